//! Selection and cache-key properties over the public API.

use edge_ai_router::cache::CacheKeyGenerator;
use edge_ai_router::{Error, RegionRegistry, RegionSelector};

const LOCATIONS: [Option<&str>; 8] = [
    None,
    Some("US"),
    Some("EU"),
    Some("UK"),
    Some("SG"),
    Some("JP"),
    Some("us-west"),
    Some("ZZ"),
];

const MODELS: [Option<&str>; 4] = [None, Some("gpt-4o"), Some("gpt-4o-mini"), Some("claude-3-5-sonnet")];

#[test]
fn saturated_regions_are_never_selected() {
    let ids: Vec<String> = RegionRegistry::default().iter().map(|r| r.id.clone()).collect();
    let selector = RegionSelector::new();

    // Saturate every subset of regions and check all location/model combinations.
    for mask in 0u32..(1 << ids.len()) {
        let mut registry = RegionRegistry::default();
        for (i, id) in ids.iter().enumerate() {
            if mask & (1 << i) != 0 {
                registry.update_capacity(id, 0.95 + 0.01 * i as f64).unwrap();
            }
        }
        for location in LOCATIONS {
            for model in MODELS {
                match selector.select(&registry, location, model) {
                    Ok(region) => {
                        assert!(region.capacity < 0.95, "picked saturated {}", region.id);
                        assert!(region.available);
                        if let Some(m) = model {
                            assert!(region.supports(m));
                        }
                    }
                    Err(Error::NoEligibleRegion { .. }) => {
                        assert!(registry.iter().all(|r| r.capacity >= 0.95
                            || model.is_some_and(|m| !r.supports(m))));
                    }
                    Err(other) => panic!("unexpected error: {other}"),
                }
            }
        }
    }
}

#[test]
fn eu_location_picks_eu_central_when_healthy() {
    let registry = RegionRegistry::default();
    let region = RegionSelector::new().select(&registry, Some("EU"), None).unwrap();
    assert_eq!(region.id, "eu-central");
}

#[test]
fn lower_max_capacity_tightens_the_filter() {
    let mut registry = RegionRegistry::default();
    registry.update_capacity("eu-central", 0.6).unwrap();
    let strict = RegionSelector::new().with_max_capacity(0.5);
    let region = strict.select(&registry, Some("EU"), None).unwrap();
    assert_ne!(region.id, "eu-central");
    assert!(region.capacity < 0.5);
}

#[test]
fn cache_keys_are_deterministic_across_generators() {
    let a = CacheKeyGenerator::new();
    let b = CacheKeyGenerator::new();
    for (msg, user, model, session) in [
        ("hello", "u1", "gpt-4o", "therapy"),
        ("I can't sleep", "u2", "gpt-4o-mini", "crisis"),
        ("", "", "", ""),
    ] {
        assert_eq!(
            a.generate(msg, user, model, session),
            b.generate(msg, user, model, session)
        );
    }
}
