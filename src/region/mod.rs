//! Region registry.
//!
//! A region is a logical deployment label used for client-side routing
//! heuristics. The registry is a plain, hand-maintained list; the only
//! runtime mutations are capacity/latency measurements and availability
//! toggles.
//!
//! Registry order matters: it breaks score ties during selection and its
//! first entry is the last-resort default region.

pub mod selector;

pub use selector::{LocationMap, RegionSelector, DEFAULT_MAX_CAPACITY};

use crate::config::RegionConfig;
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// A named routing region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Stable identifier (e.g. "eu-central").
    pub id: String,
    /// Display name.
    pub name: String,
    /// Human-readable location (e.g. "Frankfurt").
    pub location: String,
    /// Estimated round-trip latency in milliseconds.
    pub latency_estimate_ms: u32,
    /// Load fraction in `[0, 1]`.
    pub capacity: f64,
    pub available: bool,
    pub supported_models: BTreeSet<String>,
    /// Optional base URL that replaces the shared backend URL for this region.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl Region {
    pub fn new(id: &str, name: &str, location: &str, latency_estimate_ms: u32) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            location: location.to_string(),
            latency_estimate_ms,
            capacity: 0.0,
            available: true,
            supported_models: BTreeSet::new(),
            endpoint: None,
        }
    }

    pub fn with_capacity(mut self, capacity: f64) -> Self {
        self.capacity = clamp_capacity(capacity);
        self
    }

    pub fn with_models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.supported_models
            .extend(models.into_iter().map(Into::into));
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    pub fn supports(&self, model: &str) -> bool {
        self.supported_models.contains(model)
    }

    /// Selection score: lower is better.
    pub fn score(&self) -> f64 {
        self.latency_estimate_ms as f64 * (1.0 + self.capacity)
    }
}

fn clamp_capacity(capacity: f64) -> f64 {
    if capacity.is_nan() {
        return 1.0;
    }
    capacity.clamp(0.0, 1.0)
}

/// Ordered collection of regions.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionRegistry {
    regions: Vec<Region>,
}

impl RegionRegistry {
    /// Builds a registry, rejecting an empty list or duplicate ids.
    pub fn new(regions: Vec<Region>) -> Result<Self> {
        if regions.is_empty() {
            return Err(Error::configuration_with_context(
                "region list is empty",
                ErrorContext::new()
                    .with_field_path("regions")
                    .with_source("region_registry"),
            ));
        }
        let mut seen = HashSet::new();
        for region in &regions {
            if !seen.insert(region.id.as_str()) {
                return Err(Error::configuration_with_context(
                    format!("duplicate region id '{}'", region.id),
                    ErrorContext::new()
                        .with_field_path("regions")
                        .with_source("region_registry"),
                ));
            }
        }
        Ok(Self { regions })
    }

    pub fn from_configs(configs: Vec<RegionConfig>) -> Result<Self> {
        Self::new(configs.into_iter().map(RegionConfig::into_region).collect())
    }

    pub fn get(&self, id: &str) -> Option<&Region> {
        self.regions.iter().find(|r| r.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// The last-resort default region.
    pub fn first(&self) -> &Region {
        // `new` guarantees at least one region.
        &self.regions[0]
    }

    pub fn update_capacity(&mut self, id: &str, capacity: f64) -> Result<()> {
        self.get_mut(id)?.capacity = clamp_capacity(capacity);
        Ok(())
    }

    pub fn update_latency(&mut self, id: &str, latency_ms: u32) -> Result<()> {
        self.get_mut(id)?.latency_estimate_ms = latency_ms;
        Ok(())
    }

    pub fn set_available(&mut self, id: &str, available: bool) -> Result<()> {
        self.get_mut(id)?.available = available;
        Ok(())
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut Region> {
        self.regions
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| Error::UnknownRegion(id.to_string()))
    }
}

impl Default for RegionRegistry {
    fn default() -> Self {
        let regions = vec![
            Region::new("us-east", "US East", "Virginia", 45)
                .with_capacity(0.3)
                .with_models(["gpt-4o", "gpt-4o-mini", "claude-3-5-sonnet", "claude-3-haiku"]),
            Region::new("us-west", "US West", "Oregon", 60)
                .with_capacity(0.2)
                .with_models(["gpt-4o", "gpt-4o-mini", "claude-3-haiku"]),
            Region::new("eu-central", "EU Central", "Frankfurt", 50)
                .with_capacity(0.4)
                .with_models(["gpt-4o", "gpt-4o-mini", "claude-3-5-sonnet"]),
            Region::new("eu-west", "EU West", "Ireland", 55)
                .with_capacity(0.35)
                .with_models(["gpt-4o-mini", "claude-3-5-sonnet", "claude-3-haiku"]),
            Region::new("ap-southeast", "Asia Pacific Southeast", "Singapore", 90)
                .with_capacity(0.25)
                .with_models(["gpt-4o", "gpt-4o-mini"]),
            Region::new("ap-northeast", "Asia Pacific Northeast", "Tokyo", 85)
                .with_capacity(0.3)
                .with_models(["gpt-4o-mini", "claude-3-haiku"]),
        ];
        Self { regions }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_has_every_region_serving_the_default_model() {
        let registry = RegionRegistry::default();
        assert_eq!(registry.len(), 6);
        assert_eq!(registry.first().id, "us-east");
        assert!(registry.iter().all(|r| r.supports("gpt-4o-mini")));
    }

    #[test]
    fn capacity_updates_are_clamped() {
        let mut registry = RegionRegistry::default();
        registry.update_capacity("eu-west", 1.7).unwrap();
        assert_eq!(registry.get("eu-west").unwrap().capacity, 1.0);
        registry.update_capacity("eu-west", -0.2).unwrap();
        assert_eq!(registry.get("eu-west").unwrap().capacity, 0.0);
        registry.update_capacity("eu-west", f64::NAN).unwrap();
        assert_eq!(registry.get("eu-west").unwrap().capacity, 1.0);
    }

    #[test]
    fn updates_to_missing_region_fail() {
        let mut registry = RegionRegistry::default();
        let err = registry.update_latency("mars-1", 10).unwrap_err();
        assert!(matches!(err, Error::UnknownRegion(ref id) if id == "mars-1"));
        assert!(registry.set_available("mars-1", false).is_err());
    }

    #[test]
    fn duplicate_and_empty_lists_are_rejected() {
        assert!(RegionRegistry::new(Vec::new()).is_err());
        let dup = vec![
            Region::new("a", "A", "x", 10),
            Region::new("a", "A2", "y", 20),
        ];
        assert!(RegionRegistry::new(dup).is_err());
    }

    #[test]
    fn score_weights_latency_by_load() {
        let region = Region::new("r", "R", "here", 100).with_capacity(0.5);
        assert!((region.score() - 150.0).abs() < f64::EPSILON);
    }
}
