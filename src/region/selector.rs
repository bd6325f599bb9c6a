//! Region selection.
//!
//! Pure logic over a [`RegionRegistry`]: no I/O, no shared state. The
//! dispatcher calls it once per request and once more when a fallback is
//! needed.

use super::{Region, RegionRegistry};
use crate::{Error, Result};
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Regions at or above this load fraction are never selected.
pub const DEFAULT_MAX_CAPACITY: f64 = 0.95;

/// Maps a location code (case-insensitive) to a preferred region id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationMap {
    entries: HashMap<String, String>,
}

impl LocationMap {
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn insert(&mut self, location: &str, region_id: impl Into<String>) {
        self.entries
            .insert(location.trim().to_ascii_uppercase(), region_id.into());
    }

    pub fn with(mut self, location: &str, region_id: &str) -> Self {
        self.insert(location, region_id);
        self
    }

    pub fn preferred(&self, location: &str) -> Option<&str> {
        self.entries
            .get(&location.trim().to_ascii_uppercase())
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for LocationMap {
    fn default() -> Self {
        Self::empty()
            .with("US", "us-east")
            .with("CA", "us-east")
            .with("US-WEST", "us-west")
            .with("EU", "eu-central")
            .with("DE", "eu-central")
            .with("FR", "eu-central")
            .with("UK", "eu-west")
            .with("GB", "eu-west")
            .with("IE", "eu-west")
            .with("ASIA", "ap-southeast")
            .with("SG", "ap-southeast")
            .with("AU", "ap-southeast")
            .with("IN", "ap-southeast")
            .with("JP", "ap-northeast")
            .with("KR", "ap-northeast")
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for LocationMap {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut map = Self::empty();
        for (location, region) in iter {
            map.insert(location.as_ref(), region);
        }
        map
    }
}

#[derive(Debug, Clone)]
pub struct RegionSelector {
    max_capacity: f64,
    locations: LocationMap,
}

impl RegionSelector {
    pub fn new() -> Self {
        Self {
            max_capacity: DEFAULT_MAX_CAPACITY,
            locations: LocationMap::default(),
        }
    }

    pub fn with_max_capacity(mut self, max_capacity: f64) -> Self {
        self.max_capacity = max_capacity;
        self
    }

    pub fn with_locations(mut self, locations: LocationMap) -> Self {
        self.locations = locations;
        self
    }

    pub fn max_capacity(&self) -> f64 {
        self.max_capacity
    }

    /// Whether a region may serve a request for `model`.
    pub fn is_eligible(&self, region: &Region, model: Option<&str>) -> bool {
        region.available
            && region.capacity < self.max_capacity
            && model.map_or(true, |m| region.supports(m))
    }

    /// Picks a region for the given location and model.
    ///
    /// A location whose preferred region is eligible wins outright; otherwise
    /// the eligible region with the lowest `latency * (1 + capacity)` is used.
    pub fn select<'a>(
        &self,
        registry: &'a RegionRegistry,
        location: Option<&str>,
        model: Option<&str>,
    ) -> Result<&'a Region> {
        if let Some(preferred) = location.and_then(|loc| self.locations.preferred(loc)) {
            if let Some(region) = registry
                .get(preferred)
                .filter(|r| self.is_eligible(r, model))
            {
                debug!(region = %region.id, location = ?location, "selected preferred region");
                return Ok(region);
            }
        }

        let best = best_by_score(registry.iter().filter(|r| self.is_eligible(r, model)));
        match best {
            Some(region) => {
                debug!(region = %region.id, score = region.score(), "selected lowest-score region");
                Ok(region)
            }
            None => Err(Error::NoEligibleRegion {
                model: model.map(str::to_string),
            }),
        }
    }

    /// Like [`select`](Self::select), but degrades to the registry's first
    /// region when nothing is eligible.
    pub fn select_or_default<'a>(
        &self,
        registry: &'a RegionRegistry,
        location: Option<&str>,
        model: Option<&str>,
    ) -> &'a Region {
        match self.select(registry, location, model) {
            Ok(region) => region,
            Err(e) => {
                let fallback = registry.first();
                warn!(error = %e, region = %fallback.id, "no eligible region, using default");
                fallback
            }
        }
    }

    /// Best eligible region other than `excluded`.
    pub fn select_alternate<'a>(
        &self,
        registry: &'a RegionRegistry,
        model: Option<&str>,
        excluded: &str,
    ) -> Option<&'a Region> {
        best_by_score(
            registry
                .iter()
                .filter(|r| r.id != excluded && self.is_eligible(r, model)),
        )
    }
}

impl Default for RegionSelector {
    fn default() -> Self {
        Self::new()
    }
}

// First minimum wins so ties keep registry order.
fn best_by_score<'a>(regions: impl Iterator<Item = &'a Region>) -> Option<&'a Region> {
    let mut best: Option<&'a Region> = None;
    for candidate in regions {
        let better = match best {
            Some(current) => {
                candidate.score().partial_cmp(&current.score()) == Some(Ordering::Less)
            }
            None => true,
        };
        if better {
            best = Some(candidate);
        }
    }
    best
}
