//! In-memory TTL store for routed responses.

use super::key::CacheKey;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::debug;

pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_CLEANUP_THRESHOLD: usize = 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl_secs: u64,
    /// Size above which an insert triggers removal of expired entries.
    pub cleanup_threshold: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: DEFAULT_TTL.as_secs(),
            cleanup_threshold: DEFAULT_CLEANUP_THRESHOLD,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub value: serde_json::Value,
    pub created_at: Instant,
    pub ttl: Duration,
    pub region_id: String,
}

impl CacheEntry {
    fn is_expired_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) > self.ttl
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub expired: u64,
    pub cleanups: u64,
}

impl CacheStats {
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Default)]
struct AtomicStats {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    expired: AtomicU64,
    cleanups: AtomicU64,
}

impl AtomicStats {
    fn to_stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            sets: self.sets.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
            cleanups: self.cleanups.load(Ordering::Relaxed),
        }
    }
}

/// Per-process response cache with a fixed TTL.
///
/// Not an LRU: once the table grows past the cleanup threshold, each insert
/// sweeps expired entries. Live entries are never evicted early.
pub struct ResponseCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
    cleanup_threshold: usize,
    stats: AtomicStats,
}

impl ResponseCache {
    pub fn new(ttl: Duration, cleanup_threshold: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            cleanup_threshold,
            stats: AtomicStats::default(),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.ttl(), config.cleanup_threshold)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        self.get_at(key, Instant::now())
    }

    pub(crate) fn get_at(&self, key: &CacheKey, now: Instant) -> Result<Option<CacheEntry>> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| Error::poisoned("response_cache"))?;
        match entries.get(&key.hash) {
            Some(entry) if !entry.is_expired_at(now) => {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, region = %entry.region_id, "cache hit");
                Ok(Some(entry.clone()))
            }
            Some(_) => {
                entries.remove(&key.hash);
                self.stats.expired.fetch_add(1, Ordering::Relaxed);
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, "cache entry expired");
                Ok(None)
            }
            None => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    pub fn set(&self, key: &CacheKey, value: serde_json::Value, region_id: &str) -> Result<()> {
        self.set_at(key, value, region_id, Instant::now())
    }

    pub(crate) fn set_at(
        &self,
        key: &CacheKey,
        value: serde_json::Value,
        region_id: &str,
        now: Instant,
    ) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| Error::poisoned("response_cache"))?;
        entries.insert(
            key.hash.clone(),
            CacheEntry {
                key: key.clone(),
                value,
                created_at: now,
                ttl: self.ttl,
                region_id: region_id.to_string(),
            },
        );
        self.stats.sets.fetch_add(1, Ordering::Relaxed);

        if entries.len() > self.cleanup_threshold {
            let before = entries.len();
            entries.retain(|_, e| !e.is_expired_at(now));
            let removed = (before - entries.len()) as u64;
            self.stats.cleanups.fetch_add(1, Ordering::Relaxed);
            self.stats.expired.fetch_add(removed, Ordering::Relaxed);
            debug!(removed, remaining = entries.len(), "cache cleanup pass");
        }
        Ok(())
    }

    pub fn remove(&self, key: &CacheKey) -> Result<bool> {
        Ok(self
            .entries
            .write()
            .map_err(|_| Error::poisoned("response_cache"))?
            .remove(&key.hash)
            .is_some())
    }

    pub fn clear(&self) -> Result<()> {
        self.entries
            .write()
            .map_err(|_| Error::poisoned("response_cache"))?
            .clear();
        Ok(())
    }

    /// Number of stored entries, expired or not.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.to_stats()
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_CLEANUP_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(s: &str) -> CacheKey {
        CacheKey::new(s)
    }

    #[test]
    fn hit_within_ttl() {
        let cache = ResponseCache::default();
        let start = Instant::now();
        cache.set_at(&key("a"), json!({"reply": "ok"}), "eu-west", start).unwrap();
        let entry = cache
            .get_at(&key("a"), start + DEFAULT_TTL)
            .unwrap()
            .expect("entry at exactly ttl is still valid");
        assert_eq!(entry.value["reply"], "ok");
        assert_eq!(entry.region_id, "eu-west");
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn expired_entry_is_removed_on_get() {
        let cache = ResponseCache::default();
        let start = Instant::now();
        cache.set_at(&key("a"), json!(1), "us-east", start).unwrap();
        let later = start + DEFAULT_TTL + Duration::from_millis(1);
        assert!(cache.get_at(&key("a"), later).unwrap().is_none());
        assert_eq!(cache.len(), 0);
        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.expired, 1);
    }

    #[test]
    fn expiry_holds_for_every_entry() {
        let cache = ResponseCache::new(Duration::from_secs(10), 1000);
        let start = Instant::now();
        for i in 0..50u64 {
            cache
                .set_at(&key(&i.to_string()), json!(i), "r", start + Duration::from_secs(i))
                .unwrap();
        }
        let now = start + Duration::from_secs(30);
        for i in 0..50u64 {
            let got = cache.get_at(&key(&i.to_string()), now).unwrap();
            // created at `i`, expired once 30 - i > 10
            assert_eq!(got.is_some(), i >= 20, "entry {}", i);
        }
    }

    #[test]
    fn cleanup_runs_only_past_threshold_and_keeps_live_entries() {
        let cache = ResponseCache::new(Duration::from_secs(1), 3);
        let start = Instant::now();
        for name in ["a", "b", "c"] {
            cache.set_at(&key(name), json!(name), "r", start).unwrap();
        }
        assert_eq!(cache.stats().cleanups, 0);

        let later = start + Duration::from_secs(5);
        cache.set_at(&key("d"), json!("d"), "r", later).unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().cleanups, 1);
        assert!(cache.get_at(&key("d"), later).unwrap().is_some());
    }

    #[test]
    fn cleanup_never_drops_unexpired_entries() {
        let cache = ResponseCache::new(Duration::from_secs(60), 2);
        let now = Instant::now();
        for i in 0..10 {
            cache.set_at(&key(&i.to_string()), json!(i), "r", now).unwrap();
        }
        assert_eq!(cache.len(), 10);
    }

    #[test]
    fn clear_and_remove() {
        let cache = ResponseCache::default();
        cache.set(&key("a"), json!(1), "r").unwrap();
        cache.set(&key("b"), json!(2), "r").unwrap();
        assert!(cache.remove(&key("a")).unwrap());
        assert!(!cache.remove(&key("a")).unwrap());
        cache.clear().unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn hit_ratio() {
        let stats = CacheStats {
            hits: 3,
            misses: 1,
            ..Default::default()
        };
        assert!((stats.hit_ratio() - 0.75).abs() < f64::EPSILON);
        assert_eq!(CacheStats::default().hit_ratio(), 0.0);
    }
}
