//! Response caching.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`ResponseCache`] | Per-process TTL map with threshold cleanup |
//! | [`CacheConfig`] | TTL, cleanup threshold and on/off switch |
//! | [`CacheKeyGenerator`] | Deterministic keys from message, user, model and session type |
//!
//! Keys hash a normalized message (trimmed, lowercased, whitespace collapsed)
//! so trivially different spellings of the same question share an entry.
//! Nothing is persisted; a restart starts cold.

mod key;
mod store;

pub use key::{normalize_message, CacheKey, CacheKeyGenerator};
pub use store::{
    CacheConfig, CacheEntry, CacheStats, ResponseCache, DEFAULT_CLEANUP_THRESHOLD, DEFAULT_TTL,
};
