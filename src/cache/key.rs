//! Cache key generation.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub hash: String,
    pub model: Option<String>,
}

impl CacheKey {
    pub fn new(hash: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            model: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn as_str(&self) -> &str {
        &self.hash
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.hash)
    }
}

impl From<&str> for CacheKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for CacheKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Trims, lowercases and collapses whitespace runs to a single space.
pub fn normalize_message(message: &str) -> String {
    WHITESPACE
        .replace_all(message.trim(), " ")
        .to_lowercase()
}

/// Builds keys from (normalized message, user, model, session type).
#[derive(Debug, Clone, Default)]
pub struct CacheKeyGenerator {
    salt: Option<String>,
}

impl CacheKeyGenerator {
    pub fn new() -> Self {
        Self { salt: None }
    }

    pub fn with_salt(mut self, salt: impl Into<String>) -> Self {
        self.salt = Some(salt.into());
        self
    }

    pub fn generate(
        &self,
        message: &str,
        user_id: &str,
        model: &str,
        session_type: &str,
    ) -> CacheKey {
        let mut parts: BTreeMap<&str, String> = BTreeMap::new();
        parts.insert("message", normalize_message(message));
        parts.insert("user", user_id.to_string());
        parts.insert("model", model.to_string());
        parts.insert("session_type", session_type.to_string());
        if let Some(ref s) = self.salt {
            parts.insert("salt", s.clone());
        }
        // BTreeMap of strings always serializes.
        let canonical = serde_json::to_string(&parts).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        let hash: String = hasher
            .finalize()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect();
        CacheKey::new(hash).with_model(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_inputs_give_identical_keys() {
        let gen = CacheKeyGenerator::new();
        let a = gen.generate("How do I sleep better?", "u1", "gpt-4o-mini", "therapy");
        let b = gen.generate("How do I sleep better?", "u1", "gpt-4o-mini", "therapy");
        assert_eq!(a, b);
        assert_eq!(a.hash.len(), 64);
    }

    #[test]
    fn normalization_ignores_case_and_spacing() {
        let gen = CacheKeyGenerator::new();
        let a = gen.generate("  Hello\n  World ", "u1", "m", "s");
        let b = gen.generate("hello world", "u1", "m", "s");
        assert_eq!(a, b);
    }

    #[test]
    fn every_component_changes_the_key() {
        let gen = CacheKeyGenerator::new();
        let base = gen.generate("hi", "u1", "m", "s");
        assert_ne!(base, gen.generate("hey", "u1", "m", "s"));
        assert_ne!(base, gen.generate("hi", "u2", "m", "s"));
        assert_ne!(base, gen.generate("hi", "u1", "m2", "s"));
        assert_ne!(base, gen.generate("hi", "u1", "m", "s2"));
        assert_ne!(
            base,
            CacheKeyGenerator::new().with_salt("v2").generate("hi", "u1", "m", "s")
        );
    }

    #[test]
    fn components_cannot_bleed_into_each_other() {
        let gen = CacheKeyGenerator::new();
        assert_ne!(
            gen.generate("a", "bc", "m", "s"),
            gen.generate("ab", "c", "m", "s")
        );
    }
}
