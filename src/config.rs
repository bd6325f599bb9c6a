//! Router configuration.
//!
//! Loaded from YAML, then overridden by environment variables:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `EDGE_ROUTER_CONFIG` | path of the YAML file to load first |
//! | `SUPABASE_URL` | `base_url` |
//! | `EDGE_ROUTER_FUNCTION` | `function_name` |
//! | `EDGE_ROUTER_TIMEOUT_SECS` | `timeout_secs` |
//! | `EDGE_ROUTER_CACHE_TTL_SECS` | `cache.ttl_secs` |
//! | `EDGE_ROUTER_DEFAULT_MODEL` | `default_model` |

use crate::cache::CacheConfig;
use crate::model::DEFAULT_MODEL;
use crate::region::{LocationMap, Region, RegionRegistry, RegionSelector, DEFAULT_MAX_CAPACITY};
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::path::Path;

/// One region as written in a config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionConfig {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub location: String,
    pub latency_estimate_ms: u32,
    #[serde(default)]
    pub capacity: f64,
    #[serde(default = "default_true")]
    pub available: bool,
    pub models: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

fn default_true() -> bool {
    true
}

impl RegionConfig {
    pub fn into_region(self) -> Region {
        let name = self.name.unwrap_or_else(|| self.id.clone());
        let mut region = Region::new(&self.id, &name, &self.location, self.latency_estimate_ms)
            .with_capacity(self.capacity)
            .with_models(self.models);
        region.available = self.available;
        region.endpoint = self.endpoint;
        region
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Regions at or above this load are skipped.
    pub max_capacity: f64,
    /// Extra location → region entries, merged over the built-in table.
    pub location_map: BTreeMap<String, String>,
    /// Drop the built-in location table entirely.
    pub replace_location_map: bool,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            max_capacity: DEFAULT_MAX_CAPACITY,
            location_map: BTreeMap::new(),
            replace_location_map: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    pub base_url: String,
    pub function_name: String,
    /// Fallback API key. A key stored in the OS keyring (`edge-ai-router` /
    /// `supabase`) wins over `SUPABASE_ANON_KEY`, which wins over this value.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub default_model: String,
    pub cache: CacheConfig,
    pub selection: SelectionConfig,
    /// Replaces the built-in region list when present.
    pub regions: Option<Vec<RegionConfig>>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:54321".to_string(),
            function_name: "enhanced-api".to_string(),
            api_key: None,
            timeout_secs: 30,
            default_model: DEFAULT_MODEL.to_string(),
            cache: CacheConfig::default(),
            selection: SelectionConfig::default(),
            regions: None,
        }
    }
}

impl RouterConfig {
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: RouterConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let config = Self::read_file(path.as_ref())?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults (or the file named by `EDGE_ROUTER_CONFIG`) plus env overrides.
    ///
    /// The file is validated only after overrides are applied, so it may leave
    /// fields such as `base_url` for the environment to fill.
    pub fn from_env() -> Result<Self> {
        let mut config = match env::var("EDGE_ROUTER_CONFIG") {
            Ok(path) => Self::read_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|name| env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration_with_context(
                format!("Failed to read config: {}", e),
                ErrorContext::new()
                    .with_details(path.display().to_string())
                    .with_source("config"),
            )
        })?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Applies overrides from `lookup`, keyed by environment variable name.
    fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("SUPABASE_URL") {
            self.base_url = url;
        }
        if let Some(name) = lookup("EDGE_ROUTER_FUNCTION") {
            self.function_name = name;
        }
        if let Some(model) = lookup("EDGE_ROUTER_DEFAULT_MODEL") {
            self.default_model = model;
        }
        if let Some(raw) = lookup("EDGE_ROUTER_TIMEOUT_SECS") {
            self.timeout_secs = parse_u64("EDGE_ROUTER_TIMEOUT_SECS", &raw)?;
        }
        if let Some(raw) = lookup("EDGE_ROUTER_CACHE_TTL_SECS") {
            self.cache.ttl_secs = parse_u64("EDGE_ROUTER_CACHE_TTL_SECS", &raw)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.base_url).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid base_url: {}", e),
                ErrorContext::new()
                    .with_field_path("base_url")
                    .with_source("config"),
            )
        })?;
        if self.function_name.trim().is_empty() {
            return Err(invalid("function_name", "must not be empty"));
        }
        if self.timeout_secs == 0 {
            return Err(invalid("timeout_secs", "must be positive"));
        }
        if self.cache.ttl_secs == 0 {
            return Err(invalid("cache.ttl_secs", "must be positive"));
        }
        let max = self.selection.max_capacity;
        if !(max > 0.0 && max <= 1.0) {
            return Err(invalid(
                "selection.max_capacity",
                &format!("must be in (0, 1], got {}", max),
            ));
        }
        if let Some(regions) = &self.regions {
            for (i, region) in regions.iter().enumerate() {
                if let Some(endpoint) = &region.endpoint {
                    url::Url::parse(endpoint).map_err(|e| {
                        Error::configuration_with_context(
                            format!("invalid region endpoint: {}", e),
                            ErrorContext::new()
                                .with_field_path(format!("regions[{}].endpoint", i))
                                .with_source("config"),
                        )
                    })?;
                }
            }
        }
        Ok(())
    }

    pub fn build_registry(&self) -> Result<RegionRegistry> {
        match &self.regions {
            Some(regions) => RegionRegistry::from_configs(regions.clone()),
            None => Ok(RegionRegistry::default()),
        }
    }

    pub fn build_selector(&self) -> RegionSelector {
        let mut locations = if self.selection.replace_location_map {
            LocationMap::empty()
        } else {
            LocationMap::default()
        };
        for (location, region) in &self.selection.location_map {
            locations.insert(location, region.clone());
        }
        RegionSelector::new()
            .with_max_capacity(self.selection.max_capacity)
            .with_locations(locations)
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }
}

fn invalid(field: &str, details: &str) -> Error {
    Error::configuration_with_context(
        format!("invalid value for {}", field),
        ErrorContext::new()
            .with_field_path(field)
            .with_details(details)
            .with_source("config"),
    )
}

fn parse_u64(name: &str, raw: &str) -> Result<u64> {
    raw.trim().parse::<u64>().map_err(|_| {
        Error::configuration_with_context(
            format!("{} is not a number", name),
            ErrorContext::new()
                .with_field_path(name)
                .with_details(raw)
                .with_source("config"),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = RouterConfig::default();
        config.validate().unwrap();
        assert_eq!(config.function_name, "enhanced-api");
        assert_eq!(config.cache.ttl_secs, 300);
        assert_eq!(config.cache.cleanup_threshold, 1000);
        assert_eq!(config.selection.max_capacity, 0.95);
    }

    #[test]
    fn parses_yaml_with_region_override() {
        let yaml = r#"
base_url: https://abc.supabase.co
cache:
  ttl_secs: 60
selection:
  location_map:
    BR: sa-east
regions:
  - id: sa-east
    location: Sao Paulo
    latency_estimate_ms: 70
    models: [gpt-4o-mini]
  - id: us-east
    name: US East
    location: Virginia
    latency_estimate_ms: 45
    capacity: 0.5
    models: [gpt-4o, gpt-4o-mini]
"#;
        let config = RouterConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.cache.ttl_secs, 60);
        assert_eq!(config.cache.cleanup_threshold, 1000);

        let registry = config.build_registry().unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.first().id, "sa-east");
        assert_eq!(registry.first().name, "sa-east");
        assert_eq!(registry.get("us-east").unwrap().capacity, 0.5);

        let selector = config.build_selector();
        let region = selector.select(&registry, Some("br"), None).unwrap();
        assert_eq!(region.id, "sa-east");
    }

    #[test]
    fn rejects_bad_values() {
        let bad_url = RouterConfig::default().with_base_url("not a url");
        assert!(bad_url.validate().is_err());

        let mut bad_cap = RouterConfig::default();
        bad_cap.selection.max_capacity = 1.5;
        let err = bad_cap.validate().unwrap_err();
        assert_eq!(
            err.context().and_then(|c| c.field_path.as_deref()),
            Some("selection.max_capacity")
        );

        let mut zero_ttl = RouterConfig::default();
        zero_ttl.cache.ttl_secs = 0;
        assert!(zero_ttl.validate().is_err());
    }

    #[test]
    fn api_key_is_never_serialized() {
        let config = RouterConfig::default().with_api_key("secret");
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(!yaml.contains("secret"));
    }

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn overrides_replace_file_values() {
        let mut config = RouterConfig::from_yaml_str("base_url: https://file.example.com").unwrap();
        config
            .apply_overrides(vars(&[
                ("SUPABASE_URL", "https://env.supabase.co"),
                ("EDGE_ROUTER_FUNCTION", "chat-v2"),
                ("EDGE_ROUTER_DEFAULT_MODEL", "claude-3-haiku"),
                ("EDGE_ROUTER_TIMEOUT_SECS", " 12 "),
                ("EDGE_ROUTER_CACHE_TTL_SECS", "90"),
            ]))
            .unwrap();
        assert_eq!(config.base_url, "https://env.supabase.co");
        assert_eq!(config.function_name, "chat-v2");
        assert_eq!(config.default_model, "claude-3-haiku");
        assert_eq!(config.timeout_secs, 12);
        assert_eq!(config.cache.ttl_secs, 90);
    }

    #[test]
    fn non_numeric_overrides_are_rejected() {
        for name in ["EDGE_ROUTER_TIMEOUT_SECS", "EDGE_ROUTER_CACHE_TTL_SECS"] {
            let mut config = RouterConfig::default();
            let err = config.apply_overrides(vars(&[(name, "soon")])).unwrap_err();
            assert_eq!(
                err.context().and_then(|c| c.field_path.as_deref()),
                Some(name)
            );
        }
    }

    #[test]
    fn env_fills_placeholders_left_in_file() {
        let path = std::env::temp_dir().join(format!(
            "edge-router-{}.yaml",
            uuid::Uuid::new_v4()
        ));
        std::fs::write(&path, "base_url: \"\"\ncache:\n  ttl_secs: 0\n").unwrap();

        // Only this test touches the process environment.
        std::env::set_var("EDGE_ROUTER_CONFIG", &path);
        std::env::set_var("SUPABASE_URL", "https://abc.supabase.co");
        std::env::set_var("EDGE_ROUTER_CACHE_TTL_SECS", "120");
        let loaded = RouterConfig::from_env();
        std::env::remove_var("EDGE_ROUTER_CONFIG");
        std::env::remove_var("SUPABASE_URL");
        std::env::remove_var("EDGE_ROUTER_CACHE_TTL_SECS");
        let _ = std::fs::remove_file(&path);

        let config = loaded.unwrap();
        assert_eq!(config.base_url, "https://abc.supabase.co");
        assert_eq!(config.cache.ttl_secs, 120);

        // The same file on its own is still rejected.
        assert!(RouterConfig::from_yaml_str("base_url: \"\"").is_err());
    }

    #[test]
    fn rejects_bad_region_endpoint() {
        let yaml = r#"
regions:
  - id: us-east
    location: Virginia
    latency_estimate_ms: 45
    models: [gpt-4o-mini]
  - id: eu-west
    location: Ireland
    latency_estimate_ms: 55
    models: [gpt-4o-mini]
    endpoint: "not a url"
"#;
        let err = RouterConfig::from_yaml_str(yaml).unwrap_err();
        assert_eq!(
            err.context().and_then(|c| c.field_path.as_deref()),
            Some("regions[1].endpoint")
        );

        let ok = yaml.replace("not a url", "https://eu.example.com");
        assert!(RouterConfig::from_yaml_str(&ok).is_ok());
    }
}
