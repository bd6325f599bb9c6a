use super::EdgeRouter;
use crate::analytics::{noop_sink, AnalyticsSink};
use crate::cache::{CacheConfig, CacheKeyGenerator, ResponseCache};
use crate::config::RouterConfig;
use crate::model::ModelSelector;
use crate::region::{RegionRegistry, RegionSelector};
use crate::transport::{HttpTransport, RegionBackend};
use crate::{Error, ErrorContext, Result};
use arc_swap::ArcSwap;
use std::sync::Arc;

/// Builder for [`EdgeRouter`].
///
/// Everything except the backend has a default; use [`from_config`](Self::from_config)
/// to get an HTTP backend wired from a [`RouterConfig`].
pub struct EdgeRouterBuilder {
    registry: RegionRegistry,
    selector: RegionSelector,
    models: ModelSelector,
    cache: CacheConfig,
    keys: CacheKeyGenerator,
    backend: Option<Arc<dyn RegionBackend>>,
    analytics: Arc<dyn AnalyticsSink>,
}

impl EdgeRouterBuilder {
    pub fn new() -> Self {
        Self {
            registry: RegionRegistry::default(),
            selector: RegionSelector::default(),
            models: ModelSelector::default(),
            cache: CacheConfig::default(),
            keys: CacheKeyGenerator::new(),
            backend: None,
            analytics: noop_sink(),
        }
    }

    /// Registry, selector, cache and model defaults from `config`, plus an
    /// [`HttpTransport`] backend.
    pub fn from_config(config: &RouterConfig) -> Result<Self> {
        config.validate()?;
        let transport = HttpTransport::new(config)?;
        Ok(Self::new()
            .registry(config.build_registry()?)
            .selector(config.build_selector())
            .models(ModelSelector::new().with_default_model(config.default_model.clone()))
            .cache(config.cache.clone())
            .backend(Arc::new(transport)))
    }

    pub fn registry(mut self, registry: RegionRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn selector(mut self, selector: RegionSelector) -> Self {
        self.selector = selector;
        self
    }

    pub fn models(mut self, models: ModelSelector) -> Self {
        self.models = models;
        self
    }

    pub fn cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// Salt mixed into every cache key; bump it to invalidate old entries.
    pub fn cache_key_salt(mut self, salt: impl Into<String>) -> Self {
        self.keys = CacheKeyGenerator::new().with_salt(salt);
        self
    }

    pub fn backend(mut self, backend: Arc<dyn RegionBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Inject an analytics sink. Default is a no-op sink.
    pub fn analytics(mut self, sink: Arc<dyn AnalyticsSink>) -> Self {
        self.analytics = sink;
        self
    }

    pub fn build(self) -> Result<EdgeRouter> {
        let backend = self.backend.ok_or_else(|| {
            Error::configuration_with_context(
                "no region backend configured",
                ErrorContext::new().with_source("router_builder"),
            )
        })?;
        Ok(EdgeRouter {
            registry: ArcSwap::from_pointee(self.registry),
            selector: self.selector,
            models: self.models,
            cache: ResponseCache::from_config(&self.cache),
            cache_enabled: self.cache.enabled,
            keys: self.keys,
            backend,
            analytics: self.analytics,
        })
    }
}

impl Default for EdgeRouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}
