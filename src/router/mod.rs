//! Request dispatcher.
//!
//! [`EdgeRouter::route`] resolves a model, answers from the cache when it
//! can, otherwise picks a region, invokes the backend and, on failure,
//! tries exactly one alternate region serving the same model. There is no
//! retry backoff and no circuit breaker; timeouts are whatever the backend
//! enforces.
//!
//! Concurrent misses for the same key are not coalesced: each one goes
//! upstream and the last response written wins the cache slot.

mod builder;

pub use builder::EdgeRouterBuilder;

use crate::analytics::{AnalyticsSink, RoutingEvent};
use crate::cache::{CacheKey, CacheKeyGenerator, CacheStats, ResponseCache};
use crate::model::ModelSelector;
use crate::region::{RegionRegistry, RegionSelector};
use crate::transport::RegionBackend;
use crate::types::{DispatchPayload, RoutedResponse, RoutingRequest};
use crate::{Error, ErrorContext, Result};
use arc_swap::ArcSwap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

pub struct EdgeRouter {
    registry: ArcSwap<RegionRegistry>,
    selector: RegionSelector,
    models: ModelSelector,
    cache: ResponseCache,
    cache_enabled: bool,
    keys: CacheKeyGenerator,
    backend: Arc<dyn RegionBackend>,
    analytics: Arc<dyn AnalyticsSink>,
}

impl EdgeRouter {
    pub fn builder() -> EdgeRouterBuilder {
        EdgeRouterBuilder::new()
    }

    pub async fn route(&self, request: &RoutingRequest) -> Result<RoutedResponse> {
        validate(request)?;
        let start = Instant::now();
        let request_id = uuid::Uuid::new_v4().to_string();
        let (model, reason) = self.models.resolve(request);
        let model = model.to_string();
        let event = RoutingEvent::new(&request_id, &model, reason);

        let key = (self.cache_enabled && request.cacheable)
            .then(|| self.cache_key(request, &model));
        if let Some(key) = &key {
            if let Some(entry) = self.cache.get(key)? {
                let response = RoutedResponse {
                    payload: entry.value,
                    region_id: entry.region_id,
                    model,
                    cached: true,
                    fallback_used: false,
                    latency: start.elapsed(),
                };
                self.record(
                    event
                        .with_region(&response.region_id)
                        .with_cached(true)
                        .with_latency_ms(response.latency.as_millis() as u64),
                )
                .await;
                return Ok(response);
            }
        }

        let registry = self.registry.load_full();
        let primary = match self.selector.select(
            &registry,
            request.user_location.as_deref(),
            Some(&model),
        ) {
            Ok(region) => region,
            Err(e) => {
                self.record(event.failed(&e)).await;
                return Err(e);
            }
        };

        let payload = DispatchPayload::new(
            &request.message,
            &request.context,
            &model,
            request.priority,
            &primary.id,
        );

        let (region_id, outcome, fallback_used) = match self.backend.invoke(primary, &payload).await
        {
            Ok(value) => (primary.id.clone(), Ok(value), false),
            Err(primary_err) => {
                match self
                    .selector
                    .select_alternate(&registry, Some(&model), &primary.id)
                {
                    Some(alternate) => {
                        warn!(
                            %request_id,
                            backend = self.backend.name(),
                            region = %primary.id,
                            fallback = %alternate.id,
                            error = %primary_err,
                            "primary region failed, trying alternate"
                        );
                        let retry = payload.for_region(&alternate.id);
                        let outcome = self.backend.invoke(alternate, &retry).await;
                        (alternate.id.clone(), outcome, true)
                    }
                    None => {
                        warn!(
                            %request_id,
                            backend = self.backend.name(),
                            region = %primary.id,
                            error = %primary_err,
                            "primary region failed, no alternate serves model"
                        );
                        (primary.id.clone(), Err(primary_err), false)
                    }
                }
            }
        };

        let latency = start.elapsed();
        let event = event
            .with_region(&region_id)
            .with_fallback(fallback_used)
            .with_latency_ms(latency.as_millis() as u64);

        let payload = match outcome {
            Ok(value) => value,
            Err(e) => {
                self.record(event.failed(&e)).await;
                return Err(e);
            }
        };

        if let Some(key) = &key {
            self.cache.set(key, payload.clone(), &region_id)?;
        }

        info!(
            %request_id,
            backend = self.backend.name(),
            region = %region_id,
            model = %model,
            fallback = fallback_used,
            duration_ms = latency.as_millis() as u64,
            "edge request completed"
        );
        self.record(event).await;

        Ok(RoutedResponse {
            payload,
            region_id,
            model,
            cached: false,
            fallback_used,
            latency,
        })
    }

    /// The cache key `route` would use for `request` once `model` is resolved.
    pub fn cache_key(&self, request: &RoutingRequest, model: &str) -> CacheKey {
        self.keys.generate(
            &request.message,
            &request.context.user_id,
            model,
            &request.context.session_type,
        )
    }

    /// Current registry snapshot.
    pub fn regions(&self) -> Arc<RegionRegistry> {
        self.registry.load_full()
    }

    pub fn selector(&self) -> &RegionSelector {
        &self.selector
    }

    pub fn update_region_capacity(&self, id: &str, capacity: f64) -> Result<()> {
        self.update_registry(|r| r.update_capacity(id, capacity))
    }

    pub fn update_region_latency(&self, id: &str, latency_ms: u32) -> Result<()> {
        self.update_registry(|r| r.update_latency(id, latency_ms))
    }

    pub fn set_region_available(&self, id: &str, available: bool) -> Result<()> {
        self.update_registry(|r| r.set_available(id, available))
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&self) -> Result<()> {
        self.cache.clear()
    }

    fn update_registry<F>(&self, mut apply: F) -> Result<()>
    where
        F: FnMut(&mut RegionRegistry) -> Result<()>,
    {
        let mut outcome = Ok(());
        self.registry.rcu(|current| {
            let mut next = RegionRegistry::clone(current);
            outcome = apply(&mut next);
            next
        });
        outcome
    }

    async fn record(&self, event: RoutingEvent) {
        if let Err(e) = self.analytics.record(event).await {
            debug!(error = %e, "analytics sink rejected event");
        }
    }
}

fn validate(request: &RoutingRequest) -> Result<()> {
    if request.message.trim().is_empty() {
        return Err(Error::validation_with_context(
            "message must not be empty",
            ErrorContext::new()
                .with_field_path("request.message")
                .with_source("dispatcher"),
        ));
    }
    if request.context.user_id.trim().is_empty() {
        return Err(Error::validation_with_context(
            "user id must not be empty",
            ErrorContext::new()
                .with_field_path("request.context.user_id")
                .with_source("dispatcher"),
        ));
    }
    Ok(())
}
