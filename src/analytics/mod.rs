//! Routing analytics.
//!
//! Every completed (or failed) route produces a [`RoutingEvent`] that is
//! handed to an [`AnalyticsSink`]. Sinks are best-effort: a failing sink is
//! logged and otherwise ignored by the router.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`NoopSink`] | Discards everything (default) |
//! | [`InMemorySink`] | Bounded buffer, mainly for tests |
//! | [`TracingSink`] | Emits each event through `tracing` |
//! | [`CompositeSink`] | Fans out to several sinks |

use crate::model::SelectionReason;
use crate::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, RwLock};
use tracing::debug;

fn timestamp() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingEvent {
    pub request_id: String,
    /// Region that produced the answer, or the last one tried on failure.
    pub region_id: Option<String>,
    pub model: String,
    pub model_reason: SelectionReason,
    pub cached: bool,
    pub fallback_used: bool,
    pub latency_ms: u64,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: f64,
}

impl RoutingEvent {
    pub fn new(request_id: impl Into<String>, model: &str, model_reason: SelectionReason) -> Self {
        Self {
            request_id: request_id.into(),
            region_id: None,
            model: model.to_string(),
            model_reason,
            cached: false,
            fallback_used: false,
            latency_ms: 0,
            success: true,
            error: None,
            timestamp: timestamp(),
        }
    }

    pub fn with_region(mut self, region_id: &str) -> Self {
        self.region_id = Some(region_id.to_string());
        self
    }

    pub fn with_cached(mut self, cached: bool) -> Self {
        self.cached = cached;
        self
    }

    pub fn with_fallback(mut self, fallback_used: bool) -> Self {
        self.fallback_used = fallback_used;
        self
    }

    pub fn with_latency_ms(mut self, ms: u64) -> Self {
        self.latency_ms = ms;
        self
    }

    pub fn failed(mut self, error: &Error) -> Self {
        self.success = false;
        self.error = Some(error.to_string());
        self
    }
}

#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    async fn record(&self, event: RoutingEvent) -> Result<()>;

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

pub struct NoopSink;

#[async_trait]
impl AnalyticsSink for NoopSink {
    async fn record(&self, _event: RoutingEvent) -> Result<()> {
        Ok(())
    }
}

pub fn noop_sink() -> Arc<dyn AnalyticsSink> {
    Arc::new(NoopSink)
}

/// Keeps the most recent `max_events` events.
pub struct InMemorySink {
    events: RwLock<VecDeque<RoutingEvent>>,
    max_events: usize,
}

impl InMemorySink {
    pub fn new(max_events: usize) -> Self {
        Self {
            events: RwLock::new(VecDeque::new()),
            max_events,
        }
    }

    pub fn events(&self) -> Vec<RoutingEvent> {
        self.events
            .read()
            .map(|e| e.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.events.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.write() {
            events.clear();
        }
    }
}

#[async_trait]
impl AnalyticsSink for InMemorySink {
    async fn record(&self, event: RoutingEvent) -> Result<()> {
        let mut events = self
            .events
            .write()
            .map_err(|_| Error::poisoned("analytics"))?;
        events.push_back(event);
        while events.len() > self.max_events {
            events.pop_front();
        }
        Ok(())
    }
}

pub struct TracingSink;

#[async_trait]
impl AnalyticsSink for TracingSink {
    async fn record(&self, event: RoutingEvent) -> Result<()> {
        tracing::info!(
            target: "edge_ai_router::analytics",
            request_id = %event.request_id,
            region = event.region_id.as_deref().unwrap_or("-"),
            model = %event.model,
            reason = ?event.model_reason,
            cached = event.cached,
            fallback = event.fallback_used,
            latency_ms = event.latency_ms,
            success = event.success,
            "routing event"
        );
        Ok(())
    }
}

#[derive(Default)]
pub struct CompositeSink {
    sinks: Vec<Arc<dyn AnalyticsSink>>,
}

impl CompositeSink {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn add_sink(mut self, sink: Arc<dyn AnalyticsSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

#[async_trait]
impl AnalyticsSink for CompositeSink {
    async fn record(&self, event: RoutingEvent) -> Result<()> {
        for s in &self.sinks {
            if let Err(e) = s.record(event.clone()).await {
                debug!(error = %e, request_id = %event.request_id, "analytics sink failed");
            }
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        for s in &self.sinks {
            if let Err(e) = s.close().await {
                debug!(error = %e, "analytics sink failed to close");
            }
        }
        Ok(())
    }
}
