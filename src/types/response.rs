//! Dispatch payload and routed response.

use super::request::{Priority, RequestContext};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// JSON body posted to the backing edge function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchPayload {
    pub message: String,
    pub context: RequestContext,
    pub model: String,
    pub priority: Priority,
    pub edge_region: String,
    /// RFC 3339 timestamp of the dispatch.
    pub timestamp: String,
}

impl DispatchPayload {
    pub fn new(
        message: &str,
        context: &RequestContext,
        model: &str,
        priority: Priority,
        edge_region: &str,
    ) -> Self {
        Self {
            message: message.to_string(),
            context: context.clone(),
            model: model.to_string(),
            priority,
            edge_region: edge_region.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Same payload re-targeted at another region.
    pub fn for_region(&self, edge_region: &str) -> Self {
        Self {
            edge_region: edge_region.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            ..self.clone()
        }
    }
}

/// Backend payload plus how it was obtained.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutedResponse {
    pub payload: serde_json::Value,
    pub region_id: String,
    pub model: String,
    pub cached: bool,
    pub fallback_used: bool,
    pub latency: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_uses_camel_case_wire_names() {
        let ctx = RequestContext::new("u1", "therapy");
        let payload = DispatchPayload::new("hi", &ctx, "gpt-4o-mini", Priority::High, "eu-west");
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["edgeRegion"], "eu-west");
        assert_eq!(json["context"]["userId"], "u1");
        assert_eq!(json["context"]["sessionType"], "therapy");
        assert_eq!(json["priority"], "high");
        assert!(json["timestamp"].as_str().is_some());
    }

    #[test]
    fn retargeting_keeps_message() {
        let ctx = RequestContext::new("u1", "therapy");
        let payload = DispatchPayload::new("hi", &ctx, "gpt-4o", Priority::Normal, "us-east");
        let moved = payload.for_region("us-west");
        assert_eq!(moved.edge_region, "us-west");
        assert_eq!(moved.message, "hi");
        assert_eq!(moved.model, "gpt-4o");
    }
}
