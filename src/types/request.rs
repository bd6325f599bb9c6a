//! Routing request definition.

use serde::{Deserialize, Serialize};

/// Caller identity and the kind of session the message belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    pub user_id: String,
    /// Free-form session label (e.g. "therapy", "crisis", "journal").
    pub session_type: String,
}

impl RequestContext {
    pub fn new(user_id: impl Into<String>, session_type: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            session_type: session_type.into(),
        }
    }

    pub fn is_crisis(&self) -> bool {
        self.session_type.eq_ignore_ascii_case("crisis")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "normal" => Ok(Priority::Normal),
            "high" => Ok(Priority::High),
            other => Err(crate::Error::validation_with_context(
                format!("unknown priority '{}'", other),
                crate::ErrorContext::new().with_field_path("request.priority"),
            )),
        }
    }
}

/// A single chat request to be routed to an edge region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingRequest {
    pub message: String,
    pub context: RequestContext,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default = "default_cacheable")]
    pub cacheable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_location: Option<String>,
}

fn default_cacheable() -> bool {
    true
}

impl RoutingRequest {
    pub fn new(message: impl Into<String>, context: RequestContext) -> Self {
        Self {
            message: message.into(),
            context,
            model: None,
            priority: Priority::Normal,
            cacheable: true,
            user_location: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.user_location = Some(location.into());
        self
    }

    pub fn uncached(mut self) -> Self {
        self.cacheable = false;
        self
    }
}
