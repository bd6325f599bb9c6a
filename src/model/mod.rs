//! Model selection for requests that do not name a model.
//!
//! A handful of heuristics: crisis sessions and high-priority requests go to
//! the strongest model, very long messages go to the long-context model, and
//! everything else uses the default. An explicitly requested model always
//! wins.

use crate::types::{Priority, RoutingRequest};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const CRISIS_MODEL: &str = "claude-3-5-sonnet";
pub const LONG_CONTEXT_MODEL: &str = "gpt-4o";
pub const LONG_MESSAGE_CHARS: usize = 2000;

/// Why a model was chosen; recorded in analytics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionReason {
    Requested,
    Crisis,
    HighPriority,
    LongMessage,
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSelector {
    pub default_model: String,
    pub crisis_model: String,
    pub long_context_model: String,
    pub long_message_chars: usize,
}

impl ModelSelector {
    pub fn new() -> Self {
        Self {
            default_model: DEFAULT_MODEL.to_string(),
            crisis_model: CRISIS_MODEL.to_string(),
            long_context_model: LONG_CONTEXT_MODEL.to_string(),
            long_message_chars: LONG_MESSAGE_CHARS,
        }
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    pub fn with_crisis_model(mut self, model: impl Into<String>) -> Self {
        self.crisis_model = model.into();
        self
    }

    pub fn with_long_context_model(mut self, model: impl Into<String>) -> Self {
        self.long_context_model = model.into();
        self
    }

    pub fn resolve<'a>(&'a self, request: &'a RoutingRequest) -> (&'a str, SelectionReason) {
        if let Some(model) = request.model.as_deref() {
            return (model, SelectionReason::Requested);
        }
        if request.context.is_crisis() {
            return (self.crisis_model.as_str(), SelectionReason::Crisis);
        }
        if request.priority == Priority::High {
            return (self.crisis_model.as_str(), SelectionReason::HighPriority);
        }
        if request.message.chars().count() > self.long_message_chars {
            return (self.long_context_model.as_str(), SelectionReason::LongMessage);
        }
        (self.default_model.as_str(), SelectionReason::Default)
    }
}

impl Default for ModelSelector {
    fn default() -> Self {
        Self::new()
    }
}
