//! # edge-ai-router
//!
//! Multi-region, multi-model routing for AI chat requests served by edge
//! functions, with a per-process response cache.
//!
//! ## Overview
//!
//! A request names a message, a caller context and optionally a model and a
//! location. The router:
//!
//! 1. resolves a model when none is requested ([`model`]),
//! 2. answers from the TTL cache when an identical request was seen recently ([`cache`]),
//! 3. picks an eligible region by location preference or load-weighted latency ([`region`]),
//! 4. invokes the region's backing function ([`transport`]) and falls back to one
//!    alternate region on failure ([`router`]),
//! 5. reports a routing event to an analytics sink ([`analytics`]).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edge_ai_router::{EdgeRouterBuilder, RequestContext, RouterConfig, RoutingRequest};
//!
//! #[tokio::main]
//! async fn main() -> edge_ai_router::Result<()> {
//!     let config = RouterConfig::from_env()?;
//!     let router = EdgeRouterBuilder::from_config(&config)?.build()?;
//!
//!     let request = RoutingRequest::new(
//!         "I've been feeling anxious before work",
//!         RequestContext::new("user-42", "therapy"),
//!     )
//!     .with_location("EU");
//!
//!     let response = router.route(&request).await?;
//!     println!("{} via {}", response.payload, response.region_id);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`region`] | Region registry and selection |
//! | [`model`] | Model selection heuristics |
//! | [`cache`] | Cache keys and the TTL response cache |
//! | [`router`] | The dispatcher |
//! | [`transport`] | Backend trait and HTTP implementation |
//! | [`analytics`] | Routing events and sinks |
//! | [`config`] | YAML/env configuration |
//! | [`types`] | Request and response types |

pub mod analytics;
pub mod cache;
pub mod config;
pub mod model;
pub mod region;
pub mod router;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use analytics::{AnalyticsSink, RoutingEvent};
pub use config::RouterConfig;
pub use region::{Region, RegionRegistry, RegionSelector};
pub use router::{EdgeRouter, EdgeRouterBuilder};
pub use transport::{HttpTransport, RegionBackend};
pub use types::{Priority, RequestContext, RoutedResponse, RoutingRequest};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
