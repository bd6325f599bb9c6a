//! Request and response types shared by the router, cache and transport.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`RoutingRequest`] | One chat request to be routed |
//! | [`RequestContext`] | Caller identity and session type |
//! | [`Priority`] | Request priority hint |
//! | [`RoutedResponse`] | Backend payload plus routing metadata |
//! | [`DispatchPayload`] | JSON body sent to the backing function |

pub mod request;
pub mod response;

pub use request::{Priority, RequestContext, RoutingRequest};
pub use response::{DispatchPayload, RoutedResponse};
