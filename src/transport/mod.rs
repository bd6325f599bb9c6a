//! Backend invocation.
//!
//! The dispatcher talks to regions through [`RegionBackend`]; the production
//! implementation is [`HttpTransport`], which posts to a Supabase edge
//! function.

mod http;

pub use http::{HttpTransport, TransportError};

use crate::region::Region;
use crate::types::DispatchPayload;
use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait RegionBackend: Send + Sync {
    /// Sends one request to `region` and returns the backend's JSON reply.
    async fn invoke(&self, region: &Region, payload: &DispatchPayload) -> Result<serde_json::Value>;

    fn name(&self) -> &'static str;
}
