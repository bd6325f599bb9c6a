use super::RegionBackend;
use crate::config::RouterConfig;
use crate::region::Region;
use crate::types::DispatchPayload;
use crate::{Error, Result};
use async_trait::async_trait;
use keyring::Entry;
use reqwest::Proxy;
use std::env;
use std::time::Duration;
use tracing::debug;

const KEYRING_SERVICE: &str = "edge-ai-router";
const KEYRING_USER: &str = "supabase";

/// Invokes a Supabase edge function over HTTPS.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    function_name: String,
    api_key: Option<String>,
}

impl HttpTransport {
    pub fn new(config: &RouterConfig) -> Result<Self> {
        let api_key = Self::get_api_key(config.api_key.as_deref());

        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(
                env::var("EDGE_ROUTER_POOL_MAX_IDLE_PER_HOST")
                    .ok()
                    .and_then(|s| s.parse::<usize>().ok())
                    .unwrap_or(32),
            )
            .pool_idle_timeout(Some(Duration::from_secs(90)));

        if let Ok(proxy_url) = env::var("EDGE_ROUTER_PROXY_URL") {
            if let Ok(proxy) = Proxy::all(&proxy_url) {
                builder = builder.proxy(proxy);
            }
        }

        let client = builder
            .build()
            .map_err(|e| Error::Transport(TransportError::Other(e.to_string())))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            function_name: config.function_name.clone(),
            api_key,
        })
    }

    /// Keyring first, then `SUPABASE_ANON_KEY`, then the configured key.
    fn get_api_key(configured: Option<&str>) -> Option<String> {
        // 1. Try Keyring
        if let Ok(entry) = Entry::new(KEYRING_SERVICE, KEYRING_USER) {
            if let Ok(key) = entry.get_password() {
                return Some(key);
            }
        }

        // 2. Environment, then whatever the config file carried
        env::var("SUPABASE_ANON_KEY")
            .ok()
            .or_else(|| configured.map(str::to_string))
    }

    /// Function URL for `region`, honouring a per-region endpoint override.
    pub fn function_url(&self, region: &Region) -> String {
        let base = region
            .endpoint
            .as_deref()
            .map(|e| e.trim_end_matches('/'))
            .unwrap_or(&self.base_url);
        format!("{}/functions/v1/{}", base, self.function_name)
    }
}

#[async_trait]
impl RegionBackend for HttpTransport {
    async fn invoke(&self, region: &Region, payload: &DispatchPayload) -> Result<serde_json::Value> {
        let url = self.function_url(region);
        let request_id = uuid::Uuid::new_v4().to_string();
        debug!(%url, region = %region.id, %request_id, "invoking edge function");

        let mut req = self
            .client
            .post(&url)
            .json(payload)
            .header("x-edge-region", region.id.as_str())
            .header("x-request-id", request_id.as_str());

        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key).header("apikey", key.as_str());
        }

        let response = req
            .send()
            .await
            .map_err(|e| Error::Transport(TransportError::Http(e)))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(Error::Remote {
                status: status.as_u16(),
                region: region.id.clone(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| Error::Transport(TransportError::Http(e)))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transport error: {0}")]
    Other(String),
}
