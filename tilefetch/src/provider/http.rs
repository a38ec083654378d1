//! HTTP client abstraction for testability

use super::types::{HttpResponse, ProviderError};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Trait for asynchronous HTTP GET.
///
/// This abstraction allows for dependency injection and easier testing
/// by enabling scripted HTTP clients in tests.
pub trait AsyncHttpClient: Send + Sync {
    /// Performs an async HTTP GET request.
    ///
    /// # Returns
    ///
    /// The status and body of any completed response, including 4xx/5xx,
    /// or a transport error when no response arrived.
    fn get(&self, url: &str) -> impl Future<Output = Result<HttpResponse, ProviderError>> + Send;
}

impl<C: AsyncHttpClient> AsyncHttpClient for std::sync::Arc<C> {
    fn get(&self, url: &str) -> impl Future<Output = Result<HttpResponse, ProviderError>> + Send {
        (**self).get(url)
    }
}

/// Default User-Agent string for HTTP requests.
/// Some tile servers reject requests without a browser-like User-Agent.
const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

/// Async HTTP client implementation using reqwest.
///
/// Only connection setup is bounded here; the per-attempt timeout is
/// applied by the fetcher.
#[derive(Clone)]
pub struct AsyncReqwestClient {
    client: reqwest::Client,
}

impl AsyncReqwestClient {
    /// Creates a new AsyncReqwestClient with default configuration.
    ///
    /// - Connection pool sized for parallel tile downloads
    /// - TCP keepalive to maintain warm connections
    /// - TCP nodelay for reduced latency
    pub fn new() -> Result<Self, ProviderError> {
        Self::with_pool_size(32)
    }

    /// Creates a client keeping up to `max_idle` connections per host.
    pub fn with_pool_size(max_idle: usize) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .connect_timeout(Duration::from_secs(30))
            // Connection pooling - keep connections alive for parallel requests
            .pool_max_idle_per_host(max_idle)
            .pool_idle_timeout(Duration::from_secs(90))
            // TCP optimizations
            .tcp_keepalive(Duration::from_secs(30))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| ProviderError::ClientBuild(e.to_string()))?;

        Ok(Self { client })
    }
}

impl AsyncHttpClient for AsyncReqwestClient {
    async fn get(&self, url: &str) -> Result<HttpResponse, ProviderError> {
        trace!(url = url, "HTTP GET request starting");

        let response = match self.client.get(url).send().await {
            Ok(resp) => {
                debug!(
                    url = url,
                    status = resp.status().as_u16(),
                    "HTTP response received"
                );
                resp
            }
            Err(e) => {
                warn!(
                    url = url,
                    error = %e,
                    is_connect = e.is_connect(),
                    is_timeout = e.is_timeout(),
                    is_request = e.is_request(),
                    "HTTP request failed"
                );
                return Err(ProviderError::Transport(format!("Request failed: {}", e)));
            }
        };

        let status = response.status().as_u16();

        match response.bytes().await {
            Ok(bytes) => {
                trace!(url = url, bytes = bytes.len(), "HTTP response body read");
                Ok(HttpResponse::new(status, bytes.to_vec()))
            }
            Err(e) => {
                warn!(url = url, error = %e, "Failed to read response body");
                Err(ProviderError::Transport(format!(
                    "Failed to read response: {}",
                    e
                )))
            }
        }
    }
}
