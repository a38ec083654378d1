//! Shared tile-server types.

use thiserror::Error;

/// Errors raised by the HTTP layer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    /// Request never produced a response (DNS, connect, TLS, reset, body read)
    #[error("HTTP transport error: {0}")]
    Transport(String),
    /// Client could not be constructed
    #[error("Failed to create HTTP client: {0}")]
    ClientBuild(String),
}

/// Status and body of a completed HTTP exchange.
///
/// Non-2xx statuses are not errors at this layer; the fetcher decides how to
/// classify them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// 200 with the given body.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self::new(200, body)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }
}
