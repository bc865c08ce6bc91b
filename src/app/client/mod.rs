//! Transport seam and its HTTP implementation
//!
//! The fetch pipeline only sees the [`Transport`] trait. The module is
//! organized into:
//! - `config`: HTTP client configuration and building
//! - `http`: reqwest transport posting JSON payloads

use std::time::Duration;

use async_trait::async_trait;

use crate::app::payload::RequestPayload;
use crate::errors::TransportResult;

pub mod config;
pub mod http;

pub use config::ClientConfig;
pub use http::HttpTransport;

/// Raw response of one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body as text
    pub body: String,
}

impl TransportResponse {
    /// Create a response
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Whether the status is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends built payloads to the remote API
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request, giving up after `timeout`
    ///
    /// Non-2xx responses are returned as responses, not errors.
    async fn send(
        &self,
        payload: &RequestPayload,
        timeout: Duration,
    ) -> TransportResult<TransportResponse>;
}
