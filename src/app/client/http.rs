//! reqwest-backed transport
//!
//! Posts the payload body as JSON with the payload headers, the optional API
//! token and a per-request deadline. Retry, pacing and rate limiting belong to
//! the fetcher and the dispatch limiter, not to the transport.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use tracing::debug;

use super::config::ClientConfig;
use super::{Transport, TransportResponse};
use crate::app::payload::RequestPayload;
use crate::errors::{TransportError, TransportResult};

/// HTTP transport built on a shared reqwest client
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    api_token: Option<String>,
}

impl HttpTransport {
    /// Creates a transport from the given configuration
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the HTTP client cannot be built
    pub fn new(config: &ClientConfig) -> TransportResult<Self> {
        let client = config.build_http_client()?;
        debug!(
            "Created HTTP transport (proxy: {}, token: {})",
            config.proxy.is_some(),
            config.api_token.is_some()
        );
        Ok(Self {
            client,
            api_token: config.api_token.clone(),
        })
    }

    /// Get a reference to the underlying HTTP client
    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        payload: &RequestPayload,
        timeout: Duration,
    ) -> TransportResult<TransportResponse> {
        let mut request = self
            .client
            .post(payload.url.clone())
            .timeout(timeout)
            .json(&payload.body);

        for (name, value) in &payload.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(token) = &self.api_token {
            request = request.header(AUTHORIZATION, format!("Token {}", token));
        }

        let response = request
            .send()
            .await
            .map_err(|e| classify(e, timeout))?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| classify(e, timeout))?;

        debug!("POST {} -> {} ({} bytes)", payload.url, status, body.len());
        Ok(TransportResponse { status, body })
    }
}

fn classify(error: reqwest::Error, timeout: Duration) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout {
            millis: timeout.as_millis(),
        }
    } else if error.is_builder() {
        TransportError::InvalidRequest {
            reason: error.to_string(),
        }
    } else {
        TransportError::Http(error)
    }
}
