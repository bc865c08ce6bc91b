//! HTTP client configuration and building logic
//!
//! This module handles the configuration and construction of the reqwest
//! client used by the HTTP transport.

use std::env;
use std::time::Duration;

use reqwest::{Client, Proxy};
use serde::{Deserialize, Serialize};

use crate::constants::{env as env_constants, http};
use crate::errors::{ConfigError, ConfigResult, TransportResult};

/// Configuration for the HTTP transport
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// User agent sent with every request
    pub user_agent: String,
    /// TCP keep-alive settings
    pub tcp_keepalive: Option<Duration>,
    /// TCP nodelay (disable Nagle's algorithm)
    pub tcp_nodelay: bool,
    /// Connection pool idle timeout
    pub pool_idle_timeout: Option<Duration>,
    /// Maximum number of idle connections per host
    pub pool_max_per_host: usize,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Proxy URL applied to all requests
    pub proxy: Option<String>,
    /// API token sent as `Authorization: Token <token>`
    #[serde(skip_serializing)]
    pub api_token: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: http::USER_AGENT.to_string(),
            tcp_keepalive: Some(Duration::from_secs(30)),
            tcp_nodelay: true,
            pool_idle_timeout: Some(http::POOL_IDLE_TIMEOUT),
            pool_max_per_host: http::POOL_MAX_PER_HOST,
            connect_timeout: http::CONNECT_TIMEOUT,
            proxy: None,
            api_token: None,
        }
    }
}

impl ClientConfig {
    /// Default configuration with proxy and token taken from the environment
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Fill proxy and token from the environment when set
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(proxy) = non_empty_var(env_constants::PROXY) {
            self.proxy = Some(proxy);
        }
        if let Some(token) = non_empty_var(env_constants::API_TOKEN) {
            self.api_token = Some(token);
        }
        self
    }

    /// Set the proxy URL
    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    /// Set the API token
    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    /// Set the connect timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "user_agent",
                "",
                "user agent must not be empty",
            ));
        }
        if self.connect_timeout.is_zero() {
            return Err(ConfigError::invalid_value(
                "connect_timeout",
                "0s",
                "connect timeout must be positive",
            ));
        }
        if let Some(proxy) = &self.proxy {
            url::Url::parse(proxy)
                .map_err(|e| ConfigError::invalid_value("proxy", proxy, e.to_string()))?;
        }
        Ok(())
    }

    /// Builds the HTTP client with the specified configuration
    ///
    /// Per-request deadlines are applied by the transport, not here.
    pub fn build_http_client(&self) -> TransportResult<Client> {
        let mut client_builder = Client::builder()
            .cookie_store(true)
            .connect_timeout(self.connect_timeout)
            .user_agent(self.user_agent.as_str())
            .tcp_nodelay(self.tcp_nodelay)
            .pool_max_idle_per_host(self.pool_max_per_host);

        if let Some(keepalive) = self.tcp_keepalive {
            client_builder = client_builder.tcp_keepalive(keepalive);
        }

        if let Some(idle_timeout) = self.pool_idle_timeout {
            client_builder = client_builder.pool_idle_timeout(idle_timeout);
        }

        if let Some(proxy) = &self.proxy {
            client_builder = client_builder.proxy(Proxy::all(proxy.as_str())?);
        }

        Ok(client_builder.build()?)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_default() {
        let config = ClientConfig::default();
        assert!(config.tcp_nodelay);
        assert_eq!(config.user_agent, http::USER_AGENT);
        assert!(config.proxy.is_none());
        assert!(config.api_token.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_client_config_builders() {
        let config = ClientConfig::default()
            .with_proxy("http://127.0.0.1:8080")
            .with_api_token("secret")
            .with_connect_timeout(Duration::from_secs(5));

        assert_eq!(config.proxy.as_deref(), Some("http://127.0.0.1:8080"));
        assert_eq!(config.api_token.as_deref(), Some("secret"));
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_client_config_validation() {
        let config = ClientConfig::default().with_proxy("not a url");
        assert!(config.validate().is_err());

        let config = ClientConfig::default().with_connect_timeout(Duration::ZERO);
        assert!(config.validate().is_err());

        let config = ClientConfig {
            user_agent: "  ".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_token_is_not_serialized() {
        let config = ClientConfig::default().with_api_token("secret");
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
    }

    #[test]
    fn test_http_client_creation() {
        assert!(ClientConfig::default().build_http_client().is_ok());
        assert!(ClientConfig::default()
            .with_proxy("http://127.0.0.1:8080")
            .build_http_client()
            .is_ok());
    }
}
