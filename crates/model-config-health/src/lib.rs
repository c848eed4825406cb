//! HTTP Health-Check Client
//!
//! [`HttpHealthCheckClient`] is the production [`HealthCheckClient`]: it POSTs
//! the verification payload as JSON and reports the response status. Status
//! interpretation (what counts as healthy) stays with the health gate.
//!
//! ```rust,no_run
//! use model_config_health::HttpHealthCheckClient;
//! use std::time::Duration;
//!
//! let client = HttpHealthCheckClient::new().with_timeout(Duration::from_secs(10));
//! ```

use model_config_core::health::{HealthCheckClient, HealthClientError};
use std::time::Duration;

/// Default per-request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// `reqwest`-backed health-check client
#[derive(Debug, Clone)]
pub struct HttpHealthCheckClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl Default for HttpHealthCheckClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpHealthCheckClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Use an existing client (shared connection pool, custom TLS...)
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait::async_trait]
impl HealthCheckClient for HttpHealthCheckClient {
    async fn post(&self, uri: &str, payload: &serde_json::Value) -> Result<u16, HealthClientError> {
        let url = reqwest::Url::parse(uri)
            .map_err(|e| HealthClientError::InvalidRequest(format!("{}: {}", uri, e)))?;

        let response = self
            .client
            .post(url)
            .json(payload)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| HealthClientError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(uri, status = status.as_u16(), body = %body, "Health endpoint rejected models");
        }
        Ok(status.as_u16())
    }
}
