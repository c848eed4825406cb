//! Health gate
//!
//! Before a changed configuration is committed, each capability category is
//! verified against the live model-serving endpoints. One verification call
//! is made per category, carrying every entry of that category.
//!
//! | category | verification |
//! |---|---|
//! | llm, slm, reasoning, multimodal, deepresearch | language-model endpoint |
//! | embedding | embedding endpoint |
//! | ocr, imageGeneration | none (logged as skipped) |
//!
//! Checks run concurrently; the first failure drops the checks still in
//! flight and aborts the reconciliation. Nothing is persisted unless every
//! check passes.

use crate::error::{ReconcileError, Result};
use crate::model::{AIModelsConfig, HealthProbe, ModelCategory, ModelConfiguration};
use futures::future::try_join_all;
use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Default bound on a single verification call
pub const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors reported by a [`HealthCheckClient`]
#[derive(Error, Debug)]
pub enum HealthClientError {
    /// The request could not be delivered or no response arrived
    #[error("Network error: {0}")]
    Network(String),

    /// The request could not be built
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Transport used to reach the verification endpoints
#[async_trait::async_trait]
pub trait HealthCheckClient: Send + Sync + fmt::Debug {
    /// POST `payload` as JSON to `uri` and return the response status code
    async fn post(&self, uri: &str, payload: &serde_json::Value) -> std::result::Result<u16, HealthClientError>;
}

/// Where verification calls are sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthEndpoints {
    pub base_url: String,
    pub language_model_path: String,
    pub embedding_path: String,
}

impl Default for HealthEndpoints {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            language_model_path: "/api/v1/health/llm".to_string(),
            embedding_path: "/api/v1/health/embedding".to_string(),
        }
    }
}

impl HealthEndpoints {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Full URI for a probe kind; `None` for unsupported categories
    pub fn uri_for(&self, probe: HealthProbe) -> Option<String> {
        let path = match probe {
            HealthProbe::LanguageModel => &self.language_model_path,
            HealthProbe::Embedding => &self.embedding_path,
            HealthProbe::Unsupported => return None,
        };
        Some(format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        ))
    }
}

#[derive(Serialize)]
struct HealthCheckPayload<'a> {
    category: ModelCategory,
    models: &'a [ModelConfiguration],
}

/// Result of a passing health gate
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HealthSummary {
    /// Categories that were verified, with the returned status
    pub verified: Vec<(ModelCategory, u16)>,
    /// Categories with entries that have no verification endpoint
    pub skipped: Vec<ModelCategory>,
}

/// Verifies a configuration against live endpoints
pub struct HealthGate<'a> {
    client: &'a dyn HealthCheckClient,
    endpoints: &'a HealthEndpoints,
    timeout: Duration,
}

impl<'a> HealthGate<'a> {
    pub fn new(client: &'a dyn HealthCheckClient, endpoints: &'a HealthEndpoints) -> Self {
        Self {
            client,
            endpoints,
            timeout: DEFAULT_HEALTH_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Verify every populated category; all-or-nothing
    pub async fn verify(&self, config: &AIModelsConfig) -> Result<HealthSummary> {
        let mut summary = HealthSummary::default();
        let mut checks = Vec::new();

        for (category, entries) in config.iter() {
            if entries.is_empty() {
                continue;
            }
            match self.endpoints.uri_for(category.health_probe()) {
                Some(uri) => checks.push(self.check_category(category, uri, entries)),
                None => {
                    tracing::info!(
                        %category,
                        entries = entries.len(),
                        "Health check skipped, unsupported for this category; accepting entries unverified"
                    );
                    summary.skipped.push(category);
                }
            }
        }

        tracing::debug!(checks = checks.len(), "Running model health checks");
        summary.verified = try_join_all(checks).await?;
        tracing::info!(
            verified = summary.verified.len(),
            skipped = summary.skipped.len(),
            "Model health checks passed"
        );
        Ok(summary)
    }

    async fn check_category(
        &self,
        category: ModelCategory,
        uri: String,
        entries: &[ModelConfiguration],
    ) -> Result<(ModelCategory, u16)> {
        let payload = serde_json::to_value(HealthCheckPayload {
            category,
            models: entries,
        })
        .map_err(|e| ReconcileError::HealthCheck {
            category,
            reason: format!("failed to build payload: {}", e),
        })?;

        let start = Instant::now();
        let status = match tokio::time::timeout(self.timeout, self.client.post(&uri, &payload)).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                return Err(ReconcileError::HealthCheck {
                    category,
                    reason: e.to_string(),
                })
            }
            Err(_) => {
                return Err(ReconcileError::HealthCheck {
                    category,
                    reason: format!("timed out after {}ms", self.timeout.as_millis()),
                })
            }
        };
        let latency_ms = start.elapsed().as_millis() as u64;

        if !(200..300).contains(&status) {
            tracing::error!(%category, status, latency_ms, "Model health check failed");
            return Err(ReconcileError::HealthCheck {
                category,
                reason: format!("endpoint returned status {}", status),
            });
        }

        tracing::debug!(%category, status, latency_ms, models = entries.len(), "Model health check passed");
        Ok((category, status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProviderId;
    use serde_json::{json, Map, Value};
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct RecordingClient {
        calls: Mutex<Vec<(String, Value)>>,
        fail_uri_containing: Option<&'static str>,
    }

    #[async_trait::async_trait]
    impl HealthCheckClient for RecordingClient {
        async fn post(&self, uri: &str, payload: &Value) -> std::result::Result<u16, HealthClientError> {
            self.calls.lock().unwrap().push((uri.to_string(), payload.clone()));
            match self.fail_uri_containing {
                Some(fragment) if uri.contains(fragment) => Ok(503),
                _ => Ok(200),
            }
        }
    }

    #[derive(Debug)]
    struct HangingClient;

    #[async_trait::async_trait]
    impl HealthCheckClient for HangingClient {
        async fn post(&self, _uri: &str, _payload: &Value) -> std::result::Result<u16, HealthClientError> {
            futures::future::pending::<()>().await;
            Ok(200)
        }
    }

    fn entry(key: &str) -> ModelConfiguration {
        ModelConfiguration {
            key: key.into(),
            provider: ProviderId::OpenAi,
            configuration: Map::new(),
            role: None,
            is_default: false,
            is_multimodal: false,
            is_reasoning: false,
            extra: Map::new(),
        }
    }

    fn config_with(categories: &[(ModelCategory, usize)]) -> AIModelsConfig {
        let mut config = AIModelsConfig::new();
        for (category, count) in categories {
            let entries = (0..*count).map(|i| entry(&format!("{}-{}", category, i))).collect();
            config.set(*category, entries);
        }
        config
    }

    #[test]
    fn test_uri_for_joins_slashes() {
        let endpoints = HealthEndpoints::new("http://models:8080/");
        assert_eq!(
            endpoints.uri_for(HealthProbe::LanguageModel).unwrap(),
            "http://models:8080/api/v1/health/llm"
        );
        assert_eq!(endpoints.uri_for(HealthProbe::Unsupported), None);
    }

    #[tokio::test]
    async fn test_one_call_per_populated_category() {
        let client = RecordingClient::default();
        let endpoints = HealthEndpoints::default();
        let config = config_with(&[
            (ModelCategory::Llm, 2),
            (ModelCategory::Embedding, 1),
            (ModelCategory::Reasoning, 1),
        ]);

        let summary = HealthGate::new(&client, &endpoints).verify(&config).await.unwrap();
        assert_eq!(summary.verified.len(), 3);

        let calls = client.calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        let llm_call = calls
            .iter()
            .find(|(_, p)| p["category"] == json!("llm"))
            .unwrap();
        assert!(llm_call.0.ends_with("/api/v1/health/llm"));
        assert_eq!(llm_call.1["models"].as_array().unwrap().len(), 2);

        let embedding_call = calls
            .iter()
            .find(|(_, p)| p["category"] == json!("embedding"))
            .unwrap();
        assert!(embedding_call.0.ends_with("/api/v1/health/embedding"));
    }

    #[tokio::test]
    async fn test_ocr_is_skipped_not_called() {
        let client = RecordingClient::default();
        let endpoints = HealthEndpoints::default();
        let config = config_with(&[(ModelCategory::Ocr, 1)]);

        let summary = HealthGate::new(&client, &endpoints).verify(&config).await.unwrap();
        assert_eq!(summary.skipped, vec![ModelCategory::Ocr]);
        assert!(summary.verified.is_empty());
        assert!(client.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failure_names_category() {
        let client = RecordingClient {
            fail_uri_containing: Some("embedding"),
            ..Default::default()
        };
        let endpoints = HealthEndpoints::default();
        let config = config_with(&[(ModelCategory::Llm, 1), (ModelCategory::Embedding, 1)]);

        let err = HealthGate::new(&client, &endpoints)
            .verify(&config)
            .await
            .unwrap_err();
        assert_eq!(err.category(), Some(ModelCategory::Embedding));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_timeout_is_failure() {
        let endpoints = HealthEndpoints::default();
        let config = config_with(&[(ModelCategory::Slm, 1)]);

        let err = HealthGate::new(&HangingClient, &endpoints)
            .with_timeout(Duration::from_millis(20))
            .verify(&config)
            .await
            .unwrap_err();
        assert_eq!(err.category(), Some(ModelCategory::Slm));
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_empty_config_makes_no_calls() {
        let client = RecordingClient::default();
        let endpoints = HealthEndpoints::default();
        let summary = HealthGate::new(&client, &endpoints)
            .verify(&AIModelsConfig::new())
            .await
            .unwrap();
        assert_eq!(summary, HealthSummary::default());
    }
}
