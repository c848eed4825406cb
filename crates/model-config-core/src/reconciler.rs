//! Reconciliation pipeline
//!
//! `source → schema → normalize → drift → health → persist`
//!
//! Every terminal state either performs exactly one store write (after all
//! checks passed) or none at all.

use crate::drift::{detect_drift, DriftReason};
use crate::error::Result;
use crate::health::{HealthCheckClient, HealthEndpoints, HealthGate, DEFAULT_HEALTH_TIMEOUT};
use crate::model::AIModelsConfig;
use crate::normalize::normalize;
use crate::persist::{self, DEFAULT_STORE_KEY};
use crate::schema::validate;
use crate::source::ConfigSource;
use model_config_crypto::EncryptionService;
use model_config_storage::KeyValueStore;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument::WithSubscriber;
use tracing::{Dispatch, Instrument};

/// Tunables for a [`Reconciler`]
#[derive(Debug, Clone)]
pub struct ReconcilerOptions {
    /// Store key of the encrypted record
    pub store_key: String,
    /// Persist changed configurations without live verification
    pub skip_health_check: bool,
    pub endpoints: HealthEndpoints,
    /// Bound on each category's verification call
    pub health_timeout: Duration,
}

impl Default for ReconcilerOptions {
    fn default() -> Self {
        Self {
            store_key: DEFAULT_STORE_KEY.to_string(),
            skip_health_check: false,
            endpoints: HealthEndpoints::default(),
            health_timeout: DEFAULT_HEALTH_TIMEOUT,
        }
    }
}

/// Terminal state of a successful run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// No input configured
    NoSource,
    /// Input has no entries in any category
    Empty,
    /// Input matches the stored record
    Unchanged,
    /// The record was written
    Persisted { entries: usize, reason: DriftReason },
}

impl ReconcileOutcome {
    /// Whether a store write was performed
    pub fn wrote(&self) -> bool {
        matches!(self, ReconcileOutcome::Persisted { .. })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileOutcome::NoSource => "no-source",
            ReconcileOutcome::Empty => "empty",
            ReconcileOutcome::Unchanged => "unchanged",
            ReconcileOutcome::Persisted { .. } => "persisted",
        }
    }
}

impl fmt::Display for ReconcileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builder for [`Reconciler`]
pub struct ReconcilerBuilder {
    store: Arc<dyn KeyValueStore>,
    cipher: Arc<dyn EncryptionService>,
    health: Arc<dyn HealthCheckClient>,
    options: ReconcilerOptions,
    dispatch: Option<Dispatch>,
}

impl ReconcilerBuilder {
    pub fn options(mut self, options: ReconcilerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn store_key(mut self, key: impl Into<String>) -> Self {
        self.options.store_key = key.into();
        self
    }

    pub fn skip_health_check(mut self, skip: bool) -> Self {
        self.options.skip_health_check = skip;
        self
    }

    pub fn endpoints(mut self, endpoints: HealthEndpoints) -> Self {
        self.options.endpoints = endpoints;
        self
    }

    pub fn health_timeout(mut self, timeout: Duration) -> Self {
        self.options.health_timeout = timeout;
        self
    }

    /// Route this reconciler's log events to `dispatch` instead of the
    /// global subscriber
    pub fn dispatch(mut self, dispatch: impl Into<Dispatch>) -> Self {
        self.dispatch = Some(dispatch.into());
        self
    }

    pub fn build(self) -> Reconciler {
        Reconciler {
            store: self.store,
            cipher: self.cipher,
            health: self.health,
            options: self.options,
            dispatch: self.dispatch,
        }
    }
}

/// Reconciles operator-supplied configuration into the encrypted store
pub struct Reconciler {
    store: Arc<dyn KeyValueStore>,
    cipher: Arc<dyn EncryptionService>,
    health: Arc<dyn HealthCheckClient>,
    options: ReconcilerOptions,
    dispatch: Option<Dispatch>,
}

impl Reconciler {
    pub fn builder(
        store: Arc<dyn KeyValueStore>,
        cipher: Arc<dyn EncryptionService>,
        health: Arc<dyn HealthCheckClient>,
    ) -> ReconcilerBuilder {
        ReconcilerBuilder {
            store,
            cipher,
            health,
            options: ReconcilerOptions::default(),
            dispatch: None,
        }
    }

    pub fn options(&self) -> &ReconcilerOptions {
        &self.options
    }

    /// Run the pipeline once and report the terminal state
    pub async fn run(&self, source: &ConfigSource) -> Result<ReconcileOutcome> {
        self.scoped(async {
            let span = tracing::info_span!(
                "reconcile",
                store = self.store.name(),
                key = %self.options.store_key
            );
            self.run_stages(source).instrument(span).await
        })
        .await
    }

    /// Run the pipeline once; `true` when the store was written
    pub async fn reconcile(&self, source: &ConfigSource) -> Result<bool> {
        self.run(source).await.map(|outcome| outcome.wrote())
    }

    /// Decrypt the currently persisted configuration
    pub async fn load_current(&self) -> Result<Option<AIModelsConfig>> {
        self.scoped(persist::load_current(
            self.store.as_ref(),
            self.cipher.as_ref(),
            &self.options.store_key,
        ))
        .await
    }

    async fn run_stages(&self, source: &ConfigSource) -> Result<ReconcileOutcome> {
        let Some(raw) = source.load_raw()? else {
            tracing::info!("No model configuration source set; nothing to reconcile");
            return Ok(ReconcileOutcome::NoSource);
        };

        let validated = validate(&raw)?;
        let config = normalize(&validated);
        let entries = config.entry_count();
        if entries == 0 {
            tracing::info!("Model configuration has no entries; stored record left untouched");
            return Ok(ReconcileOutcome::Empty);
        }
        tracing::debug!(entries, "Normalized model configuration");

        let existing = persist::read_record(self.store.as_ref(), &self.options.store_key).await?;
        let report = detect_drift(&config, existing.as_deref(), self.cipher.as_ref());
        if !report.drift {
            tracing::info!(entries, "Model configuration unchanged; skipping write");
            return Ok(ReconcileOutcome::Unchanged);
        }

        if self.options.skip_health_check {
            tracing::warn!("Health check override set; persisting model configuration unverified");
        } else {
            HealthGate::new(self.health.as_ref(), &self.options.endpoints)
                .with_timeout(self.options.health_timeout)
                .verify(&config)
                .await?;
        }

        persist::persist(
            self.store.as_ref(),
            self.cipher.as_ref(),
            &self.options.store_key,
            &config,
        )
        .await?;

        Ok(ReconcileOutcome::Persisted {
            entries,
            reason: report.reason,
        })
    }

    async fn scoped<F: Future>(&self, fut: F) -> F::Output {
        match &self.dispatch {
            Some(dispatch) => fut.with_subscriber(dispatch.clone()).await,
            None => fut.await,
        }
    }
}

impl fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler")
            .field("store", &self.store.name())
            .field("algorithm", &self.cipher.algorithm())
            .field("options", &self.options)
            .field("dispatch", &self.dispatch.is_some())
            .finish()
    }
}
