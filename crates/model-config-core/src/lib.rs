//! Model Configuration Reconciler
//!
//! Turns operator-supplied model-provider configuration into the canonical,
//! encrypted record that the rest of the platform reads at runtime.
//!
//! ## Pipeline
//!
//! 1. **Source** (`source`): inline JSON, base64 JSON or a file path, in that
//!    precedence order.
//! 2. **Schema** (`schema`): structural validation of categories and entries,
//!    with the offending path on failure.
//! 3. **Normalize** (`normalize`): stable keys, default roles, per-category
//!    default entry and capability flags.
//! 4. **Drift** (`drift`): order-independent comparison with the stored
//!    record. An unreadable record counts as drift.
//! 5. **Health** (`health`): one live verification call per category,
//!    all-or-nothing.
//! 6. **Persist** (`persist`): one encrypted full-replacement write.
//!
//! Nothing is written unless every earlier stage succeeds.
//!
//! ## Example
//!
//! ```rust,no_run
//! use model_config_core::{ConfigSource, Reconciler, ReconcileOutcome};
//! use model_config_core::health::{HealthCheckClient, HealthClientError};
//! use model_config_crypto::{Algorithm, Cipher, SecretKey};
//! use model_config_storage::MemoryStore;
//! use std::sync::Arc;
//!
//! #[derive(Debug)]
//! struct Healthy;
//!
//! #[async_trait::async_trait]
//! impl HealthCheckClient for Healthy {
//!     async fn post(&self, _uri: &str, _payload: &serde_json::Value) -> Result<u16, HealthClientError> {
//!         Ok(200)
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let key = SecretKey::generate(Algorithm::Aes256Gcm)?;
//! let reconciler = Reconciler::builder(
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(Cipher::new(Algorithm::Aes256Gcm, key)?),
//!     Arc::new(Healthy),
//! )
//! .build();
//!
//! let outcome = reconciler.run(&ConfigSource::from_env()).await?;
//! if let ReconcileOutcome::Persisted { entries, .. } = outcome {
//!     println!("stored {} model entries", entries);
//! }
//! # Ok(())
//! # }
//! ```

pub mod drift;
pub mod error;
pub mod health;
pub mod model;
pub mod normalize;
pub mod persist;
pub mod reconciler;
pub mod schema;
pub mod source;

pub use drift::{detect_drift, DriftReason, DriftReport};
pub use error::{ReconcileError, Result, Stage};
pub use health::{HealthCheckClient, HealthClientError, HealthEndpoints, HealthGate};
pub use model::{AIModelsConfig, HealthProbe, ModelCategory, ModelConfiguration, ProviderId};
pub use normalize::normalize;
pub use persist::DEFAULT_STORE_KEY;
pub use reconciler::{ReconcileOutcome, Reconciler, ReconcilerBuilder, ReconcilerOptions};
pub use schema::{validate, RawConfig, RawModelEntry};
pub use source::{ConfigSource, SourceKind};
