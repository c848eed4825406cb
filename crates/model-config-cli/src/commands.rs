//! Command implementations
//!
//! Wires the settings into concrete collaborators (store backend, cipher,
//! HTTP health client) and runs the reconciler.

use crate::settings::{Settings, StoreBackend};
use anyhow::Context;
use model_config_core::{
    AIModelsConfig, ConfigSource, HealthEndpoints, ReconcileOutcome, Reconciler,
};
use model_config_crypto::{Cipher, EncryptionService, SecretKey};
use model_config_health::HttpHealthCheckClient;
use model_config_storage::{FileStore, KeyValueStore, MemoryStore, SledStore};
use std::sync::Arc;

/// Environment variable holding the encryption key (hex or base64)
pub const ENCRYPTION_KEY_ENV: &str = "MODEL_CONFIG_ENCRYPTION_KEY";

/// Open the configured store backend
pub fn open_store(settings: &Settings) -> anyhow::Result<Arc<dyn KeyValueStore>> {
    let path = &settings.store.path;
    let store: Arc<dyn KeyValueStore> = match settings.store.backend {
        StoreBackend::Sled => Arc::new(
            SledStore::open(path)
                .with_context(|| format!("Failed to open sled store at {}", path.display()))?,
        ),
        StoreBackend::File => Arc::new(
            FileStore::open(path)
                .with_context(|| format!("Failed to open file store at {}", path.display()))?,
        ),
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
    };
    tracing::debug!(backend = store.name(), path = %path.display(), "Opened store");
    Ok(store)
}

/// Build the cipher from settings and operator-supplied key material
///
/// Ciphertexts are bound to the store key, so a record copied under another
/// key does not decrypt.
pub fn build_cipher(settings: &Settings, encoded_key: Option<&str>) -> anyhow::Result<Arc<dyn EncryptionService>> {
    let encoded_key = encoded_key
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .with_context(|| format!("{} is not set", ENCRYPTION_KEY_ENV))?;
    let key = SecretKey::parse(encoded_key).context("Invalid encryption key")?;
    let cipher = Cipher::new(settings.encryption.algorithm, key)
        .context("Encryption key does not fit the configured algorithm")?
        .with_context(settings.store.key.clone());
    Ok(Arc::new(cipher))
}

pub fn build_reconciler(
    settings: &Settings,
    encoded_key: Option<&str>,
    skip_health_check: bool,
) -> anyhow::Result<Reconciler> {
    let store = open_store(settings)?;
    let cipher = build_cipher(settings, encoded_key)?;
    let health = HttpHealthCheckClient::new().with_timeout(settings.health.timeout());

    Ok(Reconciler::builder(store, cipher, Arc::new(health))
        .store_key(settings.store.key.clone())
        .endpoints(HealthEndpoints::new(settings.health.base_url.clone()))
        .health_timeout(settings.health.timeout())
        .skip_health_check(skip_health_check)
        .build())
}

/// `model-config reconcile`
pub async fn reconcile(
    settings: &Settings,
    encoded_key: Option<&str>,
    source: &ConfigSource,
    skip_health_check: bool,
) -> anyhow::Result<ReconcileOutcome> {
    let reconciler = build_reconciler(settings, encoded_key, skip_health_check)?;
    let outcome = reconciler.run(source).await?;
    tracing::info!(outcome = %outcome, "Reconciliation finished");
    Ok(outcome)
}

/// `model-config show`; credential-like values are masked unless `reveal`
pub async fn show(
    settings: &Settings,
    encoded_key: Option<&str>,
    reveal: bool,
) -> anyhow::Result<Option<AIModelsConfig>> {
    let reconciler = build_reconciler(settings, encoded_key, false)?;
    let current = reconciler.load_current().await?;
    Ok(current.map(|config| if reveal { config } else { config.redacted() }))
}
