//! Encrypted persistence of the reconciled configuration
//!
//! The whole configuration is stored as one encrypted record at a fixed key.
//! Every write is a full replacement; there is no version check, so the last
//! writer wins.

use crate::drift::decode_record;
use crate::error::{ReconcileError, Result, Stage};
use crate::model::AIModelsConfig;
use model_config_crypto::EncryptionService;
use model_config_storage::KeyValueStore;

/// Default store key for the model configuration record
pub const DEFAULT_STORE_KEY: &str = "ai_models_config";

/// Read the raw encrypted record, if one exists
pub async fn read_record(store: &dyn KeyValueStore, key: &str) -> Result<Option<String>> {
    store.get(key).await.map_err(|e| {
        ReconcileError::failed(
            Stage::Drift,
            format!("failed to read '{}' from {} store: {}", key, store.name(), e),
        )
    })
}

/// Serialize, encrypt and write `config` at `key`
///
/// Nothing is written unless serialization and encryption both succeed.
pub async fn persist(
    store: &dyn KeyValueStore,
    cipher: &dyn EncryptionService,
    key: &str,
    config: &AIModelsConfig,
) -> Result<()> {
    let plaintext = serde_json::to_string(config)
        .map_err(|e| ReconcileError::failed(Stage::Persistence, format!("serialization failed: {}", e)))?;
    let sealed = cipher
        .encrypt(&plaintext)
        .map_err(|e| ReconcileError::failed(Stage::Persistence, e.to_string()))?;

    store
        .set(key, &sealed)
        .await
        .map_err(ReconcileError::Persistence)?;

    tracing::info!(
        store = store.name(),
        key,
        algorithm = %cipher.algorithm(),
        entries = config.entry_count(),
        "Persisted model configuration"
    );
    Ok(())
}

/// Load and decrypt the persisted configuration
///
/// Unlike drift detection, an unreadable record is an error here.
pub async fn load_current(
    store: &dyn KeyValueStore,
    cipher: &dyn EncryptionService,
    key: &str,
) -> Result<Option<AIModelsConfig>> {
    match read_record(store, key).await? {
        Some(encrypted) => decode_record(cipher, &encrypted)
            .map(Some)
            .map_err(|e| ReconcileError::failed(Stage::Drift, e)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ModelCategory, ModelConfiguration, ProviderId};
    use model_config_crypto::{Algorithm, Cipher, SecretKey};
    use model_config_storage::{MemoryStore, StorageError, StorageResult};
    use serde_json::{json, Map};

    #[derive(Debug)]
    struct ReadOnlyStore;

    #[async_trait::async_trait]
    impl KeyValueStore for ReadOnlyStore {
        fn name(&self) -> &str {
            "read-only"
        }

        async fn get(&self, _key: &str) -> StorageResult<Option<String>> {
            Ok(None)
        }

        async fn set(&self, _key: &str, _value: &str) -> StorageResult<()> {
            Err(StorageError::Other("store is read-only".into()))
        }
    }

    fn cipher() -> Cipher {
        let algorithm = Algorithm::ChaCha20Poly1305;
        Cipher::new(algorithm, SecretKey::generate(algorithm).unwrap()).unwrap()
    }

    fn sample() -> AIModelsConfig {
        let mut config = AIModelsConfig::new();
        config.set(
            ModelCategory::Embedding,
            vec![ModelConfiguration {
                key: "embed".into(),
                provider: ProviderId::OpenAi,
                configuration: json!({"model": "text-embedding-3-small", "apiKey": "sk-x"})
                    .as_object()
                    .cloned()
                    .unwrap(),
                role: Some("embedding".into()),
                is_default: true,
                is_multimodal: false,
                is_reasoning: false,
                extra: Map::new(),
            }],
        );
        config
    }

    #[tokio::test]
    async fn test_persist_then_load() {
        let store = MemoryStore::new();
        let cipher = cipher();
        persist(&store, &cipher, DEFAULT_STORE_KEY, &sample()).await.unwrap();

        let loaded = load_current(&store, &cipher, DEFAULT_STORE_KEY).await.unwrap();
        assert_eq!(loaded, Some(sample()));
    }

    #[tokio::test]
    async fn test_record_is_encrypted() {
        let store = MemoryStore::new();
        persist(&store, &cipher(), DEFAULT_STORE_KEY, &sample()).await.unwrap();

        let raw = store.get(DEFAULT_STORE_KEY).await.unwrap().unwrap();
        assert!(!raw.contains("sk-x"));
        assert!(!raw.contains("text-embedding"));
    }

    #[tokio::test]
    async fn test_store_failure_is_persistence_error() {
        let err = persist(&ReadOnlyStore, &cipher(), DEFAULT_STORE_KEY, &sample())
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::Persistence(_)));
        assert_eq!(err.stage(), Stage::Persistence);
    }

    #[tokio::test]
    async fn test_load_missing_record() {
        let loaded = load_current(&MemoryStore::new(), &cipher(), DEFAULT_STORE_KEY)
            .await
            .unwrap();
        assert_eq!(loaded, None);
    }

    #[tokio::test]
    async fn test_load_with_wrong_key_fails() {
        let store = MemoryStore::new();
        persist(&store, &cipher(), DEFAULT_STORE_KEY, &sample()).await.unwrap();

        let err = load_current(&store, &cipher(), DEFAULT_STORE_KEY)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("decryption failed"));
    }
}
