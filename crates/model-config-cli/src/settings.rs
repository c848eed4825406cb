//! Settings file
//!
//! ```toml
//! [store]
//! backend = "sled"          # sled | file | memory
//! path = "./data/model-config"
//! key = "ai_models_config"
//!
//! [encryption]
//! algorithm = "aes-256-gcm"
//!
//! [health]
//! base_url = "http://localhost:8080"
//! timeout_ms = 30000
//! ```
//!
//! Every section and field is optional. The encryption key itself is never
//! read from this file.

use anyhow::Context;
use model_config_core::DEFAULT_STORE_KEY;
use model_config_crypto::Algorithm;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub store: StoreSettings,
    pub encryption: EncryptionSettings,
    pub health: HealthSettings,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Sled,
    File,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreSettings {
    pub backend: StoreBackend,
    pub path: PathBuf,
    pub key: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: PathBuf::from("./data/model-config"),
            key: DEFAULT_STORE_KEY.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncryptionSettings {
    pub algorithm: Algorithm,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HealthSettings {
    pub base_url: String,
    pub timeout_ms: u64,
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout_ms: 30_000,
        }
    }
}

impl HealthSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Values given on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub store_backend: Option<StoreBackend>,
    pub store_path: Option<PathBuf>,
    pub store_key: Option<String>,
    pub algorithm: Option<Algorithm>,
    pub health_url: Option<String>,
    pub health_timeout_ms: Option<u64>,
}

impl Settings {
    /// Parse a TOML settings file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Invalid settings file {}", path.display()))
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Settings file (if any) with command-line values layered on top
    pub fn resolve(path: Option<&Path>, overrides: Overrides) -> anyhow::Result<Self> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        settings.apply(overrides);
        Ok(settings)
    }

    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(backend) = overrides.store_backend {
            self.store.backend = backend;
        }
        if let Some(path) = overrides.store_path {
            self.store.path = path;
        }
        if let Some(key) = overrides.store_key {
            self.store.key = key;
        }
        if let Some(algorithm) = overrides.algorithm {
            self.encryption.algorithm = algorithm;
        }
        if let Some(url) = overrides.health_url {
            self.health.base_url = url;
        }
        if let Some(timeout_ms) = overrides.health_timeout_ms {
            self.health.timeout_ms = timeout_ms;
        }
    }
}
