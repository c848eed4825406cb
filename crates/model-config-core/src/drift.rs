//! Drift detection against the persisted record
//!
//! Both sides are reduced to their canonical form (every category present,
//! entries sorted by stable key) before comparison, so reordering entries in
//! the input never registers as drift.

use crate::model::AIModelsConfig;
use model_config_crypto::EncryptionService;
use std::fmt;

/// Why the detector reached its verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriftReason {
    /// No record stored yet
    FirstSeed,
    /// A record exists but could not be decrypted or parsed
    UnreadableRecord,
    /// The stored configuration differs from the new one
    Changed,
    Unchanged,
}

impl fmt::Display for DriftReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DriftReason::FirstSeed => "first_seed",
            DriftReason::UnreadableRecord => "unreadable_record",
            DriftReason::Changed => "changed",
            DriftReason::Unchanged => "unchanged",
        })
    }
}

/// Outcome of comparing a new configuration with the stored one
#[derive(Debug, Clone)]
pub struct DriftReport {
    pub drift: bool,
    /// The decoded stored configuration, when it could be read
    pub existing: Option<AIModelsConfig>,
    pub reason: DriftReason,
}

/// Decrypt and parse a stored record
pub fn decode_record(
    cipher: &dyn EncryptionService,
    encrypted: &str,
) -> Result<AIModelsConfig, String> {
    let plaintext = cipher
        .decrypt(encrypted)
        .map_err(|e| format!("decryption failed: {}", e))?;
    serde_json::from_str(&plaintext).map_err(|e| format!("record is not a model configuration: {}", e))
}

/// Compare `new` with the stored record, if any
///
/// An unreadable record is reported as drift rather than an error: a fresh,
/// verified configuration replaces it.
pub fn detect_drift(
    new: &AIModelsConfig,
    existing_encrypted: Option<&str>,
    cipher: &dyn EncryptionService,
) -> DriftReport {
    let Some(encrypted) = existing_encrypted else {
        tracing::info!("No stored model configuration found; seeding");
        return DriftReport {
            drift: true,
            existing: None,
            reason: DriftReason::FirstSeed,
        };
    };

    let existing = match decode_record(cipher, encrypted) {
        Ok(existing) => existing,
        Err(error) => {
            tracing::warn!(
                %error,
                "Stored model configuration is unreadable; treating it as absent and reseeding"
            );
            return DriftReport {
                drift: true,
                existing: None,
                reason: DriftReason::UnreadableRecord,
            };
        }
    };

    let drift = match (new.canonical_json(), existing.canonical_json()) {
        (Ok(a), Ok(b)) => a != b,
        _ => new.canonical() != existing.canonical(),
    };
    let reason = if drift {
        DriftReason::Changed
    } else {
        DriftReason::Unchanged
    };
    tracing::debug!(drift, %reason, "Compared model configuration with stored record");

    DriftReport {
        drift,
        existing: Some(existing),
        reason,
    }
}
