//! Error types for the reconciliation pipeline
//!
//! Every fatal error identifies the pipeline stage it came from, and health
//! failures additionally name the category that failed verification.

use crate::model::ModelCategory;
use crate::source::SourceKind;
use model_config_storage::StorageError;
use std::fmt;
use thiserror::Error;

/// Pipeline stage, used to label errors and log events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Source,
    Schema,
    Normalize,
    Drift,
    Health,
    Persistence,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Source => "source",
            Stage::Schema => "schema",
            Stage::Normalize => "normalize",
            Stage::Drift => "drift",
            Stage::Health => "health",
            Stage::Persistence => "persistence",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fatal reconciliation errors
#[derive(Error, Debug)]
pub enum ReconcileError {
    /// An explicitly configured source could not be decoded or read
    #[error("Failed to read {kind} configuration source: {message}")]
    SourceDecode { kind: SourceKind, message: String },

    /// JSON parse failure or shape violation
    #[error("Schema error at {path}: {message}")]
    Schema { path: String, message: String },

    /// A category failed live verification
    #[error("Health check failed for category '{category}': {reason}")]
    HealthCheck {
        category: ModelCategory,
        reason: String,
    },

    /// The store rejected the final write; the previous record is intact
    #[error("Failed to persist model configuration: {0}")]
    Persistence(#[source] StorageError),

    /// Unexpected failure inside a stage
    #[error("Reconciliation failed during {stage}: {message}")]
    Failed { stage: Stage, message: String },
}

impl ReconcileError {
    pub fn schema(path: impl Into<String>, message: impl Into<String>) -> Self {
        ReconcileError::Schema {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn source_decode(kind: SourceKind, message: impl Into<String>) -> Self {
        ReconcileError::SourceDecode {
            kind,
            message: message.into(),
        }
    }

    pub fn failed(stage: Stage, message: impl Into<String>) -> Self {
        ReconcileError::Failed {
            stage,
            message: message.into(),
        }
    }

    /// Stage the error originated from
    pub fn stage(&self) -> Stage {
        match self {
            ReconcileError::SourceDecode { .. } => Stage::Source,
            ReconcileError::Schema { .. } => Stage::Schema,
            ReconcileError::HealthCheck { .. } => Stage::Health,
            ReconcileError::Persistence(_) => Stage::Persistence,
            ReconcileError::Failed { stage, .. } => *stage,
        }
    }

    /// Category that failed verification, for health errors
    pub fn category(&self) -> Option<ModelCategory> {
        match self {
            ReconcileError::HealthCheck { category, .. } => Some(*category),
            _ => None,
        }
    }

    /// Whether the operator can fix this by changing the supplied configuration
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            ReconcileError::SourceDecode { .. }
                | ReconcileError::Schema { .. }
                | ReconcileError::HealthCheck { .. }
        )
    }
}

/// Result type alias for reconciliation operations
pub type Result<T> = std::result::Result<T, ReconcileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ReconcileError::schema("llm[0].provider", "missing required field");
        assert_eq!(
            err.to_string(),
            "Schema error at llm[0].provider: missing required field"
        );

        let err = ReconcileError::HealthCheck {
            category: ModelCategory::Embedding,
            reason: "status 503".into(),
        };
        assert!(err.to_string().contains("'embedding'"));
    }

    #[test]
    fn test_stage_and_category() {
        let err = ReconcileError::HealthCheck {
            category: ModelCategory::Reasoning,
            reason: "timeout".into(),
        };
        assert_eq!(err.stage(), Stage::Health);
        assert_eq!(err.category(), Some(ModelCategory::Reasoning));

        let err = ReconcileError::source_decode(SourceKind::Base64, "bad padding");
        assert_eq!(err.stage(), Stage::Source);
        assert_eq!(err.category(), None);

        let err = ReconcileError::failed(Stage::Drift, "store unreachable");
        assert_eq!(err.stage(), Stage::Drift);
    }

    #[test]
    fn test_is_user_error() {
        assert!(ReconcileError::schema("$", "x").is_user_error());
        assert!(!ReconcileError::Persistence(StorageError::Other("disk".into())).is_user_error());
    }
}
