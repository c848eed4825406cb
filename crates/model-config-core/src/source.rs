//! Configuration source loading
//!
//! Operators supply the model configuration through exactly one of three
//! inputs, checked in precedence order:
//!
//! 1. inline JSON (`AI_MODELS_CONFIG`)
//! 2. base64-encoded JSON (`AI_MODELS_CONFIG_BASE64`)
//! 3. path to a JSON file (`AI_MODELS_CONFIG_PATH`)
//!
//! Absence of all three is not an error. A configured source that cannot be
//! decoded or read is.

use crate::error::{ReconcileError, Result};
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use base64::Engine;
use std::fmt;
use std::path::PathBuf;

pub const ENV_INLINE: &str = "AI_MODELS_CONFIG";
pub const ENV_BASE64: &str = "AI_MODELS_CONFIG_BASE64";
pub const ENV_PATH: &str = "AI_MODELS_CONFIG_PATH";

/// Which input supplied the configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Inline,
    Base64,
    Path,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SourceKind::Inline => "inline",
            SourceKind::Base64 => "base64",
            SourceKind::Path => "path",
        })
    }
}

/// Operator-supplied configuration inputs
///
/// Blank values count as not configured.
#[derive(Clone, Default)]
pub struct ConfigSource {
    pub inline: Option<String>,
    pub base64: Option<String>,
    pub path: Option<PathBuf>,
}

impl ConfigSource {
    pub fn inline(json: impl Into<String>) -> Self {
        Self {
            inline: Some(json.into()),
            ..Default::default()
        }
    }

    pub fn base64(encoded: impl Into<String>) -> Self {
        Self {
            base64: Some(encoded.into()),
            ..Default::default()
        }
    }

    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Default::default()
        }
    }

    /// Read the three inputs from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the three inputs through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            inline: lookup(ENV_INLINE),
            base64: lookup(ENV_BASE64),
            path: lookup(ENV_PATH).map(PathBuf::from),
        }
    }

    /// The input that will be used, if any
    pub fn selected(&self) -> Option<SourceKind> {
        if non_blank(self.inline.as_deref()).is_some() {
            Some(SourceKind::Inline)
        } else if non_blank(self.base64.as_deref()).is_some() {
            Some(SourceKind::Base64)
        } else if self
            .path
            .as_ref()
            .is_some_and(|p| !p.as_os_str().is_empty())
        {
            Some(SourceKind::Path)
        } else {
            None
        }
    }

    /// Obtain the raw configuration text
    ///
    /// Returns `Ok(None)` only when no input is configured.
    pub fn load_raw(&self) -> Result<Option<String>> {
        let Some(kind) = self.selected() else {
            return Ok(None);
        };
        tracing::debug!(source = %kind, "Loading model configuration");

        let raw = match kind {
            SourceKind::Inline => self.inline.clone().unwrap_or_default(),
            SourceKind::Base64 => {
                let encoded = non_blank(self.base64.as_deref()).unwrap_or_default();
                let bytes = STANDARD
                    .decode(encoded)
                    .or_else(|_| STANDARD_NO_PAD.decode(encoded))
                    .map_err(|e| ReconcileError::source_decode(kind, e.to_string()))?;
                String::from_utf8(bytes).map_err(|e| {
                    ReconcileError::source_decode(kind, format!("decoded bytes are not UTF-8: {}", e))
                })?
            }
            SourceKind::Path => {
                let path = self.path.clone().unwrap_or_default();
                std::fs::read_to_string(&path).map_err(|e| {
                    ReconcileError::source_decode(kind, format!("{}: {}", path.display(), e))
                })?
            }
        };

        Ok(Some(raw))
    }
}

// Inline JSON routinely carries API keys, so only report which inputs are set.
impl fmt::Debug for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigSource")
            .field("inline", &self.inline.as_ref().map(|_| "<set>"))
            .field("base64", &self.base64.as_ref().map(|_| "<set>"))
            .field("path", &self.path)
            .finish()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    const CONFIG: &str = r#"{"llm":[]}"#;

    #[test]
    fn test_nothing_configured() {
        let source = ConfigSource::default();
        assert_eq!(source.selected(), None);
        assert_eq!(source.load_raw().unwrap(), None);
    }

    #[test]
    fn test_blank_values_are_absent() {
        let source = ConfigSource {
            inline: Some("   ".into()),
            base64: Some(String::new()),
            path: Some(PathBuf::new()),
        };
        assert_eq!(source.load_raw().unwrap(), None);
    }

    #[test]
    fn test_inline_takes_precedence() {
        let source = ConfigSource {
            inline: Some(CONFIG.into()),
            base64: Some("!!not base64!!".into()),
            path: Some(PathBuf::from("/definitely/missing.json")),
        };
        assert_eq!(source.selected(), Some(SourceKind::Inline));
        assert_eq!(source.load_raw().unwrap().as_deref(), Some(CONFIG));
    }

    #[test]
    fn test_base64_before_path() {
        let source = ConfigSource {
            base64: Some(STANDARD.encode(CONFIG)),
            path: Some(PathBuf::from("/definitely/missing.json")),
            ..Default::default()
        };
        assert_eq!(source.load_raw().unwrap().as_deref(), Some(CONFIG));
    }

    #[test]
    fn test_unpadded_base64_accepted() {
        let source = ConfigSource::base64(STANDARD_NO_PAD.encode(CONFIG));
        assert_eq!(source.load_raw().unwrap().as_deref(), Some(CONFIG));
    }

    #[test]
    fn test_malformed_base64_is_fatal() {
        let err = ConfigSource::base64("%%%").load_raw().unwrap_err();
        assert!(matches!(
            err,
            ReconcileError::SourceDecode { kind: SourceKind::Base64, .. }
        ));
    }

    #[test]
    fn test_non_utf8_base64_is_fatal() {
        let err = ConfigSource::base64(STANDARD.encode([0xff, 0xfe, 0xfd]))
            .load_raw()
            .unwrap_err();
        assert!(err.to_string().contains("UTF-8"));
    }

    #[test]
    fn test_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CONFIG.as_bytes()).unwrap();

        let source = ConfigSource::path(file.path());
        assert_eq!(source.load_raw().unwrap().as_deref(), Some(CONFIG));
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let err = ConfigSource::path("/definitely/missing.json")
            .load_raw()
            .unwrap_err();
        assert!(matches!(
            err,
            ReconcileError::SourceDecode { kind: SourceKind::Path, .. }
        ));
        assert!(err.to_string().contains("/definitely/missing.json"));
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = [(ENV_PATH, "/etc/models.json")].into_iter().collect();
        let source = ConfigSource::from_lookup(|name| vars.get(name).map(|v| v.to_string()));
        assert_eq!(source.selected(), Some(SourceKind::Path));
        assert_eq!(source.path, Some(PathBuf::from("/etc/models.json")));
    }

    #[test]
    fn test_debug_hides_inline_content() {
        let source = ConfigSource::inline(r#"{"llm":[{"configuration":{"apiKey":"sk-x"}}]}"#);
        let debug = format!("{:?}", source);
        assert!(!debug.contains("sk-x"));
        assert!(debug.contains("<set>"));
    }
}
