//! Structural validation of raw configuration documents
//!
//! The document is a JSON object mapping category names to arrays of
//! provider entries:
//!
//! ```json
//! {
//!   "llm": [
//!     { "provider": "openAI", "configuration": { "model": "gpt-4o", "apiKey": "..." } }
//!   ],
//!   "embedding": []
//! }
//! ```
//!
//! Only the top-level entry fields are checked. Provider payloads stay opaque,
//! and entry fields this module does not know about are carried through.

use crate::error::{ReconcileError, Result};
use crate::model::{ModelCategory, ProviderId};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};

const FIELD_PROVIDER: &str = "provider";
const FIELD_CONFIGURATION: &str = "configuration";
const FIELD_KEY: &str = "key";
const FIELD_ROLE: &str = "role";
const FIELD_IS_DEFAULT: &str = "isDefault";
const FIELD_IS_MULTIMODAL: &str = "isMultimodal";
const FIELD_IS_REASONING: &str = "isReasoning";

const KNOWN_FIELDS: [&str; 7] = [
    FIELD_PROVIDER,
    FIELD_CONFIGURATION,
    FIELD_KEY,
    FIELD_ROLE,
    FIELD_IS_DEFAULT,
    FIELD_IS_MULTIMODAL,
    FIELD_IS_REASONING,
];

/// A validated but not yet normalized provider entry
#[derive(Debug, Clone, PartialEq)]
pub struct RawModelEntry {
    pub provider: ProviderId,
    pub configuration: Map<String, Value>,
    pub key: Option<String>,
    pub role: Option<String>,
    pub is_default: Option<bool>,
    pub is_multimodal: Option<bool>,
    pub is_reasoning: Option<bool>,
    pub extra: Map<String, Value>,
}

impl RawModelEntry {
    /// Entry with only the required fields set
    pub fn new(provider: impl Into<ProviderId>, configuration: Map<String, Value>) -> Self {
        Self {
            provider: provider.into(),
            configuration,
            key: None,
            role: None,
            is_default: None,
            is_multimodal: None,
            is_reasoning: None,
            extra: Map::new(),
        }
    }
}

/// Validated document: only categories present in the input appear here
pub type RawConfig = BTreeMap<ModelCategory, Vec<RawModelEntry>>;

/// Parse and structurally validate a raw configuration document
pub fn validate(raw: &str) -> Result<RawConfig> {
    let document: Value = serde_json::from_str(raw)
        .map_err(|e| ReconcileError::schema("$", format!("invalid JSON: {}", e)))?;

    let root = match document {
        Value::Object(root) => root,
        other => {
            return Err(ReconcileError::schema(
                "$",
                format!(
                    "expected an object mapping categories to arrays, found {}",
                    type_name(&other)
                ),
            ))
        }
    };

    let mut config = RawConfig::new();
    for (name, value) in root {
        let category = ModelCategory::from_wire(&name).ok_or_else(|| {
            let known: Vec<_> = ModelCategory::ALL.iter().map(|c| c.as_str()).collect();
            ReconcileError::schema(
                name.as_str(),
                format!("unknown model category (expected one of: {})", known.join(", ")),
            )
        })?;

        let items = match value {
            Value::Null => Vec::new(),
            Value::Array(items) => items,
            other => {
                return Err(ReconcileError::schema(
                    name.as_str(),
                    format!("expected an array of model entries, found {}", type_name(&other)),
                ))
            }
        };

        let entries = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| parse_entry(&format!("{}[{}]", name, index), item))
            .collect::<Result<Vec<_>>>()?;

        check_category_invariants(&name, &entries)?;
        config.insert(category, entries);
    }

    tracing::debug!(
        categories = config.len(),
        entries = config.values().map(Vec::len).sum::<usize>(),
        "Model configuration passed schema validation"
    );
    Ok(config)
}

fn parse_entry(path: &str, value: Value) -> Result<RawModelEntry> {
    let mut fields = match value {
        Value::Object(fields) => fields,
        other => {
            return Err(ReconcileError::schema(
                path,
                format!("expected an object, found {}", type_name(&other)),
            ))
        }
    };

    let provider = match fields.remove(FIELD_PROVIDER) {
        Some(Value::String(s)) if !s.trim().is_empty() => ProviderId::from(s),
        Some(Value::String(_)) => {
            return Err(ReconcileError::schema(
                field_path(path, FIELD_PROVIDER),
                "must not be empty",
            ))
        }
        Some(other) => {
            return Err(ReconcileError::schema(
                field_path(path, FIELD_PROVIDER),
                format!("expected a string, found {}", type_name(&other)),
            ))
        }
        None => {
            return Err(ReconcileError::schema(
                field_path(path, FIELD_PROVIDER),
                "missing required field",
            ))
        }
    };

    let configuration = match fields.remove(FIELD_CONFIGURATION) {
        Some(Value::Object(map)) => map,
        Some(other) => {
            return Err(ReconcileError::schema(
                field_path(path, FIELD_CONFIGURATION),
                format!("expected an object, found {}", type_name(&other)),
            ))
        }
        None => {
            return Err(ReconcileError::schema(
                field_path(path, FIELD_CONFIGURATION),
                "missing required field",
            ))
        }
    };

    let key = optional_string(path, FIELD_KEY, fields.remove(FIELD_KEY))?;
    if key.as_deref().is_some_and(|k| k.trim().is_empty()) {
        return Err(ReconcileError::schema(
            field_path(path, FIELD_KEY),
            "must not be empty",
        ));
    }

    let entry = RawModelEntry {
        provider,
        configuration,
        key,
        role: optional_string(path, FIELD_ROLE, fields.remove(FIELD_ROLE))?,
        is_default: optional_bool(path, FIELD_IS_DEFAULT, fields.remove(FIELD_IS_DEFAULT))?,
        is_multimodal: optional_bool(path, FIELD_IS_MULTIMODAL, fields.remove(FIELD_IS_MULTIMODAL))?,
        is_reasoning: optional_bool(path, FIELD_IS_REASONING, fields.remove(FIELD_IS_REASONING))?,
        extra: fields,
    };
    debug_assert!(KNOWN_FIELDS.iter().all(|f| !entry.extra.contains_key(*f)));
    Ok(entry)
}

fn check_category_invariants(category: &str, entries: &[RawModelEntry]) -> Result<()> {
    let mut seen_keys = HashSet::new();
    let mut default_declared = false;

    for (index, entry) in entries.iter().enumerate() {
        let path = format!("{}[{}]", category, index);

        if let Some(key) = &entry.key {
            if !seen_keys.insert(key.as_str()) {
                return Err(ReconcileError::schema(
                    field_path(&path, FIELD_KEY),
                    format!("duplicate key '{}' in category", key),
                ));
            }
        }

        if entry.is_default == Some(true) {
            if default_declared {
                return Err(ReconcileError::schema(
                    field_path(&path, FIELD_IS_DEFAULT),
                    "more than one entry in category declares isDefault",
                ));
            }
            default_declared = true;
        }
    }

    Ok(())
}

fn optional_string(path: &str, field: &str, value: Option<Value>) -> Result<Option<String>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(ReconcileError::schema(
            field_path(path, field),
            format!("expected a string, found {}", type_name(&other)),
        )),
    }
}

fn optional_bool(path: &str, field: &str, value: Option<Value>) -> Result<Option<bool>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(b)),
        Some(other) => Err(ReconcileError::schema(
            field_path(path, field),
            format!("expected a boolean, found {}", type_name(&other)),
        )),
    }
}

fn field_path(path: &str, field: &str) -> String {
    format!("{}.{}", path, field)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
