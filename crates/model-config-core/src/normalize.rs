//! Normalization of validated documents into canonical configurations
//!
//! Fills every derived default so that downstream consumers never have to:
//! stable keys, roles, the per-category default entry and the capability
//! flags. Pure; performs no I/O.

use crate::model::{AIModelsConfig, ModelCategory, ModelConfiguration};
use crate::schema::{RawConfig, RawModelEntry};
use serde_json::{json, Value};
use std::collections::HashMap;
use uuid::Uuid;

/// Namespace for name-based stable keys
const STABLE_KEY_NAMESPACE: Uuid = Uuid::from_u128(0x6d2f_1c3a_8b4e_4f0a_9c55_2e7b_d1a0_f3c8);

/// Normalize a validated document into a configuration covering every category
pub fn normalize(raw: &RawConfig) -> AIModelsConfig {
    let mut config = AIModelsConfig::new();

    for category in ModelCategory::ALL {
        let entries = raw.get(&category).map(Vec::as_slice).unwrap_or_default();
        config.set(category, normalize_category(category, entries));
    }

    config
}

fn normalize_category(category: ModelCategory, entries: &[RawModelEntry]) -> Vec<ModelConfiguration> {
    let default_declared = entries.iter().any(|e| e.is_default == Some(true));
    let mut occurrences: HashMap<String, usize> = HashMap::new();

    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let key = match &entry.key {
                Some(key) => key.clone(),
                None => {
                    let seed = key_seed(category, entry);
                    let seen = occurrences.entry(seed.clone()).or_insert(0);
                    let key = derive_stable_key(&seed, *seen);
                    *seen += 1;
                    key
                }
            };

            ModelConfiguration {
                key,
                provider: entry.provider.clone(),
                configuration: entry.configuration.clone(),
                role: entry
                    .role
                    .clone()
                    .or_else(|| category.default_role().map(str::to_string)),
                is_default: entry
                    .is_default
                    .unwrap_or(!default_declared && index == 0),
                is_multimodal: entry
                    .is_multimodal
                    .unwrap_or(category == ModelCategory::Multimodal),
                is_reasoning: entry
                    .is_reasoning
                    .unwrap_or(category == ModelCategory::Reasoning),
                extra: entry.extra.clone(),
            }
        })
        .collect()
}

/// Everything that identifies an entry except its position and key
///
/// `serde_json` objects serialize with sorted keys, so the seed does not
/// depend on the field order of the input document.
fn key_seed(category: ModelCategory, entry: &RawModelEntry) -> String {
    json!({
        "category": category.as_str(),
        "provider": entry.provider.as_str(),
        "configuration": Value::Object(entry.configuration.clone()),
        "role": entry.role,
        "isDefault": entry.is_default,
        "isMultimodal": entry.is_multimodal,
        "isReasoning": entry.is_reasoning,
        "extra": Value::Object(entry.extra.clone()),
    })
    .to_string()
}

/// Name-based key; `occurrence` separates identical entries in one category
fn derive_stable_key(seed: &str, occurrence: usize) -> String {
    let name = if occurrence == 0 {
        seed.to_string()
    } else {
        format!("{}#{}", seed, occurrence)
    };
    Uuid::new_v5(&STABLE_KEY_NAMESPACE, name.as_bytes()).to_string()
}
