//! Model-provider configuration types
//!
//! [`AIModelsConfig`] is the unit of diffing and storage: a map from every
//! [`ModelCategory`] to the ordered list of providers configured for it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Capability categories a provider entry can serve
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ModelCategory {
    /// General-purpose language model
    #[serde(rename = "llm")]
    Llm,
    #[serde(rename = "embedding")]
    Embedding,
    /// Small or local language model
    #[serde(rename = "slm")]
    Slm,
    #[serde(rename = "reasoning")]
    Reasoning,
    #[serde(rename = "multimodal")]
    Multimodal,
    #[serde(rename = "ocr")]
    Ocr,
    #[serde(rename = "deepresearch")]
    DeepResearch,
    #[serde(rename = "imageGeneration")]
    ImageGeneration,
}

/// How a category is verified before a configuration is committed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthProbe {
    /// Chat/completion style verification call
    LanguageModel,
    /// Embedding verification call
    Embedding,
    /// No verification endpoint exists; entries are accepted as-is
    Unsupported,
}

impl ModelCategory {
    /// Every category, in wire order
    pub const ALL: [ModelCategory; 8] = [
        ModelCategory::Llm,
        ModelCategory::Embedding,
        ModelCategory::Slm,
        ModelCategory::Reasoning,
        ModelCategory::Multimodal,
        ModelCategory::Ocr,
        ModelCategory::DeepResearch,
        ModelCategory::ImageGeneration,
    ];

    /// Name used in configuration documents
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelCategory::Llm => "llm",
            ModelCategory::Embedding => "embedding",
            ModelCategory::Slm => "slm",
            ModelCategory::Reasoning => "reasoning",
            ModelCategory::Multimodal => "multimodal",
            ModelCategory::Ocr => "ocr",
            ModelCategory::DeepResearch => "deepresearch",
            ModelCategory::ImageGeneration => "imageGeneration",
        }
    }

    /// Look up a category by its configuration-document name
    pub fn from_wire(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }

    /// Role assigned to entries that do not declare one
    pub fn default_role(&self) -> Option<&'static str> {
        match self {
            ModelCategory::Llm => Some("internal"),
            ModelCategory::Reasoning => Some("reasoning"),
            ModelCategory::Multimodal => Some("multimodal"),
            ModelCategory::DeepResearch => Some("deepresearch"),
            ModelCategory::ImageGeneration => Some("imageGeneration"),
            ModelCategory::Embedding | ModelCategory::Slm | ModelCategory::Ocr => None,
        }
    }

    pub fn health_probe(&self) -> HealthProbe {
        match self {
            ModelCategory::Llm
            | ModelCategory::Slm
            | ModelCategory::Reasoning
            | ModelCategory::Multimodal
            | ModelCategory::DeepResearch => HealthProbe::LanguageModel,
            ModelCategory::Embedding => HealthProbe::Embedding,
            ModelCategory::Ocr | ModelCategory::ImageGeneration => HealthProbe::Unsupported,
        }
    }
}

impl fmt::Display for ModelCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider identifier
///
/// Known providers get their own variant; anything else is carried verbatim
/// so that configuration for newer providers survives a round trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProviderId {
    OpenAi,
    AzureOpenAi,
    Anthropic,
    Google,
    Mistral,
    Ollama,
    Bedrock,
    HuggingFace,
    Vllm,
    Other(String),
}

impl ProviderId {
    pub fn as_str(&self) -> &str {
        match self {
            ProviderId::OpenAi => "openAI",
            ProviderId::AzureOpenAi => "azureOpenAI",
            ProviderId::Anthropic => "anthropic",
            ProviderId::Google => "google",
            ProviderId::Mistral => "mistral",
            ProviderId::Ollama => "ollama",
            ProviderId::Bedrock => "bedrock",
            ProviderId::HuggingFace => "huggingface",
            ProviderId::Vllm => "vllm",
            ProviderId::Other(name) => name,
        }
    }
}

impl From<String> for ProviderId {
    fn from(name: String) -> Self {
        match name.as_str() {
            "openAI" => ProviderId::OpenAi,
            "azureOpenAI" => ProviderId::AzureOpenAi,
            "anthropic" => ProviderId::Anthropic,
            "google" => ProviderId::Google,
            "mistral" => ProviderId::Mistral,
            "ollama" => ProviderId::Ollama,
            "bedrock" => ProviderId::Bedrock,
            "huggingface" => ProviderId::HuggingFace,
            "vllm" => ProviderId::Vllm,
            _ => ProviderId::Other(name),
        }
    }
}

impl From<&str> for ProviderId {
    fn from(name: &str) -> Self {
        ProviderId::from(name.to_string())
    }
}

impl From<ProviderId> for String {
    fn from(id: ProviderId) -> Self {
        match id {
            ProviderId::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One normalized provider entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfiguration {
    /// Stable identifier, constant for the same logical entry
    pub key: String,
    pub provider: ProviderId,
    /// Provider-specific payload (model name, credentials, endpoints...)
    pub configuration: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub is_multimodal: bool,
    #[serde(default)]
    pub is_reasoning: bool,
    /// Operator-supplied fields not interpreted here
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

type CategoryMap = BTreeMap<ModelCategory, Vec<ModelConfiguration>>;

/// Complete model configuration, one list per category
///
/// Every category is always present, possibly empty. Records persisted
/// before a category existed deserialize with that category empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "CategoryMap", into = "CategoryMap")]
pub struct AIModelsConfig {
    categories: CategoryMap,
}

impl Default for AIModelsConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl From<CategoryMap> for AIModelsConfig {
    fn from(mut categories: CategoryMap) -> Self {
        for category in ModelCategory::ALL {
            categories.entry(category).or_default();
        }
        Self { categories }
    }
}

impl From<AIModelsConfig> for CategoryMap {
    fn from(config: AIModelsConfig) -> Self {
        config.categories
    }
}

impl AIModelsConfig {
    /// Configuration with every category present and empty
    pub fn new() -> Self {
        Self::from(CategoryMap::new())
    }

    /// Entries for a category, in configured order
    pub fn get(&self, category: ModelCategory) -> &[ModelConfiguration] {
        self.categories
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Replace the entries of a category
    pub fn set(&mut self, category: ModelCategory, entries: Vec<ModelConfiguration>) {
        self.categories.insert(category, entries);
    }

    /// Iterate categories in fixed order
    pub fn iter(&self) -> impl Iterator<Item = (ModelCategory, &[ModelConfiguration])> {
        self.categories.iter().map(|(c, e)| (*c, e.as_slice()))
    }

    /// Total entries across all categories
    pub fn entry_count(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entry_count() == 0
    }

    /// The default entry of a category, if any
    pub fn default_for(&self, category: ModelCategory) -> Option<&ModelConfiguration> {
        self.get(category).iter().find(|e| e.is_default)
    }

    /// Order-independent form: entries sorted by stable key
    ///
    /// Ties (only possible in hand-built configurations) fall back to the
    /// serialized entry so the result is total.
    pub fn canonical(&self) -> AIModelsConfig {
        let mut categories = self.categories.clone();
        for entries in categories.values_mut() {
            entries.sort_by_cached_key(|e| {
                (
                    e.key.clone(),
                    serde_json::to_string(e).unwrap_or_default(),
                )
            });
        }
        AIModelsConfig::from(categories)
    }

    /// JSON value of the canonical form, used for equality checks
    pub fn canonical_json(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self.canonical())
    }

    /// Copy with credential-like configuration values masked
    pub fn redacted(&self) -> AIModelsConfig {
        let mut copy = self.clone();
        for entries in copy.categories.values_mut() {
            for entry in entries.iter_mut() {
                redact_map(&mut entry.configuration);
            }
        }
        copy
    }
}

const REDACTED: &str = "********";

fn is_sensitive(name: &str) -> bool {
    let name = name.to_lowercase();
    ["secret", "password", "token", "key", "credential"]
        .iter()
        .any(|word| name.contains(word))
}

/// Anything under a sensitive name is masked whole, including arrays and objects
fn redact_map(map: &mut Map<String, Value>) {
    for (name, value) in map.iter_mut() {
        if is_sensitive(name) && !value.is_null() {
            *value = Value::String(REDACTED.to_string());
        } else {
            redact_value(value);
        }
    }
}

fn redact_value(value: &mut Value) {
    match value {
        Value::Object(map) => redact_map(map),
        Value::Array(items) => items.iter_mut().for_each(redact_value),
        _ => {}
    }
}
