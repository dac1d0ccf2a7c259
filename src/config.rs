//! Translator options, read from a JSON document.

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};
use std::path::Path;

/// Accepts `true`, `"true"`, `"1"`, `"yes"`, `"on"` and their negatives.
fn deserialize_bool_or_string<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrString {
        Bool(bool),
        String(String),
    }

    match Option::<BoolOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(BoolOrString::Bool(b)) => Ok(Some(b)),
        Some(BoolOrString::String(s)) => {
            let normalized = s.trim().to_lowercase();
            match normalized.as_str() {
                "true" | "1" | "yes" | "on" => Ok(Some(true)),
                "false" | "0" | "no" | "off" => Ok(Some(false)),
                _ => Err(Error::custom(format!(
                    "invalid boolean value: '{s}'. Expected true, false, 'true', or 'false'"
                ))),
            }
        }
    }
}

/// The document as written: every key optional.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RawOptions {
    #[serde(default, deserialize_with = "deserialize_bool_or_string")]
    simplify_casts: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_bool_or_string")]
    use_threads: Option<bool>,
    #[serde(default)]
    ignored_modules: Option<Vec<String>>,
    #[serde(default)]
    proxy_modules: Option<Vec<String>>,
    #[serde(default, deserialize_with = "deserialize_bool_or_string")]
    visit_nested_functions: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_bool_or_string")]
    strict_untranslatable: Option<bool>,
}

/// Resolved options for a [`crate::TranslationSession`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatorOptions {
    /// Run the cast-expansion pass over every translated method.
    pub simplify_casts: bool,
    /// Translate batches on the rayon pool.
    pub use_threads: bool,
    /// Glob patterns; every type in a matching module is ignored.
    pub ignored_modules: Vec<String>,
    /// Modules whose proxy types are registered. Empty means all.
    pub proxy_modules: Vec<String>,
    pub visit_nested_functions: bool,
    /// Fail the method on an untranslatable instruction.
    pub strict_untranslatable: bool,
}

impl Default for TranslatorOptions {
    fn default() -> Self {
        Self {
            simplify_casts: true,
            use_threads: true,
            ignored_modules: Vec::new(),
            proxy_modules: Vec::new(),
            visit_nested_functions: false,
            strict_untranslatable: false,
        }
    }
}

impl From<RawOptions> for TranslatorOptions {
    fn from(raw: RawOptions) -> Self {
        let defaults = Self::default();
        Self {
            simplify_casts: raw.simplify_casts.unwrap_or(defaults.simplify_casts),
            use_threads: raw.use_threads.unwrap_or(defaults.use_threads),
            ignored_modules: raw.ignored_modules.unwrap_or(defaults.ignored_modules),
            proxy_modules: raw.proxy_modules.unwrap_or(defaults.proxy_modules),
            visit_nested_functions: raw
                .visit_nested_functions
                .unwrap_or(defaults.visit_nested_functions),
            strict_untranslatable: raw
                .strict_untranslatable
                .unwrap_or(defaults.strict_untranslatable),
        }
    }
}

impl TranslatorOptions {
    pub fn from_json_str(source: &str) -> Result<Self> {
        let raw: RawOptions =
            serde_json::from_str(source).context("failed to parse translator options JSON")?;
        Ok(raw.into())
    }
}

/// Read and parse an options file.
pub fn load_options(path: &Path) -> Result<TranslatorOptions> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read options: {}", path.display()))?;
    TranslatorOptions::from_json_str(&source)
        .with_context(|| format!("failed to parse options: {}", path.display()))
}
