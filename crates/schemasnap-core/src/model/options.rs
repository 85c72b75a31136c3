//! Declarative operation inputs: string-or-structured options and keys.

use crate::errors::{Result, SnapError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A payload or query option as configured.
///
/// Configuration may hold either a structured value or its serialized JSON
/// text. [`OptionValue::normalize`] is the single step that turns both into
/// a structured value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Raw(String),
    Structured(Value),
}

impl OptionValue {
    /// Produce the structured form.
    ///
    /// Returns `Ok(None)` for blank text and for `null`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPayloadFormat` if raw text is not valid JSON. There is
    /// no fallback to treating the text as a plain string.
    pub fn normalize(&self, option: &str) -> Result<Option<Value>> {
        match self {
            OptionValue::Raw(text) if text.trim().is_empty() => Ok(None),
            OptionValue::Raw(text) => {
                let parsed: Value =
                    serde_json::from_str(text).map_err(|e| SnapError::InvalidPayloadFormat {
                        option: option.to_string(),
                        reason: e.to_string(),
                    })?;
                Ok((!parsed.is_null()).then_some(parsed))
            }
            OptionValue::Structured(Value::Null) => Ok(None),
            OptionValue::Structured(value) => Ok(Some(value.clone())),
        }
    }
}

impl From<Value> for OptionValue {
    fn from(value: Value) -> Self {
        OptionValue::Structured(value)
    }
}

impl From<&str> for OptionValue {
    fn from(text: &str) -> Self {
        OptionValue::Raw(text.to_string())
    }
}

/// Primary key of an item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrimaryKey {
    Integer(i64),
    String(String),
}

impl From<i64> for PrimaryKey {
    fn from(value: i64) -> Self {
        PrimaryKey::Integer(value)
    }
}

impl From<&str> for PrimaryKey {
    fn from(value: &str) -> Self {
        PrimaryKey::String(value.to_string())
    }
}

impl std::fmt::Display for PrimaryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrimaryKey::Integer(n) => write!(f, "{}", n),
            PrimaryKey::String(s) => f.write_str(s),
        }
    }
}

/// Explicit key selection of an update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeySelection {
    One(PrimaryKey),
    Many(Vec<PrimaryKey>),
}

impl KeySelection {
    pub fn into_keys(self) -> Vec<PrimaryKey> {
        match self {
            KeySelection::One(key) => vec![key],
            KeySelection::Many(keys) => keys,
        }
    }
}
