//! Categorical label encoders fitted by the external training step.
//!
//! Each encoder holds the sorted vocabulary of one input column. A label's
//! integer code is its position in that vocabulary, so `transform` is a
//! binary search over `classes`.
//!
//! Artifact layout (`encoders.json`):
//!
//! ```json
//! {
//!   "gender": { "classes": ["female", "male"] },
//!   "lunch":  { "classes": ["free/reduced", "standard"] }
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Errors raised while encoding a single label.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    /// The label was not part of the vocabulary seen during fitting.
    #[error("label {label:?} was not seen during fitting")]
    UnseenLabel { label: String },
}

/// Errors raised while building an encoder from artifact data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncoderFormatError {
    #[error("expected a mapping of column name to encoder, found {0}")]
    NotAMapping(&'static str),
    #[error("encoder for column {column:?} is malformed: {reason}")]
    MalformedEntry { column: String, reason: String },
    #[error("encoder classes must be sorted and unique (offending label {0:?})")]
    UnsortedClasses(String),
}

/// A fitted label encoder for one categorical column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawLabelEncoder")]
pub struct LabelEncoder {
    classes: Vec<String>,
}

#[derive(Deserialize)]
struct RawLabelEncoder {
    classes: Vec<String>,
}

impl TryFrom<RawLabelEncoder> for LabelEncoder {
    type Error = EncoderFormatError;

    fn try_from(raw: RawLabelEncoder) -> Result<Self, Self::Error> {
        Self::new(raw.classes)
    }
}

impl LabelEncoder {
    /// Build an encoder from its fitted vocabulary.
    ///
    /// The vocabulary must be strictly ascending, which is what the fitting
    /// step emits and what the binary search in [`transform`](Self::transform)
    /// relies on.
    pub fn new(classes: Vec<String>) -> Result<Self, EncoderFormatError> {
        if let Some(pair) = classes.windows(2).find(|w| w[0] >= w[1]) {
            return Err(EncoderFormatError::UnsortedClasses(pair[1].clone()));
        }
        Ok(Self { classes })
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Map a label to its integer code.
    pub fn transform(&self, label: &str) -> Result<usize, EncodeError> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(label))
            .map_err(|_| EncodeError::UnseenLabel {
                label: label.to_string(),
            })
    }

    pub fn inverse_transform(&self, code: usize) -> Option<&str> {
        self.classes.get(code).map(String::as_str)
    }
}

/// Column name → fitted encoder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EncoderSet {
    encoders: BTreeMap<String, LabelEncoder>,
}

impl EncoderSet {
    /// Interpret a parsed `encoders.json` document.
    ///
    /// Anything other than an object whose values are all valid encoders is
    /// rejected, so a successfully built set is always usable.
    pub fn from_json_value(value: serde_json::Value) -> Result<Self, EncoderFormatError> {
        let entries = match value {
            serde_json::Value::Object(map) => map,
            other => return Err(EncoderFormatError::NotAMapping(json_kind(&other))),
        };

        let mut encoders = BTreeMap::new();
        for (column, entry) in entries {
            let encoder: LabelEncoder = serde_json::from_value(entry).map_err(|e| {
                EncoderFormatError::MalformedEntry {
                    column: column.clone(),
                    reason: e.to_string(),
                }
            })?;
            encoders.insert(column, encoder);
        }
        Ok(Self { encoders })
    }

    pub fn get(&self, column: &str) -> Option<&LabelEncoder> {
        self.encoders.get(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.encoders.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.encoders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.encoders.is_empty()
    }
}

impl FromIterator<(String, LabelEncoder)> for EncoderSet {
    fn from_iter<I: IntoIterator<Item = (String, LabelEncoder)>>(iter: I) -> Self {
        Self {
            encoders: iter.into_iter().collect(),
        }
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
