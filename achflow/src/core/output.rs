//! Stage output type.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// The output of a successful stage execution.
///
/// `value` is what the orchestrator publishes under the stage's output key;
/// `metadata` is diagnostic only and never enters the context.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StageOutput {
    /// The published value: a JSON string for text output, any JSON value
    /// for structured output.
    pub value: Value,

    /// Additional metadata (call counts, model used).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, Value>,
}

impl StageOutput {
    /// Creates a text output.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            value: Value::String(text.into()),
            metadata: HashMap::new(),
        }
    }

    /// Creates a structured output.
    #[must_use]
    pub fn structured(value: Value) -> Self {
        Self {
            value,
            metadata: HashMap::new(),
        }
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn add_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Returns the value as text, if it is a string.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        self.value.as_str()
    }

    /// Returns true if the value carries no content.
    ///
    /// Whitespace-only strings, `null`, and empty arrays or objects are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match &self.value {
            Value::Null => true,
            Value::String(s) => s.trim().is_empty(),
            Value::Array(items) => items.is_empty(),
            Value::Object(map) => map.is_empty(),
            Value::Bool(_) | Value::Number(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_output() {
        let output = StageOutput::text("hello");
        assert_eq!(output.as_text(), Some("hello"));
        assert!(!output.is_empty());
    }

    #[test]
    fn test_emptiness() {
        assert!(StageOutput::text("  \n").is_empty());
        assert!(StageOutput::structured(json!(null)).is_empty());
        assert!(StageOutput::structured(json!([])).is_empty());
        assert!(StageOutput::structured(json!({})).is_empty());
        assert!(!StageOutput::structured(json!(0)).is_empty());
        assert!(!StageOutput::structured(json!({"a": 1})).is_empty());
    }

    #[test]
    fn test_metadata_is_skipped_when_empty() {
        let json = serde_json::to_value(StageOutput::text("x")).unwrap();
        assert!(json.get("metadata").is_none());

        let json = serde_json::to_value(StageOutput::text("x").add_metadata("calls", json!(2))).unwrap();
        assert_eq!(json["metadata"]["calls"], 2);
    }
}
