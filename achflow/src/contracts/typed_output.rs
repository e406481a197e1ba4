//! Output contracts that validate raw responses through serde.

use crate::errors::AchflowError;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

type Validator = Arc<dyn Fn(Value) -> Result<Value, String> + Send + Sync>;

/// A structured-output contract.
///
/// Carries the JSON schema sent to the inference service and a validator
/// the raw response must pass. A response that is not valid JSON, or does
/// not deserialize into the contract's type, is a schema violation.
#[derive(Clone)]
pub struct OutputContract {
    name: String,
    schema: Value,
    validator: Validator,
}

impl OutputContract {
    /// Creates a contract whose responses must deserialize into `T`.
    ///
    /// The published value is `T` serialized back, so unknown fields are
    /// dropped and defaults are filled in.
    #[must_use]
    pub fn typed<T>(name: impl Into<String>, schema: Value) -> Self
    where
        T: Serialize + DeserializeOwned + 'static,
    {
        Self {
            name: name.into(),
            schema,
            validator: Arc::new(|value| {
                let typed: T = serde_json::from_value(value).map_err(|e| e.to_string())?;
                serde_json::to_value(&typed).map_err(|e| e.to_string())
            }),
        }
    }

    /// Creates a contract that only requires well-formed JSON.
    #[must_use]
    pub fn json(name: impl Into<String>, schema: Value) -> Self {
        Self {
            name: name.into(),
            schema,
            validator: Arc::new(Ok::<Value, String>),
        }
    }

    /// Returns the contract name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the JSON schema.
    #[must_use]
    pub fn schema(&self) -> &Value {
        &self.schema
    }

    /// Parses and validates a raw response for `stage`.
    pub fn parse(&self, stage: &str, raw: &str) -> Result<Value, AchflowError> {
        let body = strip_code_fences(raw);
        let value: Value = serde_json::from_str(body).map_err(|e| AchflowError::SchemaViolation {
            stage: stage.to_string(),
            message: format!("response is not valid JSON: {e}"),
        })?;
        (self.validator)(value).map_err(|message| AchflowError::SchemaViolation {
            stage: stage.to_string(),
            message: format!("response does not match '{}': {message}", self.name),
        })
    }
}

impl fmt::Debug for OutputContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputContract")
            .field("name", &self.name)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// Strips a surrounding Markdown code fence, if present.
#[must_use]
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. `json`) on the opening line.
    match body.find('\n') {
        Some(newline) => body[newline + 1..].trim(),
        None => body.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize)]
    struct Hypotheses {
        hypotheses: Vec<String>,
        #[serde(default)]
        reasoning: String,
    }

    fn contract() -> OutputContract {
        OutputContract::typed::<Hypotheses>("hypotheses", json!({"type": "OBJECT"}))
    }

    #[test]
    fn test_valid_response_is_normalized() {
        let value = contract()
            .parse("extract", r#"{"hypotheses": ["a", "b"], "extra": 1}"#)
            .unwrap();
        assert_eq!(value, json!({"hypotheses": ["a", "b"], "reasoning": ""}));
    }

    #[test]
    fn test_fenced_response_is_accepted() {
        let raw = "```json\n{\"hypotheses\": [\"a\"], \"reasoning\": \"r\"}\n```";
        let value = contract().parse("extract", raw).unwrap();
        assert_eq!(value["reasoning"], "r");
    }

    #[test]
    fn test_malformed_json_is_schema_violation() {
        let err = contract().parse("extract", "not json").unwrap_err();
        assert!(matches!(err, AchflowError::SchemaViolation { ref stage, .. } if stage == "extract"));
    }

    #[test]
    fn test_wrong_shape_is_schema_violation() {
        let err = contract().parse("extract", r#"{"hypotheses": "one"}"#).unwrap_err();
        assert!(matches!(err, AchflowError::SchemaViolation { .. }));
        assert!(err.to_string().contains("hypotheses"));
    }

    #[test]
    fn test_json_contract_accepts_any_json() {
        let contract = OutputContract::json("any", json!({}));
        assert_eq!(contract.parse("s", "[1, 2]").unwrap(), json!([1, 2]));
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("  {}  "), "{}");
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("```json\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fences("```{}```"), "{}");
    }
}
