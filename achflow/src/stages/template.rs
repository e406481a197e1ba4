//! Instruction templates with named context substitution.

use crate::context::ContextSnapshot;
use crate::errors::AchflowError;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"\{\{|\}\}|\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid placeholder regex")
});

/// A text template whose `{key}` placeholders are filled from the context.
///
/// `{{` and `}}` render as literal braces. Braces around anything that is
/// not an identifier (such as inline JSON) are left untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    source: String,
    placeholders: Vec<String>,
}

impl PromptTemplate {
    /// Parses a template.
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let mut placeholders: Vec<String> = Vec::new();
        for caps in PLACEHOLDER.captures_iter(&source) {
            if let Some(name) = caps.get(1) {
                if !placeholders.iter().any(|p| p == name.as_str()) {
                    placeholders.push(name.as_str().to_string());
                }
            }
        }
        Self {
            source,
            placeholders,
        }
    }

    /// Returns the template text.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns the distinct placeholder names, in order of first use.
    #[must_use]
    pub fn placeholders(&self) -> &[String] {
        &self.placeholders
    }

    /// Renders the template for `stage` against the context.
    ///
    /// String values are substituted verbatim; other values as pretty JSON.
    pub fn render(&self, stage: &str, context: &ContextSnapshot) -> Result<String, AchflowError> {
        let mut out = String::with_capacity(self.source.len());
        let mut last = 0;

        for caps in PLACEHOLDER.captures_iter(&self.source) {
            let Some(whole) = caps.get(0) else { continue };
            out.push_str(&self.source[last..whole.start()]);
            last = whole.end();

            match caps.get(1) {
                Some(name) => {
                    let value = context.get(name.as_str()).ok_or_else(|| AchflowError::MissingInput {
                        stage: stage.to_string(),
                        key: name.as_str().to_string(),
                    })?;
                    match value {
                        Value::String(s) => out.push_str(s),
                        other => out.push_str(&serde_json::to_string_pretty(other)?),
                    }
                }
                None => out.push_str(&whole.as_str()[..1]),
            }
        }

        out.push_str(&self.source[last..]);
        Ok(out)
    }
}

impl From<&str> for PromptTemplate {
    fn from(source: &str) -> Self {
        Self::new(source)
    }
}

impl From<String> for PromptTemplate {
    fn from(source: String) -> Self {
        Self::new(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn context() -> ContextSnapshot {
        ContextSnapshot::from_entries([
            ("user_request".to_string(), json!("Will X happen?")),
            ("hypotheses".to_string(), json!({"hypotheses": ["X", "not X"]})),
        ])
    }

    #[test]
    fn test_placeholders_are_collected_once() {
        let template = PromptTemplate::new("{a} then {b} then {a}");
        assert_eq!(template.placeholders(), &["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_render_strings_verbatim() {
        let rendered = PromptTemplate::new("Request: {user_request}")
            .render("s", &context())
            .unwrap();
        assert_eq!(rendered, "Request: Will X happen?");
    }

    #[test]
    fn test_render_structured_as_json() {
        let rendered = PromptTemplate::new("H: {hypotheses}").render("s", &context()).unwrap();
        assert!(rendered.starts_with("H: {\n"));
        assert!(rendered.contains("\"not X\""));
    }

    #[test]
    fn test_missing_key_is_missing_input() {
        let err = PromptTemplate::new("{absent}").render("stage_a", &context()).unwrap_err();
        match err {
            AchflowError::MissingInput { stage, key } => {
                assert_eq!(stage, "stage_a");
                assert_eq!(key, "absent");
            }
            other => panic!("expected missing input, got {other:?}"),
        }
    }

    #[test]
    fn test_escaped_and_non_identifier_braces_are_literal() {
        let template = PromptTemplate::new(r#"Use {{user_request}} and {"k": 1} for {user_request}"#);
        assert_eq!(template.placeholders(), &["user_request".to_string()]);
        assert_eq!(
            template.render("s", &context()).unwrap(),
            r#"Use {user_request} and {"k": 1} for Will X happen?"#
        );
    }
}
