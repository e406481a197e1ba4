//! Tool definitions and call I/O types.

use serde::{Deserialize, Serialize};

/// The single string argument a tool accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolParameter {
    /// Argument name as the model sees it.
    pub name: String,
    /// What the argument means.
    pub description: String,
}

impl ToolParameter {
    /// Creates a new parameter.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// Definition of a tool as declared to the inference service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name.
    pub name: String,
    /// Description of what the tool does.
    pub description: String,
    /// The tool's argument, if it takes one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter: Option<ToolParameter>,
}

impl ToolDefinition {
    /// Creates a new tool definition with no argument.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameter: None,
        }
    }

    /// Sets the argument.
    #[must_use]
    pub fn with_parameter(mut self, parameter: ToolParameter) -> Self {
        self.parameter = Some(parameter);
        self
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Call identifier, unique within a response.
    pub id: String,
    /// The tool name.
    pub name: String,
    /// The string argument.
    #[serde(default)]
    pub argument: String,
}

impl ToolCall {
    /// Creates a new tool call.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, argument: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            argument: argument.into(),
        }
    }
}

/// The output of a tool invocation, sent back to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    /// The call this answers.
    pub call_id: String,
    /// The tool name.
    pub name: String,
    /// The tool's string output.
    pub output: String,
}

impl ToolResult {
    /// Creates a new tool result.
    #[must_use]
    pub fn new(call_id: impl Into<String>, name: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            name: name.into(),
            output: output.into(),
        }
    }

    /// Creates the result for a call.
    #[must_use]
    pub fn for_call(call: &ToolCall, output: impl Into<String>) -> Self {
        Self::new(call.id.clone(), call.name.clone(), output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definition_builder() {
        let def = ToolDefinition::new("lookup", "Looks things up")
            .with_parameter(ToolParameter::new("query", "What to look up"));

        assert_eq!(def.name, "lookup");
        assert_eq!(def.parameter.as_ref().map(|p| p.name.as_str()), Some("query"));
    }

    #[test]
    fn test_definition_without_parameter_omits_field() {
        let json = serde_json::to_value(ToolDefinition::new("list", "Lists")).unwrap();
        assert!(json.get("parameter").is_none());
    }

    #[test]
    fn test_result_for_call() {
        let call = ToolCall::new("call-3", "lookup", "rust");
        let result = ToolResult::for_call(&call, "found");
        assert_eq!(result.call_id, "call-3");
        assert_eq!(result.name, "lookup");
        assert_eq!(result.output, "found");
    }
}
