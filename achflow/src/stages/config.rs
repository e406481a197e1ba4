//! Typed per-stage configuration.

use super::PromptTemplate;
use crate::contracts::OutputContract;
use crate::errors::{AchflowError, ContractErrorInfo, PipelineValidationError};
use crate::tools::{Tool, ToolSet};
use std::sync::Arc;

/// Configuration of one capability stage.
///
/// Built with [`StageConfig::builder`] and validated at `build()`; a built
/// config is always internally consistent.
#[derive(Debug, Clone)]
pub struct StageConfig {
    /// Unique stage name.
    pub name: String,
    /// Context key the result is published under.
    pub output_key: String,
    /// System instruction template.
    pub instruction: PromptTemplate,
    /// User message template.
    pub message: PromptTemplate,
    /// Tools the model may invoke, in declaration order.
    pub tools: ToolSet,
    /// Structured-output contract.
    pub contract: Option<OutputContract>,
    /// Model override for this stage.
    pub model: Option<String>,
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Whether an empty result fails the stage.
    pub require_non_empty: bool,
    /// Every context key the stage reads, templates included.
    pub input_keys: Vec<String>,
}

impl StageConfig {
    /// Starts building a stage config.
    #[must_use]
    pub fn builder(name: impl Into<String>, output_key: impl Into<String>) -> StageConfigBuilder {
        StageConfigBuilder {
            name: name.into(),
            output_key: output_key.into(),
            instruction: None,
            message: None,
            tools: Vec::new(),
            contract: None,
            model: None,
            temperature: None,
            require_non_empty: true,
            input_keys: Vec::new(),
        }
    }
}

/// Builder for [`StageConfig`].
pub struct StageConfigBuilder {
    name: String,
    output_key: String,
    instruction: Option<PromptTemplate>,
    message: Option<PromptTemplate>,
    tools: Vec<Arc<dyn Tool>>,
    contract: Option<OutputContract>,
    model: Option<String>,
    temperature: Option<f32>,
    require_non_empty: bool,
    input_keys: Vec<String>,
}

impl std::fmt::Debug for StageConfigBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageConfigBuilder")
            .field("name", &self.name)
            .field("output_key", &self.output_key)
            .field("tools", &self.tools.iter().map(|t| t.name()).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl StageConfigBuilder {
    /// Sets the system instruction template.
    #[must_use]
    pub fn instruction(mut self, template: impl Into<PromptTemplate>) -> Self {
        self.instruction = Some(template.into());
        self
    }

    /// Sets the user message template.
    #[must_use]
    pub fn message(mut self, template: impl Into<PromptTemplate>) -> Self {
        self.message = Some(template.into());
        self
    }

    /// Adds a tool.
    #[must_use]
    pub fn tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    /// Adds several tools.
    #[must_use]
    pub fn tools(mut self, tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> Self {
        self.tools.extend(tools);
        self
    }

    /// Sets the structured-output contract.
    #[must_use]
    pub fn contract(mut self, contract: OutputContract) -> Self {
        self.contract = Some(contract);
        self
    }

    /// Overrides the model.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets whether an empty result fails the stage. Defaults to true.
    #[must_use]
    pub fn require_non_empty(mut self, required: bool) -> Self {
        self.require_non_empty = required;
        self
    }

    /// Declares a context key read outside the templates.
    #[must_use]
    pub fn input(mut self, key: impl Into<String>) -> Self {
        self.input_keys.push(key.into());
        self
    }

    /// Validates and builds the config.
    pub fn build(self) -> Result<StageConfig, AchflowError> {
        let invalid = |code: &str, message: String, hint: &str| {
            AchflowError::Validation(
                PipelineValidationError::new(message.clone())
                    .with_stages(vec![self.name.clone()])
                    .with_error_info(ContractErrorInfo::new(code, message).with_fix_hint(hint)),
            )
        };

        if self.name.trim().is_empty() {
            return Err(invalid(
                "STAGE-001-NAME",
                "Stage name must not be empty".to_string(),
                "Give every stage a unique, non-empty name",
            ));
        }
        if self.output_key.trim().is_empty() {
            return Err(invalid(
                "STAGE-001-OUTPUT",
                format!("Stage '{}' has an empty output key", self.name),
                "Set the context key the stage publishes under",
            ));
        }
        let Some(message) = self.message.clone() else {
            return Err(invalid(
                "STAGE-002-MESSAGE",
                format!("Stage '{}' has no message template", self.name),
                "Call .message(...) with the text sent as the user turn",
            ));
        };
        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(invalid(
                    "STAGE-003-TEMPERATURE",
                    format!("Stage '{}' temperature {t} is outside 0.0..=2.0", self.name),
                    "Use a temperature between 0.0 and 2.0",
                ));
            }
        }

        let instruction = self.instruction.clone().unwrap_or_else(|| PromptTemplate::new(""));

        let mut input_keys: Vec<String> = Vec::new();
        let declared = instruction
            .placeholders()
            .iter()
            .chain(message.placeholders())
            .chain(self.input_keys.iter());
        for key in declared {
            if !input_keys.contains(key) {
                input_keys.push(key.clone());
            }
        }
        if input_keys.contains(&self.output_key) {
            return Err(invalid(
                "STAGE-004-SELF_READ",
                format!(
                    "Stage '{}' reads its own output key '{}'",
                    self.name, self.output_key
                ),
                "A stage can only read keys published before it runs",
            ));
        }

        let mut tools = ToolSet::new();
        for tool in &self.tools {
            tools.register(tool.clone())?;
        }

        Ok(StageConfig {
            name: self.name,
            output_key: self.output_key,
            instruction,
            message,
            tools,
            contract: self.contract,
            model: self.model,
            temperature: self.temperature,
            require_non_empty: self.require_non_empty,
            input_keys,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ToolError;
    use crate::tools::{FnTool, ToolDefinition};
    use pretty_assertions::assert_eq;

    fn echo_tool(name: &str) -> Arc<dyn Tool> {
        Arc::new(FnTool::new(ToolDefinition::new(name, "echo"), |arg: &str| {
            Ok::<String, ToolError>(arg.to_string())
        }))
    }

    fn validation_code(err: &AchflowError) -> Option<&str> {
        match err {
            AchflowError::Validation(e) => e.code(),
            _ => None,
        }
    }

    #[test]
    fn test_input_keys_merge_templates_and_declared() {
        let config = StageConfig::builder("evidence", "evidence_out")
            .instruction("Use {hypotheses} for {user_request}")
            .message("{user_request}")
            .input("extra")
            .build()
            .unwrap();

        assert_eq!(config.input_keys, vec!["hypotheses", "user_request", "extra"]);
        assert!(config.require_non_empty);
        assert!(config.tools.is_empty());
    }

    #[test]
    fn test_missing_message_rejected() {
        let err = StageConfig::builder("s", "out").instruction("x").build().unwrap_err();
        assert_eq!(validation_code(&err), Some("STAGE-002-MESSAGE"));
    }

    #[test]
    fn test_empty_output_key_rejected() {
        let err = StageConfig::builder("s", " ").message("m").build().unwrap_err();
        assert_eq!(validation_code(&err), Some("STAGE-001-OUTPUT"));
    }

    #[test]
    fn test_self_read_rejected() {
        let err = StageConfig::builder("s", "out").message("{out}").build().unwrap_err();
        assert_eq!(validation_code(&err), Some("STAGE-004-SELF_READ"));
    }

    #[test]
    fn test_temperature_range() {
        let err = StageConfig::builder("s", "out")
            .message("m")
            .temperature(3.5)
            .build()
            .unwrap_err();
        assert_eq!(validation_code(&err), Some("STAGE-003-TEMPERATURE"));
    }

    #[test]
    fn test_duplicate_tools_rejected() {
        let err = StageConfig::builder("s", "out")
            .message("m")
            .tool(echo_tool("fetch"))
            .tool(echo_tool("fetch"))
            .build()
            .unwrap_err();
        assert!(matches!(err, AchflowError::Tool(ToolError::Duplicate { .. })));
    }

    #[test]
    fn test_tools_keep_declaration_order() {
        let config = StageConfig::builder("s", "out")
            .message("m")
            .tools([echo_tool("b"), echo_tool("a")])
            .build()
            .unwrap();
        assert_eq!(config.tools.names(), vec!["b", "a"]);
    }
}
