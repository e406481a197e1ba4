//! The capability stage: one inference call plus an optional tool loop.

use super::{Stage, StageConfig};
use crate::context::StageContext;
use crate::core::StageOutput;
use crate::errors::{AchflowError, ToolError};
use crate::inference::{
    BackoffClient, CallFailure, FailureClass, InferenceRequest, InferenceResponse, Turn,
};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

/// A stage that renders its templates, calls the inference service and
/// publishes the (optionally contract-checked) answer.
///
/// Tool calls requested by the model are executed sequentially in the order
/// given and fed back before the next call. The loop ends when the model
/// answers with text, or fails once `max_tool_rounds` is exceeded.
#[derive(Debug, Clone)]
pub struct CapabilityStage {
    config: StageConfig,
    client: Arc<BackoffClient>,
    default_model: String,
    max_tool_rounds: Option<usize>,
}

impl CapabilityStage {
    /// Creates a capability stage.
    ///
    /// `default_model` is used unless the config overrides it.
    #[must_use]
    pub fn new(
        config: StageConfig,
        client: Arc<BackoffClient>,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            config,
            client,
            default_model: default_model.into(),
            max_tool_rounds: None,
        }
    }

    /// Caps the number of tool rounds per execution.
    #[must_use]
    pub fn with_max_tool_rounds(mut self, max: Option<usize>) -> Self {
        self.max_tool_rounds = max;
        self
    }

    /// Returns the stage config.
    #[must_use]
    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    /// Returns the model this stage calls.
    #[must_use]
    pub fn model(&self) -> &str {
        self.config.model.as_deref().unwrap_or(&self.default_model)
    }

    fn build_request(&self, ctx: &StageContext) -> Result<InferenceRequest, AchflowError> {
        let name = &self.config.name;
        let system = self.config.instruction.render(name, ctx.inputs())?;
        let message = self.config.message.render(name, ctx.inputs())?;

        let mut request = InferenceRequest::new(name, self.model(), system, message);
        request.tools = self.config.tools.definitions();
        request.response_schema = self.config.contract.as_ref().map(|c| c.schema().clone());
        request.temperature = self.config.temperature;
        Ok(request)
    }

    fn tool_failure(error: &ToolError) -> AchflowError {
        AchflowError::FatalCall {
            attempts: 1,
            failure: CallFailure::new(FailureClass::Tool, error.to_string()),
        }
    }

    fn publish(&self, text: &str) -> Result<StageOutput, AchflowError> {
        let name = &self.config.name;
        let empty = || AchflowError::EmptyResult { stage: name.clone() };

        if self.config.require_non_empty && text.trim().is_empty() {
            return Err(empty());
        }

        let output = match &self.config.contract {
            Some(contract) => StageOutput::structured(contract.parse(name, text)?),
            None => StageOutput::text(text),
        };

        if self.config.require_non_empty && output.is_empty() {
            return Err(empty());
        }
        Ok(output)
    }
}

#[async_trait]
impl Stage for CapabilityStage {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn output_key(&self) -> &str {
        &self.config.output_key
    }

    fn input_keys(&self) -> Vec<String> {
        self.config.input_keys.clone()
    }

    async fn execute(&self, ctx: &StageContext) -> Result<StageOutput, AchflowError> {
        let mut request = self.build_request(ctx)?;
        let mut inference_calls: u64 = 0;
        let mut tool_calls: u64 = 0;
        let mut rounds: usize = 0;

        let text = loop {
            inference_calls += 1;
            let calls = match self.client.generate(&request).await? {
                InferenceResponse::Text { text } => break text,
                InferenceResponse::ToolCalls { calls } => calls,
            };

            if self.config.tools.is_empty() {
                return Err(AchflowError::FatalCall {
                    attempts: 1,
                    failure: CallFailure::new(
                        FailureClass::Protocol,
                        "model requested tools but the stage declares none",
                    ),
                });
            }

            rounds += 1;
            if let Some(max) = self.max_tool_rounds {
                if rounds > max {
                    return Err(AchflowError::FatalCall {
                        attempts: 1,
                        failure: CallFailure::new(
                            FailureClass::Tool,
                            format!("tool round limit of {max} exceeded"),
                        ),
                    });
                }
            }

            let mut results = Vec::with_capacity(calls.len());
            for call in &calls {
                tool_calls += 1;
                tracing::debug!(
                    stage = %self.config.name,
                    tool = %call.name,
                    round = rounds,
                    "Invoking tool"
                );
                let result = self
                    .config
                    .tools
                    .execute(call)
                    .await
                    .map_err(|e| Self::tool_failure(&e))?;
                results.push(result);
            }

            request.turns.push(Turn::ToolCalls { calls });
            request.turns.push(Turn::ToolResults { results });
        };

        Ok(self
            .publish(&text)?
            .add_metadata("model", json!(self.model()))
            .add_metadata("inference_calls", Value::from(inference_calls))
            .add_metadata("tool_calls", Value::from(tool_calls)))
    }
}
