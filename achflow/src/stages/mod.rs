//! Stage trait and implementations.
//!
//! Stages are the units of work in a pipeline. A stage reads the context
//! accumulated so far and returns one output; the orchestrator publishes it
//! under the stage's output key.

mod capability;
mod config;
mod template;

pub use capability::CapabilityStage;
pub use config::{StageConfig, StageConfigBuilder};
pub use template::PromptTemplate;

use crate::context::StageContext;
use crate::core::StageOutput;
use crate::errors::AchflowError;
use async_trait::async_trait;
use std::fmt::Debug;

/// Trait for pipeline stages.
#[async_trait]
pub trait Stage: Send + Sync + Debug {
    /// Returns the name of the stage.
    fn name(&self) -> &str;

    /// Returns the context key the stage's output is published under.
    fn output_key(&self) -> &str;

    /// Returns the context keys the stage reads.
    fn input_keys(&self) -> Vec<String> {
        Vec::new()
    }

    /// Executes the stage.
    ///
    /// The stage must not assume anything about keys it did not declare.
    async fn execute(&self, ctx: &StageContext) -> Result<StageOutput, AchflowError>;
}

/// A simple function-based stage.
pub struct FnStage<F>
where
    F: Fn(&StageContext) -> Result<StageOutput, AchflowError> + Send + Sync,
{
    name: String,
    output_key: String,
    inputs: Vec<String>,
    func: F,
}

impl<F> FnStage<F>
where
    F: Fn(&StageContext) -> Result<StageOutput, AchflowError> + Send + Sync,
{
    /// Creates a new function-based stage.
    pub fn new(name: impl Into<String>, output_key: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            output_key: output_key.into(),
            inputs: Vec::new(),
            func,
        }
    }

    /// Declares the context keys the function reads.
    #[must_use]
    pub fn with_inputs(mut self, inputs: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.inputs = inputs.into_iter().map(Into::into).collect();
        self
    }
}

impl<F> Debug for FnStage<F>
where
    F: Fn(&StageContext) -> Result<StageOutput, AchflowError> + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnStage")
            .field("name", &self.name)
            .field("output_key", &self.output_key)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<F> Stage for FnStage<F>
where
    F: Fn(&StageContext) -> Result<StageOutput, AchflowError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn output_key(&self) -> &str {
        &self.output_key
    }

    fn input_keys(&self) -> Vec<String> {
        self.inputs.clone()
    }

    async fn execute(&self, ctx: &StageContext) -> Result<StageOutput, AchflowError> {
        (self.func)(ctx)
    }
}
