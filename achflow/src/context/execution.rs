//! Per-stage execution context.

use super::{ContextSnapshot, RunIdentity};
use crate::errors::AchflowError;
use serde_json::Value;

/// What a stage sees while it executes.
///
/// The context is a snapshot taken after the previous stage's output was
/// merged, so a stage can read every earlier key but cannot write any.
#[derive(Debug, Clone)]
pub struct StageContext {
    run: RunIdentity,
    pipeline: String,
    stage: String,
    index: usize,
    inputs: ContextSnapshot,
}

impl StageContext {
    /// Creates a new stage context.
    #[must_use]
    pub fn new(
        run: RunIdentity,
        pipeline: impl Into<String>,
        stage: impl Into<String>,
        index: usize,
        inputs: ContextSnapshot,
    ) -> Self {
        Self {
            run,
            pipeline: pipeline.into(),
            stage: stage.into(),
            index,
            inputs,
        }
    }

    /// Creates a context for running a stage outside a pipeline.
    #[must_use]
    pub fn standalone(stage: impl Into<String>, inputs: ContextSnapshot) -> Self {
        Self::new(RunIdentity::new(), "standalone", stage, 0, inputs)
    }

    /// Returns the run identity.
    #[must_use]
    pub fn run(&self) -> &RunIdentity {
        &self.run
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn pipeline(&self) -> &str {
        &self.pipeline
    }

    /// Returns the stage name.
    #[must_use]
    pub fn stage(&self) -> &str {
        &self.stage
    }

    /// Returns the stage's position in the chain.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns the context accumulated so far.
    #[must_use]
    pub fn inputs(&self) -> &ContextSnapshot {
        &self.inputs
    }

    /// Gets a value, failing with `MissingInput` if absent.
    pub fn require(&self, key: &str) -> Result<&Value, AchflowError> {
        self.inputs.get(key).ok_or_else(|| AchflowError::MissingInput {
            stage: self.stage.clone(),
            key: key.to_string(),
        })
    }
}
