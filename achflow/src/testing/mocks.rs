//! Mock stages for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::context::{ContextSnapshot, StageContext};
use crate::core::StageOutput;
use crate::errors::AchflowError;
use crate::inference::{CallFailure, FailureClass};
use crate::stages::Stage;

/// Execution log shared between recording stages.
pub type StageLog = Arc<Mutex<Vec<String>>>;

/// A stage that records each execution and returns a fixed output.
#[derive(Debug)]
pub struct RecordingStage {
    name: String,
    output_key: String,
    inputs: Vec<String>,
    output: Value,
    fail: bool,
    log: Option<StageLog>,
    calls: AtomicUsize,
    seen: Mutex<Vec<ContextSnapshot>>,
}

impl RecordingStage {
    /// Creates a stage publishing `"<name> done"` under `output_key`.
    #[must_use]
    pub fn new(name: impl Into<String>, output_key: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            output: Value::String(format!("{name} done")),
            name,
            output_key: output_key.into(),
            inputs: Vec::new(),
            fail: false,
            log: None,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Creates an empty log to share between stages.
    #[must_use]
    pub fn shared_log() -> StageLog {
        Arc::new(Mutex::new(Vec::new()))
    }

    /// Declares input keys.
    #[must_use]
    pub fn with_inputs(mut self, inputs: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.inputs = inputs.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the published value.
    #[must_use]
    pub fn with_output(mut self, output: Value) -> Self {
        self.output = output;
        self
    }

    /// Appends the stage name to `log` on every execution.
    #[must_use]
    pub fn with_log(mut self, log: StageLog) -> Self {
        self.log = Some(log);
        self
    }

    /// Makes every execution fail with a fatal call error.
    #[must_use]
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Returns the number of executions.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Returns the context seen by each execution.
    #[must_use]
    pub fn seen_contexts(&self) -> Vec<ContextSnapshot> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl Stage for RecordingStage {
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
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().push(ctx.inputs().clone());
        if let Some(log) = &self.log {
            log.lock().push(self.name.clone());
        }

        if self.fail {
            return Err(AchflowError::FatalCall {
                attempts: 1,
                failure: CallFailure::new(FailureClass::ServerError, "scripted failure"),
            });
        }
        Ok(StageOutput::structured(self.output.clone()))
    }
}
