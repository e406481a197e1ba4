//! Pipeline builder with validation.

use super::Pipeline;
use crate::errors::{ContractErrorInfo, PipelineValidationError};
use crate::events::{EventSink, NoOpEventSink};
use crate::stages::Stage;
use std::collections::HashSet;
use std::sync::Arc;

/// Builder for creating validated linear pipelines.
///
/// Stages run in the order they are added. `build()` checks that every key
/// a stage reads is published by the seed or by an earlier stage, and that no
/// key is published twice.
#[derive(Clone)]
pub struct PipelineBuilder {
    /// The pipeline name.
    name: String,
    /// Keys the caller supplies when the run starts.
    seed_keys: Vec<String>,
    /// The stages, in execution order.
    stages: Vec<Arc<dyn Stage>>,
    /// Where lifecycle events go.
    sink: Option<Arc<dyn EventSink>>,
}

impl std::fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("name", &self.name)
            .field("seed_keys", &self.seed_keys)
            .field("stages", &self.stages)
            .finish_non_exhaustive()
    }
}

impl PipelineBuilder {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            seed_keys: Vec::new(),
            stages: Vec::new(),
            sink: None,
        }
    }

    /// Declares a key the caller seeds the context with.
    #[must_use]
    pub fn seed_key(mut self, key: impl Into<String>) -> Self {
        self.seed_keys.push(key.into());
        self
    }

    /// Appends a stage.
    #[must_use]
    pub fn stage(mut self, stage: Arc<dyn Stage>) -> Self {
        self.stages.push(stage);
        self
    }

    /// Appends several stages.
    #[must_use]
    pub fn stages(mut self, stages: impl IntoIterator<Item = Arc<dyn Stage>>) -> Self {
        self.stages.extend(stages);
        self
    }

    /// Sets the event sink. Defaults to [`NoOpEventSink`].
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Appends another builder's stages after this one's.
    ///
    /// The other builder's seed keys must be published by this pipeline or
    /// declared as seeds here; that is checked at `build()`.
    #[must_use]
    pub fn compose(mut self, other: Self) -> Self {
        self.name = format!("{}+{}", self.name, other.name);
        for key in other.seed_keys {
            if !self.seed_keys.contains(&key) && !self.publishes(&key) {
                self.seed_keys.push(key);
            }
        }
        self.stages.extend(other.stages);
        self
    }

    fn publishes(&self, key: &str) -> bool {
        self.stages.iter().any(|stage| stage.output_key() == key)
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Validates the chain and builds the pipeline.
    ///
    /// # Errors
    ///
    /// Returns `CONTRACT-004-EMPTY` for a pipeline with no stages,
    /// `CONTRACT-004-CONFLICT` when a stage name or output key is reused, and
    /// `CONTRACT-004-MISSING_DEP` when a stage reads a key nothing earlier
    /// publishes.
    pub fn build(self) -> Result<Pipeline, PipelineValidationError> {
        if self.stages.is_empty() {
            return Err(PipelineValidationError::new(format!(
                "Pipeline '{}' has no stages",
                self.name
            ))
            .with_error_info(
                ContractErrorInfo::new("CONTRACT-004-EMPTY", "Cannot build an empty pipeline")
                    .with_fix_hint("Add at least one stage to the pipeline before building."),
            ));
        }

        let mut names: HashSet<&str> = HashSet::new();
        let mut published: HashSet<&str> = self.seed_keys.iter().map(String::as_str).collect();

        for stage in &self.stages {
            let name = stage.name();
            let output_key = stage.output_key();

            if !names.insert(name) {
                return Err(conflict(name, format!("Stage name '{name}' is used twice")));
            }

            for input in stage.input_keys() {
                if !published.contains(input.as_str()) {
                    return Err(PipelineValidationError::new(format!(
                        "Stage '{name}' reads '{input}' which no earlier stage publishes"
                    ))
                    .with_stages(vec![name.to_string()])
                    .with_error_info(
                        ContractErrorInfo::new(
                            "CONTRACT-004-MISSING_DEP",
                            format!("Input '{input}' not available"),
                        )
                        .with_fix_hint(
                            "Move the producing stage before this one, or declare the key with seed_key().",
                        )
                        .with_context_entry("stage", name)
                        .with_context_entry("key", input.clone()),
                    ));
                }
            }

            if !published.insert(output_key) {
                return Err(conflict(
                    name,
                    format!("Stage '{name}' publishes '{output_key}' which is already in the context"),
                ));
            }
        }

        let sink = self
            .sink
            .unwrap_or_else(|| Arc::new(NoOpEventSink) as Arc<dyn EventSink>);
        Ok(Pipeline::new(self.name, self.seed_keys, self.stages, sink))
    }
}

fn conflict(stage: &str, message: String) -> PipelineValidationError {
    PipelineValidationError::new(message.clone())
        .with_stages(vec![stage.to_string()])
        .with_error_info(
            ContractErrorInfo::new("CONTRACT-004-CONFLICT", message)
                .with_fix_hint("Give every stage a unique name and output key."),
        )
}
