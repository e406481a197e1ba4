//! Linear pipeline execution.

use super::PipelineBuilder;
use crate::context::{ContextBag, ContextSnapshot, RunIdentity, StageContext};
use crate::core::{RunStatus, StageStatus};
use crate::errors::{AchflowError, PipelineFailure};
use crate::events::{EventKind, EventSink, PipelineEvent};
use crate::stages::Stage;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

/// What happened to one stage during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRecord {
    /// Stage name.
    pub name: String,
    /// Position in the chain.
    pub index: usize,
    /// Key the output was published under.
    pub output_key: String,
    /// Final status.
    pub status: StageStatus,
    /// Wall time in milliseconds.
    pub duration_ms: f64,
    /// Diagnostic metadata reported by the stage.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, Value>,
}

/// A completed pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    /// The run identity.
    pub run: RunIdentity,
    /// The pipeline name.
    pub pipeline: String,
    /// The final context: the seed plus one key per stage.
    pub context: ContextSnapshot,
    /// One record per stage, in execution order.
    pub records: Vec<StageRecord>,
    /// Always [`RunStatus::Completed`] for a returned run.
    pub status: RunStatus,
    /// Total wall time in milliseconds.
    pub duration_ms: f64,
}

/// A validated, immutable chain of stages.
///
/// Built with [`Pipeline::builder`]. A pipeline can be run any number of
/// times, concurrently; each run gets a fresh context.
#[derive(Clone)]
pub struct Pipeline {
    name: String,
    seed_keys: Vec<String>,
    stages: Vec<Arc<dyn Stage>>,
    sink: Arc<dyn EventSink>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("seed_keys", &self.seed_keys)
            .field("stages", &self.stage_names())
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Starts building a pipeline.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> PipelineBuilder {
        PipelineBuilder::new(name)
    }

    pub(super) fn new(
        name: String,
        seed_keys: Vec<String>,
        stages: Vec<Arc<dyn Stage>>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            name,
            seed_keys,
            stages,
            sink,
        }
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared seed keys.
    #[must_use]
    pub fn seed_keys(&self) -> &[String] {
        &self.seed_keys
    }

    /// Returns the stage names in execution order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns true if the pipeline has no stages. Never true for a built
    /// pipeline.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Runs the pipeline under a fresh identity.
    pub async fn run(&self, seed: ContextSnapshot) -> Result<PipelineRun, Box<PipelineFailure>> {
        self.run_as(RunIdentity::new(), seed).await
    }

    /// Runs the pipeline under the given identity.
    ///
    /// Stages execute strictly in order. Stage `i + 1` starts only after
    /// stage `i`'s output is merged; the first failure stops the run and is
    /// returned with the context accumulated so far.
    pub async fn run_as(
        &self,
        run: RunIdentity,
        seed: ContextSnapshot,
    ) -> Result<PipelineRun, Box<PipelineFailure>> {
        let span = tracing::info_span!(
            "pipeline.run",
            pipeline = %self.name,
            run_id = %run.run_id,
        );
        self.execute(run, seed).instrument(span).await
    }

    async fn execute(
        &self,
        run: RunIdentity,
        seed: ContextSnapshot,
    ) -> Result<PipelineRun, Box<PipelineFailure>> {
        let start = Instant::now();
        let bag = ContextBag::new();
        for (key, value) in seed.iter() {
            // A snapshot never repeats a key.
            let _ = bag.set(key, value.clone());
        }

        let mut status = RunStatus::Pending;
        let mut records = Vec::with_capacity(self.stages.len());

        tracing::info!(stages = self.stages.len(), "Pipeline started");
        self.sink
            .emit(
                &PipelineEvent::pipeline(EventKind::PipelineStarted, &self.name, run).with_data(
                    json!({ "stages": self.stage_names(), "seed_keys": seed.keys() }),
                ),
            )
            .await;

        for (index, stage) in self.stages.iter().enumerate() {
            debug_assert!(status.can_transition_to(RunStatus::Running(index)));
            status = RunStatus::Running(index);

            match self.run_stage(run, index, stage.as_ref(), &bag).await {
                Ok(record) => records.push(record),
                Err(error) => {
                    let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
                    tracing::warn!(
                        stage = %stage.name(),
                        index,
                        %status,
                        error = %error,
                        "Pipeline failed"
                    );
                    self.sink
                        .emit(
                            &PipelineEvent::pipeline(EventKind::PipelineFailed, &self.name, run)
                                .with_data(json!({
                                    "stage": stage.name(),
                                    "index": index,
                                    "error": error.to_string(),
                                    "duration_ms": duration_ms,
                                })),
                        )
                        .await;
                    return Err(Box::new(PipelineFailure {
                        pipeline: self.name.clone(),
                        stage: stage.name().to_string(),
                        index,
                        error,
                        context: bag.snapshot(),
                    }));
                }
            }
        }

        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
        status = RunStatus::Completed;
        tracing::info!(duration_ms, "Pipeline completed");
        self.sink
            .emit(
                &PipelineEvent::pipeline(EventKind::PipelineCompleted, &self.name, run)
                    .with_data(json!({ "duration_ms": duration_ms })),
            )
            .await;

        Ok(PipelineRun {
            run,
            pipeline: self.name.clone(),
            context: bag.snapshot(),
            records,
            status,
            duration_ms,
        })
    }

    async fn run_stage(
        &self,
        run: RunIdentity,
        index: usize,
        stage: &dyn Stage,
        bag: &ContextBag,
    ) -> Result<StageRecord, AchflowError> {
        let name = stage.name();
        self.sink
            .emit(&PipelineEvent::stage(EventKind::StageStarted, &self.name, run, name, index))
            .await;

        let stage_start = Instant::now();
        let result = self.invoke(run, index, stage, bag).await;
        let duration_ms = stage_start.elapsed().as_secs_f64() * 1000.0;

        match result {
            Ok(metadata) => {
                tracing::info!(stage = %name, index, duration_ms, "Stage completed");
                self.sink
                    .emit(
                        &PipelineEvent::stage(EventKind::StageCompleted, &self.name, run, name, index)
                            .with_data(json!({
                                "output_key": stage.output_key(),
                                "duration_ms": duration_ms,
                                "metadata": metadata,
                            })),
                    )
                    .await;
                Ok(StageRecord {
                    name: name.to_string(),
                    index,
                    output_key: stage.output_key().to_string(),
                    status: StageStatus::Ok,
                    duration_ms,
                    metadata,
                })
            }
            Err(error) => {
                self.sink
                    .emit(
                        &PipelineEvent::stage(EventKind::StageFailed, &self.name, run, name, index)
                            .with_data(json!({
                                "error": error.to_string(),
                                "kind": error.kind(),
                                "duration_ms": duration_ms,
                            })),
                    )
                    .await;
                Err(error)
            }
        }
    }

    async fn invoke(
        &self,
        run: RunIdentity,
        index: usize,
        stage: &dyn Stage,
        bag: &ContextBag,
    ) -> Result<HashMap<String, Value>, AchflowError> {
        let name = stage.name();
        let inputs = bag.snapshot();

        if let Some(key) = stage
            .input_keys()
            .into_iter()
            .find(|key| !inputs.contains_key(key))
        {
            return Err(AchflowError::MissingInput {
                stage: name.to_string(),
                key,
            });
        }

        tracing::info!(stage = %name, index, "Stage started");
        let ctx = StageContext::new(run, &self.name, name, index, inputs);
        let span = tracing::info_span!("stage", stage = %name, index);
        let output = run.scope(stage.execute(&ctx).instrument(span)).await?;

        bag.set(stage.output_key(), output.value)?;
        Ok(output.metadata)
    }
}
