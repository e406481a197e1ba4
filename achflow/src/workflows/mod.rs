//! The built-in workflows: document curation and competing-hypotheses
//! analysis, plus the [`Analyst`] composition root wiring them together.

mod analysis;
mod analyst;
mod curation;
pub mod prompts;
mod report;

pub use analysis::{
    analysis_pipeline, EvidenceItem, HypothesesExtraction, HypothesisSupport, StructuredEvidence,
    ANALYSIS_PIPELINE, USER_REQUEST_KEY,
};
pub use analyst::{AnalysisOutcome, Analyst, AnalystParts};
pub use curation::{curation_pipeline, DocumentInformation, PipelineCurator, CURATION_PIPELINE};
pub use report::{AnalysisDebugData, AnalysisReport};

use crate::inference::BackoffClient;
use crate::stages::{CapabilityStage, Stage, StageConfig};
use std::sync::Arc;

/// Builds capability stages sharing one client, model and tool-round cap.
#[derive(Debug, Clone)]
pub struct StageFactory {
    client: Arc<BackoffClient>,
    model: String,
    max_tool_rounds: Option<usize>,
}

impl StageFactory {
    /// Creates a factory.
    #[must_use]
    pub fn new(client: Arc<BackoffClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            max_tool_rounds: None,
        }
    }

    /// Caps tool rounds for every stage built afterwards.
    #[must_use]
    pub fn with_max_tool_rounds(mut self, max: Option<usize>) -> Self {
        self.max_tool_rounds = max;
        self
    }

    /// Returns the default model.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Wraps a validated config into a stage.
    #[must_use]
    pub fn stage(&self, config: StageConfig) -> Arc<dyn Stage> {
        Arc::new(
            CapabilityStage::new(config, Arc::clone(&self.client), &self.model)
                .with_max_tool_rounds(self.max_tool_rounds),
        )
    }
}
