//! The competing-hypotheses analysis chain.
//!
//! Eight capability stages run in order against the request seeded under
//! [`USER_REQUEST_KEY`]:
//!
//! | stage | publishes |
//! |---|---|
//! | `hypotheses_extraction` | `analysis_hypotheses_extracted` ([`HypothesesExtraction`]) |
//! | `web_information` | `analysis_web_information` (uses the source tools) |
//! | `evidence_structuring` | `analysis_evidence_structured` ([`StructuredEvidence`]) |
//! | `competing_hypotheses_matrix` | `analysis_competing_hypotheses_matrix` |
//! | `evidence_detailed_analysis` | `analysis_evidence_detailed_analysis` |
//! | `executive_review` | `analysis_executive_review` |
//! | `actionable_information` | `analysis_actionable_information` |
//! | `report_title` | `analysis_report_title` |

use super::{prompts, StageFactory};
use crate::contracts::OutputContract;
use crate::errors::AchflowError;
use crate::events::EventSink;
use crate::pipeline::Pipeline;
use crate::stages::StageConfig;
use crate::tools::Tool;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

/// Name of the analysis pipeline.
pub const ANALYSIS_PIPELINE: &str = "competing_hypotheses_analysis";

/// Context key the analyst request is seeded under.
pub const USER_REQUEST_KEY: &str = "user_request";

pub(super) const HYPOTHESES_KEY: &str = "analysis_hypotheses_extracted";
pub(super) const WEB_INFORMATION_KEY: &str = "analysis_web_information";
pub(super) const STRUCTURED_EVIDENCE_KEY: &str = "analysis_evidence_structured";
pub(super) const MATRIX_KEY: &str = "analysis_competing_hypotheses_matrix";
pub(super) const DETAILED_ANALYSIS_KEY: &str = "analysis_evidence_detailed_analysis";
pub(super) const EXECUTIVE_REVIEW_KEY: &str = "analysis_executive_review";
pub(super) const ACTIONABLE_KEY: &str = "analysis_actionable_information";
pub(super) const TITLE_KEY: &str = "analysis_report_title";

/// Hypotheses extracted from the request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HypothesesExtraction {
    /// The hypotheses, possibly empty.
    #[serde(default)]
    pub hypotheses: Vec<String>,
    /// One sentence on why these hypotheses were formulated.
    #[serde(default)]
    pub reasoning: String,
}

/// How one evidence item bears on one hypothesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HypothesisSupport {
    /// The hypothesis text.
    pub hypothesis: String,
    /// One of "strongly supports", "supports", "irrelevant", "contradicts",
    /// "strongly contradicts".
    pub support: String,
    /// Why the evidence has this support level.
    pub reasoning: String,
}

/// A single piece of evidence taken from a curated source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceItem {
    /// Short title.
    pub evidence: String,
    /// Brief description.
    pub description: String,
    /// `high`, `medium` or `low`.
    pub relevance: String,
    /// Why the relevance was assigned.
    pub relevance_reasoning: String,
    /// `objective` or `subjective`.
    pub objectivity: String,
    /// Why the objectivity was assigned.
    pub objectivity_reasoning: String,
    /// Source title and publishing date.
    pub source: String,
    /// Source URL.
    pub url: String,
    /// Support per hypothesis.
    #[serde(default)]
    pub hypotheses_support: Vec<HypothesisSupport>,
}

/// The structured evidence list.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StructuredEvidence {
    /// Items, most relevant first.
    pub evidence_items: Vec<EvidenceItem>,
}

impl StructuredEvidence {
    /// Returns the distinct source URLs, in order of first appearance.
    #[must_use]
    pub fn source_urls(&self) -> Vec<&str> {
        let mut urls: Vec<&str> = Vec::new();
        for item in &self.evidence_items {
            if !urls.contains(&item.url.as_str()) {
                urls.push(&item.url);
            }
        }
        urls
    }
}

fn string_schema() -> Value {
    json!({ "type": "STRING" })
}

fn hypotheses_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "hypotheses": { "type": "ARRAY", "items": string_schema() },
            "reasoning": string_schema(),
        },
        "required": ["hypotheses", "reasoning"],
    })
}

fn evidence_schema() -> Value {
    let support = json!({
        "type": "OBJECT",
        "properties": {
            "hypothesis": string_schema(),
            "support": {
                "type": "STRING",
                "enum": [
                    "strongly supports",
                    "supports",
                    "irrelevant",
                    "contradicts",
                    "strongly contradicts"
                ],
            },
            "reasoning": string_schema(),
        },
        "required": ["hypothesis", "support", "reasoning"],
    });
    let fields = [
        "evidence",
        "description",
        "relevance",
        "relevance_reasoning",
        "objectivity",
        "objectivity_reasoning",
        "source",
        "url",
    ];
    let mut properties = serde_json::Map::new();
    for field in fields {
        properties.insert(field.to_string(), string_schema());
    }
    properties.insert(
        "hypotheses_support".to_string(),
        json!({ "type": "ARRAY", "items": support }),
    );
    let mut required: Vec<&str> = fields.to_vec();
    required.push("hypotheses_support");

    json!({
        "type": "OBJECT",
        "properties": {
            "evidence_items": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": properties,
                    "required": required,
                },
            },
        },
        "required": ["evidence_items"],
    })
}

/// Builds the analysis pipeline.
///
/// `source_tools` are handed to the evidence-gathering stage; normally the
/// source listing and curated document tools.
pub fn analysis_pipeline(
    factory: &StageFactory,
    source_tools: impl IntoIterator<Item = Arc<dyn Tool>>,
    sink: Option<Arc<dyn EventSink>>,
) -> Result<Pipeline, AchflowError> {
    let stages = vec![
        StageConfig::builder("hypotheses_extraction", HYPOTHESES_KEY)
            .instruction(prompts::HYPOTHESES_EXTRACTION)
            .message(format!("{{{USER_REQUEST_KEY}}}"))
            .contract(OutputContract::typed::<HypothesesExtraction>(
                "HypothesesExtraction",
                hypotheses_schema(),
            ))
            .build()?,
        StageConfig::builder("web_information", WEB_INFORMATION_KEY)
            .instruction(prompts::WEB_INFORMATION)
            .message(prompts::EVIDENCE_EXTRACTION_MESSAGE)
            .tools(source_tools)
            .build()?,
        StageConfig::builder("evidence_structuring", STRUCTURED_EVIDENCE_KEY)
            .instruction(prompts::EVIDENCE_STRUCTURING)
            .message(prompts::EVIDENCE_STRUCTURING_MESSAGE)
            .contract(OutputContract::typed::<StructuredEvidence>(
                "StructuredEvidence",
                evidence_schema(),
            ))
            .build()?,
        StageConfig::builder("competing_hypotheses_matrix", MATRIX_KEY)
            .instruction(prompts::COMPETING_HYPOTHESES_MATRIX)
            .message(prompts::COMPETING_HYPOTHESES_MATRIX_MESSAGE)
            .build()?,
        StageConfig::builder("evidence_detailed_analysis", DETAILED_ANALYSIS_KEY)
            .instruction(prompts::EVIDENCE_DETAILED_ANALYSIS)
            .message(prompts::EVIDENCE_DETAILED_ANALYSIS_MESSAGE)
            .build()?,
        StageConfig::builder("executive_review", EXECUTIVE_REVIEW_KEY)
            .instruction(prompts::EXECUTIVE_REVIEW)
            .message(prompts::EXECUTIVE_REVIEW_MESSAGE)
            .build()?,
        StageConfig::builder("actionable_information", ACTIONABLE_KEY)
            .instruction(prompts::ACTIONABLE_INFORMATION)
            .message(prompts::ACTIONABLE_INFORMATION_MESSAGE)
            .build()?,
        StageConfig::builder("report_title", TITLE_KEY)
            .instruction(prompts::REPORT_TITLE)
            .message(prompts::REPORT_TITLE_MESSAGE)
            .build()?,
    ];

    let mut builder = Pipeline::builder(ANALYSIS_PIPELINE)
        .seed_key(USER_REQUEST_KEY)
        .stages(stages.into_iter().map(|config| factory.stage(config)));
    if let Some(sink) = sink {
        builder = builder.with_event_sink(sink);
    }
    Ok(builder.build()?)
}
