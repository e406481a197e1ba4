//! The external-facing result of an analysis run.

use super::analysis::{
    HypothesesExtraction, StructuredEvidence, ACTIONABLE_KEY, DETAILED_ANALYSIS_KEY,
    EXECUTIVE_REVIEW_KEY, HYPOTHESES_KEY, MATRIX_KEY, STRUCTURED_EVIDENCE_KEY, TITLE_KEY,
    USER_REQUEST_KEY, WEB_INFORMATION_KEY,
};
use crate::context::ContextSnapshot;
use crate::errors::AchflowError;
use serde::{Deserialize, Serialize};

const ASSEMBLER: &str = "analysis_report";

fn text(context: &ContextSnapshot, key: &str) -> Result<String, AchflowError> {
    context
        .get_str(key)
        .map(str::to_string)
        .ok_or_else(|| AchflowError::MissingInput {
            stage: ASSEMBLER.to_string(),
            key: key.to_string(),
        })
}

/// The report handed to presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Generated title.
    pub report_title: String,
    /// The request as submitted.
    pub user_request: String,
    /// Extracted hypotheses.
    pub hypotheses: Vec<String>,
    /// Narrative review ranking the hypotheses.
    pub executive_review: String,
    /// Recommended actions.
    pub actionable_information: String,
    /// Per-evidence narrative.
    pub evidence_analysis: String,
    /// Markdown evidence/hypothesis matrix.
    pub competing_hypotheses_matrix: String,
}

impl AnalysisReport {
    /// Assembles the report from a completed analysis context.
    pub fn from_context(context: &ContextSnapshot) -> Result<Self, AchflowError> {
        let extraction: HypothesesExtraction = context.parse(HYPOTHESES_KEY)?;
        Ok(Self {
            report_title: text(context, TITLE_KEY)?.trim().to_string(),
            user_request: text(context, USER_REQUEST_KEY)?,
            hypotheses: extraction.hypotheses,
            executive_review: text(context, EXECUTIVE_REVIEW_KEY)?,
            actionable_information: text(context, ACTIONABLE_KEY)?,
            evidence_analysis: text(context, DETAILED_ANALYSIS_KEY)?,
            competing_hypotheses_matrix: text(context, MATRIX_KEY)?,
        })
    }
}

/// Intermediate evidence kept for diagnosis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisDebugData {
    /// Evidence as gathered from the sources, before structuring.
    pub extracted_evidence: String,
    /// Evidence after structuring.
    pub structured_evidence: StructuredEvidence,
}

impl AnalysisDebugData {
    /// Extracts the debug data from a completed analysis context.
    pub fn from_context(context: &ContextSnapshot) -> Result<Self, AchflowError> {
        Ok(Self {
            extracted_evidence: text(context, WEB_INFORMATION_KEY)?,
            structured_evidence: context.parse(STRUCTURED_EVIDENCE_KEY)?,
        })
    }
}
