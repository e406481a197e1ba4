//! Lifecycle events emitted by the orchestrator.
//!
//! Sinks are injected per pipeline; there is no process-wide sink.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

use crate::context::RunIdentity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of a lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// A run began.
    #[serde(rename = "pipeline.started")]
    PipelineStarted,
    /// A stage began.
    #[serde(rename = "stage.started")]
    StageStarted,
    /// A stage's output was merged.
    #[serde(rename = "stage.completed")]
    StageCompleted,
    /// A stage failed.
    #[serde(rename = "stage.failed")]
    StageFailed,
    /// Every stage completed.
    #[serde(rename = "pipeline.completed")]
    PipelineCompleted,
    /// The run stopped at a failed stage.
    #[serde(rename = "pipeline.failed")]
    PipelineFailed,
}

impl EventKind {
    /// Returns the dotted event name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PipelineStarted => "pipeline.started",
            Self::StageStarted => "stage.started",
            Self::StageCompleted => "stage.completed",
            Self::StageFailed => "stage.failed",
            Self::PipelineCompleted => "pipeline.completed",
            Self::PipelineFailed => "pipeline.failed",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A lifecycle event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineEvent {
    /// The event kind.
    pub kind: EventKind,
    /// The pipeline name.
    pub pipeline: String,
    /// The run this event belongs to.
    pub run: RunIdentity,
    /// The stage name, for stage events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    /// The stage index, for stage events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    /// Event payload (durations, error text).
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub data: serde_json::Value,
    /// When the event was created.
    pub timestamp: DateTime<Utc>,
}

impl PipelineEvent {
    /// Creates a pipeline-level event.
    #[must_use]
    pub fn pipeline(kind: EventKind, pipeline: impl Into<String>, run: RunIdentity) -> Self {
        Self {
            kind,
            pipeline: pipeline.into(),
            run,
            stage: None,
            index: None,
            data: serde_json::Value::Null,
            timestamp: Utc::now(),
        }
    }

    /// Creates a stage-level event.
    #[must_use]
    pub fn stage(
        kind: EventKind,
        pipeline: impl Into<String>,
        run: RunIdentity,
        stage: impl Into<String>,
        index: usize,
    ) -> Self {
        Self {
            stage: Some(stage.into()),
            index: Some(index),
            ..Self::pipeline(kind, pipeline, run)
        }
    }

    /// Sets the payload.
    #[must_use]
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_kind_names() {
        assert_eq!(EventKind::StageFailed.to_string(), "stage.failed");
        assert_eq!(
            serde_json::to_value(EventKind::PipelineCompleted).unwrap(),
            json!("pipeline.completed")
        );
    }

    #[test]
    fn test_stage_event_serialization() {
        let event = PipelineEvent::stage(EventKind::StageStarted, "p", RunIdentity::new(), "s", 2)
            .with_data(json!({"attempt": 1}));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "stage.started");
        assert_eq!(json["stage"], "s");
        assert_eq!(json["index"], 2);
        assert_eq!(json["data"]["attempt"], 1);
    }

    #[test]
    fn test_pipeline_event_omits_stage_fields() {
        let event = PipelineEvent::pipeline(EventKind::PipelineStarted, "p", RunIdentity::new());
        let json = serde_json::to_value(&event).unwrap();
        assert!(json.get("stage").is_none());
        assert!(json.get("data").is_none());
    }
}
