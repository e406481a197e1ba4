//! # Achflow
//!
//! Pipeline orchestration and document caching for competing-hypotheses
//! analysis.
//!
//! A free-text analytical request is threaded through a fixed chain of
//! capability stages, each a single call to an external inference service
//! with optional tool use. Achflow provides:
//!
//! - **Linear pipelines**: stages run strictly in order against one growing
//!   context; a failure stops the run and reports the partial context
//! - **Capability stages**: templated instructions, a bounded tool loop and
//!   typed output contracts
//! - **Backoff**: bounded exponential retry for transient inference failures
//! - **Document caches**: insert-once key to (metadata, payload) storage, in
//!   memory or on disk
//! - **Content providers**: fetch-or-cached resolution of raw pages and of
//!   curated documents produced by a nested curation pipeline
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use achflow::prelude::*;
//!
//! let config = AnalysisConfig::from_json_file("achflow.json")?;
//! let analyst = Analyst::from_config(config).await?;
//!
//! let outcome = analyst.analyze("We are uncertain whether event X will occur").await?;
//! println!("{}", outcome.report.report_title);
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cache;
pub mod config;
pub mod content;
pub mod context;
pub mod contracts;
pub mod core;
pub mod errors;
pub mod events;
pub mod helpers;
pub mod inference;
pub mod observability;
pub mod pipeline;
pub mod stages;
pub mod testing;
pub mod tools;
pub mod workflows;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cache::{Document, DocumentCache, FileDocumentCache, InMemoryDocumentCache};
    pub use crate::config::{AnalysisConfig, CacheConfig, FetchConfig, InferenceConfig};
    pub use crate::content::{
        ContentProvider, CuratedContentProvider, DocumentCurator, Fetcher, WebContentProvider,
    };
    pub use crate::context::{ContextSnapshot, RunIdentity, StageContext};
    pub use crate::contracts::OutputContract;
    pub use crate::core::{RunStatus, StageOutput, StageStatus};
    pub use crate::errors::{AchflowError, PipelineFailure, PipelineValidationError, ToolError};
    pub use crate::events::{EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::helpers::run_blocking;
    pub use crate::inference::{
        BackoffClient, GeminiClient, InferenceClient, InferenceRequest, InferenceResponse,
        RetryPolicy,
    };
    pub use crate::observability::{init_tracing, TracingOptions};
    pub use crate::pipeline::{Pipeline, PipelineBuilder, PipelineRun};
    pub use crate::stages::{CapabilityStage, Stage, StageConfig};
    pub use crate::tools::{Tool, ToolDefinition, ToolSet};
    pub use crate::workflows::{AnalysisOutcome, AnalysisReport, Analyst};
}
