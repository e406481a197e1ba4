//! Test doubles for achflow pipelines.
//!
//! This module provides:
//! - A scripted inference service
//! - A counting in-memory fetcher
//! - A recording stage for ordering assertions

mod fetch;
mod inference;
mod mocks;

pub use fetch::CountingFetcher;
pub use inference::ScriptedInference;
pub use mocks::{RecordingStage, StageLog};
