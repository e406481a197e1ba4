//! Pipeline building and execution.
//!
//! This module provides:
//! - The validating [`PipelineBuilder`]
//! - The strictly linear [`Pipeline`] executor
//! - Run records returned to callers

mod builder;
mod runner;

pub use builder::PipelineBuilder;
pub use runner::{Pipeline, PipelineRun, StageRecord};
