//! Core domain model types.
//!
//! This module contains the fundamental types used throughout the crate:
//! - Run and stage status enums with their state machine
//! - The stage output type

mod output;
mod status;

pub use output::StageOutput;
pub use status::{RunStatus, StageStatus};
