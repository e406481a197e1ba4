//! Structured-output contracts for capability stages.
//!
//! This module provides:
//! - The [`OutputContract`] a stage's raw response must satisfy
//! - Typed parsing of responses through serde

mod typed_output;

pub use typed_output::{strip_code_fences, OutputContract};
