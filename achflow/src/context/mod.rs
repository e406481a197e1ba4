//! Context management for pipeline execution.
//!
//! This module provides:
//! - The write-once, insertion-ordered context bag a run accumulates
//! - Immutable snapshots handed to stages and returned on failure
//! - Run identity and the per-stage execution context

mod bags;
mod execution;
mod identity;
mod snapshot;

pub use bags::ContextBag;
pub use execution::StageContext;
pub use identity::RunIdentity;
pub use snapshot::ContextSnapshot;
