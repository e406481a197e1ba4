//! Runtime helpers.

mod runtime;

pub use runtime::{run_blocking, run_blocking_with, RuntimeConfig};
