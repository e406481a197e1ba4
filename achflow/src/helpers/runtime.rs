//! Scoped runtime for synchronous callers.
//!
//! A caller without its own runtime gets one for the duration of a single
//! future. The runtime is shut down before returning, with a bounded wait for
//! background tasks, so no shutdown error can surface after the result.

use crate::errors::AchflowError;
use std::future::Future;
use std::time::Duration;

/// Settings for the scoped runtime.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Worker threads. Defaults to the number of cores.
    pub worker_threads: Option<usize>,
    /// How long shutdown waits for spawned tasks.
    pub shutdown_timeout: Duration,
    /// Name given to worker threads.
    pub thread_name: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            worker_threads: None,
            shutdown_timeout: Duration::from_secs(10),
            thread_name: "achflow-worker".to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Creates a new runtime configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the worker thread count.
    #[must_use]
    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = Some(threads);
        self
    }

    /// Sets the shutdown timeout.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

/// Runs `future` to completion on a fresh multi-thread runtime.
///
/// Must not be called from inside another runtime.
pub fn run_blocking<F: Future>(future: F) -> Result<F::Output, AchflowError> {
    run_blocking_with(&RuntimeConfig::default(), future)
}

/// [`run_blocking`] with explicit settings.
pub fn run_blocking_with<F: Future>(
    config: &RuntimeConfig,
    future: F,
) -> Result<F::Output, AchflowError> {
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all().thread_name(config.thread_name.clone());
    if let Some(threads) = config.worker_threads {
        builder.worker_threads(threads.max(1));
    }
    let runtime = builder.build()?;

    let output = runtime.block_on(future);
    runtime.shutdown_timeout(config.shutdown_timeout);
    tracing::debug!("Scoped runtime shut down");
    Ok(output)
}
