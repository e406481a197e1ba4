//! Bounded retry with exponential backoff for external calls.
//!
//! A failed attempt is retried only when its [`FailureClass`] is in the
//! policy's retryable set and attempts remain. The delay before retry `n`
//! (zero-based) is `base_delay * multiplier^n`, optionally capped and
//! jittered. Exhausted or non-retryable failures surface as
//! [`AchflowError::FatalCall`] wrapping the last failure.

use super::{CallFailure, FailureClass, InferenceClient, InferenceRequest, InferenceResponse};
use crate::errors::AchflowError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Jitter strategy applied to the computed backoff delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JitterStrategy {
    /// Use the computed delay as-is.
    #[default]
    None,
    /// Random from 0 to delay.
    Full,
    /// Half fixed, half random.
    Equal,
}

/// Retry policy for external calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum attempts, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first retry, in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Exponential growth factor between retries.
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    /// Upper bound on a single delay, in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_delay_ms: Option<u64>,
    /// Jitter strategy.
    #[serde(default)]
    pub jitter: JitterStrategy,
    /// Failure classes that trigger a retry.
    #[serde(default = "default_retry_on")]
    pub retry_on: Vec<FailureClass>,
    /// Deadline for a single attempt, in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_timeout_ms: Option<u64>,
}

fn default_max_attempts() -> u32 {
    5
}

fn default_base_delay_ms() -> u64 {
    10_000
}

fn default_multiplier() -> f64 {
    7.0
}

fn default_retry_on() -> Vec<FailureClass> {
    vec![
        FailureClass::RateLimited,
        FailureClass::ServerError,
        FailureClass::ServerUnavailable,
        FailureClass::GatewayTimeout,
        FailureClass::Timeout,
    ]
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            multiplier: default_multiplier(),
            max_delay_ms: None,
            jitter: JitterStrategy::None,
            retry_on: default_retry_on(),
            call_timeout_ms: None,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with the default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A policy that makes exactly one attempt.
    #[must_use]
    pub fn no_retry() -> Self {
        Self::default().with_max_attempts(1)
    }

    /// Sets the maximum attempts.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Sets the base delay.
    #[must_use]
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Sets the exponential multiplier.
    #[must_use]
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Caps a single delay.
    #[must_use]
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay_ms = Some(u64::try_from(delay.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Sets the jitter strategy.
    #[must_use]
    pub fn with_jitter(mut self, jitter: JitterStrategy) -> Self {
        self.jitter = jitter;
        self
    }

    /// Replaces the retryable failure classes.
    #[must_use]
    pub fn with_retry_on(mut self, classes: impl IntoIterator<Item = FailureClass>) -> Self {
        self.retry_on = classes.into_iter().collect();
        self
    }

    /// Sets a deadline for each attempt.
    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Returns the per-attempt deadline, if any.
    #[must_use]
    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_ms.map(Duration::from_millis)
    }

    /// Returns true if a failure of this class may be retried.
    #[must_use]
    pub fn is_retryable(&self, class: FailureClass) -> bool {
        self.retry_on.contains(&class)
    }

    /// Checks the policy for values that would make retrying meaningless.
    pub fn validate(&self) -> Result<(), AchflowError> {
        if self.max_attempts == 0 {
            return Err(AchflowError::Config(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(AchflowError::Config(format!(
                "retry.multiplier must be a finite value >= 1.0, got {}",
                self.multiplier
            )));
        }
        Ok(())
    }

    /// Computes the delay before retry number `retry` (zero-based), without jitter.
    #[must_use]
    pub fn base_delay_for(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
        #[allow(clippy::cast_precision_loss)]
        let raw = self.base_delay_ms as f64 * self.multiplier.powi(exponent);
        let capped = match self.max_delay_ms {
            #[allow(clippy::cast_precision_loss)]
            Some(max) => raw.min(max as f64),
            None => raw,
        };
        if capped.is_finite() && capped >= 0.0 {
            Duration::from_secs_f64(capped.min(u64::MAX as f64) / 1000.0)
        } else {
            Duration::MAX
        }
    }

    /// Computes the delay before retry number `retry`, with jitter applied.
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        let delay = self.base_delay_for(retry);
        match self.jitter {
            JitterStrategy::None => delay,
            JitterStrategy::Full => {
                if delay.is_zero() {
                    delay
                } else {
                    rand::thread_rng().gen_range(Duration::ZERO..=delay)
                }
            }
            JitterStrategy::Equal => {
                let half = delay / 2;
                if half.is_zero() {
                    delay
                } else {
                    half + rand::thread_rng().gen_range(Duration::ZERO..=half)
                }
            }
        }
    }
}

/// Runs `operation` under the retry policy.
///
/// `label` identifies the call in logs.
pub async fn with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut operation: F,
) -> Result<T, AchflowError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CallFailure>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;

        let outcome = match policy.call_timeout() {
            Some(deadline) => match tokio::time::timeout(deadline, operation()).await {
                Ok(result) => result,
                Err(_) => Err(CallFailure::new(
                    FailureClass::Timeout,
                    format!("no response within {}ms", deadline.as_millis()),
                )),
            },
            None => operation().await,
        };

        let failure = match outcome {
            Ok(value) => return Ok(value),
            Err(failure) => failure,
        };

        if !policy.is_retryable(failure.class) {
            tracing::debug!(
                call = %label,
                attempt,
                class = %failure.class,
                "Call failed with non-retryable error"
            );
            return Err(AchflowError::FatalCall {
                attempts: attempt,
                failure,
            });
        }

        if attempt >= max_attempts {
            tracing::warn!(
                call = %label,
                attempts = attempt,
                class = %failure.class,
                error = %failure,
                "Retry budget exhausted"
            );
            return Err(AchflowError::FatalCall {
                attempts: attempt,
                failure,
            });
        }

        let delay = policy.delay_for(attempt - 1);
        tracing::debug!(
            call = %label,
            attempt,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            class = %failure.class,
            error = %failure,
            "Retrying after transient error"
        );
        tokio::time::sleep(delay).await;
    }
}

/// An inference client that retries transient failures.
#[derive(Clone)]
pub struct BackoffClient {
    inner: Arc<dyn InferenceClient>,
    policy: RetryPolicy,
}

impl std::fmt::Debug for BackoffClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackoffClient")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl BackoffClient {
    /// Wraps a client with a retry policy.
    #[must_use]
    pub fn new(inner: Arc<dyn InferenceClient>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    /// Returns the retry policy.
    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Performs the request, retrying transient failures.
    pub async fn generate(
        &self,
        request: &InferenceRequest,
    ) -> Result<InferenceResponse, AchflowError> {
        with_backoff(&self.policy, &request.stage, || self.inner.generate(request)).await
    }
}
