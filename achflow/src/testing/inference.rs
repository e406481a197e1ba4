//! Scripted inference service.

use crate::inference::{
    CallFailure, FailureClass, InferenceClient, InferenceRequest, InferenceResponse,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;

type Responder =
    Box<dyn Fn(&InferenceRequest) -> Result<InferenceResponse, CallFailure> + Send + Sync>;

/// An [`InferenceClient`] answering from a closure or a fixed script.
///
/// Every request is recorded, so tests can assert on rendered instructions,
/// declared tools and the turns fed back after tool calls.
pub struct ScriptedInference {
    responder: Responder,
    requests: Mutex<Vec<InferenceRequest>>,
}

impl ScriptedInference {
    /// Answers every request with `responder`.
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&InferenceRequest) -> Result<InferenceResponse, CallFailure> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answers requests with `responses`, in order.
    ///
    /// Once the script runs out every call fails with a non-retryable
    /// protocol failure.
    #[must_use]
    pub fn from_responses(responses: Vec<Result<InferenceResponse, CallFailure>>) -> Self {
        let script = Mutex::new(VecDeque::from(responses));
        Self::new(move |_| {
            script.lock().pop_front().unwrap_or_else(|| {
                Err(CallFailure::new(
                    FailureClass::Protocol,
                    "no scripted response left",
                ))
            })
        })
    }

    /// Returns how many attempts were made.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Returns every request received, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<InferenceRequest> {
        self.requests.lock().clone()
    }

    /// Returns how many attempts came from `stage`.
    #[must_use]
    pub fn calls_for(&self, stage: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|request| request.stage == stage)
            .count()
    }
}

impl std::fmt::Debug for ScriptedInference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedInference")
            .field("calls", &self.call_count())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl InferenceClient for ScriptedInference {
    async fn generate(&self, request: &InferenceRequest) -> Result<InferenceResponse, CallFailure> {
        self.requests.lock().push(request.clone());
        (self.responder)(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_script_runs_out() {
        let inference = ScriptedInference::from_responses(vec![Ok(InferenceResponse::text("a"))]);
        let request = InferenceRequest::new("s", "m", "", "hi");

        assert_eq!(inference.generate(&request).await, Ok(InferenceResponse::text("a")));
        let failure = inference.generate(&request).await.unwrap_err();
        assert_eq!(failure.class, FailureClass::Protocol);
        assert_eq!(inference.call_count(), 2);
        assert_eq!(inference.calls_for("s"), 2);
    }
}
