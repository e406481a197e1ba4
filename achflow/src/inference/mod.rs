//! The external inference boundary.
//!
//! A capability stage talks to an external text-generation service through
//! the [`InferenceClient`] trait. The service is unreliable: every failure is
//! reported as a [`CallFailure`] tagged with a [`FailureClass`] so the
//! [`BackoffClient`] can decide whether a retry is worthwhile.

mod backoff;
mod gemini;

pub use backoff::{with_backoff, BackoffClient, JitterStrategy, RetryPolicy};
pub use gemini::GeminiClient;

use crate::tools::{ToolCall, ToolDefinition, ToolResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Classification of a failed external call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// HTTP 429.
    RateLimited,
    /// HTTP 503.
    ServerUnavailable,
    /// HTTP 500.
    ServerError,
    /// HTTP 504.
    GatewayTimeout,
    /// Any other 5xx status.
    OtherServer,
    /// A 4xx status other than 429.
    Client,
    /// The per-call deadline elapsed.
    Timeout,
    /// Connection-level failure (DNS, TLS, reset).
    Transport,
    /// The service answered with something that could not be interpreted.
    Protocol,
    /// A tool invoked during the call failed.
    Tool,
}

impl FailureClass {
    /// Maps an HTTP status code to a failure class.
    #[must_use]
    pub fn from_status(status: u16) -> Self {
        match status {
            429 => Self::RateLimited,
            500 => Self::ServerError,
            503 => Self::ServerUnavailable,
            504 => Self::GatewayTimeout,
            501..=599 => Self::OtherServer,
            _ => Self::Client,
        }
    }
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RateLimited => "rate_limited",
            Self::ServerUnavailable => "server_unavailable",
            Self::ServerError => "server_error",
            Self::GatewayTimeout => "gateway_timeout",
            Self::OtherServer => "other_server",
            Self::Client => "client",
            Self::Timeout => "timeout",
            Self::Transport => "transport",
            Self::Protocol => "protocol",
            Self::Tool => "tool",
        };
        write!(f, "{name}")
    }
}

/// A single failed attempt at an external call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{class} failure{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
pub struct CallFailure {
    /// The failure class.
    pub class: FailureClass,
    /// The HTTP status, if the service answered.
    pub status: Option<u16>,
    /// Failure description.
    pub message: String,
}

impl CallFailure {
    /// Creates a new failure.
    #[must_use]
    pub fn new(class: FailureClass, message: impl Into<String>) -> Self {
        Self {
            class,
            status: None,
            message: message.into(),
        }
    }

    /// Creates a failure from an HTTP status and response body.
    #[must_use]
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        Self::new(FailureClass::from_status(status), message).with_status(status)
    }

    /// Sets the HTTP status.
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

/// One turn of the conversation sent to the inference service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Turn {
    /// Text from the caller.
    User {
        /// The message text.
        text: String,
    },
    /// Tool calls previously requested by the model.
    ToolCalls {
        /// The requested calls.
        calls: Vec<ToolCall>,
    },
    /// Results for the preceding tool calls.
    ToolResults {
        /// The results, one per call.
        results: Vec<ToolResult>,
    },
}

/// A request to the inference service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceRequest {
    /// The name of the stage issuing the request.
    pub stage: String,
    /// Model identifier.
    pub model: String,
    /// Rendered system instruction.
    pub system_instruction: String,
    /// Conversation so far.
    pub turns: Vec<Turn>,
    /// Tools the model may call.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
    /// Schema the response must conform to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<serde_json::Value>,
    /// Sampling temperature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl InferenceRequest {
    /// Creates a request with a single user turn.
    #[must_use]
    pub fn new(
        stage: impl Into<String>,
        model: impl Into<String>,
        system_instruction: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            stage: stage.into(),
            model: model.into(),
            system_instruction: system_instruction.into(),
            turns: vec![Turn::User {
                text: message.into(),
            }],
            tools: Vec::new(),
            response_schema: None,
            temperature: None,
        }
    }

    /// Returns the most recent turn.
    #[must_use]
    pub fn last_turn(&self) -> Option<&Turn> {
        self.turns.last()
    }
}

/// A response from the inference service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InferenceResponse {
    /// The final answer.
    Text {
        /// The response text.
        text: String,
    },
    /// The model wants tools invoked before it answers.
    ToolCalls {
        /// The requested calls, in order.
        calls: Vec<ToolCall>,
    },
}

impl InferenceResponse {
    /// Creates a text response.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Creates a tool call response.
    #[must_use]
    pub fn tool_calls(calls: Vec<ToolCall>) -> Self {
        Self::ToolCalls { calls }
    }
}

/// Contract for calling the external inference service.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Performs a single generation attempt.
    async fn generate(&self, request: &InferenceRequest) -> Result<InferenceResponse, CallFailure>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_class_from_status() {
        assert_eq!(FailureClass::from_status(429), FailureClass::RateLimited);
        assert_eq!(FailureClass::from_status(500), FailureClass::ServerError);
        assert_eq!(FailureClass::from_status(502), FailureClass::OtherServer);
        assert_eq!(FailureClass::from_status(503), FailureClass::ServerUnavailable);
        assert_eq!(FailureClass::from_status(504), FailureClass::GatewayTimeout);
        assert_eq!(FailureClass::from_status(400), FailureClass::Client);
    }

    #[test]
    fn test_call_failure_display() {
        let failure = CallFailure::from_status(503, "overloaded");
        assert_eq!(failure.to_string(), "server_unavailable failure (HTTP 503): overloaded");

        let failure = CallFailure::new(FailureClass::Transport, "connection reset");
        assert_eq!(failure.to_string(), "transport failure: connection reset");
    }

    #[test]
    fn test_failure_class_serialize() {
        let json = serde_json::to_string(&FailureClass::GatewayTimeout).unwrap();
        assert_eq!(json, r#""gateway_timeout""#);
    }

    #[test]
    fn test_request_starts_with_user_turn() {
        let request = InferenceRequest::new("stage", "model", "be brief", "hello");
        assert_eq!(
            request.last_turn(),
            Some(&Turn::User {
                text: "hello".to_string()
            })
        );
    }
}
