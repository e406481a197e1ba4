//! Error types for the achflow crate.
//!
//! The taxonomy mirrors the failure classes a pipeline run can hit: calls to
//! the external inference service, structured-output contract violations,
//! document cache contract violations, content fetch failures and builder
//! validation errors.

use crate::context::ContextSnapshot;
use crate::inference::CallFailure;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// The main error type for achflow operations.
#[derive(Debug, Error)]
pub enum AchflowError {
    /// An external call failed and will not be retried any further.
    #[error("Fatal call error after {attempts} attempt(s): {failure}")]
    FatalCall {
        /// Number of attempts made before giving up.
        attempts: u32,
        /// The last observed failure.
        failure: CallFailure,
    },

    /// A structured response did not conform to the stage's output contract.
    #[error("Schema violation in stage '{stage}': {message}")]
    SchemaViolation {
        /// The stage whose response was rejected.
        stage: String,
        /// Parser diagnostics.
        message: String,
    },

    /// A stage required non-empty output but none was produced.
    #[error("Stage '{stage}' produced an empty result")]
    EmptyResult {
        /// The stage name.
        stage: String,
    },

    /// A template referenced a context key that is not present.
    #[error("Stage '{stage}' requires context key '{key}' which is not present")]
    MissingInput {
        /// The stage name.
        stage: String,
        /// The missing key.
        key: String,
    },

    /// A document was inserted under a key that already exists.
    #[error("Document is already in the cache for key '{key}'")]
    DuplicateKey {
        /// The duplicated key.
        key: String,
    },

    /// A document was requested under a key that does not exist.
    #[error("Document is not in the cache for key '{key}'")]
    NotFound {
        /// The missing key.
        key: String,
    },

    /// A remote resource could not be fetched.
    #[error("Failed to retrieve content from {identifier}: {message}")]
    Fetch {
        /// The resource identifier (usually a URL).
        identifier: String,
        /// HTTP status, when the remote answered.
        status: Option<u16>,
        /// Failure description.
        message: String,
    },

    /// A nested pipeline run failed.
    #[error("{0}")]
    Pipeline(Box<PipelineFailure>),

    /// A pipeline validation error occurred.
    #[error("{0}")]
    Validation(#[from] PipelineValidationError),

    /// A context key was written twice.
    #[error("{0}")]
    DataConflict(#[from] DataConflictError),

    /// A tool-related error.
    #[error("{0}")]
    Tool(#[from] ToolError),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AchflowError {
    /// Creates a fetch error for a non-success HTTP status.
    #[must_use]
    pub fn fetch_status(identifier: impl Into<String>, status: u16) -> Self {
        Self::Fetch {
            identifier: identifier.into(),
            status: Some(status),
            message: format!("Status: {status}"),
        }
    }

    /// Creates a fetch error for a transport failure.
    #[must_use]
    pub fn fetch_transport(identifier: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fetch {
            identifier: identifier.into(),
            status: None,
            message: message.into(),
        }
    }

    /// Returns a short, stable name for the error kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FatalCall { .. } => "fatal_call",
            Self::SchemaViolation { .. } => "schema_violation",
            Self::EmptyResult { .. } => "empty_result",
            Self::MissingInput { .. } => "missing_input",
            Self::DuplicateKey { .. } => "duplicate_key",
            Self::NotFound { .. } => "not_found",
            Self::Fetch { .. } => "fetch",
            Self::Pipeline(_) => "pipeline",
            Self::Validation(_) => "validation",
            Self::DataConflict(_) => "data_conflict",
            Self::Tool(_) => "tool",
            Self::Config(_) => "config",
            Self::Serialization(_) => "serialization",
            Self::Io(_) => "io",
        }
    }
}

impl From<serde_json::Error> for AchflowError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<PipelineFailure> for AchflowError {
    fn from(failure: PipelineFailure) -> Self {
        Self::Pipeline(Box::new(failure))
    }
}

impl From<Box<PipelineFailure>> for AchflowError {
    fn from(failure: Box<PipelineFailure>) -> Self {
        Self::Pipeline(failure)
    }
}

/// A failed pipeline run.
///
/// Carries the failing stage and the context accumulated up to the failure
/// so the run can be diagnosed without re-running completed stages.
#[derive(Debug, Error)]
#[error("Pipeline '{pipeline}' failed at stage '{stage}' (#{index}): {error}")]
pub struct PipelineFailure {
    /// The pipeline name.
    pub pipeline: String,
    /// The failing stage name.
    pub stage: String,
    /// The failing stage's position in the chain.
    pub index: usize,
    /// The stage error.
    #[source]
    pub error: AchflowError,
    /// The context accumulated before the failure.
    pub context: ContextSnapshot,
}

/// Metadata about a contract error for better diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ContractErrorInfo {
    /// Error code (e.g., "CONTRACT-004-MISSING_DEP").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl ContractErrorInfo {
    /// Creates a new contract error info.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            summary: summary.into(),
            fix_hint: None,
            context: HashMap::new(),
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// Error raised when pipeline validation fails.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PipelineValidationError {
    /// The error message.
    pub message: String,
    /// The stages involved in the error.
    pub stages: Vec<String>,
    /// Optional contract error info.
    pub error_info: Option<ContractErrorInfo>,
}

impl PipelineValidationError {
    /// Creates a new pipeline validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stages: Vec::new(),
            error_info: None,
        }
    }

    /// Sets the stages involved.
    #[must_use]
    pub fn with_stages(mut self, stages: Vec<String>) -> Self {
        self.stages = stages;
        self
    }

    /// Sets the contract error info.
    #[must_use]
    pub fn with_error_info(mut self, info: ContractErrorInfo) -> Self {
        self.error_info = Some(info);
        self
    }

    /// Returns the contract error code, if any.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.error_info.as_ref().map(|info| info.code.as_str())
    }
}

/// Error raised when writing to an existing key in a context bag.
#[derive(Debug, Clone, Error)]
#[error("Data conflict: key '{key}' already exists")]
pub struct DataConflictError {
    /// The conflicting key.
    pub key: String,
}

impl DataConflictError {
    /// Creates a new data conflict error.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

/// Errors related to tool registration and execution.
#[derive(Debug, Clone, Error)]
pub enum ToolError {
    /// Tool was not found in the tool set.
    #[error("Tool not found: {name}")]
    NotFound {
        /// The tool name.
        name: String,
    },

    /// A tool with the same name is already registered.
    #[error("Tool already registered: {name}")]
    Duplicate {
        /// The tool name.
        name: String,
    },

    /// The tool was called with an unusable argument.
    #[error("Invalid argument for tool {name}: {reason}")]
    InvalidArgument {
        /// The tool name.
        name: String,
        /// Why the argument was rejected.
        reason: String,
    },

    /// Tool execution failed.
    #[error("Tool execution failed: {name} - {reason}")]
    ExecutionFailed {
        /// The tool name.
        name: String,
        /// The reason for failure.
        reason: String,
    },
}

impl ToolError {
    /// Creates a tool not found error.
    #[must_use]
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Creates an execution failed error.
    #[must_use]
    pub fn execution_failed(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ExecutionFailed {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Returns the name of the tool involved.
    #[must_use]
    pub fn tool_name(&self) -> &str {
        match self {
            Self::NotFound { name }
            | Self::Duplicate { name }
            | Self::InvalidArgument { name, .. }
            | Self::ExecutionFailed { name, .. } => name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::{CallFailure, FailureClass};

    #[test]
    fn test_contract_error_info_creation() {
        let info = ContractErrorInfo::new("TEST-001", "Test error")
            .with_fix_hint("Fix this by doing that")
            .with_context_entry("stage", "my_stage");

        assert_eq!(info.code, "TEST-001");
        assert_eq!(info.fix_hint, Some("Fix this by doing that".to_string()));
        assert_eq!(info.context.get("stage"), Some(&"my_stage".to_string()));
    }

    #[test]
    fn test_validation_error_code() {
        let err = PipelineValidationError::new("bad")
            .with_error_info(ContractErrorInfo::new("CONTRACT-004-EMPTY", "empty"));
        assert_eq!(err.code(), Some("CONTRACT-004-EMPTY"));
        assert_eq!(PipelineValidationError::new("bad").code(), None);
    }

    #[test]
    fn test_fatal_call_display() {
        let err = AchflowError::FatalCall {
            attempts: 5,
            failure: CallFailure::new(FailureClass::RateLimited, "quota exhausted").with_status(429),
        };
        let message = err.to_string();
        assert!(message.contains("5 attempt(s)"));
        assert!(message.contains("quota exhausted"));
        assert_eq!(err.kind(), "fatal_call");
    }

    #[test]
    fn test_fetch_status_error() {
        let err = AchflowError::fetch_status("https://example.com", 404);
        assert!(matches!(err, AchflowError::Fetch { status: Some(404), .. }));
        assert!(err.to_string().contains("Status: 404"));
    }

    #[test]
    fn test_tool_error_name() {
        assert_eq!(ToolError::not_found("fetch").tool_name(), "fetch");
        assert_eq!(ToolError::execution_failed("fetch", "boom").tool_name(), "fetch");
    }
}
