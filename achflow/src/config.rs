//! Configuration for an analysis deployment.
//!
//! Everything a run needs is carried by [`AnalysisConfig`] and handed to
//! constructors explicitly. Nothing reads process environment.

use crate::errors::AchflowError;
use crate::inference::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Baseline model identifier used by every stage without an override.
    #[serde(default = "default_model")]
    pub model: String,
    /// Inference service connection.
    #[serde(default)]
    pub inference: InferenceConfig,
    /// Retry policy for inference calls.
    #[serde(default)]
    pub retry: RetryPolicy,
    /// Document cache locations.
    #[serde(default)]
    pub cache: CacheConfig,
    /// HTTP fetching of raw content.
    #[serde(default)]
    pub fetch: FetchConfig,
    /// CSV registry of curated source URLs.
    #[serde(default = "default_sources_path")]
    pub sources_path: PathBuf,
    /// Cap on tool rounds per stage execution. Unbounded when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tool_rounds: Option<usize>,
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_sources_path() -> PathBuf {
    PathBuf::from("data_sources/web_sources.csv")
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            inference: InferenceConfig::default(),
            retry: RetryPolicy::default(),
            cache: CacheConfig::default(),
            fetch: FetchConfig::default(),
            sources_path: default_sources_path(),
            max_tool_rounds: None,
        }
    }
}

impl AnalysisConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration from JSON.
    pub fn from_json_str(json: &str) -> Result<Self, AchflowError> {
        serde_json::from_str(json)
            .map_err(|e| AchflowError::Config(format!("invalid configuration: {e}")))
    }

    /// Reads a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, AchflowError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AchflowError::Config(format!("cannot read configuration {}: {e}", path.display()))
        })?;
        Self::from_json_str(&raw)
    }

    /// Sets the baseline model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the inference configuration.
    #[must_use]
    pub fn with_inference(mut self, inference: InferenceConfig) -> Self {
        self.inference = inference;
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the cache configuration.
    #[must_use]
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// Sets the fetch configuration.
    #[must_use]
    pub fn with_fetch(mut self, fetch: FetchConfig) -> Self {
        self.fetch = fetch;
        self
    }

    /// Sets the source registry path.
    #[must_use]
    pub fn with_sources_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources_path = path.into();
        self
    }

    /// Caps tool rounds per stage execution.
    #[must_use]
    pub fn with_max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = Some(rounds);
        self
    }

    /// Checks the configuration for values no run could succeed with.
    pub fn validate(&self) -> Result<(), AchflowError> {
        if self.model.trim().is_empty() {
            return Err(AchflowError::Config("model must not be empty".to_string()));
        }
        self.inference.validate()?;
        self.retry.validate()?;
        self.fetch.validate()?;
        if self.cache.raw_root == self.cache.curated_root {
            return Err(AchflowError::Config(format!(
                "raw and curated caches must use different roots, both are {}",
                self.cache.raw_root.display()
            )));
        }
        if self.max_tool_rounds == Some(0) {
            return Err(AchflowError::Config(
                "max_tool_rounds must be at least 1 when set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Connection settings for the inference service.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Base URL of the service.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// API key. Never serialized.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// HTTP timeout for one request, in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_request_timeout() -> u64 {
    120
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

impl std::fmt::Debug for InferenceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .finish()
    }
}

impl InferenceConfig {
    /// Sets the API key.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn validate(&self) -> Result<(), AchflowError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(AchflowError::Config(format!(
                "inference base_url '{}' is not an http(s) URL",
                self.base_url
            )));
        }
        if self.request_timeout_seconds == 0 {
            return Err(AchflowError::Config(
                "inference request_timeout_seconds must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Storage roots of the two cache tiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Root of the raw fetched-content cache.
    #[serde(default = "default_raw_root")]
    pub raw_root: PathBuf,
    /// Root of the curated-document cache.
    #[serde(default = "default_curated_root")]
    pub curated_root: PathBuf,
}

fn default_raw_root() -> PathBuf {
    PathBuf::from("./cache/raw")
}

fn default_curated_root() -> PathBuf {
    PathBuf::from("./cache/curated")
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            raw_root: default_raw_root(),
            curated_root: default_curated_root(),
        }
    }
}

impl CacheConfig {
    /// Places both tiers under `root`.
    #[must_use]
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            raw_root: root.join("raw"),
            curated_root: root.join("curated"),
        }
    }
}

/// Configuration for HTTP fetching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    /// Maximum number of redirects to follow.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    /// User agent string.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Additional headers to include.
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

fn default_timeout() -> u64 {
    30
}

fn default_max_redirects() -> usize {
    10
}

fn default_user_agent() -> String {
    format!("achflow/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            max_redirects: default_max_redirects(),
            user_agent: default_user_agent(),
            headers: HashMap::new(),
        }
    }
}

impl FetchConfig {
    /// Sets the timeout.
    #[must_use]
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Sets the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    fn validate(&self) -> Result<(), AchflowError> {
        if self.timeout_seconds == 0 {
            return Err(AchflowError::Config(
                "fetch timeout_seconds must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::FailureClass;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.base_delay_ms, 10_000);
        assert!(config.retry.is_retryable(FailureClass::RateLimited));
        assert_eq!(config.cache.raw_root, PathBuf::from("./cache/raw"));
        assert_eq!(config.fetch.timeout_seconds, 30);
        assert!(config.max_tool_rounds.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = AnalysisConfig::from_json_str(
            r#"{
                "model": "gemini-2.5-pro",
                "inference": {"api_key": "secret"},
                "retry": {"max_attempts": 3},
                "max_tool_rounds": 12
            }"#,
        )
        .unwrap();

        assert_eq!(config.model, "gemini-2.5-pro");
        assert_eq!(config.inference.api_key.as_deref(), Some("secret"));
        assert_eq!(config.inference.request_timeout_seconds, 120);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.multiplier, 7.0);
        assert_eq!(config.max_tool_rounds, Some(12));
    }

    #[test]
    fn test_api_key_is_not_serialized() {
        let config = AnalysisConfig::default()
            .with_inference(InferenceConfig::default().with_api_key("secret"));
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
        assert!(!format!("{config:?}").contains("secret"));
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"sources_path": "sources.csv"}"#).unwrap();

        let config = AnalysisConfig::from_json_file(&path).unwrap();
        assert_eq!(config.sources_path, PathBuf::from("sources.csv"));

        let err = AnalysisConfig::from_json_file(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, AchflowError::Config(_)));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let same_roots = AnalysisConfig::default().with_cache(CacheConfig {
            raw_root: PathBuf::from("c"),
            curated_root: PathBuf::from("c"),
        });
        assert!(same_roots.validate().is_err());

        let zero_rounds = AnalysisConfig::default().with_max_tool_rounds(0);
        assert!(zero_rounds.validate().is_err());

        let bad_url = AnalysisConfig::default()
            .with_inference(InferenceConfig::default().with_base_url("ftp://x"));
        assert!(bad_url.validate().is_err());

        let bad_retry =
            AnalysisConfig::default().with_retry(RetryPolicy::new().with_max_attempts(0));
        assert!(bad_retry.validate().is_err());
    }

    #[test]
    fn test_cache_under_root() {
        let cache = CacheConfig::under("/tmp/x");
        assert_eq!(cache.raw_root, PathBuf::from("/tmp/x/raw"));
        assert_eq!(cache.curated_root, PathBuf::from("/tmp/x/curated"));
    }
}
