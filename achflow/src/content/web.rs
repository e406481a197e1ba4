//! Raw web content: fetch over HTTP, cache the body.

use super::{CachedResolver, ContentProvider};
use crate::cache::{Document, DocumentCache, Metadata};
use crate::config::FetchConfig;
use crate::errors::AchflowError;
use async_trait::async_trait;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

static TITLE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"(?is)<title>(.*?)</title>").expect("valid title regex")
});

const UNTITLED: &str = "Untitled";

/// A fetched HTTP response.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FetchResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers, names lowercased.
    pub headers: HashMap<String, String>,
    /// Response body as text.
    pub body: String,
}

impl FetchResponse {
    /// Creates a response with no headers.
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Looks up a header, case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// Contract for the network fetch collaborator.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Performs a GET for `url`. Non-success statuses are returned, not raised.
    async fn fetch(&self, url: &str) -> Result<FetchResponse, AchflowError>;
}

/// `reqwest`-backed fetcher.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    http: reqwest::Client,
}

impl ReqwestFetcher {
    /// Builds a fetcher from the fetch configuration.
    pub fn new(config: &FetchConfig) -> Result<Self, AchflowError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| AchflowError::Config(format!("invalid header name '{name}': {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| AchflowError::Config(format!("invalid header value: {e}")))?;
            headers.insert(name, value);
        }
        let user_agent = HeaderValue::from_str(&config.user_agent)
            .map_err(|e| AchflowError::Config(format!("invalid user agent: {e}")))?;
        headers.insert(USER_AGENT, user_agent);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .default_headers(headers)
            .build()
            .map_err(|e| AchflowError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http })
    }
}

#[async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchResponse, AchflowError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| AchflowError::fetch_transport(url, e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = response
            .text()
            .await
            .map_err(|e| AchflowError::fetch_transport(url, e.to_string()))?;

        Ok(FetchResponse {
            status,
            headers,
            body,
        })
    }
}

/// Derives `{title, time}` metadata from a fetched page.
///
/// The title is the first `<title>` element, trimmed, or `"Untitled"`. The
/// time is `Last-Modified`, else `Date`, else the local time of the fetch.
#[must_use]
pub fn page_metadata(response: &FetchResponse) -> Metadata {
    let title = TITLE_PATTERN
        .captures(&response.body)
        .and_then(|caps| caps.get(1))
        .map_or_else(|| UNTITLED.to_string(), |m| m.as_str().trim().to_string());

    let time = response
        .header("last-modified")
        .or_else(|| response.header("date"))
        .map_or_else(
            || {
                chrono::Local::now()
                    .format("%Y-%m-%d %H:%M:%S%.6f")
                    .to_string()
            },
            str::to_string,
        );

    let mut metadata = Metadata::new();
    metadata.insert("title".to_string(), Value::String(title));
    metadata.insert("time".to_string(), Value::String(time));
    metadata
}

/// Raw content provider backed by a network fetcher.
pub struct WebContentProvider {
    fetcher: Arc<dyn Fetcher>,
    resolver: CachedResolver,
}

impl WebContentProvider {
    /// Creates a provider over a fetcher and the raw cache.
    #[must_use]
    pub fn new(fetcher: Arc<dyn Fetcher>, cache: Arc<dyn DocumentCache>) -> Self {
        Self {
            fetcher,
            resolver: CachedResolver::new(cache, "raw"),
        }
    }

    async fn fetch_document(&self, url: &str) -> Result<Document, AchflowError> {
        let response = self.fetcher.fetch(url).await?;
        if response.status != 200 {
            return Err(AchflowError::fetch_status(url, response.status));
        }
        Ok(Document::new(page_metadata(&response), response.body))
    }
}

impl std::fmt::Debug for WebContentProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebContentProvider").finish_non_exhaustive()
    }
}

#[async_trait]
impl ContentProvider for WebContentProvider {
    async fn resolve(&self, identifier: &str) -> Result<Document, AchflowError> {
        self.resolver
            .resolve_with(identifier, || self.fetch_document(identifier))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryDocumentCache;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_title_extraction_is_case_insensitive_and_multiline() {
        let response = FetchResponse::new(200, "<html><TITLE>\n  Hello\n World </TITLE></html>");
        let metadata = page_metadata(&response);
        assert_eq!(metadata["title"], "Hello\n World");
    }

    #[test]
    fn test_missing_title_defaults() {
        let metadata = page_metadata(&FetchResponse::new(200, "<p>no title</p>"));
        assert_eq!(metadata["title"], "Untitled");
    }

    #[test]
    fn test_time_prefers_last_modified_then_date() {
        let response = FetchResponse::new(200, "")
            .with_header("Date", "Tue, 02 Jan 2024 00:00:00 GMT")
            .with_header("Last-Modified", "Mon, 01 Jan 2024 00:00:00 GMT");
        assert_eq!(page_metadata(&response)["time"], "Mon, 01 Jan 2024 00:00:00 GMT");

        let response = FetchResponse::new(200, "").with_header("Date", "Tue, 02 Jan 2024 00:00:00 GMT");
        assert_eq!(page_metadata(&response)["time"], "Tue, 02 Jan 2024 00:00:00 GMT");

        let response = FetchResponse::new(200, "");
        assert!(!page_metadata(&response)["time"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_fetches_once() {
        let mut fetcher = MockFetcher::new();
        fetcher
            .expect_fetch()
            .times(1)
            .returning(|_| Ok(FetchResponse::new(200, "<title>Page</title>body")));

        let provider = WebContentProvider::new(Arc::new(fetcher), Arc::new(InMemoryDocumentCache::new()));

        let first = provider.resolve("https://a.example").await.unwrap();
        let second = provider.resolve("https://a.example").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.metadata_str("title"), Some("Page"));
        assert_eq!(first.content, "<title>Page</title>body");
    }

    #[tokio::test]
    async fn test_non_success_status_is_fetch_error() {
        let mut fetcher = MockFetcher::new();
        fetcher
            .expect_fetch()
            .returning(|_| Ok(FetchResponse::new(404, "missing")));
        let cache = Arc::new(InMemoryDocumentCache::new());
        let provider = WebContentProvider::new(Arc::new(fetcher), cache.clone());

        let err = provider.resolve("https://a.example").await.unwrap_err();
        assert!(matches!(err, AchflowError::Fetch { status: Some(404), .. }));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_reqwest_fetcher_against_mock_server() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/article"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Last-Modified", "Mon, 01 Jan 2024 00:00:00 GMT")
                    .set_body_string("<title>Article</title><p>text</p>"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = ReqwestFetcher::new(&FetchConfig::default()).unwrap();
        let provider = WebContentProvider::new(Arc::new(fetcher), Arc::new(InMemoryDocumentCache::new()));
        let url = format!("{}/article", server.uri());

        let doc = provider.resolve(&url).await.unwrap();
        provider.resolve(&url).await.unwrap();

        assert_eq!(doc.metadata_str("title"), Some("Article"));
        assert_eq!(doc.metadata_str("time"), Some("Mon, 01 Jan 2024 00:00:00 GMT"));
    }
}
