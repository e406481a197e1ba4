//! In-memory fetcher that counts requests.

use crate::content::{FetchResponse, Fetcher};
use crate::errors::AchflowError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

/// A [`Fetcher`] serving canned pages and counting every fetch per URL.
///
/// Unknown URLs answer 404.
#[derive(Debug, Default)]
pub struct CountingFetcher {
    pages: HashMap<String, FetchResponse>,
    calls: Mutex<HashMap<String, usize>>,
}

impl CountingFetcher {
    /// Creates a fetcher with no pages.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `body` with status 200 for `url`.
    #[must_use]
    pub fn with_page(self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.with_response(url, FetchResponse::new(200, body))
    }

    /// Serves `response` for `url`.
    #[must_use]
    pub fn with_response(mut self, url: impl Into<String>, response: FetchResponse) -> Self {
        self.pages.insert(url.into(), response);
        self
    }

    /// Returns how often `url` was fetched.
    #[must_use]
    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().get(url).copied().unwrap_or(0)
    }

    /// Returns the total number of fetches.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.calls.lock().values().sum()
    }
}

#[async_trait]
impl Fetcher for CountingFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchResponse, AchflowError> {
        *self.calls.lock().entry(url.to_string()).or_insert(0) += 1;
        Ok(self
            .pages
            .get(url)
            .cloned()
            .unwrap_or_else(|| FetchResponse::new(404, "")))
    }
}
