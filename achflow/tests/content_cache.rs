//! Content providers over the file-backed cache under concurrent use.

use achflow::cache::{DocumentCache, FileDocumentCache};
use achflow::content::{ContentProvider, WebContentProvider};
use achflow::errors::AchflowError;
use achflow::testing::CountingFetcher;
use futures::future::join_all;
use std::sync::Arc;
use tempfile::TempDir;

const URL: &str = "https://news.example/a";
const PAGE: &str = "<html><head><title>Shared</title></head><body><p>Body</p></body></html>";

async fn provider(dir: &TempDir, fetcher: Arc<CountingFetcher>) -> WebContentProvider {
    let cache = FileDocumentCache::open(dir.path()).await.unwrap();
    WebContentProvider::new(fetcher, Arc::new(cache))
}

#[tokio::test]
async fn test_concurrent_resolves_fetch_once() {
    let dir = TempDir::new().unwrap();
    let fetcher = Arc::new(CountingFetcher::new().with_page(URL, PAGE));
    let provider = provider(&dir, fetcher.clone()).await;

    let documents = join_all((0..8).map(|_| provider.resolve(URL))).await;

    let first = documents[0].as_ref().unwrap();
    for document in &documents {
        assert_eq!(document.as_ref().unwrap(), first);
    }
    assert_eq!(first.content, PAGE);
    assert_eq!(first.metadata_str("title"), Some("Shared"));
    assert_eq!(fetcher.calls(URL), 1);
}

#[tokio::test]
async fn test_cached_page_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let first = provider(&dir, Arc::new(CountingFetcher::new().with_page(URL, PAGE))).await;
    let original = first.resolve(URL).await.unwrap();

    let fetcher = Arc::new(CountingFetcher::new());
    let second = provider(&dir, fetcher.clone()).await;
    let reloaded = second.resolve(URL).await.unwrap();

    assert_eq!(reloaded, original);
    assert_eq!(fetcher.total_calls(), 0);
}

#[tokio::test]
async fn test_failed_fetch_is_not_cached() {
    let dir = TempDir::new().unwrap();
    let fetcher = Arc::new(CountingFetcher::new());
    let provider = provider(&dir, fetcher.clone()).await;

    for _ in 0..2 {
        let err = provider.resolve(URL).await.unwrap_err();
        assert!(matches!(err, AchflowError::Fetch { status: Some(404), .. }));
    }
    assert_eq!(fetcher.calls(URL), 2);

    let cache = FileDocumentCache::open(dir.path()).await.unwrap();
    assert!(!cache.has(URL).await);
}
