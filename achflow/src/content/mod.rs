//! Fetch-or-return-cached content resolution.
//!
//! A [`ContentProvider`] resolves an identifier to a [`Document`]. Both
//! providers in this module consult their own [`DocumentCache`] first and only
//! fetch or compute on a miss, so repeated resolution of one identifier does
//! the expensive work once.

mod convert;
mod curated;
mod document;
mod web;

pub use convert::{HtmlTextConverter, TextConverter};
pub use curated::{CuratedContentProvider, DocumentCurator};
pub use document::format_curated_document;
pub use web::{FetchResponse, Fetcher, ReqwestFetcher, WebContentProvider};

#[cfg(test)]
pub use web::MockFetcher;

use crate::cache::{Document, DocumentCache};
use crate::errors::AchflowError;
use async_trait::async_trait;
use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Contract for resolving an identifier to its content.
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Returns the document for `identifier`, fetching it on first use.
    async fn resolve(&self, identifier: &str) -> Result<Document, AchflowError>;
}

/// Per-key async locks.
///
/// An entry lives only while some task holds or awaits its lock.
#[derive(Debug, Default)]
pub struct KeyedLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl KeyedLocks {
    /// Creates an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the lock for `key`, waiting if another task holds it.
    pub async fn lock(&self, key: &str) -> KeyGuard<'_> {
        let lock = self
            .locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        KeyGuard {
            guard: Some(lock.lock_owned().await),
            key: key.to_string(),
            locks: &self.locks,
        }
    }

    /// Returns the number of keys currently locked or awaited.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Returns true if no key is locked or awaited.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Holds one key of a [`KeyedLocks`] table; releases it on drop.
#[must_use = "the key is unlocked as soon as the guard is dropped"]
#[derive(Debug)]
pub struct KeyGuard<'a> {
    guard: Option<OwnedMutexGuard<()>>,
    key: String,
    locks: &'a DashMap<String, Arc<Mutex<()>>>,
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // The table's own handle is the only one left once nobody waits.
        self.locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// A cache plus the per-identifier locks guarding it.
pub(crate) struct CachedResolver {
    cache: Arc<dyn DocumentCache>,
    locks: KeyedLocks,
    label: &'static str,
}

impl CachedResolver {
    pub(crate) fn new(cache: Arc<dyn DocumentCache>, label: &'static str) -> Self {
        Self {
            cache,
            locks: KeyedLocks::new(),
            label,
        }
    }

    /// Returns the cached document, or computes, stores and returns it.
    ///
    /// The identifier's lock is held from the existence check to the insert.
    pub(crate) async fn resolve_with<F, Fut>(
        &self,
        identifier: &str,
        compute: F,
    ) -> Result<Document, AchflowError>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Document, AchflowError>> + Send,
    {
        let _guard = self.locks.lock(identifier).await;

        if self.cache.has(identifier).await {
            tracing::debug!(provider = self.label, identifier = %identifier, "Content cache hit");
            return self.cache.get(identifier).await;
        }

        tracing::debug!(provider = self.label, identifier = %identifier, "Content cache miss");
        let document = compute().await?;
        self.cache
            .insert(identifier, document.metadata.clone(), &document.content)
            .await?;
        Ok(document)
    }
}
