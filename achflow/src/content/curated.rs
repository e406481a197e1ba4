//! Curated content: raw content run through a curation pipeline.

use super::{CachedResolver, ContentProvider};
use crate::cache::{Document, DocumentCache};
use crate::errors::AchflowError;
use async_trait::async_trait;
use std::sync::Arc;

/// Computes the curated form of a resource.
///
/// The returned metadata carries `url`, `title`, `authors`, `keywords` and
/// `summary`; the content is the cleaned-up text.
#[async_trait]
pub trait DocumentCurator: Send + Sync {
    /// Curates the resource at `url`.
    async fn curate(&self, url: &str) -> Result<Document, AchflowError>;
}

/// Content provider returning curated documents, cached independently of
/// the raw tier.
pub struct CuratedContentProvider {
    curator: Arc<dyn DocumentCurator>,
    resolver: CachedResolver,
}

impl CuratedContentProvider {
    /// Creates a provider over a curator and the curated cache.
    #[must_use]
    pub fn new(curator: Arc<dyn DocumentCurator>, cache: Arc<dyn DocumentCache>) -> Self {
        Self {
            curator,
            resolver: CachedResolver::new(cache, "curated"),
        }
    }
}

impl std::fmt::Debug for CuratedContentProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CuratedContentProvider").finish_non_exhaustive()
    }
}

#[async_trait]
impl ContentProvider for CuratedContentProvider {
    async fn resolve(&self, identifier: &str) -> Result<Document, AchflowError> {
        self.resolver
            .resolve_with(identifier, || async {
                tracing::info!(url = %identifier, "Curating document");
                self.curator.curate(identifier).await
            })
            .await
    }
}
