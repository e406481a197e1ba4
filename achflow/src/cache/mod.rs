//! Durable key to (metadata, payload) storage with insert-once semantics.
//!
//! A [`DocumentCache`] never updates a record: inserting under an existing
//! key fails with [`AchflowError::DuplicateKey`], reading an absent key fails
//! with [`AchflowError::NotFound`].

mod file;

pub use file::FileDocumentCache;

use crate::errors::AchflowError;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Free-form document metadata.
pub type Metadata = HashMap<String, serde_json::Value>;

/// A cached document: metadata plus payload.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Document {
    /// Metadata recorded at insert time.
    #[serde(default)]
    pub metadata: Metadata,
    /// The payload, byte-for-byte as inserted.
    pub content: String,
}

impl Document {
    /// Creates a new document.
    #[must_use]
    pub fn new(metadata: Metadata, content: impl Into<String>) -> Self {
        Self {
            metadata,
            content: content.into(),
        }
    }

    /// Returns a metadata value as a string, if it is one.
    #[must_use]
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(serde_json::Value::as_str)
    }
}

/// Contract for document cache backends.
#[async_trait]
pub trait DocumentCache: Send + Sync {
    /// Returns true if a record exists for `key`.
    async fn has(&self, key: &str) -> bool;

    /// Returns the record for `key`.
    async fn get(&self, key: &str) -> Result<Document, AchflowError>;

    /// Stores a new record. Fails if `key` already exists.
    async fn insert(&self, key: &str, metadata: Metadata, content: &str) -> Result<(), AchflowError>;
}

/// Non-durable cache for tests and single-shot runs.
#[derive(Debug, Default)]
pub struct InMemoryDocumentCache {
    documents: Mutex<HashMap<String, Document>>,
}

impl InMemoryDocumentCache {
    /// Creates a new empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.lock().len()
    }

    /// Returns true if the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.lock().is_empty()
    }
}

#[async_trait]
impl DocumentCache for InMemoryDocumentCache {
    async fn has(&self, key: &str) -> bool {
        self.documents.lock().contains_key(key)
    }

    async fn get(&self, key: &str) -> Result<Document, AchflowError> {
        self.documents
            .lock()
            .get(key)
            .cloned()
            .ok_or_else(|| AchflowError::NotFound { key: key.to_string() })
    }

    async fn insert(&self, key: &str, metadata: Metadata, content: &str) -> Result<(), AchflowError> {
        let mut documents = self.documents.lock();
        if documents.contains_key(key) {
            return Err(AchflowError::DuplicateKey { key: key.to_string() });
        }
        documents.insert(key.to_string(), Document::new(metadata, content));
        Ok(())
    }
}
