//! File-backed document cache.
//!
//! Layout under the cache root:
//!
//! ```text
//! <root>/index.json        {"records": [{"id", "file_name", "metadata"}, ...]}
//! <root>/content/<uuid>    one payload file per record
//! ```
//!
//! The payload file name is generated, so logical keys (usually URLs) never
//! leak into physical paths.

use super::{Document, DocumentCache, Metadata};
use crate::errors::AchflowError;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, Weak};
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

const INDEX_FILE: &str = "index.json";
const CONTENT_DIR: &str = "content";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexRecord {
    id: String,
    file_name: String,
    #[serde(default)]
    metadata: Metadata,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct IndexFile {
    #[serde(default)]
    records: Vec<IndexRecord>,
}

#[derive(Debug, Default)]
struct Index {
    records: Vec<IndexRecord>,
    positions: HashMap<String, usize>,
}

impl Index {
    fn from_records(records: Vec<IndexRecord>) -> Self {
        let positions = records
            .iter()
            .enumerate()
            .map(|(i, record)| (record.id.clone(), i))
            .collect();
        Self { records, positions }
    }

    fn get(&self, key: &str) -> Option<&IndexRecord> {
        self.positions.get(key).map(|&i| &self.records[i])
    }

    fn push(&mut self, record: IndexRecord) {
        self.positions.insert(record.id.clone(), self.records.len());
        self.records.push(record);
    }

    fn pop(&mut self) {
        if let Some(record) = self.records.pop() {
            self.positions.remove(&record.id);
        }
    }
}

type SharedIndex = Arc<Mutex<Index>>;

// Handles opened on the same root share one index lock.
static OPEN_ROOTS: LazyLock<DashMap<PathBuf, Weak<Mutex<Index>>>> = LazyLock::new(DashMap::new);

fn shared_index(root: &Path) -> SharedIndex {
    OPEN_ROOTS.retain(|_, index| index.strong_count() > 0);
    let mut entry = OPEN_ROOTS.entry(root.to_path_buf()).or_default();
    if let Some(index) = entry.upgrade() {
        return index;
    }
    let index = Arc::new(Mutex::new(Index::default()));
    *entry = Arc::downgrade(&index);
    index
}

/// A document cache persisted under a directory.
///
/// The index file is re-read under the lock before every lookup and insert,
/// so `insert` stays an atomic create-if-absent across every handle opened
/// on the same root in this process, and sees records written by handles
/// that have since been dropped.
#[derive(Debug)]
pub struct FileDocumentCache {
    root: PathBuf,
    index: SharedIndex,
}

impl FileDocumentCache {
    /// Opens (or creates) a cache rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, AchflowError> {
        let root = root.into();
        tokio::fs::create_dir_all(root.join(CONTENT_DIR)).await?;
        let root = tokio::fs::canonicalize(&root).await?;

        let index = shared_index(&root);
        let records = {
            let mut guard = index.lock().await;
            *guard = Index::from_records(Self::read_records(&root).await?);
            guard.records.len()
        };

        tracing::debug!(root = %root.display(), records, "Opened document cache");

        Ok(Self { root, index })
    }

    /// Returns the cache root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the number of records.
    pub async fn len(&self) -> usize {
        self.locked_index().await.records.len()
    }

    /// Returns true if the cache holds no records.
    pub async fn is_empty(&self) -> bool {
        self.locked_index().await.records.is_empty()
    }

    fn content_path(&self, file_name: &str) -> PathBuf {
        self.root.join(CONTENT_DIR).join(file_name)
    }

    async fn read_records(root: &Path) -> Result<Vec<IndexRecord>, AchflowError> {
        match tokio::fs::read(root.join(INDEX_FILE)).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Vec::new()),
            Ok(bytes) => Ok(serde_json::from_slice::<IndexFile>(&bytes)?.records),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Locks the index and brings it up to date with the index file.
    async fn refreshed_index(&self) -> Result<MutexGuard<'_, Index>, AchflowError> {
        let mut index = self.index.lock().await;
        *index = Index::from_records(Self::read_records(&self.root).await?);
        Ok(index)
    }

    /// Like [`Self::refreshed_index`], falling back to the last view read.
    async fn locked_index(&self) -> MutexGuard<'_, Index> {
        let mut index = self.index.lock().await;
        match Self::read_records(&self.root).await {
            Ok(records) => *index = Index::from_records(records),
            Err(e) => tracing::warn!(
                root = %self.root.display(),
                error = %e,
                "Failed to re-read cache index"
            ),
        }
        index
    }

    async fn write_durably(path: &Path, bytes: &[u8]) -> Result<(), std::io::Error> {
        let mut file = tokio::fs::File::create(path).await?;
        file.write_all(bytes).await?;
        file.sync_all().await
    }

    /// Writes a new file, removing whatever was written if the write fails.
    async fn write_new(path: &Path, bytes: &[u8]) -> Result<(), std::io::Error> {
        if let Err(e) = Self::write_durably(path, bytes).await {
            Self::remove_quietly(path).await;
            return Err(e);
        }
        Ok(())
    }

    async fn remove_quietly(path: &Path) {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %path.display(),
                error = %e,
                "Failed to remove orphaned file"
            ),
        }
    }

    /// Flushes directory entries created or renamed under `dir`.
    #[cfg(unix)]
    async fn sync_dir(dir: &Path) -> Result<(), std::io::Error> {
        tokio::fs::File::open(dir).await?.sync_all().await
    }

    #[cfg(not(unix))]
    async fn sync_dir(_dir: &Path) -> Result<(), std::io::Error> {
        Ok(())
    }

    async fn persist_index(&self, index: &Index) -> Result<(), AchflowError> {
        let body = serde_json::to_vec_pretty(&IndexFile {
            records: index.records.clone(),
        })?;
        let tmp = self.root.join(format!("{INDEX_FILE}.{}.tmp", Uuid::new_v4()));
        Self::write_new(&tmp, &body).await?;
        if let Err(e) = tokio::fs::rename(&tmp, self.root.join(INDEX_FILE)).await {
            Self::remove_quietly(&tmp).await;
            return Err(e.into());
        }
        if let Err(e) = Self::sync_dir(&self.root).await {
            // The rename already happened, so the record is visible.
            tracing::warn!(root = %self.root.display(), error = %e, "Failed to sync cache root");
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentCache for FileDocumentCache {
    async fn has(&self, key: &str) -> bool {
        self.locked_index().await.get(key).is_some()
    }

    async fn get(&self, key: &str) -> Result<Document, AchflowError> {
        let record = self
            .refreshed_index()
            .await?
            .get(key)
            .cloned()
            .ok_or_else(|| AchflowError::NotFound { key: key.to_string() })?;

        let content = tokio::fs::read_to_string(self.content_path(&record.file_name)).await?;
        tracing::debug!(key = %key, root = %self.root.display(), "Cache hit");
        Ok(Document::new(record.metadata, content))
    }

    async fn insert(&self, key: &str, metadata: Metadata, content: &str) -> Result<(), AchflowError> {
        let mut index = self.refreshed_index().await?;
        if index.get(key).is_some() {
            return Err(AchflowError::DuplicateKey { key: key.to_string() });
        }

        let file_name = Uuid::new_v4().to_string();
        let content_path = self.content_path(&file_name);
        Self::write_new(&content_path, content.as_bytes()).await?;
        if let Err(e) = Self::sync_dir(&self.root.join(CONTENT_DIR)).await {
            Self::remove_quietly(&content_path).await;
            return Err(e.into());
        }

        index.push(IndexRecord {
            id: key.to_string(),
            file_name,
            metadata,
        });

        if let Err(e) = self.persist_index(&index).await {
            index.pop();
            Self::remove_quietly(&content_path).await;
            return Err(e);
        }

        tracing::debug!(key = %key, root = %self.root.display(), "Inserted document");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    fn metadata(title: &str) -> Metadata {
        let mut metadata = Metadata::new();
        metadata.insert("title".into(), json!(title));
        metadata
    }

    #[tokio::test]
    async fn test_open_creates_layout() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("raw");
        let cache = FileDocumentCache::open(&root).await.unwrap();

        assert!(root.join("content").is_dir());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_insert_then_get_round_trips() {
        let dir = TempDir::new().unwrap();
        let cache = FileDocumentCache::open(dir.path()).await.unwrap();
        let payload = "line one\nline two\n\u{00e9}";

        cache.insert("https://a.example", metadata("A"), payload).await.unwrap();

        assert!(cache.has("https://a.example").await);
        let doc = cache.get("https://a.example").await.unwrap();
        assert_eq!(doc, Document::new(metadata("A"), payload));
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_rejected() {
        let dir = TempDir::new().unwrap();
        let cache = FileDocumentCache::open(dir.path()).await.unwrap();

        cache.insert("k", metadata("first"), "one").await.unwrap();
        let err = cache.insert("k", metadata("second"), "two").await.unwrap_err();

        assert!(matches!(err, AchflowError::DuplicateKey { ref key } if key == "k"));
        let doc = cache.get("k").await.unwrap();
        assert_eq!(doc.content, "one");
        assert_eq!(doc.metadata_str("title"), Some("first"));
        assert_eq!(std::fs::read_dir(dir.path().join("content")).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_missing_key_is_not_found() {
        let dir = TempDir::new().unwrap();
        let cache = FileDocumentCache::open(dir.path()).await.unwrap();

        assert!(!cache.has("absent").await);
        assert!(matches!(
            cache.get("absent").await,
            Err(AchflowError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let cache = FileDocumentCache::open(dir.path()).await.unwrap();
            cache.insert("k", Metadata::new(), "persisted").await.unwrap();
        }

        let reopened = FileDocumentCache::open(dir.path()).await.unwrap();
        let doc = reopened.get("k").await.unwrap();
        assert_eq!(doc.content, "persisted");
        assert!(doc.metadata.is_empty());
    }

    #[tokio::test]
    async fn test_payload_file_name_is_not_the_key() {
        let dir = TempDir::new().unwrap();
        let cache = FileDocumentCache::open(dir.path()).await.unwrap();
        cache.insert("https://a.example/x", Metadata::new(), "p").await.unwrap();

        let index: serde_json::Value =
            serde_json::from_slice(&std::fs::read(dir.path().join("index.json")).unwrap()).unwrap();
        let file_name = index["records"][0]["file_name"].as_str().unwrap();
        assert!(Uuid::parse_str(file_name).is_ok());
        assert_eq!(index["records"][0]["id"], "https://a.example/x");
    }

    #[tokio::test]
    async fn test_index_without_metadata_defaults_to_empty() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("content")).unwrap();
        std::fs::write(dir.path().join("content").join("f1"), "body").unwrap();
        std::fs::write(
            dir.path().join("index.json"),
            r#"{"records":[{"id":"k","file_name":"f1"}]}"#,
        )
        .unwrap();

        let cache = FileDocumentCache::open(dir.path()).await.unwrap();
        let doc = cache.get("k").await.unwrap();
        assert!(doc.metadata.is_empty());
        assert_eq!(doc.content, "body");
    }

    #[tokio::test]
    async fn test_concurrent_inserts_same_key_single_winner() {
        let dir = TempDir::new().unwrap();
        let cache = std::sync::Arc::new(FileDocumentCache::open(dir.path()).await.unwrap());

        let mut handles = Vec::new();
        for i in 0..8 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                cache.insert("k", Metadata::new(), &format!("v{i}")).await
            }));
        }

        let mut ok = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                ok += 1;
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_handles_on_one_root_share_records() {
        let dir = TempDir::new().unwrap();
        let a = FileDocumentCache::open(dir.path()).await.unwrap();
        let b = FileDocumentCache::open(dir.path()).await.unwrap();

        a.insert("k1", metadata("first"), "one").await.unwrap();
        b.insert("k2", metadata("second"), "two").await.unwrap();

        assert!(b.has("k1").await);
        assert!(a.has("k2").await);
        let err = b.insert("k1", metadata("other"), "other").await.unwrap_err();
        assert!(matches!(err, AchflowError::DuplicateKey { ref key } if key == "k1"));

        drop((a, b));
        let reopened = FileDocumentCache::open(dir.path()).await.unwrap();
        assert_eq!(reopened.len().await, 2);
        assert_eq!(reopened.get("k1").await.unwrap().content, "one");
        assert_eq!(reopened.get("k2").await.unwrap().content, "two");
    }

    #[tokio::test]
    async fn test_concurrent_inserts_across_handles_single_winner() {
        let dir = TempDir::new().unwrap();

        let mut handles = Vec::new();
        for i in 0..6 {
            let cache = FileDocumentCache::open(dir.path()).await.unwrap();
            handles.push(tokio::spawn(async move {
                cache.insert("k", Metadata::new(), &format!("v{i}")).await
            }));
        }

        let mut ok = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                ok += 1;
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(std::fs::read_dir(dir.path().join("content")).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_failed_insert_leaves_no_stray_files() {
        let dir = TempDir::new().unwrap();
        let cache = FileDocumentCache::open(dir.path()).await.unwrap();
        cache.insert("kept", Metadata::new(), "kept").await.unwrap();

        let content = dir.path().join("content");
        std::fs::rename(&content, dir.path().join("moved")).unwrap();
        std::fs::write(&content, "not a directory").unwrap();

        let err = cache.insert("k", Metadata::new(), "payload").await.unwrap_err();
        assert!(matches!(err, AchflowError::Io(_)));

        std::fs::remove_file(&content).unwrap();
        std::fs::rename(dir.path().join("moved"), &content).unwrap();
        assert!(!cache.has("k").await);
        assert_eq!(std::fs::read_dir(&content).unwrap().count(), 1);
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "left behind {leftovers:?}");

        cache.insert("k", Metadata::new(), "payload").await.unwrap();
        assert_eq!(cache.get("k").await.unwrap().content, "payload");
    }

    #[tokio::test]
    async fn test_temp_index_files_are_not_left_behind() {
        let dir = TempDir::new().unwrap();
        let cache = FileDocumentCache::open(dir.path()).await.unwrap();
        for i in 0..3 {
            cache.insert(&format!("k{i}"), Metadata::new(), "p").await.unwrap();
        }

        let mut names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["content", "index.json"]);
    }
}
