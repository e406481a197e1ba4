//! Registry of approved source identifiers.

use crate::errors::AchflowError;
use async_trait::async_trait;
use csv::ReaderBuilder;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Column holding the source identifiers.
pub const WEB_SOURCES_COLUMN: &str = "web_sources";

/// A list of source identifiers the analysis may draw from.
#[async_trait]
pub trait SourceList: Send + Sync {
    /// Returns the identifiers in registry order.
    async fn sources(&self) -> Result<Vec<String>, AchflowError>;
}

/// A CSV-backed source registry, re-read on every call.
#[derive(Debug, Clone)]
pub struct CsvSourceRegistry {
    path: PathBuf,
}

impl CsvSourceRegistry {
    /// Creates a registry over the given CSV file.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the CSV path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parse<R: Read>(reader: R) -> Result<Vec<String>, AchflowError> {
        let mut reader = ReaderBuilder::new().has_headers(true).from_reader(reader);

        let headers = reader
            .headers()
            .map_err(|e| AchflowError::Serialization(format!("Failed to read headers: {e}")))?;
        let column = headers
            .iter()
            .position(|h| h.trim() == WEB_SOURCES_COLUMN)
            .ok_or_else(|| {
                AchflowError::Config(format!("source registry has no '{WEB_SOURCES_COLUMN}' column"))
            })?;

        let mut sources = Vec::new();
        for record in reader.records() {
            let record =
                record.map_err(|e| AchflowError::Serialization(format!("Invalid CSV row: {e}")))?;
            if let Some(value) = record.get(column).map(str::trim) {
                if !value.is_empty() {
                    sources.push(value.to_string());
                }
            }
        }
        Ok(sources)
    }
}

#[async_trait]
impl SourceList for CsvSourceRegistry {
    async fn sources(&self) -> Result<Vec<String>, AchflowError> {
        let bytes = tokio::fs::read(&self.path).await?;
        let sources = Self::parse(bytes.as_slice())?;
        tracing::debug!(path = %self.path.display(), count = sources.len(), "Loaded source registry");
        Ok(sources)
    }
}

/// A fixed, in-memory source list.
#[derive(Debug, Clone, Default)]
pub struct StaticSources(Vec<String>);

impl StaticSources {
    /// Creates a list from identifiers.
    #[must_use]
    pub fn new(sources: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self(sources.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl SourceList for StaticSources {
    async fn sources(&self) -> Result<Vec<String>, AchflowError> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[tokio::test]
    async fn test_reads_web_sources_column() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "name,web_sources").unwrap();
        writeln!(file, "a,https://a.example").unwrap();
        writeln!(file, "b,https://b.example").unwrap();
        writeln!(file, "c,").unwrap();

        let registry = CsvSourceRegistry::new(file.path());
        assert_eq!(
            registry.sources().await.unwrap(),
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
    }

    #[tokio::test]
    async fn test_registry_is_reread_on_each_call() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("sources.csv");
        std::fs::write(&path, "web_sources\nhttps://a.example\n").unwrap();
        let registry = CsvSourceRegistry::new(&path);
        assert_eq!(registry.sources().await.unwrap(), vec!["https://a.example"]);

        std::fs::write(&path, "web_sources\nhttps://a.example\nhttps://b.example\n").unwrap();
        assert_eq!(
            registry.sources().await.unwrap(),
            vec!["https://a.example", "https://b.example"]
        );
    }

    #[test]
    fn test_missing_column_is_config_error() {
        let err = CsvSourceRegistry::parse("urls\nhttps://a.example\n".as_bytes()).unwrap_err();
        assert!(matches!(err, AchflowError::Config(_)));
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let registry = CsvSourceRegistry::new("/definitely/not/here.csv");
        assert!(matches!(registry.sources().await, Err(AchflowError::Io(_))));
    }

    #[tokio::test]
    async fn test_static_sources() {
        let sources = StaticSources::new(["x", "y"]);
        assert_eq!(sources.sources().await.unwrap(), vec!["x", "y"]);
    }
}
