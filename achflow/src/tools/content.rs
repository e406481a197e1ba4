//! Built-in tools over content providers and the source registry.

use super::{SourceList, Tool, ToolDefinition, ToolParameter};
use crate::content::{format_curated_document, ContentProvider, TextConverter};
use crate::errors::ToolError;
use async_trait::async_trait;
use std::sync::Arc;

/// Name of the source-listing tool.
pub const GET_WEB_SOURCES: &str = "get_web_sources_urls";
/// Name of the raw content tool.
pub const RETRIEVE_CONTENT: &str = "retrieve_content_from_url";
/// Name of the curated document tool.
pub const RETRIEVE_CURATED_DOCUMENT: &str = "retrieve_curated_document_content_from_url";

fn url_parameter() -> ToolParameter {
    ToolParameter::new("url", "The URL to retrieve.")
}

fn require_argument(name: &str, argument: &str) -> Result<String, ToolError> {
    let trimmed = argument.trim();
    if trimmed.is_empty() {
        return Err(ToolError::InvalidArgument {
            name: name.to_string(),
            reason: "a URL is required".to_string(),
        });
    }
    Ok(trimmed.to_string())
}

/// Lists the approved source URLs as a JSON array.
pub struct WebSourcesTool {
    definition: ToolDefinition,
    sources: Arc<dyn SourceList>,
}

impl WebSourcesTool {
    /// Creates the tool over a source list.
    #[must_use]
    pub fn new(sources: Arc<dyn SourceList>) -> Self {
        Self {
            definition: ToolDefinition::new(
                GET_WEB_SOURCES,
                "Gets the list of URLs of curated web articles to use for analysis. \
                 Select data only from this list; do not search the web.",
            ),
            sources,
        }
    }
}

#[async_trait]
impl Tool for WebSourcesTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn invoke(&self, _argument: &str) -> Result<String, ToolError> {
        let sources = self
            .sources
            .sources()
            .await
            .map_err(|e| ToolError::execution_failed(GET_WEB_SOURCES, e.to_string()))?;
        serde_json::to_string(&sources)
            .map_err(|e| ToolError::execution_failed(GET_WEB_SOURCES, e.to_string()))
    }
}

/// Retrieves a page through the raw provider and converts it to text.
pub struct RawContentTool {
    definition: ToolDefinition,
    provider: Arc<dyn ContentProvider>,
    converter: Arc<dyn TextConverter>,
}

impl RawContentTool {
    /// Creates the tool.
    #[must_use]
    pub fn new(provider: Arc<dyn ContentProvider>, converter: Arc<dyn TextConverter>) -> Self {
        Self {
            definition: ToolDefinition::new(
                RETRIEVE_CONTENT,
                "Retrieves the content of a web page as Markdown text.",
            )
            .with_parameter(url_parameter()),
            provider,
            converter,
        }
    }
}

#[async_trait]
impl Tool for RawContentTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn invoke(&self, argument: &str) -> Result<String, ToolError> {
        let url = require_argument(RETRIEVE_CONTENT, argument)?;
        let document = self
            .provider
            .resolve(&url)
            .await
            .map_err(|e| ToolError::execution_failed(RETRIEVE_CONTENT, e.to_string()))?;
        Ok(self.converter.convert(&document.content))
    }
}

/// Retrieves a curated document rendered as self-contained Markdown.
pub struct CuratedDocumentTool {
    definition: ToolDefinition,
    provider: Arc<dyn ContentProvider>,
}

impl CuratedDocumentTool {
    /// Creates the tool over the curated provider.
    #[must_use]
    pub fn new(provider: Arc<dyn ContentProvider>) -> Self {
        Self {
            definition: ToolDefinition::new(
                RETRIEVE_CURATED_DOCUMENT,
                "Retrieves a curated document with its title, URL, keywords, summary and \
                 cleaned content.",
            )
            .with_parameter(url_parameter()),
            provider,
        }
    }
}

#[async_trait]
impl Tool for CuratedDocumentTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn invoke(&self, argument: &str) -> Result<String, ToolError> {
        let url = require_argument(RETRIEVE_CURATED_DOCUMENT, argument)?;
        let document = self
            .provider
            .resolve(&url)
            .await
            .map_err(|e| ToolError::execution_failed(RETRIEVE_CURATED_DOCUMENT, e.to_string()))?;
        Ok(format_curated_document(&url, &document))
    }
}
