//! Tools a capability stage may invoke mid-call.
//!
//! This module provides:
//! - Tool definitions and call/result types
//! - The [`Tool`] trait and the ordered [`ToolSet`]
//! - Built-in content and source registry tools

mod content;
mod definitions;
mod registry;
mod sources;

pub use content::{
    CuratedDocumentTool, RawContentTool, WebSourcesTool, GET_WEB_SOURCES, RETRIEVE_CONTENT,
    RETRIEVE_CURATED_DOCUMENT,
};
pub use definitions::{ToolCall, ToolDefinition, ToolParameter, ToolResult};
pub use registry::{FnTool, Tool, ToolSet};
pub use sources::{CsvSourceRegistry, SourceList, StaticSources, WEB_SOURCES_COLUMN};
