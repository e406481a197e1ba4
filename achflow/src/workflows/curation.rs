//! Document curation: a seven-stage pipeline turning a URL into a titled,
//! summarised, keyword-tagged document.

use super::{prompts, StageFactory};
use crate::cache::{Document, Metadata};
use crate::content::DocumentCurator;
use crate::context::{ContextSnapshot, RunIdentity};
use crate::contracts::OutputContract;
use crate::errors::AchflowError;
use crate::events::EventSink;
use crate::pipeline::Pipeline;
use crate::stages::StageConfig;
use crate::tools::Tool;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

/// Name of the curation pipeline.
pub const CURATION_PIPELINE: &str = "content_curation";

const URL_KEY: &str = "url";
const ASSEMBLED_KEY: &str = "assembled_document";

/// The structured record published by the assembly stage.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DocumentInformation {
    /// Document title, `UNTITLED` when none could be found.
    pub title: String,
    /// Comma separated authors; may be empty.
    #[serde(default)]
    pub authors: String,
    /// Comma separated keywords, most relevant first.
    pub keywords: String,
    /// Short summary.
    pub summary: String,
    /// Cleaned up content.
    pub content: String,
}

impl DocumentInformation {
    fn schema() -> Value {
        let text = json!({ "type": "STRING" });
        json!({
            "type": "OBJECT",
            "properties": {
                "title": text,
                "authors": text,
                "keywords": text,
                "summary": text,
                "content": text,
            },
            "required": ["title", "authors", "keywords", "summary", "content"],
        })
    }

    /// Converts the record into a cacheable document for `url`.
    #[must_use]
    pub fn into_document(self, url: &str) -> Document {
        let mut metadata = Metadata::new();
        metadata.insert("url".into(), json!(url));
        metadata.insert("title".into(), json!(self.title));
        metadata.insert("authors".into(), json!(self.authors));
        metadata.insert("keywords".into(), json!(self.keywords));
        metadata.insert("summary".into(), json!(self.summary));
        Document::new(metadata, self.content)
    }
}

/// Builds the curation pipeline.
///
/// `retrieval` is the tool the first stage uses to read the raw page; the
/// run is seeded with the page URL under `url`.
pub fn curation_pipeline(
    factory: &StageFactory,
    retrieval: Arc<dyn Tool>,
    sink: Option<Arc<dyn EventSink>>,
) -> Result<Pipeline, AchflowError> {
    let stage = |name: &str, key: &str, instruction: &str| {
        StageConfig::builder(name, key)
            .instruction(instruction)
            .message(prompts::CURATION_MESSAGE)
    };

    let stages = vec![
        stage("content_retrieval", "original_content", prompts::CONTENT_RETRIEVAL)
            .tool(retrieval)
            .build()?,
        stage("content_title", "title", prompts::CONTENT_TITLE).build()?,
        stage("content_authors", "authors", prompts::CONTENT_AUTHORS)
            .require_non_empty(false)
            .build()?,
        stage("content_cleanup", "cleaned_up_content", prompts::CONTENT_CLEANUP).build()?,
        stage("content_summary", "summary", prompts::CONTENT_SUMMARY).build()?,
        stage("content_keywords", "keywords", prompts::CONTENT_KEYWORDS).build()?,
        stage("document_assembly", ASSEMBLED_KEY, prompts::DOCUMENT_ASSEMBLY)
            .contract(OutputContract::typed::<DocumentInformation>(
                "DocumentInformation",
                DocumentInformation::schema(),
            ))
            .build()?,
    ];

    let mut builder = Pipeline::builder(CURATION_PIPELINE)
        .seed_key(URL_KEY)
        .stages(stages.into_iter().map(|config| factory.stage(config)));
    if let Some(sink) = sink {
        builder = builder.with_event_sink(sink);
    }
    Ok(builder.build()?)
}

/// A [`DocumentCurator`] backed by the curation pipeline.
#[derive(Debug, Clone)]
pub struct PipelineCurator {
    pipeline: Pipeline,
}

impl PipelineCurator {
    /// Wraps a pipeline built by [`curation_pipeline`].
    #[must_use]
    pub fn new(pipeline: Pipeline) -> Self {
        Self { pipeline }
    }

    /// Builds the curation pipeline and wraps it.
    pub fn build(
        factory: &StageFactory,
        retrieval: Arc<dyn Tool>,
        sink: Option<Arc<dyn EventSink>>,
    ) -> Result<Self, AchflowError> {
        curation_pipeline(factory, retrieval, sink).map(Self::new)
    }
}

#[async_trait]
impl DocumentCurator for PipelineCurator {
    async fn curate(&self, url: &str) -> Result<Document, AchflowError> {
        let seed = ContextSnapshot::from_entries([(URL_KEY.to_string(), json!(url))]);
        // A curation started from a tool call is a child of the calling run.
        let run = self.pipeline.run_as(RunIdentity::nested(), seed).await?;
        let information: DocumentInformation = run.context.parse(ASSEMBLED_KEY)?;
        tracing::debug!(
            url,
            title = %information.title,
            duration_ms = run.duration_ms,
            "Document curated"
        );
        Ok(information.into_document(url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{HtmlTextConverter, WebContentProvider};
    use crate::cache::InMemoryDocumentCache;
    use crate::events::{CollectingEventSink, EventKind};
    use crate::inference::{BackoffClient, InferenceResponse, RetryPolicy, Turn};
    use crate::testing::{CountingFetcher, ScriptedInference};
    use crate::tools::{RawContentTool, ToolCall, RETRIEVE_CONTENT};
    use pretty_assertions::assert_eq;

    const PAGE: &str = "<html><body><h1>Rates</h1><p>By Ann Lee</p><p>Rates rose.</p></body></html>";

    fn scripted() -> Arc<ScriptedInference> {
        Arc::new(ScriptedInference::new(|request| {
            let answer = match request.stage.as_str() {
                "content_retrieval" => match request.last_turn() {
                    Some(Turn::ToolResults { results }) => results[0].output.clone(),
                    _ => {
                        return Ok(InferenceResponse::tool_calls(vec![ToolCall::new(
                            "c1",
                            RETRIEVE_CONTENT,
                            "https://news.example/rates",
                        )]))
                    }
                },
                "content_title" => "Rates".to_string(),
                "content_authors" => String::new(),
                "content_cleanup" => "Rates rose.".to_string(),
                "content_summary" => "Rates went up.".to_string(),
                "content_keywords" => "rates, economy".to_string(),
                "document_assembly" => json!({
                    "title": "Rates",
                    "authors": "",
                    "keywords": "rates, economy",
                    "summary": "Rates went up.",
                    "content": "Rates rose.",
                })
                .to_string(),
                other => panic!("unexpected stage {other}"),
            };
            Ok(InferenceResponse::text(answer))
        }))
    }

    fn retrieval(fetcher: Arc<CountingFetcher>) -> Arc<dyn Tool> {
        let provider = WebContentProvider::new(fetcher, Arc::new(InMemoryDocumentCache::new()));
        Arc::new(RawContentTool::new(
            Arc::new(provider),
            Arc::new(HtmlTextConverter::new()),
        ))
    }

    fn factory(inference: Arc<ScriptedInference>) -> StageFactory {
        StageFactory::new(
            Arc::new(BackoffClient::new(inference, RetryPolicy::no_retry())),
            "test-model",
        )
    }

    #[test]
    fn test_pipeline_shape() {
        let fetcher = Arc::new(CountingFetcher::new());
        let pipeline = curation_pipeline(&factory(scripted()), retrieval(fetcher), None).unwrap();
        assert_eq!(
            pipeline.stage_names(),
            vec![
                "content_retrieval",
                "content_title",
                "content_authors",
                "content_cleanup",
                "content_summary",
                "content_keywords",
                "document_assembly",
            ]
        );
        assert_eq!(pipeline.seed_keys(), &["url".to_string()]);
    }

    #[tokio::test]
    async fn test_curator_produces_document() {
        let fetcher = Arc::new(CountingFetcher::new().with_page("https://news.example/rates", PAGE));
        let inference = scripted();
        let curator =
            PipelineCurator::build(&factory(inference.clone()), retrieval(fetcher.clone()), None)
                .unwrap();

        let document = curator.curate("https://news.example/rates").await.unwrap();

        assert_eq!(document.content, "Rates rose.");
        assert_eq!(document.metadata_str("url"), Some("https://news.example/rates"));
        assert_eq!(document.metadata_str("title"), Some("Rates"));
        assert_eq!(document.metadata_str("authors"), Some(""));
        assert_eq!(document.metadata_str("keywords"), Some("rates, economy"));
        assert_eq!(fetcher.calls("https://news.example/rates"), 1);
        assert_eq!(inference.calls_for("content_retrieval"), 2);

        let title_request = inference
            .requests()
            .into_iter()
            .find(|r| r.stage == "content_title")
            .unwrap();
        assert!(title_request.system_instruction.contains("# Rates"));
    }

    #[tokio::test]
    async fn test_failed_fetch_fails_curation() {
        let fetcher = Arc::new(CountingFetcher::new());
        let curator =
            PipelineCurator::build(&factory(scripted()), retrieval(fetcher), None).unwrap();

        let err = curator.curate("https://news.example/rates").await.unwrap_err();

        let AchflowError::Pipeline(failure) = err else {
            panic!("expected a pipeline failure, got {err:?}");
        };
        assert_eq!(failure.stage, "content_retrieval");
        assert!(matches!(failure.error, AchflowError::FatalCall { .. }));
    }

    #[tokio::test]
    async fn test_curation_reports_to_sink_as_child_run() {
        let fetcher = Arc::new(CountingFetcher::new().with_page("https://news.example/rates", PAGE));
        let sink = Arc::new(CollectingEventSink::new());
        let curator =
            PipelineCurator::build(&factory(scripted()), retrieval(fetcher), Some(sink.clone()))
                .unwrap();

        let parent = RunIdentity::new();
        parent
            .scope(curator.curate("https://news.example/rates"))
            .await
            .unwrap();

        let events = sink.events();
        assert!(!events.is_empty());
        assert!(events.iter().all(|e| e.pipeline == CURATION_PIPELINE));
        assert!(events
            .iter()
            .all(|e| e.run.parent_run_id == Some(parent.run_id)));
        assert_eq!(sink.kinds().last(), Some(&EventKind::PipelineCompleted));
    }
}
