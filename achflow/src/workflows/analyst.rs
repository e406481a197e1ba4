//! The composition root: one place where caches, providers, tools and
//! pipelines are assembled from an [`AnalysisConfig`].

use super::analysis::{analysis_pipeline, USER_REQUEST_KEY};
use super::curation::PipelineCurator;
use super::report::{AnalysisDebugData, AnalysisReport};
use super::StageFactory;
use crate::cache::{DocumentCache, FileDocumentCache};
use crate::config::AnalysisConfig;
use crate::content::{
    CuratedContentProvider, Fetcher, HtmlTextConverter, ReqwestFetcher, WebContentProvider,
};
use crate::context::{ContextSnapshot, RunIdentity};
use crate::errors::AchflowError;
use crate::events::{EventSink, LoggingEventSink};
use crate::helpers::run_blocking;
use crate::inference::{BackoffClient, GeminiClient, InferenceClient};
use crate::pipeline::{Pipeline, PipelineRun};
use crate::tools::{
    CsvSourceRegistry, CuratedDocumentTool, RawContentTool, SourceList, Tool, WebSourcesTool,
};
use serde_json::json;
use std::sync::Arc;

/// The collaborators an [`Analyst`] is assembled from.
///
/// [`Analyst::new`] fills these from the config; tests supply their own.
pub struct AnalystParts {
    /// The inference service.
    pub inference: Arc<dyn InferenceClient>,
    /// Raw page fetcher.
    pub fetcher: Arc<dyn Fetcher>,
    /// Cache for raw fetched pages.
    pub raw_cache: Arc<dyn DocumentCache>,
    /// Cache for curated documents.
    pub curated_cache: Arc<dyn DocumentCache>,
    /// Registry of curated source URLs.
    pub sources: Arc<dyn SourceList>,
    /// Receives events from the analysis pipeline and from every curation
    /// run it starts.
    pub sink: Arc<dyn EventSink>,
}

impl std::fmt::Debug for AnalystParts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalystParts").finish_non_exhaustive()
    }
}

/// A finished analysis.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    /// The report for presentation.
    pub report: AnalysisReport,
    /// Intermediate evidence.
    pub debug: AnalysisDebugData,
    /// The underlying run, with per-stage records.
    pub run: PipelineRun,
}

/// Runs competing-hypotheses analyses against curated sources.
///
/// Built once; [`Analyst::analyze`] may be called any number of times and
/// concurrently. Curated documents persist in the curated cache across
/// runs, so a source is curated at most once.
#[derive(Clone)]
pub struct Analyst {
    config: AnalysisConfig,
    pipeline: Pipeline,
    raw_cache: Arc<dyn DocumentCache>,
    curated_cache: Arc<dyn DocumentCache>,
}

impl std::fmt::Debug for Analyst {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analyst")
            .field("model", &self.config.model)
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

impl Analyst {
    /// Builds an analyst calling `inference`, fetching over HTTP and caching
    /// under the configured roots.
    pub async fn new(
        config: AnalysisConfig,
        inference: Arc<dyn InferenceClient>,
    ) -> Result<Self, AchflowError> {
        config.validate()?;
        let fetcher = Arc::new(ReqwestFetcher::new(&config.fetch)?);
        let raw_cache = Arc::new(FileDocumentCache::open(&config.cache.raw_root).await?);
        let curated_cache = Arc::new(FileDocumentCache::open(&config.cache.curated_root).await?);
        let sources = Arc::new(CsvSourceRegistry::new(&config.sources_path));

        Self::from_parts(
            config,
            AnalystParts {
                inference,
                fetcher,
                raw_cache,
                curated_cache,
                sources,
                sink: Arc::new(LoggingEventSink::default()),
            },
        )
    }

    /// Builds an analyst against the Gemini API.
    pub async fn from_config(config: AnalysisConfig) -> Result<Self, AchflowError> {
        let inference = Arc::new(GeminiClient::new(&config.inference)?);
        Self::new(config, inference).await
    }

    /// Assembles an analyst from explicit collaborators.
    pub fn from_parts(config: AnalysisConfig, parts: AnalystParts) -> Result<Self, AchflowError> {
        config.validate()?;

        let client = Arc::new(BackoffClient::new(parts.inference, config.retry.clone()));
        let factory = StageFactory::new(client, &config.model)
            .with_max_tool_rounds(config.max_tool_rounds);

        let raw = Arc::new(WebContentProvider::new(
            parts.fetcher,
            Arc::clone(&parts.raw_cache),
        ));
        let retrieval: Arc<dyn Tool> =
            Arc::new(RawContentTool::new(raw, Arc::new(HtmlTextConverter::new())));
        let curator = PipelineCurator::build(&factory, retrieval, Some(Arc::clone(&parts.sink)))?;
        let curated = Arc::new(CuratedContentProvider::new(
            Arc::new(curator),
            Arc::clone(&parts.curated_cache),
        ));

        let tools: [Arc<dyn Tool>; 2] = [
            Arc::new(WebSourcesTool::new(parts.sources)),
            Arc::new(CuratedDocumentTool::new(curated)),
        ];
        let pipeline = analysis_pipeline(&factory, tools, Some(parts.sink))?;

        tracing::debug!(
            model = %config.model,
            stages = pipeline.len(),
            "Analyst assembled"
        );
        Ok(Self {
            config,
            pipeline,
            raw_cache: parts.raw_cache,
            curated_cache: parts.curated_cache,
        })
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Returns the analysis pipeline.
    #[must_use]
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Returns the raw page cache.
    #[must_use]
    pub fn raw_cache(&self) -> &Arc<dyn DocumentCache> {
        &self.raw_cache
    }

    /// Returns the curated document cache.
    #[must_use]
    pub fn curated_cache(&self) -> &Arc<dyn DocumentCache> {
        &self.curated_cache
    }

    /// Analyses `request`.
    ///
    /// A failed run surfaces as [`AchflowError::Pipeline`] carrying the
    /// failing stage and the context gathered until then.
    pub async fn analyze(&self, request: &str) -> Result<AnalysisOutcome, AchflowError> {
        self.analyze_as(RunIdentity::new(), request).await
    }

    /// Analyses `request` under an explicit run identity.
    pub async fn analyze_as(
        &self,
        run: RunIdentity,
        request: &str,
    ) -> Result<AnalysisOutcome, AchflowError> {
        let seed = ContextSnapshot::from_entries([(USER_REQUEST_KEY.to_string(), json!(request))]);
        let run = self.pipeline.run_as(run, seed).await?;
        let report = AnalysisReport::from_context(&run.context)?;
        let debug_data = AnalysisDebugData::from_context(&run.context)?;
        tracing::info!(
            run_id = %run.run.run_id,
            title = %report.report_title,
            hypotheses = report.hypotheses.len(),
            evidence = debug_data.structured_evidence.evidence_items.len(),
            duration_ms = run.duration_ms,
            "Analysis completed"
        );
        Ok(AnalysisOutcome {
            report,
            debug: debug_data,
            run,
        })
    }

    /// Builds a Gemini-backed analyst and analyses `request` on a scoped
    /// runtime that is shut down before returning.
    ///
    /// Must not be called from within an async context.
    pub fn analyze_blocking(
        config: AnalysisConfig,
        request: &str,
    ) -> Result<AnalysisOutcome, AchflowError> {
        run_blocking(async move {
            let analyst = Self::from_config(config).await?;
            analyst.analyze(request).await
        })?
    }
}
