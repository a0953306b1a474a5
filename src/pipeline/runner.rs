use crate::analysis::{ChunkAnalyzer, ChunkSummary, FinalReport, PromptError, PromptSource, Reducer};
use crate::chunk::{CharRatioEstimator, ChunkBuilder, ChunkError, TokenEstimator};
use crate::config::types::{LlmConfig, Ordering};
use crate::llm::CompletionClient;
use crate::pipeline::progress::{NoProgress, ProgressReporter};
use crate::source::{ReaderError, RecordBatch};
use futures::stream::{self, StreamExt};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Errors that abort a pipeline run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("input error: {0}")]
    Reader(#[from] ReaderError),

    #[error("chunking error: {0}")]
    Chunk(#[from] ChunkError),

    #[error(transparent)]
    Prompt(#[from] PromptError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub batches: usize,
    pub records: usize,
    pub chunks: usize,
    pub failed_chunks: usize,
}

#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub report: FinalReport,
    pub stats: PipelineStats,
}

/// Map-reduce over a stream of record batches.
///
/// Each batch is chunked and every chunk analyzed (up to `concurrency` calls
/// in flight, results kept in chunk order). Once the stream is exhausted all
/// summaries are reduced into one report.
pub struct Pipeline {
    client: Arc<dyn CompletionClient>,
    model: String,
    builder: ChunkBuilder,
    analyzer: ChunkAnalyzer,
    estimator: Arc<dyn TokenEstimator>,
    max_summary_tokens: usize,
    final_prompt: PromptSource,
    ordering: Ordering,
    concurrency: usize,
    progress: Arc<dyn ProgressReporter>,
}

impl Pipeline {
    pub fn new(
        client: Arc<dyn CompletionClient>,
        llm: &LlmConfig,
        ordering: Ordering,
        chunk_instructions: &str,
        final_prompt: PromptSource,
    ) -> Self {
        let estimator: Arc<dyn TokenEstimator> = Arc::new(CharRatioEstimator::default());
        Self {
            builder: ChunkBuilder::new(llm.max_tokens_per_chunk, estimator.clone()),
            analyzer: ChunkAnalyzer::new(client.clone(), &llm.model, chunk_instructions),
            client,
            model: llm.model.clone(),
            estimator,
            max_summary_tokens: llm.max_summary_tokens,
            final_prompt,
            ordering,
            concurrency: llm.concurrency.max(1),
            progress: Arc::new(NoProgress),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// Replace the size estimator used for both chunking and the reduce ceiling
    pub fn with_estimator(mut self, estimator: Arc<dyn TokenEstimator>) -> Self {
        self.builder = ChunkBuilder::new(self.builder.token_budget(), estimator.clone());
        self.estimator = estimator;
        self
    }

    pub async fn run<I>(&self, batches: I) -> Result<PipelineOutcome, PipelineError>
    where
        I: IntoIterator<Item = Result<RecordBatch, ReaderError>>,
    {
        let mut summaries: Vec<ChunkSummary> = Vec::new();
        let mut stats = PipelineStats::default();

        match self.ordering {
            Ordering::Global => {
                let mut records = Vec::new();
                for batch in batches {
                    records.extend(batch?.records);
                }
                if !records.is_empty() {
                    let mut all = RecordBatch { index: 0, records };
                    all.sort_by_timestamp();
                    info!(records = all.len(), "Loaded and sorted all records");
                    self.process_batch(&all, &mut summaries, &mut stats).await?;
                }
            }
            Ordering::StreamOrder | Ordering::Batch => {
                for batch in batches {
                    let mut batch = batch?;
                    if self.ordering == Ordering::Batch {
                        batch.sort_by_timestamp();
                    }
                    self.process_batch(&batch, &mut summaries, &mut stats).await?;
                }
            }
        }

        info!(
            batches = stats.batches,
            records = stats.records,
            chunks = stats.chunks,
            failed_chunks = stats.failed_chunks,
            "All chunks analyzed"
        );
        self.progress.reduce_started(summaries.len());

        let report = if summaries.is_empty() {
            info!("No chunk summaries, skipping final report generation");
            FinalReport::NoSummaries
        } else {
            let instructions = self.final_prompt.load()?;
            let reducer = Reducer::new(
                self.client.clone(),
                &self.model,
                &instructions,
                self.max_summary_tokens,
                self.estimator.clone(),
            );
            reducer.reduce(&summaries).await
        };

        self.progress.finished();
        Ok(PipelineOutcome { report, stats })
    }

    async fn process_batch(
        &self,
        batch: &RecordBatch,
        summaries: &mut Vec<ChunkSummary>,
        stats: &mut PipelineStats,
    ) -> Result<(), PipelineError> {
        let chunks = self.builder.build(&batch.records)?;
        let total = chunks.len();
        let first_chunk = stats.chunks;
        debug!(batch = batch.index, records = batch.len(), chunks = total, "Chunked batch");
        self.progress.batch_started(batch.index, total);

        // `buffered` yields in input order regardless of completion order
        let mut completed = 0usize;
        let batch_summaries: Vec<ChunkSummary> = stream::iter(&chunks)
            .map(|chunk| self.analyzer.analyze(first_chunk + chunk.index, &chunk.text))
            .buffered(self.concurrency)
            .inspect(|summary| {
                completed += 1;
                self.progress
                    .chunk_finished(batch.index, completed, total, summary.is_failed());
            })
            .collect()
            .await;

        stats.batches += 1;
        stats.records += batch.len();
        stats.chunks += total;
        stats.failed_chunks += batch_summaries.iter().filter(|s| s.is_failed()).count();
        summaries.extend(batch_summaries);

        self.progress.batch_finished(batch.index);
        Ok(())
    }
}

/// Write the rendered report, creating parent directories as needed.
pub fn write_report(path: &Path, report: &FinalReport) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, report.render())
}
