use crate::analysis::analyzer::ChunkSummary;
use crate::analysis::prompt::summary_system_prompt;
use crate::chunk::TokenEstimator;
use crate::llm::{CompletionClient, CompletionRequest};
use std::sync::Arc;
use tracing::{info, warn};

pub const SUMMARY_SEPARATOR: &str = "\n\n---\n\n";
pub const REDUCE_FAILED_SENTINEL: &str = "[Error: final summarization failed]";
pub const NO_SUMMARIES_REPORT: &str = "No summaries were generated from the log chunks.";

/// The final artifact of a run.
#[derive(Debug, Clone, PartialEq)]
pub enum FinalReport {
    /// Synthesis returned by the reduce call, verbatim
    Synthesized(String),
    /// Combined summaries were too large for the reduce call
    Overflow {
        estimated_tokens: usize,
        ceiling: usize,
        body: String,
    },
    NoSummaries,
    Failed,
}

impl FinalReport {
    pub fn render(&self) -> String {
        match self {
            FinalReport::Synthesized(text) => text.clone(),
            FinalReport::Overflow {
                estimated_tokens,
                ceiling,
                body,
            } => format!(
                "# FINAL REPORT SKIPPED\n\n{}{}{}",
                overflow_notice(*estimated_tokens, *ceiling),
                SUMMARY_SEPARATOR,
                body
            ),
            FinalReport::NoSummaries => NO_SUMMARIES_REPORT.to_string(),
            FinalReport::Failed => REDUCE_FAILED_SENTINEL.to_string(),
        }
    }

    /// True when the report is the model's synthesis rather than a fallback
    pub fn is_synthesized(&self) -> bool {
        matches!(self, FinalReport::Synthesized(_))
    }
}

pub fn overflow_notice(estimated_tokens: usize, ceiling: usize) -> String {
    format!(
        "Warning: The combined summary text is too large (~{} tokens) to fit within the context limit of {} tokens. \
         Final summarization is skipped. Returning the concatenated chunk summaries instead.",
        estimated_tokens, ceiling
    )
}

pub fn join_summaries(summaries: &[ChunkSummary]) -> String {
    summaries
        .iter()
        .map(ChunkSummary::as_text)
        .collect::<Vec<_>>()
        .join(SUMMARY_SEPARATOR)
}

/// Reduce step: merges every chunk summary into one report.
pub struct Reducer {
    client: Arc<dyn CompletionClient>,
    model: String,
    system_prompt: String,
    max_summary_tokens: usize,
    estimator: Arc<dyn TokenEstimator>,
}

impl Reducer {
    pub fn new(
        client: Arc<dyn CompletionClient>,
        model: &str,
        instructions: &str,
        max_summary_tokens: usize,
        estimator: Arc<dyn TokenEstimator>,
    ) -> Self {
        Self {
            client,
            model: model.to_string(),
            system_prompt: summary_system_prompt(instructions),
            max_summary_tokens,
            estimator,
        }
    }

    pub async fn reduce(&self, summaries: &[ChunkSummary]) -> FinalReport {
        if summaries.is_empty() {
            info!("No chunk summaries, skipping final summarization");
            return FinalReport::NoSummaries;
        }

        let joined = join_summaries(summaries);
        let estimated = self.estimator.estimate(&joined);

        if estimated > self.max_summary_tokens as f64 {
            warn!(
                estimated_tokens = estimated as usize,
                ceiling = self.max_summary_tokens,
                "Combined summaries exceed context limit, skipping final summarization"
            );
            return FinalReport::Overflow {
                estimated_tokens: estimated as usize,
                ceiling: self.max_summary_tokens,
                body: joined,
            };
        }

        info!(
            summaries = summaries.len(),
            estimated_tokens = estimated as usize,
            "Generating final report"
        );
        let request = CompletionRequest::separated(&self.model, &self.system_prompt, joined);
        match self.client.complete(&request).await {
            Ok(text) => FinalReport::Synthesized(text),
            Err(e) => {
                warn!(kind = e.kind(), error = %e, "Final summarization failed");
                FinalReport::Failed
            }
        }
    }
}
