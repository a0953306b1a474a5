use crate::analysis::prompt::load_prompt;
use crate::analysis::{PromptError, PromptSource};
use crate::config::{load_analysis_config, load_system_config, AnalysisConfig, ConfigError, SystemConfig};
use crate::llm::{CompletionClient, LlmError, OpenAiClient};
use crate::pipeline::{
    estimate_batches, write_report, BarProgress, LogProgress, Pipeline, PipelineError,
    PipelineOutcome, ProgressReporter,
};
use crate::source::{validate_file, ReaderError, RecordReader, TimestampParser};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("API key not found: set the {var} environment variable (or add it to .env)")]
    Credential { var: String },

    #[error("prompt error: {0}")]
    Prompt(#[from] PromptError),

    #[error("input error: {0}")]
    Reader(#[from] ReaderError),

    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("LLM client error: {0}")]
    Llm(#[from] LlmError),

    #[error("failed to write report '{}': {source}", .path.display())]
    WriteReport {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct RunArgs {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub system_config: PathBuf,
    pub analysis_config: PathBuf,
    /// Draw progress bars on stderr instead of logging progress
    pub progress: bool,
}

/// Everything resolved before the log file is touched
struct Preflight {
    system: SystemConfig,
    analysis: AnalysisConfig,
    output_path: PathBuf,
    api_key: String,
    chunk_instructions: String,
}

pub async fn run(args: RunArgs) -> Result<PipelineOutcome, RunError> {
    let preflight = preflight(&args)?;

    let llm = &preflight.system.llm;
    let client = OpenAiClient::new(&llm.base_url, preflight.api_key.clone(), llm.request_timeout)?;
    info!(base_url = %client.base_url(), model = %llm.model, "Using LLM endpoint");

    execute(&args, preflight, Arc::new(client)).await
}

/// Same as [`run`] but with a caller-supplied completion client
pub async fn run_with_client(
    args: RunArgs,
    client: Arc<dyn CompletionClient>,
) -> Result<PipelineOutcome, RunError> {
    let preflight = preflight(&args)?;
    execute(&args, preflight, client).await
}

fn preflight(args: &RunArgs) -> Result<Preflight, RunError> {
    info!(path = %args.system_config.display(), "Loading system configuration");
    let system = load_system_config(&args.system_config)?;
    info!(path = %args.analysis_config.display(), "Loading analysis configuration");
    let analysis = load_analysis_config(&args.analysis_config)?;

    let output_path = match &args.output {
        Some(path) => path.clone(),
        None => analysis.output.report_path().ok_or_else(|| {
            ConfigError::Validation(
                "no output path: pass --output or set output.output_dir and output.report_filename"
                    .to_string(),
            )
        })?,
    };

    let var = system.llm.api_key_env.clone();
    let api_key = match std::env::var(&var) {
        Ok(key) if !key.trim().is_empty() => key,
        _ => return Err(RunError::Credential { var }),
    };

    let chunk_instructions = load_prompt(
        "chunk analysis",
        &analysis.prompts.chunk_analysis_prompt_path,
    )?;

    Ok(Preflight {
        system,
        analysis,
        output_path,
        api_key,
        chunk_instructions,
    })
}

async fn execute(
    args: &RunArgs,
    preflight: Preflight,
    client: Arc<dyn CompletionClient>,
) -> Result<PipelineOutcome, RunError> {
    let data = &preflight.analysis.data;

    // Every record is checked before any batch is chunked or sent out
    let records = validate_file(
        &args.input,
        &data.timestamp_field,
        TimestampParser::new(&data.timestamp_format),
    )?;
    info!(records, "Input validated");

    let reader = RecordReader::open(
        &args.input,
        &data.timestamp_field,
        TimestampParser::new(&data.timestamp_format),
        data.dataframe_chunk_size,
    )?;

    let total_batches = estimate_batches(records, data.dataframe_chunk_size, data.ordering);
    let progress: Arc<dyn ProgressReporter> = if args.progress {
        Arc::new(BarProgress::new(Some(total_batches)))
    } else {
        Arc::new(LogProgress::new(Some(total_batches)))
    };

    let final_prompt = PromptSource::file(
        "final summary",
        preflight.analysis.prompts.final_summary_prompt_path.clone(),
    );
    let pipeline = Pipeline::new(
        client,
        &preflight.system.llm,
        data.ordering,
        &preflight.chunk_instructions,
        final_prompt,
    )
    .with_progress(progress);

    info!(
        input = %args.input.display(),
        ordering = ?data.ordering,
        concurrency = preflight.system.llm.concurrency,
        "Starting analysis"
    );
    let outcome = pipeline.run(reader).await?;

    if outcome.stats.failed_chunks > 0 {
        warn!(
            failed = outcome.stats.failed_chunks,
            total = outcome.stats.chunks,
            "Some chunks could not be analyzed"
        );
    }

    write_report(&preflight.output_path, &outcome.report).map_err(|source| {
        RunError::WriteReport {
            path: preflight.output_path.clone(),
            source,
        }
    })?;
    info!(path = %preflight.output_path.display(), "Report written");

    Ok(outcome)
}
