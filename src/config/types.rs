use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// `system_config.yaml`: endpoint and budget settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    pub llm: LlmConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_max_tokens_per_chunk")]
    pub max_tokens_per_chunk: usize,
    #[serde(default = "default_max_summary_tokens")]
    pub max_summary_tokens: usize,
    /// Number of chunk analysis calls allowed in flight at once
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default, with = "humantime_serde")]
    pub request_timeout: Option<Duration>,
    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

fn default_base_url() -> String {
    crate::llm::DEFAULT_BASE_URL.to_string()
}

fn default_max_tokens_per_chunk() -> usize {
    2048
}

fn default_max_summary_tokens() -> usize {
    16000
}

fn default_concurrency() -> usize {
    1
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

/// `analysis_config.yaml`: input layout, prompts and output location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub data: DataConfig,
    pub prompts: PromptsConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub timestamp_field: String,
    /// `iso8601`, `epoch`, or a strptime pattern
    pub timestamp_format: String,
    #[serde(default = "default_dataframe_chunk_size")]
    pub dataframe_chunk_size: usize,
    #[serde(default)]
    pub ordering: Ordering,
}

fn default_dataframe_chunk_size() -> usize {
    10000
}

/// How records are ordered before chunking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ordering {
    /// File order, one batch in memory at a time
    #[default]
    StreamOrder,
    /// Each batch sorted by timestamp, no sort across batches
    Batch,
    /// Whole file loaded and sorted by timestamp
    Global,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptsConfig {
    pub chunk_analysis_prompt_path: PathBuf,
    pub final_summary_prompt_path: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    pub output_dir: Option<PathBuf>,
    pub report_filename: Option<String>,
}

impl OutputConfig {
    /// `output_dir/report_filename` when both are set
    pub fn report_path(&self) -> Option<PathBuf> {
        match (&self.output_dir, &self.report_filename) {
            (Some(dir), Some(name)) => Some(dir.join(name)),
            _ => None,
        }
    }
}
