pub const SYSTEM_CONFIG_FILENAME: &str = "system_config.yaml";
pub const ANALYSIS_CONFIG_FILENAME: &str = "analysis_config.yaml";

pub fn generate_system_config() -> String {
    r#"# =============================================================================
# LOGSIFT SYSTEM CONFIGURATION
# =============================================================================
# Endpoint and size budgets for the LLM calls. The API key is read from the
# environment variable named by `api_key_env` (a .env file in the working
# directory is loaded first).

llm:
  # Model identifier passed to the chat completion endpoint (required)
  model: gpt-4o-mini

  # Any OpenAI-compatible endpoint; requests go to {base_url}/chat/completions
  base_url: https://api.openai.com/v1

  # Approximate token budget per log chunk (tokens ~= characters / 3.5)
  max_tokens_per_chunk: 2048

  # Ceiling for the final summarization call. When the combined chunk
  # summaries are estimated above this, the final call is skipped and the
  # summaries are written out as-is under a warning banner.
  max_summary_tokens: 16000

  # Chunk analysis calls in flight at once. 1 = strictly sequential.
  concurrency: 1

  # Per-request timeout, e.g. 30s, 2m. Omit to use the transport default.
  # request_timeout: 120s

  api_key_env: OPENAI_API_KEY
"#
    .to_string()
}

pub fn generate_analysis_config() -> String {
    r#"# =============================================================================
# LOGSIFT ANALYSIS CONFIGURATION
# =============================================================================
# Describes the log file layout, the instruction prompts, and where the report
# is written.

data:
  # Field present in every record that holds its timestamp (required)
  timestamp_field: timestamp

  # 'iso8601', 'epoch' (seconds), or a strptime pattern such as
  # '%Y-%m-%d %H:%M:%S' (required)
  timestamp_format: iso8601

  # Records read per batch; bounds memory use when streaming
  dataframe_chunk_size: 10000

  # stream_order: file order, one batch in memory at a time
  # batch:        sort each batch by timestamp
  # global:       load the whole file and sort it by timestamp
  ordering: stream_order

prompts:
  # Instructions applied to every chunk of log records (required)
  chunk_analysis_prompt_path: prompts/chunk_analysis.txt
  # Instructions for combining the chunk summaries (required)
  final_summary_prompt_path: prompts/final_summary.txt

output:
  # Used when --output is not given on the command line
  output_dir: reports
  report_filename: analysis_report.md
"#
    .to_string()
}
