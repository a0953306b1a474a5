use async_trait::async_trait;
use axum::routing::post;
use axum::{Json, Router};
use logsift::analysis::NO_SUMMARIES_REPORT;
use logsift::cli::run::{run, run_with_client, RunArgs, RunError};
use logsift::config::ConfigError;
use logsift::llm::client::Result as LlmResult;
use logsift::llm::{CompletionClient, CompletionRequest};
use logsift::source::{Position, ReaderError};
use serde_json::json;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const KEY_VAR: &str = "LOGSIFT_RUN_TESTS_API_KEY";

/// Answers chunk calls with "summary N" and the reduce call with "FINAL REPORT".
#[derive(Default)]
struct ScriptedClient {
    chunk_payloads: Mutex<Vec<String>>,
    reduce_payloads: Mutex<Vec<String>>,
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(&self, request: &CompletionRequest) -> LlmResult<String> {
        let system = &request.messages[0].content;
        let payload = request.messages[1].content.clone();
        if system.contains("summarizing analysis reports") {
            self.reduce_payloads.lock().unwrap().push(payload);
            return Ok("FINAL REPORT".to_string());
        }
        let mut chunks = self.chunk_payloads.lock().unwrap();
        chunks.push(payload);
        Ok(format!("summary {}", chunks.len()))
    }
}

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        std::env::set_var(KEY_VAR, "sk-test");
        let fixture = Self {
            dir: TempDir::new().unwrap(),
        };
        fixture.write_system("base_url: http://127.0.0.1:9/v1");
        fixture.write_analysis(10000);
        fs::write(fixture.path("chunk.txt"), "List every error.").unwrap();
        fs::write(fixture.path("final.txt"), "Combine the findings.").unwrap();
        fixture
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn write_system(&self, extra: &str) {
        let yaml = format!(
            "llm:\n  model: test-model\n  api_key_env: {}\n  max_tokens_per_chunk: 2048\n  {}\n",
            KEY_VAR, extra
        );
        fs::write(self.path("system_config.yaml"), yaml).unwrap();
    }

    fn write_analysis(&self, batch_size: usize) {
        let yaml = format!(
            r#"data:
  timestamp_field: ts
  timestamp_format: epoch
  dataframe_chunk_size: {batch_size}
prompts:
  chunk_analysis_prompt_path: {chunk}
  final_summary_prompt_path: {final_}
output:
  output_dir: {out}
  report_filename: report.md
"#,
            batch_size = batch_size,
            chunk = self.path("chunk.txt").display(),
            final_ = self.path("final.txt").display(),
            out = self.path("reports").display(),
        );
        fs::write(self.path("analysis_config.yaml"), yaml).unwrap();
    }

    fn write_input(&self, records: usize) -> PathBuf {
        let mut text = String::new();
        for i in 0..records {
            writeln!(
                text,
                r#"{{"ts": {}, "level": "INFO", "msg": "event {}"}}"#,
                1_700_000_000 + i,
                i
            )
            .unwrap();
        }
        let path = self.path("input.jsonl");
        fs::write(&path, text).unwrap();
        path
    }

    fn args(&self, input: &Path) -> RunArgs {
        RunArgs {
            input: input.to_path_buf(),
            output: Some(self.path("out/report.md")),
            system_config: self.path("system_config.yaml"),
            analysis_config: self.path("analysis_config.yaml"),
            progress: false,
        }
    }
}

#[tokio::test]
async fn test_large_file_is_streamed_in_batches() {
    let fx = Fixture::new();
    let input = fx.write_input(25000);
    let client = Arc::new(ScriptedClient::default());

    let outcome = run_with_client(fx.args(&input), client.clone()).await.unwrap();

    assert_eq!(outcome.stats.batches, 3);
    assert_eq!(outcome.stats.records, 25000);
    assert_eq!(outcome.stats.failed_chunks, 0);

    // Every record reaches exactly one chunk, in file order
    let chunks = client.chunk_payloads.lock().unwrap();
    assert_eq!(chunks.len(), outcome.stats.chunks);
    let lines: Vec<&str> = chunks.iter().flat_map(|c| c.lines()).collect();
    assert_eq!(lines.len(), 25000);
    assert!(lines[0].contains("\"event 0\""));
    assert!(lines[24999].contains("\"event 24999\""));
    assert!(lines[0].starts_with(r#"{"ts":"2023-11-14T22:13:20.000Z""#));
    for chunk in chunks.iter() {
        assert!(chunk.chars().count() <= 7168);
    }

    // One reduce call over every summary, in order
    let reduce = client.reduce_payloads.lock().unwrap();
    assert_eq!(reduce.len(), 1);
    assert!(reduce[0].starts_with("summary 1\n\n---\n\nsummary 2"));

    let report = fs::read_to_string(fx.path("out/report.md")).unwrap();
    assert_eq!(report, "FINAL REPORT");
}

#[tokio::test]
async fn test_missing_timestamp_field_is_fatal() {
    let fx = Fixture::new();
    let input = fx.path("input.jsonl");
    fs::write(
        &input,
        "{\"ts\": 1, \"msg\": \"a\"}\n{\"ts\": 2, \"msg\": \"b\"}\n{\"msg\": \"no ts\"}\n",
    )
    .unwrap();
    let client = Arc::new(ScriptedClient::default());

    let err = run_with_client(fx.args(&input), client.clone()).await.unwrap_err();

    match err {
        RunError::Reader(ReaderError::MissingField { field, .. }) => assert_eq!(field, "ts"),
        other => panic!("unexpected error: {}", other),
    }
    assert!(client.chunk_payloads.lock().unwrap().is_empty());
    assert!(!fx.path("out/report.md").exists());
}

#[tokio::test]
async fn test_missing_field_in_later_batch_stops_before_any_call() {
    let fx = Fixture::new();
    fx.write_analysis(2);
    let input = fx.path("input.jsonl");
    fs::write(
        &input,
        "{\"ts\": 1, \"msg\": \"a\"}\n{\"ts\": 2, \"msg\": \"b\"}\n{\"msg\": \"no ts\"}\n",
    )
    .unwrap();
    let client = Arc::new(ScriptedClient::default());

    let err = run_with_client(fx.args(&input), client.clone()).await.unwrap_err();

    match err {
        RunError::Reader(ReaderError::MissingField { position, .. }) => {
            assert_eq!(position, Position::Line(3))
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(client.chunk_payloads.lock().unwrap().is_empty());
    assert!(client.reduce_payloads.lock().unwrap().is_empty());
    assert!(!fx.path("out/report.md").exists());
}

#[tokio::test]
async fn test_bad_timestamp_in_later_batch_stops_before_any_call() {
    let fx = Fixture::new();
    fx.write_analysis(2);
    let input = fx.path("input.jsonl");
    fs::write(
        &input,
        "{\"ts\": 1}\n{\"ts\": 2}\n{\"ts\": 3}\n{\"ts\": \"soon\"}\n",
    )
    .unwrap();
    let client = Arc::new(ScriptedClient::default());

    let err = run_with_client(fx.args(&input), client.clone()).await.unwrap_err();

    assert!(matches!(err, RunError::Reader(ReaderError::Timestamp { .. })));
    assert!(client.chunk_payloads.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_input_reports_no_summaries() {
    let fx = Fixture::new();
    let input = fx.path("input.jsonl");
    fs::write(&input, "").unwrap();
    // The final prompt is never needed for an empty file
    fs::remove_file(fx.path("final.txt")).unwrap();
    let client = Arc::new(ScriptedClient::default());

    let outcome = run_with_client(fx.args(&input), client.clone()).await.unwrap();

    assert_eq!(outcome.stats.chunks, 0);
    assert!(client.chunk_payloads.lock().unwrap().is_empty());
    assert!(client.reduce_payloads.lock().unwrap().is_empty());
    assert_eq!(
        fs::read_to_string(fx.path("out/report.md")).unwrap(),
        NO_SUMMARIES_REPORT
    );
}

#[tokio::test]
async fn test_oversized_summaries_skip_final_call() {
    let fx = Fixture::new();
    fx.write_system("max_summary_tokens: 1");
    let input = fx.write_input(10);
    let client = Arc::new(ScriptedClient::default());

    let outcome = run_with_client(fx.args(&input), client.clone()).await.unwrap();

    assert!(!outcome.report.is_synthesized());
    assert!(client.reduce_payloads.lock().unwrap().is_empty());
    let report = fs::read_to_string(fx.path("out/report.md")).unwrap();
    assert!(report.starts_with("# FINAL REPORT SKIPPED"));
    assert!(report.contains("context limit of 1 tokens"));
    assert!(report.ends_with("summary 1"));
}

#[tokio::test]
async fn test_output_path_from_config() {
    let fx = Fixture::new();
    let input = fx.write_input(3);
    let mut args = fx.args(&input);
    args.output = None;

    run_with_client(args, Arc::new(ScriptedClient::default()))
        .await
        .unwrap();

    assert_eq!(
        fs::read_to_string(fx.path("reports/report.md")).unwrap(),
        "FINAL REPORT"
    );
}

#[tokio::test]
async fn test_missing_credential_fails_before_reading() {
    let fx = Fixture::new();
    fs::write(
        fx.path("system_config.yaml"),
        "llm:\n  model: test-model\n  api_key_env: LOGSIFT_RUN_TESTS_UNSET_KEY\n",
    )
    .unwrap();
    let client = Arc::new(ScriptedClient::default());

    let err = run_with_client(fx.args(&fx.path("missing.jsonl")), client.clone())
        .await
        .unwrap_err();

    match err {
        RunError::Credential { var } => assert_eq!(var, "LOGSIFT_RUN_TESTS_UNSET_KEY"),
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_missing_chunk_prompt_fails_before_reading() {
    let fx = Fixture::new();
    fs::remove_file(fx.path("chunk.txt")).unwrap();

    let err = run_with_client(
        fx.args(&fx.path("missing.jsonl")),
        Arc::new(ScriptedClient::default()),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, RunError::Prompt(_)));
    assert!(err.to_string().contains("chunk analysis prompt file"));
}

#[tokio::test]
async fn test_missing_required_key_names_key() {
    let fx = Fixture::new();
    fs::write(
        fx.path("system_config.yaml"),
        "llm:\n  base_url: http://localhost/v1\n",
    )
    .unwrap();

    let err = run_with_client(
        fx.args(&fx.path("missing.jsonl")),
        Arc::new(ScriptedClient::default()),
    )
    .await
    .unwrap_err();

    match err {
        RunError::Config(ConfigError::MissingKey { key, .. }) => assert_eq!(key, "llm.model"),
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_run_against_http_endpoint() {
    let fx = Fixture::new();
    let app = Router::new().route(
        "/v1/chat/completions",
        post(|Json(body): Json<serde_json::Value>| async move {
            let system = body["messages"][0]["content"].as_str().unwrap_or_default();
            let content = if system.contains("summarizing analysis reports") {
                "overall: healthy"
            } else {
                "chunk: nothing unusual"
            };
            Json(json!({"choices": [{"message": {"role": "assistant", "content": content}}]}))
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    fx.write_system(&format!("base_url: http://{}/v1\n  concurrency: 4", addr));
    let input = fx.write_input(50);

    let outcome = run(fx.args(&input)).await.unwrap();

    assert_eq!(outcome.stats.records, 50);
    assert_eq!(
        fs::read_to_string(fx.path("out/report.md")).unwrap(),
        "overall: healthy"
    );
}
