use crate::llm::types::{CompletionRequest, CompletionResponse};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization/deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("endpoint returned error status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("completion contained no text")]
    EmptyResponse,
}

impl LlmError {
    /// Short error category for log lines; never includes response bodies
    pub fn kind(&self) -> &'static str {
        match self {
            LlmError::Http(e) if e.is_timeout() => "timeout",
            LlmError::Http(e) if e.is_connect() => "connection",
            LlmError::Http(_) => "transport",
            LlmError::Json(_) => "decode",
            LlmError::Api { status: 401, .. } | LlmError::Api { status: 403, .. } => {
                "authentication"
            }
            LlmError::Api { status: 429, .. } => "rate_limited",
            LlmError::Api { .. } => "api",
            LlmError::EmptyResponse => "empty_response",
        }
    }
}

pub type Result<T> = std::result::Result<T, LlmError>;

/// A chat-completion endpoint: one ordered list of turns in, one text out.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Client for OpenAI-compatible `/chat/completions` endpoints
#[derive(Debug)]
pub struct OpenAiClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(base_url: &str, api_key: String, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client: builder.build()?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(LlmError::Api {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let body = response.bytes().await?;
        let completion: CompletionResponse = serde_json::from_slice(&body)?;
        completion.into_text().ok_or(LlmError::EmptyResponse)
    }
}
