pub mod client;
pub mod types;

pub use client::{CompletionClient, LlmError, OpenAiClient, DEFAULT_BASE_URL};
pub use types::{ChatMessage, CompletionRequest, CompletionResponse, Role};
