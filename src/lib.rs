pub mod analysis;
pub mod chunk;
pub mod cli;
pub mod config;
pub mod llm;
pub mod pipeline;
pub mod source;
