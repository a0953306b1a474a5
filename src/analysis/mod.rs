pub mod analyzer;
pub mod prompt;
pub mod reducer;

pub use analyzer::{ChunkAnalyzer, ChunkSummary, CHUNK_FAILED_SENTINEL};
pub use prompt::{PromptError, PromptSource};
pub use reducer::{FinalReport, Reducer, NO_SUMMARIES_REPORT, REDUCE_FAILED_SENTINEL};
