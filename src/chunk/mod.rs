pub mod builder;
pub mod estimate;

pub use builder::{Chunk, ChunkBuilder, ChunkError};
pub use estimate::{CharRatioEstimator, TokenEstimator, DEFAULT_CHARS_PER_TOKEN};
