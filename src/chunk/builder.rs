use crate::chunk::estimate::TokenEstimator;
use crate::source::record::LogRecord;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ChunkError {
    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
}

const RECORD_SEPARATOR: &str = "\n";

/// A group of serialized records sent to the LLM as one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Position of the chunk within its batch
    pub index: usize,
    pub text: String,
    pub record_count: usize,
    /// Size of `text` in the estimator's unit
    pub size: usize,
    pub approx_tokens: f64,
}

impl Chunk {
    /// Serialized records, one per line
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.split(RECORD_SEPARATOR)
    }
}

/// Packs ordered records into chunks under a token budget.
///
/// Records are never split or reordered. A record that alone exceeds the
/// budget forms its own chunk.
#[derive(Clone)]
pub struct ChunkBuilder {
    token_budget: usize,
    estimator: Arc<dyn TokenEstimator>,
}

impl ChunkBuilder {
    pub fn new(token_budget: usize, estimator: Arc<dyn TokenEstimator>) -> Self {
        Self {
            token_budget,
            estimator,
        }
    }

    pub fn token_budget(&self) -> usize {
        self.token_budget
    }

    /// Size limit per chunk in the estimator's unit
    pub fn capacity(&self) -> usize {
        self.estimator.capacity(self.token_budget)
    }

    pub fn build(&self, records: &[LogRecord]) -> Result<Vec<Chunk>, ChunkError> {
        let lines = records
            .iter()
            .map(LogRecord::to_json_line)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.pack(lines))
    }

    /// Pack already-serialized lines, preserving their order.
    pub fn pack<I>(&self, lines: I) -> Vec<Chunk>
    where
        I: IntoIterator<Item = String>,
    {
        let capacity = self.capacity();
        let separator_size = self.estimator.measure(RECORD_SEPARATOR);

        let mut chunks = Vec::new();
        let mut current: Vec<String> = Vec::new();
        let mut current_size = 0usize;

        for line in lines {
            let line_size = self.estimator.measure(&line);

            if !current.is_empty() && current_size + separator_size + line_size > capacity {
                let full = std::mem::take(&mut current);
                chunks.push(self.finish(chunks.len(), full, current_size));
                current_size = 0;
            }

            if !current.is_empty() {
                current_size += separator_size;
            }
            current_size += line_size;
            current.push(line);
        }

        if !current.is_empty() {
            chunks.push(self.finish(chunks.len(), current, current_size));
        }

        debug!(chunks = chunks.len(), capacity, "Built chunks");
        chunks
    }

    fn finish(&self, index: usize, lines: Vec<String>, size: usize) -> Chunk {
        if lines.len() == 1 && size > self.capacity() {
            debug!(index, size, "Single record exceeds chunk budget");
        }
        Chunk {
            index,
            record_count: lines.len(),
            text: lines.join(RECORD_SEPARATOR),
            size,
            approx_tokens: self.estimator.tokens(size),
        }
    }
}

impl std::fmt::Debug for ChunkBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkBuilder")
            .field("token_budget", &self.token_budget)
            .finish_non_exhaustive()
    }
}
