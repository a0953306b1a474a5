use crate::config::Ordering;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;
use tracing::{debug, info};

/// Receives progress notifications from the pipeline.
///
/// Batch indices and per-batch chunk counts only ever increase.
pub trait ProgressReporter: Send + Sync {
    fn batch_started(&self, _batch: usize, _chunks: usize) {}

    /// `completed` chunks of `total` in this batch have been analyzed
    fn chunk_finished(&self, _batch: usize, _completed: usize, _total: usize, _failed: bool) {}

    fn batch_finished(&self, _batch: usize) {}

    fn reduce_started(&self, _summaries: usize) {}

    fn finished(&self) {}
}

/// Discards all progress
pub struct NoProgress;

impl ProgressReporter for NoProgress {}

/// Reports progress through tracing
pub struct LogProgress {
    total_batches: Option<usize>,
}

impl LogProgress {
    pub fn new(total_batches: Option<usize>) -> Self {
        Self { total_batches }
    }
}

impl ProgressReporter for LogProgress {
    fn batch_started(&self, batch: usize, chunks: usize) {
        match self.total_batches {
            Some(total) => info!(batch = batch + 1, total, chunks, "Analyzing batch"),
            None => info!(batch = batch + 1, chunks, "Analyzing batch"),
        }
    }

    fn chunk_finished(&self, batch: usize, completed: usize, total: usize, failed: bool) {
        debug!(batch = batch + 1, completed, total, failed, "Chunk finished");
    }

    fn reduce_started(&self, summaries: usize) {
        info!(summaries, "All chunks analyzed");
    }
}

/// Terminal progress bars: one for batches, one for chunks in the current batch
pub struct BarProgress {
    _multi: MultiProgress,
    batches: ProgressBar,
    chunks: ProgressBar,
}

impl BarProgress {
    pub fn new(total_batches: Option<usize>) -> Self {
        let multi = MultiProgress::with_draw_target(ProgressDrawTarget::stderr_with_hz(12));

        let batches = match total_batches {
            Some(total) => ProgressBar::new(total as u64),
            None => ProgressBar::new_spinner(),
        };
        batches.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} [{elapsed_precise}] batches {pos}/{len} {wide_bar:.cyan/blue} {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        let batches = multi.add(batches);
        batches.enable_steady_tick(Duration::from_millis(120));

        let chunks = multi.add(ProgressBar::new(0));
        chunks.set_style(
            ProgressStyle::with_template("  chunks in batch {pos}/{len} {bar:30.green/white} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        Self {
            _multi: multi,
            batches,
            chunks,
        }
    }
}

impl ProgressReporter for BarProgress {
    fn batch_started(&self, _batch: usize, chunks: usize) {
        self.chunks.reset();
        self.chunks.set_length(chunks as u64);
        self.chunks.set_message("");
    }

    fn chunk_finished(&self, _batch: usize, completed: usize, _total: usize, failed: bool) {
        self.chunks.set_position(completed as u64);
        if failed {
            self.chunks.set_message("(some chunks failed)");
        }
    }

    fn batch_finished(&self, _batch: usize) {
        self.batches.inc(1);
    }

    fn reduce_started(&self, _summaries: usize) {
        self.chunks.finish_and_clear();
        self.batches.set_message("generating final report");
    }

    fn finished(&self) {
        self.batches.finish_and_clear();
    }
}

/// Number of batches the pipeline will process for `records` input records
pub fn estimate_batches(records: usize, batch_size: usize, ordering: Ordering) -> usize {
    match ordering {
        // The whole file is analyzed as one batch
        Ordering::Global => usize::from(records > 0),
        Ordering::StreamOrder | Ordering::Batch if batch_size == 0 => 0,
        Ordering::StreamOrder | Ordering::Batch => records.div_ceil(batch_size),
    }
}
