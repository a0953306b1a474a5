pub mod progress;
pub mod runner;

pub use progress::{estimate_batches, BarProgress, LogProgress, NoProgress, ProgressReporter};
pub use runner::{write_report, Pipeline, PipelineError, PipelineOutcome, PipelineStats};
