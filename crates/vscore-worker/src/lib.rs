//! Video analysis pipeline.
//!
//! A run downloads the uploaded video, samples frames with FFmpeg, asks the
//! vision model for a marketing score, and records the outcome. Runs are
//! detached from the request that triggers them and report only through
//! the stored video status.

pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod prompt;
pub mod retry;
pub mod sweep;

pub use config::PipelineConfig;
pub use error::{WorkerError, WorkerResult};
pub use logging::RunLogger;
pub use pipeline::{AnalysisPipeline, RunOutcome, VideoJob};
pub use retry::{retry_async, FailureTracker, RetryConfig};
pub use sweep::StaleRunSweeper;
