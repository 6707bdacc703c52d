//! Media handling for the analysis pipeline.
//!
//! This crate provides:
//! - HTTP download of uploaded videos into local scratch space
//! - Unique scratch paths with best-effort cleanup
//! - Type-safe FFmpeg command building and execution
//! - Evenly spaced still-frame extraction

pub mod command;
pub mod download;
pub mod error;
pub mod frames;
pub mod probe;
pub mod scratch;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use download::{HttpFetcher, MediaFetcher};
pub use error::{MediaError, MediaResult};
pub use frames::{
    frame_ordinal, list_frames_sorted, sample_timestamps, FfmpegFrameExtractor, FrameExtractor,
    FRAME_FILE_PREFIX,
};
pub use probe::{probe_duration, parse_duration};
pub use scratch::{ScratchPaths, ScratchSpace};
