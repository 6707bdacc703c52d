//! Still-frame extraction.
//!
//! Frames are written as `screenshot-{n}.jpg` with a 1-based ordinal `n` and
//! always read back in numeric ordinal order, so `screenshot-2.jpg` comes
//! before `screenshot-10.jpg`.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::probe::probe_duration;

/// File name prefix of every extracted frame.
pub const FRAME_FILE_PREFIX: &str = "screenshot-";

const FRAME_EXTENSION: &str = "jpg";

/// Produces still images from a local video file.
#[async_trait]
pub trait FrameExtractor: Send + Sync {
    /// Write up to `count` frames into `out_dir` and return their paths in
    /// ascending ordinal order. Never returns an empty list.
    async fn extract(&self, video: &Path, out_dir: &Path, count: usize)
        -> MediaResult<Vec<PathBuf>>;
}

/// [`FrameExtractor`] backed by the `ffmpeg`/`ffprobe` binaries.
#[derive(Debug, Clone)]
pub struct FfmpegFrameExtractor {
    /// Frames are scaled to this width, height follows aspect ratio
    width: u32,
    /// Per-invocation process timeout
    timeout_secs: u64,
}

impl FfmpegFrameExtractor {
    pub fn new(width: u32, timeout_secs: u64) -> Self {
        Self {
            width,
            timeout_secs,
        }
    }

    fn frame_command(&self, video: &Path, output: &Path, at: f64) -> FfmpegCommand {
        FfmpegCommand::new(video, output)
            .seek(at)
            .single_frame()
            .video_filter(format!("scale={}:-2", self.width))
            .jpeg_quality(3)
            .log_level("error")
    }
}

impl Default for FfmpegFrameExtractor {
    fn default() -> Self {
        Self::new(640, 300)
    }
}

#[async_trait]
impl FrameExtractor for FfmpegFrameExtractor {
    async fn extract(
        &self,
        video: &Path,
        out_dir: &Path,
        count: usize,
    ) -> MediaResult<Vec<PathBuf>> {
        tokio::fs::create_dir_all(out_dir).await?;

        let duration = probe_duration(video).await?;
        let runner = FfmpegRunner::new().with_timeout(self.timeout_secs);

        for (idx, at) in sample_timestamps(duration, count).into_iter().enumerate() {
            let output = out_dir.join(frame_file_name(idx + 1));
            debug!(at, output = %output.display(), "Extracting frame");
            runner.run(&self.frame_command(video, &output, at)).await?;
        }

        let frames = list_frames_sorted(out_dir).await?;
        if frames.is_empty() {
            return Err(MediaError::NoFrames(out_dir.to_path_buf()));
        }

        info!(
            requested = count,
            produced = frames.len(),
            "Extracted frames from {}",
            video.display()
        );
        Ok(frames)
    }
}

/// Timestamps splitting `duration` into `count + 1` equal intervals.
///
/// The endpoints are excluded so no sample lands on a black lead-in or past
/// the last decodable frame.
pub fn sample_timestamps(duration: f64, count: usize) -> Vec<f64> {
    if count == 0 || duration <= 0.0 {
        return Vec::new();
    }
    let step = duration / (count as f64 + 1.0);
    (1..=count).map(|i| step * i as f64).collect()
}

fn frame_file_name(ordinal: usize) -> String {
    format!("{FRAME_FILE_PREFIX}{ordinal}.{FRAME_EXTENSION}")
}

/// Parse the ordinal out of a frame file name such as `screenshot-7.jpg`.
pub fn frame_ordinal(file_name: &str) -> Option<u32> {
    file_name
        .strip_prefix(FRAME_FILE_PREFIX)?
        .strip_suffix(FRAME_EXTENSION)?
        .strip_suffix('.')?
        .parse()
        .ok()
}

/// List frame files in `dir` ordered by numeric ordinal.
///
/// Files that do not follow the frame naming scheme are ignored.
pub async fn list_frames_sorted(dir: &Path) -> MediaResult<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut frames = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        if let Some(ordinal) = name.to_str().and_then(frame_ordinal) {
            frames.push((ordinal, entry.path()));
        }
    }

    frames.sort_by_key(|(ordinal, _)| *ordinal);
    Ok(frames.into_iter().map(|(_, path)| path).collect())
}
