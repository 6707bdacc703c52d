//! The analysis pipeline.
//!
//! `download -> extract frames -> infer -> parse -> persist`, with scratch
//! cleanup on every exit path before the final status is written.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn, Instrument};
use vscore_db::VideoStore;
use vscore_media::{
    list_frames_sorted, FrameExtractor, MediaError, MediaFetcher, ScratchPaths, ScratchSpace,
};
use vscore_ml_client::{ImagePayload, MlError, VisionModel, VisionRequest};
use vscore_models::{AnalysisRecord, AnalysisResult, VideoId, VideoRecord};

use crate::config::PipelineConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::RunLogger;
use crate::prompt::{user_prompt, ANALYSIS_SYSTEM_PROMPT};
use crate::retry::{retry_async, RetryConfig};

/// What a run needs to know about its video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoJob {
    pub id: VideoId,
    pub source_url: String,
    pub original_name: String,
}

impl VideoJob {
    /// `None` when no blob URL has been recorded yet.
    pub fn from_record(record: &VideoRecord) -> Option<Self> {
        Some(Self {
            id: record.id.clone(),
            source_url: record.url.clone()?,
            original_name: record.original_name.clone(),
        })
    }
}

/// Final result of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed { overall_score: i64 },
    Failed { kind: &'static str },
}

/// Drives one video from PROCESSING to COMPLETED or FAILED.
///
/// Cheap to share: every collaborator sits behind an `Arc`.
#[derive(Clone)]
pub struct AnalysisPipeline {
    config: PipelineConfig,
    scratch: ScratchSpace,
    fetcher: Arc<dyn MediaFetcher>,
    extractor: Arc<dyn FrameExtractor>,
    /// `None` when the model backend has no endpoint or credential
    vision: Option<Arc<dyn VisionModel>>,
    store: Arc<dyn VideoStore>,
}

impl AnalysisPipeline {
    pub fn new(
        config: PipelineConfig,
        fetcher: Arc<dyn MediaFetcher>,
        extractor: Arc<dyn FrameExtractor>,
        vision: Option<Arc<dyn VisionModel>>,
        store: Arc<dyn VideoStore>,
    ) -> Self {
        Self {
            scratch: ScratchSpace::new(&config.scratch_dir),
            config,
            fetcher,
            extractor,
            vision,
            store,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn vision_configured(&self) -> bool {
        self.vision.is_some()
    }

    /// Run the pipeline for a video already marked PROCESSING.
    ///
    /// Never returns an error: every failure is logged and becomes a FAILED
    /// status.
    pub async fn run(&self, job: VideoJob) -> RunOutcome {
        let logger = RunLogger::new(&job.id);
        let span = logger.create_span();
        self.run_inner(job, logger).instrument(span).await
    }

    async fn run_inner(&self, job: VideoJob, logger: RunLogger) -> RunOutcome {
        let started = Instant::now();
        logger.log_start(&job.original_name);

        let outcome = match &self.vision {
            None => Err(WorkerError::config_error(
                "vision model endpoint or API key not configured",
            )),
            Some(vision) => {
                let heartbeat = Heartbeat::start(
                    self.store.clone(),
                    job.id.clone(),
                    self.config.heartbeat_interval,
                );
                let paths = self.scratch.allocate(&job.original_name);
                let result = self.execute(&job, &paths, vision.as_ref(), &logger).await;
                drop(heartbeat);

                let failures = paths.cleanup().await;
                if failures > 0 {
                    logger.log_warning(&format!("{failures} scratch paths could not be removed"));
                }
                result
            }
        };

        let outcome = match outcome {
            Ok(analysis) => match self.store.complete_with_analysis(&analysis).await {
                Ok(()) => Ok(analysis),
                Err(e) => Err(WorkerError::from(e)),
            },
            Err(e) => Err(e),
        };

        metrics::histogram!("vscore_pipeline_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        match outcome {
            Ok(analysis) => {
                metrics::counter!("vscore_analyses_completed_total").increment(1);
                logger.log_completion(analysis.overall_score, started.elapsed().as_millis());
                RunOutcome::Completed {
                    overall_score: analysis.overall_score,
                }
            }
            Err(e) => {
                let kind = e.kind();
                metrics::counter!("vscore_analyses_failed_total", "kind" => kind).increment(1);
                logger.log_error(kind, &e.to_string());

                match self.store.mark_failed(&job.id).await {
                    Ok(true) => {}
                    Ok(false) => {
                        logger.log_warning("video was no longer PROCESSING, status left unchanged")
                    }
                    Err(db) => logger.log_error(
                        "persistence",
                        &format!("could not mark video failed: {db}"),
                    ),
                }
                RunOutcome::Failed { kind }
            }
        }
    }

    /// Steps 2-6. Produces the record to persist.
    async fn execute(
        &self,
        job: &VideoJob,
        paths: &ScratchPaths,
        vision: &dyn VisionModel,
        logger: &RunLogger,
    ) -> WorkerResult<AnalysisRecord> {
        self.scratch.ensure_root().await?;

        let step = Instant::now();
        self.download(&job.source_url, &paths.video).await?;
        record_step("download", step, logger);

        let step = Instant::now();
        let images = self.extract_frames(&paths.video, &paths.frames_dir).await?;
        record_step("extraction", step, logger);

        let request = VisionRequest {
            system: ANALYSIS_SYSTEM_PROMPT.to_string(),
            user: user_prompt(&job.original_name),
            images,
        };

        let step = Instant::now();
        let text = self.infer(vision, &request).await?;
        record_step("inference", step, logger);

        let result = AnalysisResult::from_completion(&text)
            .map_err(|e| WorkerError::parse_failed(e.to_string()))?;

        Ok(AnalysisRecord::from_result(job.id.clone(), result))
    }

    async fn download(&self, url: &str, dest: &Path) -> WorkerResult<()> {
        let retry = RetryConfig::new("download")
            .with_max_retries(self.config.download_retries)
            .with_base_delay(self.config.retry_base_delay);
        let timeout = self.config.download_timeout;

        retry_async(
            &retry,
            || async move {
                // a failed attempt may leave a partial file behind
                match tokio::fs::remove_file(dest).await {
                    Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
                        return Err(MediaError::Io(e))
                    }
                    _ => {}
                }
                tokio::time::timeout(timeout, self.fetcher.fetch(url, dest))
                    .await
                    .unwrap_or_else(|_| Err(MediaError::Timeout(timeout.as_secs())))
            },
            MediaError::is_retryable,
        )
        .await
        .map(|_| ())
        .map_err(|e| WorkerError::download_failed(e.to_string()))
    }

    /// Extract frames, then read them back in ordinal order from disk.
    async fn extract_frames(
        &self,
        video: &Path,
        frames_dir: &Path,
    ) -> WorkerResult<Vec<ImagePayload>> {
        let timeout = self.config.extract_timeout;
        tokio::time::timeout(
            timeout,
            self.extractor.extract(video, frames_dir, self.config.frame_count),
        )
        .await
        .unwrap_or_else(|_| Err(MediaError::Timeout(timeout.as_secs())))
        .map_err(|e| WorkerError::extraction_failed(e.to_string()))?;

        let frames = list_frames_sorted(frames_dir)
            .await
            .map_err(|e| WorkerError::extraction_failed(e.to_string()))?;
        if frames.is_empty() {
            return Err(WorkerError::extraction_failed("no frames were produced"));
        }

        let mut images = Vec::with_capacity(frames.len());
        for frame in &frames {
            let data = tokio::fs::read(frame).await.map_err(|e| {
                WorkerError::extraction_failed(format!("failed to read {}: {e}", frame.display()))
            })?;
            images.push(ImagePayload::jpeg(data));
        }
        Ok(images)
    }

    async fn infer(
        &self,
        vision: &dyn VisionModel,
        request: &VisionRequest,
    ) -> WorkerResult<String> {
        let retry = RetryConfig::new("inference")
            .with_max_retries(self.config.inference_retries)
            .with_base_delay(self.config.retry_base_delay);

        retry_async(&retry, || vision.complete(request), MlError::is_retryable)
            .await
            .map_err(|e| match e {
                // a reply with no text is unusable output, not a backend fault
                MlError::EmptyCompletion => WorkerError::parse_failed(e.to_string()),
                e => WorkerError::inference_failed(e.to_string()),
            })
    }
}

/// Refreshes a PROCESSING video while its run is in flight, so the stale
/// sweeper only sees runs whose process is gone. Stops when dropped.
struct Heartbeat(JoinHandle<()>);

impl Heartbeat {
    fn start(store: Arc<dyn VideoStore>, id: VideoId, every: Duration) -> Self {
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every.max(Duration::from_millis(1)));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                match store.heartbeat(&id).await {
                    Ok(true) => {}
                    Ok(false) => {
                        debug!(video_id = %id, "Video left PROCESSING, heartbeat stopped");
                        return;
                    }
                    Err(e) => warn!(video_id = %id, error = %e, "Heartbeat failed"),
                }
            }
        });
        Self(task)
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.0.abort();
    }
}

fn record_step(step: &'static str, started: Instant, logger: &RunLogger) {
    let elapsed = started.elapsed();
    metrics::histogram!("vscore_pipeline_step_duration_seconds", "step" => step)
        .record(elapsed.as_secs_f64());
    logger.log_step(step, elapsed.as_millis());
}
