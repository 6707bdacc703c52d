//! Pipeline configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Parent directory for per-run scratch files
    pub scratch_dir: PathBuf,
    /// Frames sampled per video
    pub frame_count: usize,
    /// Frame width in pixels
    pub frame_width: u32,
    /// Retries after the first download attempt
    pub download_retries: u32,
    /// Retries after the first inference attempt
    pub inference_retries: u32,
    /// Base backoff delay, doubled per retry
    pub retry_base_delay: Duration,
    pub download_timeout: Duration,
    pub extract_timeout: Duration,
    /// PROCESSING runs without a heartbeat for this long are failed by the
    /// sweeper
    pub stale_after: Duration,
    /// How often an in-flight run refreshes its video; kept below a third
    /// of `stale_after`
    pub heartbeat_interval: Duration,
    pub sweep_interval: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            scratch_dir: std::env::temp_dir().join("vidscore"),
            frame_count: 5,
            frame_width: 640,
            download_retries: 2,
            inference_retries: 2,
            retry_base_delay: Duration::from_millis(500),
            download_timeout: Duration::from_secs(600),
            extract_timeout: Duration::from_secs(300),
            stale_after: Duration::from_secs(1800),
            heartbeat_interval: Duration::from_secs(60),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let config = Self {
            scratch_dir: std::env::var("PIPELINE_SCRATCH_DIR")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.scratch_dir),
            frame_count: env_parse("PIPELINE_FRAME_COUNT")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.frame_count),
            frame_width: env_parse("PIPELINE_FRAME_WIDTH")
                .filter(|w| *w > 0)
                .unwrap_or(defaults.frame_width),
            download_retries: env_parse("PIPELINE_DOWNLOAD_RETRIES")
                .unwrap_or(defaults.download_retries),
            inference_retries: env_parse("PIPELINE_INFERENCE_RETRIES")
                .unwrap_or(defaults.inference_retries),
            retry_base_delay: env_parse("PIPELINE_RETRY_BASE_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_base_delay),
            download_timeout: env_parse("PIPELINE_DOWNLOAD_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.download_timeout),
            extract_timeout: env_parse("PIPELINE_EXTRACT_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.extract_timeout),
            stale_after: env_parse("PIPELINE_STALE_AFTER_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.stale_after),
            heartbeat_interval: env_parse("PIPELINE_HEARTBEAT_SECS")
                .filter(|s| *s > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.heartbeat_interval),
            sweep_interval: env_parse("PIPELINE_SWEEP_INTERVAL_SECS")
                .filter(|s| *s > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.sweep_interval),
        };
        config.with_heartbeat_bound()
    }

    /// Cap the heartbeat so a live run always refreshes several times per
    /// staleness window.
    pub fn with_heartbeat_bound(mut self) -> Self {
        let ceiling = self.stale_after / 3;
        if !ceiling.is_zero() && self.heartbeat_interval > ceiling {
            self.heartbeat_interval = ceiling;
        }
        self
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.frame_count, 5);
        assert_eq!(config.frame_width, 640);
        assert_eq!(config.stale_after, Duration::from_secs(1800));
        assert!(config.heartbeat_interval * 3 <= config.stale_after);
    }

    #[test]
    fn test_heartbeat_capped_below_stale_window() {
        let config = PipelineConfig {
            stale_after: Duration::from_secs(90),
            heartbeat_interval: Duration::from_secs(600),
            ..PipelineConfig::default()
        }
        .with_heartbeat_bound();
        assert_eq!(config.heartbeat_interval, Duration::from_secs(30));

        let untouched = PipelineConfig::default().with_heartbeat_bound();
        assert_eq!(untouched.heartbeat_interval, Duration::from_secs(60));
    }
}
