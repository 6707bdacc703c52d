//! Background recovery of runs that never finished.
//!
//! A run that dies with its process leaves the video PROCESSING forever.
//! Live runs heartbeat their video, so the sweeper periodically fails every
//! PROCESSING video whose last update is older than the configured bound.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::interval;
use tracing::{error, info, warn};

use vscore_db::VideoStore;
use vscore_models::VideoId;

use crate::retry::FailureTracker;

/// Periodic stale-run sweeper.
pub struct StaleRunSweeper {
    store: Arc<dyn VideoStore>,
    stale_after: Duration,
    interval: Duration,
}

impl StaleRunSweeper {
    pub fn new(store: Arc<dyn VideoStore>, stale_after: Duration, interval: Duration) -> Self {
        Self {
            store,
            stale_after,
            interval,
        }
    }

    /// Loop until `shutdown` flips to `true`.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Starting stale run sweeper (interval: {:?}, stale after: {:?})",
            self.interval, self.stale_after
        );

        let mut ticker = interval(self.interval);
        let mut failures = FailureTracker::new(3);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Stale run sweeper stopped");
                        return;
                    }
                    continue;
                }
            }

            match self.sweep_once().await {
                Ok(_) => failures.record_success(),
                Err(e) => {
                    if failures.record_failure() {
                        error!("Stale run sweep failed: {:#}", e);
                    }
                }
            }
        }
    }

    /// Fail every PROCESSING video not refreshed within the bound.
    pub async fn sweep_once(&self) -> anyhow::Result<Vec<VideoId>> {
        let stale_after = chrono::Duration::from_std(self.stale_after)?;
        let cutoff = chrono::Utc::now() - stale_after;

        let recovered = self.store.fail_stale_processing(cutoff).await?;
        for id in &recovered {
            warn!(video_id = %id, "Recovered stale PROCESSING video as FAILED");
        }
        if !recovered.is_empty() {
            metrics::counter!("vscore_stale_runs_recovered_total")
                .increment(recovered.len() as u64);
        }
        Ok(recovered)
    }
}
