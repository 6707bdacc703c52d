//! Per-run scratch space on local disk.
//!
//! Every run gets a video path and a frame directory prefixed with a fresh
//! UUID, so concurrent runs for the same filename never collide. Cleanup is
//! best-effort: each failure is logged and swallowed, and calling it again
//! is harmless.

use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::{debug, warn};
use uuid::Uuid;

use vscore_models::sanitize_filename;

/// Root directory under which run-scoped paths are allocated.
#[derive(Debug, Clone)]
pub struct ScratchSpace {
    root: PathBuf,
}

impl ScratchSpace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Allocate unique paths for one run. Nothing is created on disk.
    pub fn allocate(&self, filename: &str) -> ScratchPaths {
        let run_id = Uuid::new_v4();
        ScratchPaths {
            video: self
                .root
                .join(format!("{}-{}", run_id, sanitize_filename(filename))),
            frames_dir: self.root.join(format!("{}-frames", run_id)),
        }
    }

    /// Make sure the root exists.
    pub async fn ensure_root(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await
    }
}

/// Paths owned by a single run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScratchPaths {
    pub video: PathBuf,
    pub frames_dir: PathBuf,
}

impl ScratchPaths {
    /// Remove the downloaded video and every extracted frame.
    ///
    /// Returns the number of removals that failed for reasons other than
    /// the path already being gone.
    pub async fn cleanup(&self) -> usize {
        let mut failures = 0;

        if let Err(e) = tokio::fs::remove_file(&self.video).await {
            if e.kind() != ErrorKind::NotFound {
                warn!("Failed to remove scratch video {}: {}", self.video.display(), e);
                failures += 1;
            }
        }

        match tokio::fs::read_dir(&self.frames_dir).await {
            Ok(mut entries) => {
                loop {
                    match entries.next_entry().await {
                        Ok(Some(entry)) => {
                            let path = entry.path();
                            if let Err(e) = tokio::fs::remove_file(&path).await {
                                if e.kind() != ErrorKind::NotFound {
                                    warn!("Failed to remove frame {}: {}", path.display(), e);
                                    failures += 1;
                                }
                            }
                        }
                        Ok(None) => break,
                        Err(e) => {
                            warn!(
                                "Failed to list frames in {}: {}",
                                self.frames_dir.display(),
                                e
                            );
                            failures += 1;
                            break;
                        }
                    }
                }

                if let Err(e) = tokio::fs::remove_dir(&self.frames_dir).await {
                    if e.kind() != ErrorKind::NotFound {
                        warn!(
                            "Failed to remove frame directory {}: {}",
                            self.frames_dir.display(),
                            e
                        );
                        failures += 1;
                    }
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                warn!(
                    "Failed to open frame directory {}: {}",
                    self.frames_dir.display(),
                    e
                );
                failures += 1;
            }
        }

        debug!(failures, "Scratch cleanup finished for {}", self.video.display());
        failures
    }
}
