use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// How long a generated file stays available.
pub const FILE_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: usize,
    pub removed: usize,
    pub failed: usize,
}

/// Periodically deletes audio files older than the TTL.
pub struct Janitor {
    dir: PathBuf,
    ttl: Duration,
    interval: Duration,
}

impl Janitor {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            dir: dir.into(),
            ttl,
            interval: ttl,
        }
    }

    #[cfg(test)]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run sweeps forever on the janitor's interval. The first sweep happens
    /// one interval after start.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut timer = time::interval_at(Instant::now() + self.interval, self.interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                timer.tick().await;
                let report = self.sweep().await;
                tracing::info!(
                    "Janitor pass: scanned {}, removed {}, failed {}",
                    report.scanned,
                    report.removed,
                    report.failed
                );
            }
        })
    }

    pub async fn sweep(&self) -> SweepReport {
        self.sweep_at(SystemTime::now()).await
    }

    /// Delete every regular file whose age at `now` exceeds the TTL.
    ///
    /// A file that cannot be inspected or removed is logged and skipped; the
    /// rest of the directory is still swept.
    pub async fn sweep_at(&self, now: SystemTime) -> SweepReport {
        let mut report = SweepReport::default();

        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Cannot read {}: {}", self.dir.display(), e);
                return report;
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!("Cannot list {}: {}", self.dir.display(), e);
                    report.failed += 1;
                    break;
                }
            };

            let path = entry.path();
            let modified = match entry.metadata().await {
                Ok(meta) if !meta.is_file() => continue,
                Ok(meta) => meta.modified(),
                Err(e) => Err(e),
            };
            report.scanned += 1;

            let modified = match modified {
                Ok(modified) => modified,
                Err(e) => {
                    tracing::warn!("Cannot stat {}: {}", path.display(), e);
                    report.failed += 1;
                    continue;
                }
            };

            // Clock skew puts mtime in the future; treat that as brand new.
            let age = now.duration_since(modified).unwrap_or_default();
            if age <= self.ttl {
                continue;
            }

            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    report.removed += 1;
                    tracing::info!("Deleted expired file: {}", file_name(&path));
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!("Cannot delete {}: {}", path.display(), e);
                }
            }
        }

        report
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
