//! Expiry of published ringtones and abandoned scratch namespaces.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::config::Config;

/// What a sweep removed
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub removed: usize,
    pub kept: usize,
    pub failed: usize,
}

/// Remove entries of `dir` last modified more than `max_age` ago.
///
/// Directories are removed with their contents. A missing `dir` is an empty sweep.
pub async fn sweep_expired(dir: &Path, max_age: Duration) -> Result<SweepReport> {
    let mut report = SweepReport::default();

    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(report),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to list {}", dir.display()));
        }
    };

    let cutoff = Utc::now()
        - chrono::Duration::from_std(max_age).unwrap_or_else(|_| chrono::Duration::zero());

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let metadata = match entry.metadata().await {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Cannot stat entry");
                report.failed += 1;
                continue;
            }
        };

        let modified: DateTime<Utc> = match metadata.modified() {
            Ok(time) => time.into(),
            Err(_) => {
                report.kept += 1;
                continue;
            }
        };

        if modified > cutoff {
            report.kept += 1;
            continue;
        }

        let removal = if metadata.is_dir() {
            tokio::fs::remove_dir_all(&path).await
        } else {
            tokio::fs::remove_file(&path).await
        };

        match removal {
            Ok(()) => {
                tracing::debug!(path = %path.display(), modified = %modified, "Expired");
                report.removed += 1;
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to remove expired entry");
                report.failed += 1;
            }
        }
    }

    Ok(report)
}

/// Sweeps the downloads directory and the scratch namespaces
#[derive(Debug, Clone)]
pub struct Sweeper {
    downloads_dir: PathBuf,
    download_ttl: Option<Duration>,
    scratch_dirs: Vec<PathBuf>,
    scratch_grace: Duration,
    interval: Duration,
}

impl Sweeper {
    pub fn from_config(config: &Config) -> Self {
        let retention = &config.retention;
        Self {
            downloads_dir: config.paths.downloads_dir.clone(),
            download_ttl: (retention.download_ttl_hours > 0)
                .then(|| Duration::from_secs(retention.download_ttl_hours * 3600)),
            scratch_dirs: vec![config.ringtone_staging_dir(), config.convert_scratch_dir()],
            scratch_grace: Duration::from_secs(retention.scratch_grace_minutes * 60),
            interval: Duration::from_secs(retention.sweep_interval_minutes.max(1) * 60),
        }
    }

    /// Clear scratch namespaces older than the grace period
    pub async fn sweep_scratch(&self) -> SweepReport {
        let mut total = SweepReport::default();
        for dir in &self.scratch_dirs {
            match sweep_expired(dir, self.scratch_grace).await {
                Ok(report) => {
                    total.removed += report.removed;
                    total.kept += report.kept;
                    total.failed += report.failed;
                }
                Err(e) => tracing::warn!(dir = %dir.display(), error = %e, "Scratch sweep failed"),
            }
        }
        total
    }

    /// Delete published ringtones past their TTL; `None` when retention is disabled
    pub async fn sweep_downloads(&self) -> Option<SweepReport> {
        let ttl = self.download_ttl?;
        match sweep_expired(&self.downloads_dir, ttl).await {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::warn!(
                    dir = %self.downloads_dir.display(),
                    error = %e,
                    "Download sweep failed"
                );
                None
            }
        }
    }

    /// Sweep scratch, then downloads; returns both reports
    pub async fn run_once(&self) -> (SweepReport, Option<SweepReport>) {
        let scratch = self.sweep_scratch().await;
        let downloads = self.sweep_downloads().await;

        tracing::info!(
            scratch_removed = scratch.removed,
            downloads_removed = downloads.as_ref().map(|r| r.removed).unwrap_or(0),
            downloads_kept = downloads.as_ref().map(|r| r.kept).unwrap_or(0),
            "Retention sweep finished"
        );

        (scratch, downloads)
    }

    /// Run [`Sweeper::run_once`] on the configured interval until the task is aborted
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            // The first tick completes immediately; startup already swept
            ticker.tick().await;
            loop {
                ticker.tick().await;
                self.run_once().await;
            }
        })
    }
}
