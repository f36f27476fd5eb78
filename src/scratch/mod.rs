//! Per-request scratch namespaces and file publishing.
//!
//! Every request that touches the filesystem works inside its own
//! `<root>/<uuid>` directory, so concurrent requests never see each other's
//! intermediate files. The directory is removed when the request finishes,
//! whether it succeeded, failed or was dropped mid-flight.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use uuid::Uuid;

/// Create `dir` (and parents) if it does not exist yet
pub async fn ensure_dir(dir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create directory {}", dir.display()))
}

/// A uniquely named directory owned by one request
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
    closed: bool,
}

impl ScratchDir {
    /// Create a fresh namespace under `root`, creating `root` on first use
    pub async fn create(root: &Path) -> Result<Self> {
        let path = root.join(Uuid::new_v4().to_string());
        ensure_dir(&path).await?;

        tracing::debug!(path = %path.display(), "Created scratch directory");
        Ok(Self { path, closed: false })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the directory and anything left in it
    pub async fn close(mut self) {
        self.closed = true;
        if let Err(e) = tokio::fs::remove_dir_all(&self.path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to remove scratch directory"
                );
            }
        }
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to remove scratch directory"
                );
            }
        }
    }
}

/// Delete a scratch file; failures are logged and swallowed
pub async fn discard(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        tracing::warn!(
            path = %path.display(),
            error = %e,
            "Error cleaning up scratch file"
        );
    }
}

/// Move a finished artifact to its public location, replacing any previous file.
///
/// A plain rename is atomic for readers; when `from` and `to` live on
/// different filesystems the file is copied and the source removed. The
/// published file's mtime is set to now, since retention counts from it.
pub async fn publish(from: &Path, to: &Path) -> Result<()> {
    if let Err(rename_err) = tokio::fs::rename(from, to).await {
        tracing::debug!(
            from = %from.display(),
            to = %to.display(),
            error = %rename_err,
            "Rename failed, falling back to copy"
        );
        tokio::fs::copy(from, to)
            .await
            .with_context(|| format!("Failed to publish {}", to.display()))?;
        discard(from).await;
    }

    touch(to)
        .await
        .with_context(|| format!("Failed to update modification time of {}", to.display()))
}

/// Set the modification time of an existing file to now
async fn touch(path: &Path) -> std::io::Result<()> {
    let file = tokio::fs::OpenOptions::new().write(true).open(path).await?;
    let file = file.into_std().await;
    tokio::task::spawn_blocking(move || file.set_modified(SystemTime::now()))
        .await
        .map_err(std::io::Error::other)?
}
