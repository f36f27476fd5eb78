use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::Config;
use crate::scratch::{discard, ensure_dir, publish, ScratchDir};
use crate::tools::{AudioFormat, MediaDownloader, TrimWindow};
use crate::utils::{extract_domain, sanitize_title};
use crate::{RingbyteError, Result};

/// Public links to a freshly published ringtone pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadLinks {
    pub mp3: String,
    pub m4r: String,
}

/// Turns a media URL into an MP3 and an M4R clip in the downloads directory
pub struct RingtoneMaker {
    downloader: Arc<dyn MediaDownloader>,
    downloads_dir: PathBuf,
    downloads_route: String,
    staging_root: PathBuf,
    trim: TrimWindow,
}

impl RingtoneMaker {
    pub fn new(
        downloader: Arc<dyn MediaDownloader>,
        downloads_dir: impl Into<PathBuf>,
        downloads_route: impl Into<String>,
        staging_root: impl Into<PathBuf>,
        trim: TrimWindow,
    ) -> Self {
        Self {
            downloader,
            downloads_dir: downloads_dir.into(),
            downloads_route: downloads_route.into().trim_end_matches('/').to_string(),
            staging_root: staging_root.into(),
            trim,
        }
    }

    pub fn from_config(config: &Config, downloader: Arc<dyn MediaDownloader>) -> Self {
        Self::new(
            downloader,
            &config.paths.downloads_dir,
            &config.paths.downloads_route,
            config.ringtone_staging_dir(),
            config.trim_window(),
        )
    }

    pub fn downloads_dir(&self) -> &Path {
        &self.downloads_dir
    }

    /// Produce `<title>.mp3` and `<title>.m4r` for `url` and return their links.
    ///
    /// Either both files are published or neither is; the staging directory
    /// is gone when this returns.
    pub async fn make(&self, url: &str) -> Result<DownloadLinks> {
        ensure_dir(&self.downloads_dir).await?;

        let staging = ScratchDir::create(&self.staging_root).await?;
        let result = self.produce(url, staging.path()).await;
        staging.close().await;

        result
    }

    async fn produce(&self, url: &str, staging: &Path) -> Result<DownloadLinks> {
        tracing::info!(
            host = extract_domain(url).as_deref().unwrap_or("unknown"),
            "Fetching title for: {}",
            url
        );
        let title = self.downloader.fetch_title(url).await?;
        let base = sanitize_title(&title);
        tracing::debug!(title = %title, base = %base, "Resolved ringtone name");

        let mp3_staged = staging.join(format!("{}.{}", base, AudioFormat::Mp3.extension()));
        self.downloader
            .extract_audio(url, AudioFormat::Mp3, self.trim, &mp3_staged)
            .await?;

        let m4a_staged = staging.join(format!("{}.{}", base, AudioFormat::M4a.extension()));
        self.downloader
            .extract_audio(url, AudioFormat::M4a, self.trim, &m4a_staged)
            .await?;

        require_artifact("MP3", &mp3_staged).await?;
        require_artifact("M4A", &m4a_staged).await?;

        let mp3_name = format!("{}.{}", base, AudioFormat::Mp3.extension());
        let m4r_name = format!("{}.{}", base, AudioFormat::M4r.extension());

        let mp3_public = self.downloads_dir.join(&mp3_name);
        publish(&mp3_staged, &mp3_public).await?;
        // M4R is M4A under another extension; no re-encoding needed
        if let Err(e) = publish(&m4a_staged, &self.downloads_dir.join(&m4r_name)).await {
            discard(&mp3_public).await;
            return Err(e);
        }

        tracing::info!(
            mp3 = %mp3_name,
            m4r = %m4r_name,
            dir = %self.downloads_dir.display(),
            "Published ringtone"
        );

        Ok(DownloadLinks {
            mp3: format!("{}/{}", self.downloads_route, mp3_name),
            m4r: format!("{}/{}", self.downloads_route, m4r_name),
        })
    }
}

async fn require_artifact(label: &'static str, path: &Path) -> Result<()> {
    let present = tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false);

    if present {
        Ok(())
    } else {
        Err(RingbyteError::MissingArtifact {
            label,
            path: path.to_path_buf(),
        }
        .into())
    }
}
