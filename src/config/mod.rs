use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::tools::TrimWindow;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Filesystem layout
    pub paths: PathsConfig,

    /// External programs
    pub tools: ToolsConfig,

    /// Ringtone clip settings
    pub ringtone: RingtoneConfig,

    /// Upload conversion settings
    pub convert: ConvertConfig,

    /// Expiry of published downloads and stale scratch space
    pub retention: RetentionConfig,

    /// Log output
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP server binds to
    pub bind_address: String,

    /// Comma-separated CORS origins; any origin when unset
    pub cors_allowed_origins: Option<String>,

    /// Largest accepted request body in megabytes
    pub max_upload_mb: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory holding the web UI
    pub static_dir: PathBuf,

    /// Directory ringtones are published to
    pub downloads_dir: PathBuf,

    /// URL prefix `downloads_dir` is served under
    pub downloads_route: String,

    /// Scratch directory for in-flight requests (system temp dir if not set)
    pub scratch_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub yt_dlp_path: String,
    pub ffmpeg_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RingtoneConfig {
    /// Offset into the source audio in seconds
    pub trim_start_secs: u32,

    /// Clip length in seconds
    pub trim_duration_secs: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    /// Target audio bitrate passed to ffmpeg
    pub audio_bitrate: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Published ringtones older than this are deleted (0 keeps them forever)
    pub download_ttl_hours: u64,

    /// How often the sweeper runs
    pub sweep_interval_minutes: u64,

    /// Scratch namespaces older than this are considered abandoned
    pub scratch_grace_minutes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter used when RUST_LOG is not set
    pub filter: String,

    /// Emit newline-delimited JSON instead of human-readable lines
    pub json: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            cors_allowed_origins: None,
            max_upload_mb: 100,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            static_dir: PathBuf::from("public"),
            downloads_dir: PathBuf::from("public").join("downloads"),
            downloads_route: "/downloads".to_string(),
            scratch_dir: None,
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            yt_dlp_path: "yt-dlp".to_string(),
            ffmpeg_path: "ffmpeg".to_string(),
        }
    }
}

impl Default for RingtoneConfig {
    fn default() -> Self {
        let trim = TrimWindow::default();
        Self {
            trim_start_secs: trim.start_secs,
            trim_duration_secs: trim.duration_secs,
        }
    }
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            audio_bitrate: "128k".to_string(),
        }
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            download_ttl_hours: 24,
            sweep_interval_minutes: 30,
            scratch_grace_minutes: 60,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "ringbyte=info,tower_http=info".to_string(),
            json: false,
        }
    }
}

impl Config {
    /// Load configuration from file or create default.
    ///
    /// An explicit path must exist. Otherwise `./config.yaml` is preferred over
    /// the per-user config directory, where a default file is written on first run.
    pub async fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::read_from(path);
        }

        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::read_from(&config_path)
        } else {
            let config = Self::default();
            if let Err(e) = config.save(&config_path).await {
                tracing::warn!(
                    path = %config_path.display(),
                    error = %e,
                    "Could not write default config file"
                );
            }
            Ok(config)
        }
    }

    fn read_from(path: &Path) -> Result<Self> {
        let content = fs_err::read_to_string(path).context("Failed to read config file")?;

        let config: Config =
            serde_yaml::from_str(&content).context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;

        fs_err::write(path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir().context("Could not determine config directory")?;

        Ok(config_dir.join("ringbyte").join("config.yaml"))
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.ringtone.trim_duration_secs == 0 {
            anyhow::bail!("ringtone.trim_duration_secs must be greater than zero");
        }

        if self.convert.audio_bitrate.trim().is_empty() {
            anyhow::bail!("convert.audio_bitrate must not be empty");
        }

        if !self.paths.downloads_route.starts_with('/') {
            anyhow::bail!("paths.downloads_route must start with '/'");
        }

        if self.retention.sweep_interval_minutes == 0 {
            anyhow::bail!("retention.sweep_interval_minutes must be greater than zero");
        }

        Ok(())
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Bind Address: {}", self.server.bind_address);
        println!("  Max Upload: {} MB", self.server.max_upload_mb);
        println!("  Static Dir: {}", self.paths.static_dir.display());
        println!(
            "  Downloads: {} (served at {})",
            self.paths.downloads_dir.display(),
            self.paths.downloads_route
        );
        println!("  Scratch Dir: {}", self.scratch_root().display());
        println!("  yt-dlp: {}", self.tools.yt_dlp_path);
        println!("  ffmpeg: {}", self.tools.ffmpeg_path);
        println!(
            "  Ringtone Window: {}s from {}s",
            self.ringtone.trim_duration_secs, self.ringtone.trim_start_secs
        );
        println!("  Audio Bitrate: {}", self.convert.audio_bitrate);
        if self.retention.download_ttl_hours == 0 {
            println!("  Download TTL: keep forever");
        } else {
            println!("  Download TTL: {}h", self.retention.download_ttl_hours);
        }
    }

    /// Root of all per-request scratch namespaces
    pub fn scratch_root(&self) -> PathBuf {
        self.paths
            .scratch_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("ringbyte"))
    }

    /// Staging area for ringtone extraction, next to the scratch used by conversions
    pub fn ringtone_staging_dir(&self) -> PathBuf {
        self.scratch_root().join("byte")
    }

    pub fn convert_scratch_dir(&self) -> PathBuf {
        self.scratch_root().join("convert")
    }

    pub fn trim_window(&self) -> TrimWindow {
        TrimWindow::new(self.ringtone.trim_start_secs, self.ringtone.trim_duration_secs)
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.server.max_upload_mb.saturating_mul(1024 * 1024)
    }
}
