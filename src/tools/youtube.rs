use async_trait::async_trait;
use std::path::Path;

use super::{check_command_available, run_tool, AudioFormat, MediaDownloader, TrimWindow};
use crate::{RingbyteError, Result};

/// YouTube audio downloader using yt-dlp
pub struct YtDlp {
    yt_dlp_path: String,
}

impl YtDlp {
    pub fn new() -> Self {
        Self::with_program("yt-dlp")
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            yt_dlp_path: program.into(),
        }
    }

    /// Check if yt-dlp is available
    pub async fn check_availability(&self) -> bool {
        check_command_available(&self.yt_dlp_path, "--version").await
    }

    fn title_args(url: &str) -> Vec<String> {
        vec![
            "--get-title".to_string(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--".to_string(),
            url.to_string(),
        ]
    }

    fn extract_args(
        url: &str,
        format: AudioFormat,
        trim: TrimWindow,
        output_path: &Path,
    ) -> Vec<String> {
        vec![
            "--extract-audio".to_string(),
            "--audio-format".to_string(),
            format.yt_dlp_audio_format().to_string(),
            "--postprocessor-args".to_string(),
            format!("ExtractAudio:{}", trim.ffmpeg_args()),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            // Keep the local write time; retention expires files by mtime
            "--no-mtime".to_string(),
            "--output".to_string(),
            output_template(output_path),
            "--".to_string(),
            url.to_string(),
        ]
    }
}

/// Build a yt-dlp output template that lands on `output_path` after extraction.
///
/// yt-dlp picks the final extension itself, so the file stem is kept and the
/// extension replaced by `%(ext)s`. Literal `%` in the stem must be doubled.
fn output_template(output_path: &Path) -> String {
    let stem = output_path
        .file_stem()
        .map(|s| s.to_string_lossy().replace('%', "%%"))
        .unwrap_or_default();
    let file = format!("{}.%(ext)s", stem);

    match output_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            parent.join(file).to_string_lossy().into_owned()
        }
        _ => file,
    }
}

/// First non-empty line of `--get-title` output
fn parse_title(stdout: &[u8]) -> Option<String> {
    String::from_utf8_lossy(stdout)
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl MediaDownloader for YtDlp {
    async fn fetch_title(&self, url: &str) -> Result<String> {
        tracing::debug!("Fetching title for: {}", url);

        let stdout = run_tool("yt-dlp", &self.yt_dlp_path, &Self::title_args(url)).await?;

        parse_title(&stdout).ok_or_else(|| {
            RingbyteError::ExternalTool {
                tool: "yt-dlp".to_string(),
                message: format!("no title returned for {}", url),
            }
            .into()
        })
    }

    async fn extract_audio(
        &self,
        url: &str,
        format: AudioFormat,
        trim: TrimWindow,
        output_path: &Path,
    ) -> Result<()> {
        tracing::debug!(
            format = %format,
            output = %output_path.display(),
            "Extracting audio for: {}",
            url
        );

        let args = Self::extract_args(url, format, trim, output_path);
        run_tool("yt-dlp", &self.yt_dlp_path, &args).await?;

        Ok(())
    }
}

impl Default for YtDlp {
    fn default() -> Self {
        Self::new()
    }
}
