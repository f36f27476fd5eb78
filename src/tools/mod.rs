use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

pub mod ffmpeg;
pub mod youtube;

pub use ffmpeg::Ffmpeg;
pub use youtube::YtDlp;

use crate::{RingbyteError, Result};

/// Audio containers ringbyte produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Mp3,
    M4a,
    M4r,
    Wav,
}

impl AudioFormat {
    /// Formats accepted as conversion targets
    pub const TARGETS: [AudioFormat; 3] = [AudioFormat::Wav, AudioFormat::Mp3, AudioFormat::M4r];

    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::M4a => "m4a",
            AudioFormat::M4r => "m4r",
            AudioFormat::Wav => "wav",
        }
    }

    /// Parse a conversion target identifier (`wav`, `mp3` or `m4r`)
    pub fn from_target(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "wav" => Some(AudioFormat::Wav),
            "mp3" => Some(AudioFormat::Mp3),
            "m4r" => Some(AudioFormat::M4r),
            _ => None,
        }
    }

    /// Content type sent with converted audio.
    ///
    /// Mirrors the extension (`audio/mp3`, `audio/wav`) except for the
    /// MPEG-4 family, which is served as `audio/mp4`.
    pub fn content_type(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "audio/mp3",
            AudioFormat::Wav => "audio/wav",
            AudioFormat::M4a | AudioFormat::M4r => "audio/mp4",
        }
    }

    /// Name of the ffmpeg muxer that writes this container.
    /// ffmpeg has no `m4r` muxer; `ipod` writes the same MPEG-4 audio layout.
    pub fn ffmpeg_muxer(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Wav => "wav",
            AudioFormat::M4a | AudioFormat::M4r => "ipod",
        }
    }

    /// Value for yt-dlp's `--audio-format`
    pub fn yt_dlp_audio_format(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Wav => "wav",
            AudioFormat::M4a | AudioFormat::M4r => "m4a",
        }
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Slice of the source audio kept for a ringtone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrimWindow {
    pub start_secs: u32,
    pub duration_secs: u32,
}

impl TrimWindow {
    pub fn new(start_secs: u32, duration_secs: u32) -> Self {
        Self { start_secs, duration_secs }
    }

    /// ffmpeg arguments selecting this window
    pub fn ffmpeg_args(&self) -> String {
        format!("-ss {} -t {}", self.start_secs, self.duration_secs)
    }
}

impl Default for TrimWindow {
    fn default() -> Self {
        Self::new(0, 20)
    }
}

/// Fetches media from a URL and extracts its audio
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaDownloader: Send + Sync {
    /// Display title of the media behind `url`
    async fn fetch_title(&self, url: &str) -> Result<String>;

    /// Extract audio in `format`, trimmed to `trim`, into exactly `output_path`
    async fn extract_audio(
        &self,
        url: &str,
        format: AudioFormat,
        trim: TrimWindow,
        output_path: &Path,
    ) -> Result<()>;
}

/// Transcodes a local audio file into another container
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn transcode(
        &self,
        input_path: &Path,
        output_path: &Path,
        format: AudioFormat,
        bitrate: &str,
    ) -> Result<()>;
}

/// Run an external program to completion and return its stdout.
///
/// Arguments are passed as a vector, never through a shell. A spawn failure
/// or non-zero exit becomes [`RingbyteError::ExternalTool`].
pub(crate) async fn run_tool(tool: &str, program: &str, args: &[String]) -> Result<Vec<u8>> {
    tracing::debug!(tool, program, ?args, "Invoking external tool");

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| RingbyteError::ExternalTool {
            tool: tool.to_string(),
            message: format!("could not start {}: {}", program, e),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        let message = if stderr.is_empty() {
            format!("exited with {}", output.status)
        } else {
            format!("exited with {}: {}", output.status, stderr)
        };
        return Err(RingbyteError::ExternalTool {
            tool: tool.to_string(),
            message,
        }
        .into());
    }

    Ok(output.stdout)
}

/// Check if a program answers to a version probe
pub async fn check_command_available(program: &str, version_flag: &str) -> bool {
    Command::new(program)
        .arg(version_flag)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .await
        .map(|output| output.status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_parsing() {
        assert_eq!(AudioFormat::from_target("wav"), Some(AudioFormat::Wav));
        assert_eq!(AudioFormat::from_target("MP3"), Some(AudioFormat::Mp3));
        assert_eq!(AudioFormat::from_target(" m4r "), Some(AudioFormat::M4r));
        // m4a is only produced by the ringtone flow, never requested
        assert_eq!(AudioFormat::from_target("m4a"), None);
        assert_eq!(AudioFormat::from_target(""), None);
        assert_eq!(AudioFormat::from_target("exe"), None);
    }

    #[test]
    fn test_content_types() {
        assert_eq!(AudioFormat::Mp3.content_type(), "audio/mp3");
        assert_eq!(AudioFormat::Wav.content_type(), "audio/wav");
        assert_eq!(AudioFormat::M4r.content_type(), "audio/mp4");
    }

    #[test]
    fn test_m4r_uses_ipod_muxer() {
        assert_eq!(AudioFormat::M4r.ffmpeg_muxer(), "ipod");
        assert_eq!(AudioFormat::Mp3.ffmpeg_muxer(), "mp3");
        assert_eq!(AudioFormat::Wav.ffmpeg_muxer(), "wav");
    }

    #[test]
    fn test_default_trim_window() {
        let trim = TrimWindow::default();
        assert_eq!(trim.start_secs, 0);
        assert_eq!(trim.duration_secs, 20);
        assert_eq!(trim.ffmpeg_args(), "-ss 0 -t 20");
    }

    #[tokio::test]
    async fn test_run_tool_reports_missing_program() {
        let err = run_tool("probe", "ringbyte-no-such-program", &[])
            .await
            .unwrap_err();
        let err = err.downcast::<RingbyteError>().unwrap();
        assert!(matches!(err, RingbyteError::ExternalTool { ref tool, .. } if tool == "probe"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_tool_reports_nonzero_exit() {
        let args = vec!["-c".to_string(), "echo broken >&2; exit 3".to_string()];
        let err = run_tool("sh", "sh", &args).await.unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("sh failed: exited with"), "{message}");
        assert!(message.ends_with("broken"), "{message}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_tool_returns_stdout() {
        let args = vec!["-c".to_string(), "printf hello".to_string()];
        let stdout = run_tool("sh", "sh", &args).await.unwrap();
        assert_eq!(stdout, b"hello");
    }
}
