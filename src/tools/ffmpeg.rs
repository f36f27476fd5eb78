use async_trait::async_trait;
use std::path::Path;

use super::{check_command_available, run_tool, AudioFormat, Transcoder};
use crate::Result;

/// Audio transcoder backed by the ffmpeg CLI
pub struct Ffmpeg {
    ffmpeg_path: String,
}

impl Ffmpeg {
    pub fn new() -> Self {
        Self::with_program("ffmpeg")
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            ffmpeg_path: program.into(),
        }
    }

    pub async fn check_availability(&self) -> bool {
        check_command_available(&self.ffmpeg_path, "-version").await
    }

    fn transcode_args(
        input_path: &Path,
        output_path: &Path,
        format: AudioFormat,
        bitrate: &str,
    ) -> Vec<String> {
        vec![
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-y".to_string(), // Overwrite output file
            "-i".to_string(),
            input_path.to_string_lossy().into_owned(),
            "-vn".to_string(), // No video
            "-b:a".to_string(),
            bitrate.to_string(),
            // The muxer is explicit so the output extension never decides the container
            "-f".to_string(),
            format.ffmpeg_muxer().to_string(),
            output_path.to_string_lossy().into_owned(),
        ]
    }
}

#[async_trait]
impl Transcoder for Ffmpeg {
    async fn transcode(
        &self,
        input_path: &Path,
        output_path: &Path,
        format: AudioFormat,
        bitrate: &str,
    ) -> Result<()> {
        tracing::debug!(
            "Converting {} to {} ({})",
            input_path.display(),
            format,
            bitrate
        );

        let args = Self::transcode_args(input_path, output_path, format, bitrate);
        run_tool("ffmpeg", &self.ffmpeg_path, &args).await?;

        Ok(())
    }
}

impl Default for Ffmpeg {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_m4r_transcode_args() {
        let args = Ffmpeg::transcode_args(
            &PathBuf::from("/tmp/in/clip.mp3"),
            &PathBuf::from("/tmp/in/out/clip.m4r"),
            AudioFormat::M4r,
            "128k",
        );

        let pos = |flag: &str| args.iter().position(|a| a == flag).unwrap();
        assert_eq!(args[pos("-i") + 1], "/tmp/in/clip.mp3");
        assert_eq!(args[pos("-b:a") + 1], "128k");
        assert_eq!(args[pos("-f") + 1], "ipod");
        assert_eq!(args.last().unwrap(), "/tmp/in/out/clip.m4r");
    }

    #[tokio::test]
    async fn test_missing_binary_is_unavailable() {
        let ffmpeg = Ffmpeg::with_program("ringbyte-missing-ffmpeg");
        assert!(!ffmpeg.check_availability().await);
    }
}
