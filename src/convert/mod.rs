use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::config::Config;
use crate::scratch::{discard, ScratchDir};
use crate::tools::{AudioFormat, Transcoder};
use crate::utils::{format_file_size, replace_extension, sanitize_upload_name};
use crate::Result;

/// An uploaded file and the container it should be converted to
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    /// Name the client gave the file
    pub file_name: String,
    pub data: Vec<u8>,
    pub format: AudioFormat,
}

/// Result of a conversion, ready to be sent back
#[derive(Debug, Clone)]
pub struct ConvertedAudio {
    /// Original base name with the target extension
    pub file_name: String,
    pub content_type: &'static str,
    pub data: Vec<u8>,
}

/// Transcodes uploads inside a private scratch namespace
pub struct Converter {
    transcoder: Arc<dyn Transcoder>,
    scratch_root: PathBuf,
    bitrate: String,
}

impl Converter {
    pub fn new(
        transcoder: Arc<dyn Transcoder>,
        scratch_root: impl Into<PathBuf>,
        bitrate: impl Into<String>,
    ) -> Self {
        Self {
            transcoder,
            scratch_root: scratch_root.into(),
            bitrate: bitrate.into(),
        }
    }

    pub fn from_config(config: &Config, transcoder: Arc<dyn Transcoder>) -> Self {
        Self::new(
            transcoder,
            config.convert_scratch_dir(),
            &config.convert.audio_bitrate,
        )
    }

    pub async fn convert(&self, request: ConversionRequest) -> Result<ConvertedAudio> {
        let scratch = ScratchDir::create(&self.scratch_root).await?;

        // Input and output get their own directories so neither the upload name
        // nor a same-format conversion can collide with the other
        let input_dir = scratch.path().join("in");
        let output_dir = scratch.path().join("out");
        for dir in [&input_dir, &output_dir] {
            tokio::fs::create_dir(dir)
                .await
                .with_context(|| format!("Error creating scratch directory {}", dir.display()))?;
        }

        let input_name = sanitize_upload_name(&request.file_name);
        let input_path = input_dir.join(&input_name);

        tracing::info!(
            file = %request.file_name,
            size = %format_file_size(request.data.len() as u64),
            format = %request.format,
            "Converting upload"
        );

        let mut input = tokio::fs::File::create(&input_path)
            .await
            .context("Error writing file")?;
        input.write_all(&request.data).await.context("Error writing file")?;
        input.flush().await.context("Error writing file")?;
        drop(input);

        let output_name = replace_extension(&input_name, request.format.extension());
        let output_path = output_dir.join(&output_name);

        self.transcoder
            .transcode(&input_path, &output_path, request.format, &self.bitrate)
            .await?;
        discard(&input_path).await;

        let mut data = Vec::new();
        tokio::fs::File::open(&output_path)
            .await
            .context("Error reading converted file")?
            .read_to_end(&mut data)
            .await
            .context("Error reading converted file")?;
        discard(&output_path).await;

        scratch.close().await;

        tracing::info!(
            file = %output_name,
            size = %format_file_size(data.len() as u64),
            "Conversion complete"
        );

        Ok(ConvertedAudio {
            file_name: output_name,
            content_type: request.format.content_type(),
            data,
        })
    }
}
