//! Ringbyte - ringtone cutter and audio converter
//!
//! This library turns YouTube links into short MP3/M4R ringtone clips using yt-dlp,
//! and transcodes uploaded audio files to WAV, MP3 or M4R using ffmpeg. Both flows
//! are exposed over HTTP (see [`server`]) and from the `ringbyte` CLI.

pub mod cli;
pub mod config;
pub mod convert;
pub mod output;
pub mod retention;
pub mod ringtone;
pub mod scratch;
pub mod server;
pub mod tools;
pub mod utils;

use std::path::PathBuf;

pub use cli::{Cli, Commands, LinkFormat};
pub use config::Config;
pub use convert::{ConversionRequest, ConvertedAudio, Converter};
pub use ringtone::{DownloadLinks, RingtoneMaker};
pub use tools::{AudioFormat, MediaDownloader, Transcoder, TrimWindow};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Error types specific to ringbyte
#[derive(thiserror::Error, Debug)]
pub enum RingbyteError {
    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),

    #[error("{tool} failed: {message}")]
    ExternalTool { tool: String, message: String },

    #[error("{label} file not found: {}", path.display())]
    MissingArtifact { label: &'static str, path: PathBuf },
}
