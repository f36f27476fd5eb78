use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "ringbyte",
    about = "Ringbyte - cut ringtones from YouTube links and convert audio files",
    version,
    long_about = "Turns a YouTube link into 20-second MP3 and M4R ringtones using yt-dlp, and converts audio files to WAV, MP3 or M4R using ffmpeg. Run `ringbyte serve` for the web interface."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to ./config.yaml or the user config directory)
    #[arg(short, long, global = true, env = "RINGBYTE_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP server and web interface
    Serve {
        /// Address to bind, overriding the config file
        #[arg(short, long, value_name = "ADDR")]
        bind: Option<String>,
    },

    /// Cut an MP3 and an M4R ringtone from a YouTube link
    Byte {
        /// Video URL
        #[arg(value_name = "URL")]
        url: String,

        /// How to print the resulting links
        #[arg(short, long, value_enum, default_value = "text")]
        format: LinkFormat,
    },

    /// Convert a local audio file to WAV, MP3 or M4R
    Convert {
        /// File to convert
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Target format
        #[arg(short, long, value_parser = ["wav", "mp3", "m4r"])]
        to: String,

        /// Output file (defaults to the input name with the new extension)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Delete expired ringtones and abandoned scratch files now
    Sweep,

    /// List supported output formats
    Formats,

    /// Show or create the configuration file
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },
}

#[derive(ValueEnum, Clone, Debug)]
pub enum LinkFormat {
    /// Human-readable lines
    Text,
    /// JSON as returned by POST /api/byte
    Json,
}

impl std::fmt::Display for LinkFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkFormat::Text => write!(f, "text"),
            LinkFormat::Json => write!(f, "json"),
        }
    }
}
