use anyhow::{Context, Result};
use console::style;
use std::path::Path;

use crate::cli::LinkFormat;
use crate::convert::ConvertedAudio;
use crate::ringtone::DownloadLinks;
use crate::utils::format_file_size;

/// Print ringtone links, with the on-disk location for text output
pub fn print_links(links: &DownloadLinks, downloads_dir: &Path, format: &LinkFormat) -> Result<()> {
    match format {
        LinkFormat::Json => {
            println!("{}", serde_json::to_string_pretty(links)?);
        }
        LinkFormat::Text => {
            println!("{} {}", style("MP3:").bold(), links.mp3);
            println!("{} {}", style("M4R:").bold(), links.m4r);
            println!(
                "{}",
                style(format!("Files are in {}", downloads_dir.display())).dim()
            );
        }
    }

    Ok(())
}

/// Write converted audio to `path`
pub async fn save_converted(audio: &ConvertedAudio, path: &Path) -> Result<()> {
    tokio::fs::write(path, &audio.data)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!(
        "{} {} ({}, {})",
        style("Saved").green().bold(),
        path.display(),
        audio.content_type,
        format_file_size(audio.data.len() as u64)
    );

    Ok(())
}
