use std::path::Path;
use url::Url;

use crate::config::ToolsConfig;
use crate::tools::{Ffmpeg, YtDlp};

/// Characters that are illegal in file names on at least one common platform
const ILLEGAL_FILENAME_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Base name used when a title sanitizes down to nothing
pub const FALLBACK_TITLE: &str = "ringtone";

/// Turn a media title into a file base name.
///
/// Drops filename-illegal and control characters, keeps everything else
/// (including spaces and non-ASCII letters) and trims the ends.
pub fn sanitize_title(title: &str) -> String {
    strip_illegal(title).unwrap_or_else(|| FALLBACK_TITLE.to_string())
}

/// Reduce a client-supplied upload name to a single safe path component
pub fn sanitize_upload_name(name: &str) -> String {
    // Browsers on Windows have been known to send full paths
    let last = name.rsplit(['/', '\\']).next().unwrap_or(name);
    strip_illegal(last).unwrap_or_else(|| "upload".to_string())
}

fn strip_illegal(name: &str) -> Option<String> {
    let cleaned: String = name
        .chars()
        .filter(|c| !ILLEGAL_FILENAME_CHARS.contains(c) && !c.is_control())
        .collect();
    let cleaned = cleaned.trim();

    // "." and ".." would resolve to directories
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        None
    } else {
        Some(cleaned.to_string())
    }
}

/// File stem of `name`, or the whole name when it has no extension
pub fn file_stem(name: &str) -> String {
    Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| name.to_string())
}

/// Replace (or add) the extension of a file name
pub fn replace_extension(name: &str, extension: &str) -> String {
    format!("{}.{}", file_stem(name), extension)
}

/// Format file size in human-readable format
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: f64 = 1024.0;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let bytes_f = bytes as f64;
    let unit_index = (bytes_f.log10() / THRESHOLD.log10()).floor() as usize;
    let unit_index = unit_index.min(UNITS.len() - 1);

    let size = bytes_f / THRESHOLD.powi(unit_index as i32);

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

/// Extract domain from URL for display purposes
pub fn extract_domain(url: &str) -> Option<String> {
    Url::parse(url).ok()?.host_str().map(|host| {
        // Remove 'www.' prefix if present
        host.strip_prefix("www.").unwrap_or(host).to_string()
    })
}

/// Check if the current environment has the required tools
pub async fn check_dependencies(tools: &ToolsConfig) -> Vec<String> {
    let mut missing = Vec::new();

    if !YtDlp::with_program(&tools.yt_dlp_path).check_availability().await {
        missing.push(format!(
            "{} - required for ringtones from YouTube links",
            tools.yt_dlp_path
        ));
    }

    if !Ffmpeg::with_program(&tools.ffmpeg_path).check_availability().await {
        missing.push(format!(
            "{} - required for audio conversion and ringtone trimming",
            tools.ffmpeg_path
        ));
    }

    missing
}
