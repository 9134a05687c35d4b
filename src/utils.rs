//! Utility functions for slugs, log-friendly truncation and file system checks.
//!
//! This module provides helper functions used throughout the pipeline:
//! - Subject slug derivation for document ids
//! - String truncation for logging model responses
//! - JSON error detection for truncated model output
//! - Code-fence stripping for model responses
//! - File system validation for the local JSON store

use std::error::Error;
use std::fs as stdfs;
use tokio::fs;
use tracing::{info, instrument};

/// Convert a subject label to its document id.
///
/// Lower-cases the label, then replaces `" & "` and remaining spaces with
/// hyphens.
///
/// # Arguments
///
/// * `label` - The subject label, e.g. `"Economy & Business"`
///
/// # Returns
///
/// The lowercase, hyphenated document id.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(subject_slug("Economy & Business"), "economy-business");
/// assert_eq!(subject_slug("Sports"), "sports");
/// ```
pub fn subject_slug(label: &str) -> String {
    label.to_lowercase().replace(" & ", "-").replace(' ', "-")
}

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to at most `max` bytes (on a char boundary)
/// with an ellipsis and byte count indicator appended.
///
/// # Arguments
///
/// * `s` - The string to potentially truncate
/// * `max` - Maximum number of bytes to keep
///
/// # Returns
///
/// The original string if it fits in `max` bytes, otherwise a truncated
/// version with `"…(+N bytes)"` appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Detect if a serde_json error indicates truncated/incomplete JSON.
///
/// When the model response is cut off (e.g., by its output token limit) the
/// JSON fails with an EOF error. Used to make parse-failure logs actionable.
///
/// # Arguments
///
/// * `e` - The serde_json error to classify
///
/// # Returns
///
/// `true` if the error is an EOF (end-of-file) error, indicating truncation.
pub fn looks_truncated(e: &serde_json::Error) -> bool {
    use serde_json::error::Category;
    matches!(e.classify(), Category::Eof)
}

/// Remove Markdown code-fence markup surrounding a model response.
///
/// Handles both ```` ```json ```` and bare ```` ``` ```` fences; text without
/// fences is only trimmed.
pub fn strip_code_fences(text: &str) -> &str {
    let mut body = text.trim();
    if let Some(rest) = body.strip_prefix("```") {
        body = rest.strip_prefix("json").unwrap_or(rest);
    }
    if let Some(rest) = body.trim_end().strip_suffix("```") {
        body = rest;
    }
    body.trim()
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if it doesn't exist, then performs a write test by
/// creating and immediately deleting a scratch file.
///
/// # Arguments
///
/// * `path` - The directory path to validate
///
/// # Errors
///
/// Returns an error if the directory cannot be created or is not writable
/// (permission denied, read-only filesystem).
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    // Plain std fs for the scratch file gives the simplest error surface
    let scratch_path = format!("{}/..__write_check__", path.trim_end_matches('/'));
    stdfs::File::create(&scratch_path)?;
    let _ = stdfs::remove_file(&scratch_path);
    info!("Output directory is writable");
    Ok(())
}
