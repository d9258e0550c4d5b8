//! Utility functions for text cleanup, date formatting and file system checks.
//!
//! This module provides helper functions used throughout the crate:
//! - Markup stripping and char-safe truncation for article descriptions
//! - Date formatting in the two shapes the providers expect
//! - String truncation and slugification for logging and request parameters
//! - File system validation for output directories

use chrono::NaiveDate;
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use std::error::Error;
use std::fs as stdfs;
use tokio::fs;
use tracing::{info, instrument};

/// Tags that separate words when rendered: line breaks and block closers.
static BREAKING_TAGS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<\s*(?:br|hr|/p|/div|/li|/h[1-6]|/tr|/td|/blockquote|/figcaption)\b[^>]*>")
        .expect("breaking tag pattern is valid")
});

/// Remove markup from an HTML snippet and return its visible text.
///
/// Line breaks and block boundaries become single spaces, inline tags vanish
/// without adding whitespace, entities are decoded, and runs of whitespace
/// are collapsed.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(strip_html("<p>Hello <strong>World</strong>!</p>"), "Hello World!");
/// assert_eq!(strip_html("Line break<br />New line"), "Line break New line");
/// ```
pub fn strip_html(html: &str) -> String {
    if html.is_empty() {
        return String::new();
    }
    let spaced = BREAKING_TAGS.replace_all(html, " ");
    let fragment = Html::parse_fragment(&spaced);
    let text: String = fragment.root_element().text().collect();
    text.split_whitespace().join(" ")
}

/// Keep at most `max` characters of `s`.
///
/// Unlike byte slicing this never splits a multi-byte character.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((byte_idx, _)) => s[..byte_idx].to_string(),
        None => s.to_string(),
    }
}

/// Format a date as `YYYY-MM-DD`.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Format a date as a dashless `YYYYMMDD`.
pub fn format_compact_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to `max` characters with an ellipsis and
/// byte count indicator appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    let kept = truncate_chars(s, max);
    if kept.len() == s.len() {
        kept
    } else {
        format!("{}…(+{} bytes)", kept, s.len() - kept.len())
    }
}

/// Detect if a serde_json error indicates truncated/incomplete JSON.
///
/// A provider body cut off mid-transfer fails with an EOF error; the
/// transport logs those separately from bodies that are simply not JSON.
pub fn looks_truncated(e: &serde_json::Error) -> bool {
    use serde_json::error::Category;
    matches!(e.classify(), Category::Eof)
}

/// Convert a name to a URL-friendly slug.
///
/// Lowercases the text, removes special characters, and replaces spaces
/// with hyphens.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(slugify("Hello World"), "hello-world");
/// assert_eq!(slugify("Test-Article!"), "test-article");
/// ```
pub fn slugify(title: &str) -> String {
    title
        .trim()
        .to_lowercase()
        .replace(|c: char| !c.is_alphanumeric() && c != ' ' && c != '-', "")
        .replace(' ', "-")
}

/// Ensure a directory exists and is writable.
///
/// This function creates the directory if it doesn't exist, then performs
/// a write test by creating and immediately deleting a probe file.
///
/// # Errors
///
/// Returns an error if:
/// - The directory cannot be created
/// - The directory is not writable (permission denied, read-only filesystem, etc.)
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    if let Err(e) = fs::create_dir_all(path).await {
        return Err(Box::new(e));
    }
    // Try a small sync write using std fs (simpler error surface)
    let probe_path = format!("{}/..__probe_write__", path.trim_end_matches('/'));
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_html_removes_tags() {
        assert_eq!(strip_html("<p>Hello <strong>World</strong>!</p>"), "Hello World!");
    }

    #[test]
    fn test_strip_html_empty_and_plain() {
        assert_eq!(strip_html(""), "");
        assert_eq!(strip_html("Just plain text"), "Just plain text");
    }

    #[test]
    fn test_strip_html_nested_tags() {
        assert_eq!(
            strip_html("<div><p>Nested <span>content</span></p></div>"),
            "Nested content"
        );
    }

    #[test]
    fn test_strip_html_line_breaks_become_spaces() {
        assert_eq!(strip_html("Line break<br />New line"), "Line break New line");
        assert_eq!(strip_html("<p>One</p><p>Two</p>"), "One Two");
    }

    #[test]
    fn test_strip_html_decodes_entities() {
        assert_eq!(strip_html("Fish &amp; chips"), "Fish & chips");
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("short", 100), "short");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn test_date_formats() {
        let date = NaiveDate::from_ymd_opt(2025, 11, 16).unwrap();
        assert_eq!(format_date(date), "2025-11-16");
        assert_eq!(format_compact_date(date), "20251116");
    }

    #[test]
    fn test_truncate_for_log_short_string() {
        let s = "Hello, world!";
        assert_eq!(truncate_for_log(s, 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("Test-Article!"), "test-article");
        assert_eq!(slugify("  Jane O'Neil "), "jane-oneil");
    }

    #[test]
    fn test_looks_truncated() {
        let json_eof = r#"{"field": "value"#;
        let result: Result<serde_json::Value, _> = serde_json::from_str(json_eof);
        if let Err(e) = result {
            assert!(looks_truncated(&e));
        }
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("out/json");
        let path = nested.to_str().unwrap();
        ensure_writable_dir(path).await.unwrap();
        assert!(nested.is_dir());
    }
}
