//! Output filename derivation and sanitization.

use std::path::{Component, Path, PathBuf};

use super::constants::{DEFAULT_EXTENSION, DEFAULT_FILENAME_PREFIX};

/// Builds `<prefix>_<unix-seconds>.mp4`.
///
/// An empty or unsafe prefix falls back to `video`.
#[must_use]
pub fn default_filename(prefix: &str) -> String {
    let prefix = sanitize_filename_component(prefix);
    let prefix = if prefix.is_empty() {
        DEFAULT_FILENAME_PREFIX.to_string()
    } else {
        prefix
    };
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("{prefix}_{timestamp}{DEFAULT_EXTENSION}")
}

/// Joins `output_dir` with a sanitized `filename`, or a generated default.
///
/// An existing file at the target path is overwritten by the download.
#[must_use]
pub fn output_path(output_dir: &Path, filename: Option<&str>, prefix: &str) -> PathBuf {
    let name = filename
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map_or_else(|| default_filename(prefix), sanitize_filename);
    output_dir.join(name)
}

/// Replaces path separators, reserved characters, and control characters.
///
/// Dot-only names (`.`, `..`) have their dots replaced so the result is
/// always a single normal path component.
pub(crate) fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if sanitized.is_empty() {
        return "_".to_string();
    }

    if is_safe_filename_segment(&sanitized) {
        sanitized
    } else {
        sanitized.replace('.', "_")
    }
}

fn sanitize_filename_component(value: &str) -> String {
    value
        .trim()
        .chars()
        .filter_map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                Some(c)
            } else if c.is_whitespace() {
                Some('_')
            } else {
                None
            }
        })
        .collect()
}

fn is_safe_filename_segment(name: &str) -> bool {
    !Path::new(name).components().any(|component| {
        matches!(
            component,
            Component::CurDir | Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    })
}
