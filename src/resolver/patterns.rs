//! Regexes and JSON-key heuristics that recognize media URLs.
//!
//! The library is immutable after construction and shared read-only by every
//! strategy in a run.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::trace;

use super::{MediaKind, RawUrl};

/// Default depth at which [`PatternLibrary::match_tree`] stops descending.
pub const DEFAULT_MAX_TREE_DEPTH: usize = 64;

/// Lowercase key fragments that mark a JSON string value as a possible media URL.
pub const MEDIA_KEY_KEYWORDS: [&str; 6] = ["url", "video", "play", "mp4", "m3u8", "src"];

/// Whole-text patterns in priority order; capture group 1 is the URL.
const TEXT_PATTERNS: &[(&str, MediaKind)] = &[
    (r#""url"\s*:\s*"(https?:[^"\s]*?\.mp4[^"\s]*)""#, MediaKind::Mp4),
    (r#""playUrl"\s*:\s*"([^"\s]*?\.mp4[^"\s]*)""#, MediaKind::Mp4),
    (r#""videoUrl"\s*:\s*"([^"\s]*?\.mp4[^"\s]*)""#, MediaKind::Mp4),
    (r#""video_url"\s*:\s*"([^"\s]*?\.mp4[^"\s]*)""#, MediaKind::Mp4),
    (r#""main_url"\s*:\s*"([^"\s]*?\.mp4[^"\s]*)""#, MediaKind::Mp4),
    (r#""url"\s*:\s*"([^"\s]*?\.mp4[^"\s]*)""#, MediaKind::Mp4),
    (r#"\bsrc\s*=\s*["']([^"'\s>]*?\.mp4[^"'\s>]*)["']"#, MediaKind::Mp4),
    (
        r#"(?i)<video\b[^>]*?\ssrc\s*=\s*["']([^"'\s>]*?\.mp4[^"'\s>]*)["']"#,
        MediaKind::Mp4,
    ),
    (r#""url"\s*:\s*"([^"\s]*?\.m3u8[^"\s]*)""#, MediaKind::Hls),
    (r#""playUrl"\s*:\s*"([^"\s]*?\.m3u8[^"\s]*)""#, MediaKind::Hls),
    (r#""videoUrl"\s*:\s*"([^"\s]*?\.m3u8[^"\s]*)""#, MediaKind::Hls),
    (r#"\bsrc\s*=\s*["']([^"'\s>]*?\.m3u8[^"'\s>]*)["']"#, MediaKind::Hls),
];

#[allow(clippy::expect_used)]
static COMPILED_PATTERNS: LazyLock<Vec<(Regex, MediaKind)>> = LazyLock::new(|| {
    TEXT_PATTERNS
        .iter()
        .map(|(pattern, kind)| {
            // Static pattern, safe to panic
            let regex = Regex::new(pattern).expect("media URL regex is valid");
            (regex, *kind)
        })
        .collect()
});

/// Fixed matchers recognizing media URLs in text and JSON trees.
#[derive(Debug, Clone)]
pub struct PatternLibrary {
    patterns: &'static [(Regex, MediaKind)],
    max_depth: usize,
}

impl Default for PatternLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternLibrary {
    /// Creates the library with the built-in regex set and default depth cutoff.
    #[must_use]
    pub fn new() -> Self {
        Self {
            patterns: COMPILED_PATTERNS.as_slice(),
            max_depth: DEFAULT_MAX_TREE_DEPTH,
        }
    }

    /// Overrides the depth cutoff used by [`Self::match_tree`].
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Returns the configured depth cutoff.
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Returns the number of whole-text regexes.
    #[must_use]
    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    /// Scans `text` with every regex in priority order.
    ///
    /// Captures are returned per regex in order of appearance; the same URL
    /// may appear several times when more than one regex matches it.
    #[must_use]
    pub fn match_all(&self, text: &str) -> Vec<RawUrl> {
        let mut hits = Vec::new();
        for (regex, kind) in self.patterns {
            for captures in regex.captures_iter(text) {
                if let Some(url) = captures.get(1) {
                    hits.push(RawUrl::with_kind(url.as_str(), *kind));
                }
            }
        }
        trace!(hits = hits.len(), "match_all complete");
        hits
    }

    /// Walks a JSON tree depth-first in document order, applying the key-name
    /// heuristic at every object entry.
    ///
    /// Containers deeper than the cutoff are skipped without failing the walk.
    /// Strings inside arrays are not keyed and are ignored.
    #[must_use]
    pub fn match_tree(&self, root: &Value) -> Vec<RawUrl> {
        let mut hits = Vec::new();
        let mut stack: Vec<(&Value, usize)> = vec![(root, 0)];
        let mut pruned = 0usize;

        while let Some((node, depth)) = stack.pop() {
            let children: Vec<&Value> = match node {
                Value::Object(map) => {
                    for (key, value) in map {
                        if let Value::String(text) = value
                            && key_value_looks_like_media(key, text)
                        {
                            hits.push(RawUrl::with_kind(text.as_str(), MediaKind::infer(text)));
                        }
                    }
                    map.values().filter(|v| is_container(v)).collect()
                }
                Value::Array(items) => items.iter().filter(|v| is_container(v)).collect(),
                _ => Vec::new(),
            };

            if children.is_empty() {
                continue;
            }
            if depth + 1 > self.max_depth {
                pruned += children.len();
                continue;
            }
            // Reverse push keeps preorder in document order.
            for child in children.into_iter().rev() {
                stack.push((child, depth + 1));
            }
        }

        trace!(hits = hits.len(), pruned, "match_tree complete");
        hits
    }
}

fn is_container(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::Array(_))
}

fn key_value_looks_like_media(key: &str, value: &str) -> bool {
    let key = key.to_ascii_lowercase();
    if !MEDIA_KEY_KEYWORDS.iter().any(|kw| key.contains(kw)) {
        return false;
    }
    let value = value.to_ascii_lowercase();
    value.contains(".mp4") || value.contains(".m3u8")
}
