//! Media URL resolution pipeline for client-rendered landing pages.
//!
//! This module turns a landing-page URL into one or more direct media-stream
//! URLs through a priority-ordered chain of extraction strategies with
//! short-circuit fallback.
//!
//! # Architecture
//!
//! - [`PatternLibrary`] - Regexes and JSON-key heuristics that recognize media URLs
//! - [`Strategy`] - Trait each extraction technique implements
//! - [`DomElementStrategy`] - Rendered `<video>`/`<source>` attributes
//! - [`StaticHtmlRegexStrategy`] - Whole-page regex scan (broad, noisy)
//! - [`ScriptStateTraversalStrategy`] - Hydration/initial-state globals
//! - [`NetworkObservationStrategy`] - Responses observed during page load
//! - [`ApiFallbackStrategy`] - Last-resort site API probing
//! - [`ResolutionPipeline`] - Runs strategies in order, normalizes and deduplicates
//! - [`Selector`] - Picks exactly one [`Candidate`] for download
//!
//! # Example
//!
//! ```no_run
//! use streamgrab_core::resolver::{
//!     HttpEndpointProbe, SiteProfile, build_default_pipeline, resolve_and_close,
//! };
//! use streamgrab_core::session::{StaticPageSession, StaticSessionConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let page_url = "https://www.dongchedi.com/video/7301234567890";
//! let profile = SiteProfile::for_page_url(page_url);
//! let pipeline = build_default_pipeline(&profile);
//! let probe = HttpEndpointProbe::new(&profile, std::time::Duration::from_secs(10))?;
//! let session = StaticPageSession::new(StaticSessionConfig::default())?;
//!
//! let resolution = resolve_and_close(&pipeline, page_url, Box::new(session), &probe).await?;
//! for candidate in &resolution.candidates {
//!     println!("{} ({})", candidate.url, candidate.media_kind);
//! }
//! # Ok(())
//! # }
//! ```

mod api_fallback;
mod dom_element;
mod error;
mod network_observation;
mod normalize;
mod patterns;
mod pipeline;
mod probe;
mod script_state;
mod selector;
mod site;
mod static_html;
mod strategy;

pub use api_fallback::{ApiFallbackStrategy, resource_id_from_page_url};
pub use dom_element::DomElementStrategy;
pub use error::ResolveError;
pub use network_observation::NetworkObservationStrategy;
pub use normalize::{dedup_normalized, is_absolute_http_url, normalize_page_url, normalize_raw_url};
pub use patterns::{DEFAULT_MAX_TREE_DEPTH, MEDIA_KEY_KEYWORDS, PatternLibrary};
pub use pipeline::{Resolution, ResolutionPipeline, build_default_pipeline, resolve_and_close};
pub use probe::{EndpointProbe, HttpEndpointProbe, ProbeError};
pub use script_state::{DEFAULT_SCRIPT_STATE_NAMES, ScriptStateTraversalStrategy};
pub use selector::{Choice, InvalidSelection, Selection, Selector};
pub use site::SiteProfile;
pub use static_html::StaticHtmlRegexStrategy;
pub use strategy::{
    ApiPayload, Diagnostic, DiagnosticKind, Extraction, InputShape, PageInput, ScriptState,
    Strategy,
};

use std::fmt;

use serde::Serialize;

/// Streaming format of a resolved media URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Progressive MP4 file.
    Mp4,
    /// HLS `.m3u8` manifest.
    Hls,
}

impl MediaKind {
    /// Infers the media kind from a URL: `.m3u8` anywhere means HLS, everything else MP4.
    #[must_use]
    pub fn infer(url: &str) -> Self {
        if url.to_ascii_lowercase().contains(".m3u8") {
            Self::Hls
        } else {
            Self::Mp4
        }
    }

    /// Returns the stable lowercase label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Hls => "hls",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The strategy that discovered a candidate.
///
/// Declaration order is the pipeline's priority order; derived `Ord` sorts
/// `DomElement` first and `ApiFallback` last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    /// Rendered media element attributes.
    DomElement = 0,
    /// Regex scan over raw page source.
    StaticHtmlRegex = 1,
    /// Traversal of page-exposed script state.
    ScriptStateTraversal = 2,
    /// Observed network responses.
    NetworkObservation = 3,
    /// Site API endpoint probing.
    ApiFallback = 4,
}

impl CandidateSource {
    /// Returns the stable snake_case label used in logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DomElement => "dom_element",
            Self::StaticHtmlRegex => "static_html_regex",
            Self::ScriptStateTraversal => "script_state_traversal",
            Self::NetworkObservation => "network_observation",
            Self::ApiFallback => "api_fallback",
        }
    }
}

impl fmt::Display for CandidateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raw, un-normalized URL hit produced by a strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawUrl {
    /// The matched text, possibly still escaped.
    pub value: String,
    /// Media kind when the matcher knows it; inferred from the URL otherwise.
    pub kind: Option<MediaKind>,
}

impl RawUrl {
    /// Creates a raw hit with no kind hint.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            kind: None,
        }
    }

    /// Creates a raw hit with a known media kind.
    #[must_use]
    pub fn with_kind(value: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            value: value.into(),
            kind: Some(kind),
        }
    }
}

/// A validated, deduplicated media URL with provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    /// Absolute `http(s)` URL after normalization.
    pub url: String,
    /// Inferred streaming format.
    pub media_kind: MediaKind,
    /// Strategy that produced it.
    pub source: CandidateSource,
}

impl Candidate {
    /// Creates a candidate.
    #[must_use]
    pub fn new(url: impl Into<String>, media_kind: MediaKind, source: CandidateSource) -> Self {
        Self {
            url: url.into(),
            media_kind,
            source,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_source_priority_ordering() {
        assert!(CandidateSource::DomElement < CandidateSource::StaticHtmlRegex);
        assert!(CandidateSource::StaticHtmlRegex < CandidateSource::ScriptStateTraversal);
        assert!(CandidateSource::ScriptStateTraversal < CandidateSource::NetworkObservation);
        assert!(CandidateSource::NetworkObservation < CandidateSource::ApiFallback);
    }

    #[test]
    fn test_media_kind_infer_from_extension() {
        assert_eq!(MediaKind::infer("https://cdn.example.com/a.m3u8"), MediaKind::Hls);
        assert_eq!(
            MediaKind::infer("https://cdn.example.com/a.M3U8?token=1"),
            MediaKind::Hls
        );
        assert_eq!(MediaKind::infer("https://cdn.example.com/a.mp4"), MediaKind::Mp4);
    }

    #[test]
    fn test_candidate_serializes_with_labels() {
        let candidate = Candidate::new(
            "https://cdn.example.com/a.m3u8",
            MediaKind::Hls,
            CandidateSource::ScriptStateTraversal,
        );
        let json = serde_json::to_value(&candidate).unwrap();
        assert_eq!(json["media_kind"], "hls");
        assert_eq!(json["source"], "script_state_traversal");
    }

    #[test]
    fn test_raw_url_constructors() {
        assert_eq!(RawUrl::new("x").kind, None);
        assert_eq!(RawUrl::with_kind("x", MediaKind::Hls).kind, Some(MediaKind::Hls));
    }
}
