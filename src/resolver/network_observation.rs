//! Extraction from responses observed while the page loaded.

use crate::session::NetworkResponse;

use super::strategy::unexpected_input;
use super::{
    CandidateSource, Extraction, InputShape, MediaKind, PageInput, PatternLibrary, RawUrl, Strategy,
};

/// Picks observed responses whose path or MIME type marks them as media.
#[derive(Debug, Default, Clone, Copy)]
pub struct NetworkObservationStrategy;

impl NetworkObservationStrategy {
    /// Creates the strategy.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Strategy for NetworkObservationStrategy {
    fn name(&self) -> &'static str {
        "network_observation"
    }

    fn source(&self) -> CandidateSource {
        CandidateSource::NetworkObservation
    }

    fn input_shape(&self, _page_url: &str) -> InputShape {
        InputShape::NetworkResponses
    }

    fn extract(&self, input: &PageInput, _patterns: &PatternLibrary) -> Extraction {
        let PageInput::NetworkResponses(responses) = input else {
            return unexpected_input(self.source(), input);
        };
        Extraction::from_urls(responses.iter().filter_map(response_hit).collect())
    }
}

fn response_hit(response: &NetworkResponse) -> Option<RawUrl> {
    let path = response
        .url
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    let mime = response
        .mime_type
        .as_deref()
        .unwrap_or_default()
        .to_ascii_lowercase();

    let path_is_hls = path.contains(".m3u8");
    let path_matches = path_is_hls || path.contains(".mp4");
    let mime_is_hls = mime.contains("mpegurl");
    if !(path_matches || mime_is_hls || mime_is_media(&mime)) {
        return None;
    }

    let kind = if path_is_hls || mime_is_hls {
        MediaKind::Hls
    } else {
        MediaKind::Mp4
    };
    Some(RawUrl::with_kind(response.url.as_str(), kind))
}

/// Substring match on `video`/`stream`; the generic binary type
/// `application/octet-stream` is not evidence of media.
fn mime_is_media(mime: &str) -> bool {
    let essence = mime.split(';').next().unwrap_or_default().trim();
    mime.contains("video") || (mime.contains("stream") && essence != "application/octet-stream")
}
