//! Extraction from rendered `<video>`/`<source>` element attributes.

use crate::session::MediaElement;

use super::strategy::unexpected_input;
use super::{
    CandidateSource, Extraction, InputShape, MediaKind, PageInput, PatternLibrary, RawUrl, Strategy,
};

/// Reads `src`, `currentSrc`, and `poster` from rendered media elements.
#[derive(Debug, Default, Clone, Copy)]
pub struct DomElementStrategy;

impl DomElementStrategy {
    /// Creates the strategy.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Strategy for DomElementStrategy {
    fn name(&self) -> &'static str {
        "dom_element"
    }

    fn source(&self) -> CandidateSource {
        CandidateSource::DomElement
    }

    fn input_shape(&self, _page_url: &str) -> InputShape {
        InputShape::MediaElements
    }

    fn extract(&self, input: &PageInput, _patterns: &PatternLibrary) -> Extraction {
        let PageInput::MediaElements(elements) = input else {
            return unexpected_input(self.source(), input);
        };
        Extraction::from_urls(elements.iter().flat_map(element_hits).collect())
    }
}

fn element_hits(element: &MediaElement) -> Vec<RawUrl> {
    [&element.src, &element.current_src, &element.poster]
        .into_iter()
        .flatten()
        .filter_map(|value| {
            media_kind_of_attribute(value).map(|kind| RawUrl::with_kind(value.as_str(), kind))
        })
        .collect()
}

/// Returns the media kind when the attribute's path (query and fragment
/// removed) ends in `.mp4` or `.m3u8`.
fn media_kind_of_attribute(value: &str) -> Option<MediaKind> {
    let path = value
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    if path.ends_with(".m3u8") {
        Some(MediaKind::Hls)
    } else if path.ends_with(".mp4") {
        Some(MediaKind::Mp4)
    } else {
        None
    }
}
