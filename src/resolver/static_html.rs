//! Whole-page regex scan over raw HTML/JS text.

use super::strategy::unexpected_input;
use super::{CandidateSource, Extraction, InputShape, PageInput, PatternLibrary, Strategy};

/// Runs [`PatternLibrary::match_all`] over the page source.
///
/// This is the broadest strategy. A `.mp4` substring inside an unrelated
/// URL's query string still matches; format validation downstream is the
/// only filter.
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticHtmlRegexStrategy;

impl StaticHtmlRegexStrategy {
    /// Creates the strategy.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Strategy for StaticHtmlRegexStrategy {
    fn name(&self) -> &'static str {
        "static_html_regex"
    }

    fn source(&self) -> CandidateSource {
        CandidateSource::StaticHtmlRegex
    }

    fn input_shape(&self, _page_url: &str) -> InputShape {
        InputShape::PageSource
    }

    fn extract(&self, input: &PageInput, patterns: &PatternLibrary) -> Extraction {
        match input {
            PageInput::PageSource(html) => Extraction::from_urls(patterns.match_all(html)),
            other => unexpected_input(self.source(), other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_html_escaped_url_found() {
        let html = r#"<script>var data = {"url":"https://example.com/v.mp4?x=1\/y"};</script>"#;
        let input = PageInput::PageSource(html.to_string());
        let extraction = StaticHtmlRegexStrategy::new().extract(&input, &PatternLibrary::new());
        assert_eq!(extraction.urls[0].value, r"https://example.com/v.mp4?x=1\/y");
    }

    #[test]
    fn test_static_html_is_over_inclusive() {
        let html = r#"<img src="https://img.example.com/thumb?from=clip.mp4">"#;
        let input = PageInput::PageSource(html.to_string());
        let extraction = StaticHtmlRegexStrategy::new().extract(&input, &PatternLibrary::new());
        assert_eq!(extraction.urls.len(), 1);
        assert_eq!(extraction.urls[0].value, "https://img.example.com/thumb?from=clip.mp4");
    }

    #[test]
    fn test_static_html_empty_page() {
        let input = PageInput::PageSource(String::new());
        let extraction = StaticHtmlRegexStrategy::new().extract(&input, &PatternLibrary::new());
        assert!(extraction.is_empty());
        assert!(extraction.diagnostics.is_empty());
    }
}
