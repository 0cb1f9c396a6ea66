//! Last-resort probing of the site's own video-info API.

use serde_json::Value;
use url::Url;

use super::strategy::unexpected_input;
use super::{
    CandidateSource, Diagnostic, Extraction, InputShape, PageInput, PatternLibrary, SiteProfile,
    Strategy,
};

/// Derives a resource id from the page URL and walks each endpoint's JSON body.
///
/// The strategy only declares the endpoints; the pipeline fetches them
/// sequentially through its [`EndpointProbe`](super::EndpointProbe).
#[derive(Debug, Clone)]
pub struct ApiFallbackStrategy {
    profile: SiteProfile,
}

impl ApiFallbackStrategy {
    /// Creates the strategy for a site profile.
    #[must_use]
    pub fn new(profile: SiteProfile) -> Self {
        Self { profile }
    }
}

impl Strategy for ApiFallbackStrategy {
    fn name(&self) -> &'static str {
        "api_fallback"
    }

    fn source(&self) -> CandidateSource {
        CandidateSource::ApiFallback
    }

    fn input_shape(&self, page_url: &str) -> InputShape {
        let endpoints = resource_id_from_page_url(page_url)
            .map(|id| self.profile.endpoint_urls(&id))
            .unwrap_or_default();
        InputShape::ApiPayloads(endpoints)
    }

    fn extract(&self, input: &PageInput, patterns: &PatternLibrary) -> Extraction {
        let PageInput::ApiPayloads(payloads) = input else {
            return unexpected_input(self.source(), input);
        };

        let mut extraction = Extraction::default();
        for payload in payloads {
            match serde_json::from_str::<Value>(&payload.body) {
                Ok(tree) => extraction.urls.extend(patterns.match_tree(&tree)),
                Err(e) => extraction.diagnostics.push(Diagnostic::parse_failure(
                    self.source(),
                    format!("{}: body is not JSON: {e}", payload.endpoint),
                )),
            }
        }
        extraction
    }
}

/// Returns the last non-empty path segment of `page_url`, query and fragment removed.
#[must_use]
pub fn resource_id_from_page_url(page_url: &str) -> Option<String> {
    let path = match Url::parse(page_url) {
        Ok(url) => url.path().to_string(),
        Err(_) => page_url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };
    path.split('/')
        .rev()
        .find(|segment| !segment.is_empty())
        .map(|segment| {
            urlencoding::decode(segment)
                .map_or_else(|_| segment.to_string(), std::borrow::Cow::into_owned)
        })
}
