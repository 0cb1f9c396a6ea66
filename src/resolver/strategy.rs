//! The strategy capability interface and the page evidence it consumes.

use std::fmt;

use crate::session::{MediaElement, NetworkResponse};

use super::{CandidateSource, PatternLibrary, RawUrl};

/// The evidence shape a strategy needs from the page.
///
/// The pipeline computes the matching [`PageInput`] only when the strategy is
/// actually reached, so expensive shapes are never gathered after a
/// short-circuit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputShape {
    /// Rendered media elements.
    MediaElements,
    /// Raw page source.
    PageSource,
    /// The named script-state globals, evaluated in page context.
    ScriptStates(Vec<String>),
    /// Responses observed during page load.
    NetworkResponses,
    /// Bodies fetched from the listed API endpoints.
    ApiPayloads(Vec<String>),
}

/// One serialized script-state object read from the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptState {
    /// Expression name, e.g. `window.__INITIAL_STATE__`.
    pub name: String,
    /// JSON text, or `None` when the global is undefined.
    pub raw: Option<String>,
}

/// Raw body returned by one API endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiPayload {
    /// The endpoint URL that was requested.
    pub endpoint: String,
    /// Response body text.
    pub body: String,
}

/// Normalized page evidence handed to a strategy.
#[derive(Debug, Clone)]
pub enum PageInput {
    /// Rendered media elements with their attributes.
    MediaElements(Vec<MediaElement>),
    /// Raw HTML/JS text of the page.
    PageSource(String),
    /// Serialized script-state objects.
    ScriptStates(Vec<ScriptState>),
    /// Observed network responses.
    NetworkResponses(Vec<NetworkResponse>),
    /// Successful API endpoint bodies.
    ApiPayloads(Vec<ApiPayload>),
}

impl PageInput {
    /// Returns a short label for the variant, used in diagnostics.
    #[must_use]
    pub fn shape_label(&self) -> &'static str {
        match self {
            Self::MediaElements(_) => "media_elements",
            Self::PageSource(_) => "page_source",
            Self::ScriptStates(_) => "script_states",
            Self::NetworkResponses(_) => "network_responses",
            Self::ApiPayloads(_) => "api_payloads",
        }
    }
}

/// Class of a recorded local failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// A strategy could not parse (or obtain) its input.
    StrategyParseFailure,
    /// One API endpoint errored or timed out.
    EndpointFailure,
}

/// A local failure that was swallowed at a strategy or endpoint boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Strategy the failure belongs to.
    pub source: CandidateSource,
    /// Failure class.
    pub kind: DiagnosticKind,
    /// Human-readable detail.
    pub detail: String,
}

impl Diagnostic {
    /// Creates a `StrategyParseFailure` diagnostic.
    #[must_use]
    pub fn parse_failure(source: CandidateSource, detail: impl Into<String>) -> Self {
        Self {
            source,
            kind: DiagnosticKind::StrategyParseFailure,
            detail: detail.into(),
        }
    }

    /// Creates an `EndpointFailure` diagnostic.
    #[must_use]
    pub fn endpoint_failure(endpoint: &str, detail: impl fmt::Display) -> Self {
        Self {
            source: CandidateSource::ApiFallback,
            kind: DiagnosticKind::EndpointFailure,
            detail: format!("{endpoint}: {detail}"),
        }
    }
}

/// Output of one strategy run: raw hits plus any swallowed failures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// Raw, un-deduplicated URL hits in discovery order.
    pub urls: Vec<RawUrl>,
    /// Local failures recorded during extraction.
    pub diagnostics: Vec<Diagnostic>,
}

impl Extraction {
    /// Creates an extraction from hits with no diagnostics.
    #[must_use]
    pub fn from_urls(urls: Vec<RawUrl>) -> Self {
        Self {
            urls,
            diagnostics: Vec::new(),
        }
    }

    /// Creates an empty extraction carrying one diagnostic.
    #[must_use]
    pub fn failed(diagnostic: Diagnostic) -> Self {
        Self {
            urls: Vec::new(),
            diagnostics: vec![diagnostic],
        }
    }

    /// Returns true when no raw URL was produced.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

/// One self-contained extraction technique.
///
/// Implementations are pure: `extract` performs no I/O, holds no mutable
/// state, and never fails. A strategy that cannot use its input returns an
/// empty [`Extraction`] with a [`DiagnosticKind::StrategyParseFailure`].
pub trait Strategy: Send + Sync {
    /// Returns the strategy's name (e.g. "dom_element").
    fn name(&self) -> &str;

    /// Returns the provenance tag stamped on candidates this strategy finds.
    fn source(&self) -> CandidateSource;

    /// Declares the evidence shape this strategy needs for the given page.
    fn input_shape(&self, page_url: &str) -> InputShape;

    /// Extracts raw URL hits from the supplied evidence.
    fn extract(&self, input: &PageInput, patterns: &PatternLibrary) -> Extraction;
}

/// Builds the diagnostic a strategy records when handed the wrong evidence shape.
pub(crate) fn unexpected_input(source: CandidateSource, input: &PageInput) -> Extraction {
    Extraction::failed(Diagnostic::parse_failure(
        source,
        format!("unexpected input shape '{}'", input.shape_label()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_failed_is_empty_with_diagnostic() {
        let extraction = Extraction::failed(Diagnostic::parse_failure(
            CandidateSource::DomElement,
            "boom",
        ));
        assert!(extraction.is_empty());
        assert_eq!(extraction.diagnostics.len(), 1);
        assert_eq!(
            extraction.diagnostics[0].kind,
            DiagnosticKind::StrategyParseFailure
        );
    }

    #[test]
    fn test_endpoint_failure_names_endpoint() {
        let diagnostic = Diagnostic::endpoint_failure("https://api.example.com/v", "timed out");
        assert_eq!(diagnostic.source, CandidateSource::ApiFallback);
        assert_eq!(diagnostic.kind, DiagnosticKind::EndpointFailure);
        assert!(diagnostic.detail.contains("https://api.example.com/v"));
        assert!(diagnostic.detail.contains("timed out"));
    }

    #[test]
    fn test_unexpected_input_names_shape() {
        let extraction = unexpected_input(
            CandidateSource::NetworkObservation,
            &PageInput::PageSource(String::new()),
        );
        assert!(extraction.is_empty());
        assert!(extraction.diagnostics[0].detail.contains("page_source"));
    }
}
