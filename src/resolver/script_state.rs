//! Traversal of hydration/initial-state globals exposed by the page.

use serde_json::Value;
use tracing::debug;

use super::strategy::unexpected_input;
use super::{
    CandidateSource, Diagnostic, Extraction, InputShape, PageInput, PatternLibrary, Strategy,
};

/// Globals probed for embedded player state, in probe order.
pub const DEFAULT_SCRIPT_STATE_NAMES: [&str; 8] = [
    "window.__INITIAL_STATE__",
    "window.INITIAL_STATE",
    "window.initialState",
    "window.dynamicLoad",
    "window.nuxt",
    "window.pageData",
    "window.videoData",
    "window.__VIDEO_DATA__",
];

/// Parses each named script-state object and walks it with
/// [`PatternLibrary::match_tree`].
#[derive(Debug, Clone)]
pub struct ScriptStateTraversalStrategy {
    names: Vec<String>,
}

impl Default for ScriptStateTraversalStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptStateTraversalStrategy {
    /// Creates the strategy probing [`DEFAULT_SCRIPT_STATE_NAMES`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_names(
            DEFAULT_SCRIPT_STATE_NAMES
                .iter()
                .map(ToString::to_string)
                .collect(),
        )
    }

    /// Creates the strategy probing a custom list of globals.
    #[must_use]
    pub fn with_names(names: Vec<String>) -> Self {
        Self { names }
    }
}

impl Strategy for ScriptStateTraversalStrategy {
    fn name(&self) -> &'static str {
        "script_state_traversal"
    }

    fn source(&self) -> CandidateSource {
        CandidateSource::ScriptStateTraversal
    }

    fn input_shape(&self, _page_url: &str) -> InputShape {
        InputShape::ScriptStates(self.names.clone())
    }

    fn extract(&self, input: &PageInput, patterns: &PatternLibrary) -> Extraction {
        let PageInput::ScriptStates(states) = input else {
            return unexpected_input(self.source(), input);
        };

        let mut extraction = Extraction::default();
        for state in states {
            let Some(raw) = state.raw.as_deref() else {
                debug!(name = %state.name, "script state undefined");
                continue;
            };
            match serde_json::from_str::<Value>(raw) {
                Ok(tree) => extraction.urls.extend(patterns.match_tree(&tree)),
                Err(e) => extraction.diagnostics.push(Diagnostic::parse_failure(
                    self.source(),
                    format!("{}: {e}", state.name),
                )),
            }
        }
        extraction
    }
}
