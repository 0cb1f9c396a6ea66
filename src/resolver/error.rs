//! Error types for resolver operations.
//!
//! Only pipeline-level outcomes live here. Strategy-local and endpoint-local
//! failures never surface as errors; they are recorded as
//! [`Diagnostic`](super::Diagnostic)s on the run instead.

use thiserror::Error;

use crate::session::SessionError;

/// Errors that terminate a resolution run.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The page URL could not be normalized into an absolute http(s) URL.
    #[error("invalid page URL '{input}': {reason}\n  Suggestion: Pass an absolute page URL such as https://example.com/video/123")]
    InvalidPageUrl {
        /// The rejected input.
        input: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The page session failed before any strategy could run.
    #[error("page session failed for '{page_url}': {source}\n  Suggestion: {suggestion}")]
    Session {
        /// The normalized page URL being opened.
        page_url: String,
        /// The underlying session error.
        #[source]
        source: SessionError,
        /// How to fix the issue.
        suggestion: &'static str,
    },

    /// Every strategy ran to completion and none produced a usable URL.
    #[error(
        "no media candidates found for '{page_url}': tried {strategies_run} strategy(ies)\n  Suggestion: Retry with --engine chromium, a longer --settle-ms, or --dump-source to inspect the page"
    )]
    NoCandidatesFound {
        /// The normalized page URL.
        page_url: String,
        /// Number of strategies that ran.
        strategies_run: usize,
    },
}

impl ResolveError {
    /// Creates an `InvalidPageUrl` error.
    #[must_use]
    pub fn invalid_page_url(input: &str, reason: &str) -> Self {
        Self::InvalidPageUrl {
            input: input.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Creates a `Session` error.
    #[must_use]
    pub fn session(page_url: &str, source: SessionError) -> Self {
        let suggestion = match source {
            SessionError::Launch { .. } => {
                "Install Chrome/Chromium, pass --chrome <path>, or use --engine static"
            }
            _ => "Check the page URL and network connectivity",
        };
        Self::Session {
            page_url: page_url.to_string(),
            source,
            suggestion,
        }
    }

    /// Creates a `NoCandidatesFound` error.
    #[must_use]
    pub fn no_candidates(page_url: &str, strategies_run: usize) -> Self {
        Self::NoCandidatesFound {
            page_url: page_url.to_string(),
            strategies_run,
        }
    }

    /// Returns true when the run completed but found nothing.
    #[must_use]
    pub fn is_no_candidates(&self) -> bool {
        matches!(self, Self::NoCandidatesFound { .. })
    }
}
