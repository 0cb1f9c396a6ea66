//! Exit code logic for the streamgrab process.
//!
//! Single responsibility: turn a failed run into a reported error and exit outcome.

use streamgrab_core::{DownloadError, ResolveError};

use crate::ProcessExit;

/// Returns the operator hint for a failed run, if one applies.
pub(crate) fn failure_hint(error: &anyhow::Error) -> Option<&'static str> {
    if let Some(resolve_error) = error.downcast_ref::<ResolveError>() {
        return match resolve_error {
            ResolveError::NoCandidatesFound { .. } => Some(
                "No strategy found a media URL. Try a longer --settle-ms, the other --engine, \
                 or --dump-source <path> to inspect the page.",
            ),
            ResolveError::InvalidPageUrl { .. } => {
                Some("Pass the full landing page URL, e.g. https://www.dongchedi.com/video/<id>.")
            }
            ResolveError::Session { .. } => None,
        };
    }
    if let Some(DownloadError::Io { .. }) = error.downcast_ref::<DownloadError>() {
        return Some("Check that the output directory is writable.");
    }
    None
}

/// Logs a failed run and returns the failure outcome.
pub(crate) fn report_failure(error: &anyhow::Error) -> ProcessExit {
    eprintln!("Error: {error:#}");
    if let Some(hint) = failure_hint(error) {
        eprintln!("  Hint: {hint}");
    }
    ProcessExit::Failure
}
