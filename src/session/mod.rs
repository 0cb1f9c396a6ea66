//! Page sessions: the browser collaborator behind the resolution pipeline.
//!
//! A [`PageSession`] opens one page and answers evidence queries about it.
//! Two engines are provided:
//!
//! - [`ChromiumSession`] (feature `chromium`) drives headless Chromium over
//!   CDP and sees the rendered DOM, JS globals, and network traffic.
//! - [`StaticPageSession`] fetches the raw document over HTTP and recovers
//!   what it can from the markup alone.

#[cfg(feature = "chromium")]
mod chromium;
mod static_page;

#[cfg(feature = "chromium")]
pub use chromium::{ChromiumSession, ChromiumSessionConfig};
pub use static_page::{StaticPageSession, StaticSessionConfig};

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

/// Attributes of one rendered `<video>` or `<source>` element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MediaElement {
    /// Lowercase tag name.
    pub tag: String,
    /// `src` attribute, resolved against the page URL.
    pub src: Option<String>,
    /// Source the player actually selected.
    pub current_src: Option<String>,
    /// `poster` attribute.
    pub poster: Option<String>,
}

/// One response observed while the page loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkResponse {
    /// Response URL.
    pub url: String,
    /// Reported MIME type, when the engine knows it.
    pub mime_type: Option<String>,
}

/// Errors from page session engines.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The engine could not start.
    #[error("could not start page engine: {reason}")]
    Launch {
        /// Why startup failed.
        reason: String,
    },

    /// Navigation to the page failed.
    #[error("navigation to {url} failed: {reason}")]
    Navigation {
        /// Target URL.
        url: String,
        /// Why navigation failed.
        reason: String,
    },

    /// Evaluating an expression or reading page state failed.
    #[error("evaluating `{expression}` failed: {reason}")]
    Evaluation {
        /// Expression or query that failed.
        expression: String,
        /// Why it failed.
        reason: String,
    },

    /// The page document was served with an error status.
    #[error("HTTP {status} fetching {url}")]
    Http {
        /// Requested URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },
}

impl SessionError {
    /// Creates a `Launch` error.
    #[must_use]
    pub fn launch(reason: impl Into<String>) -> Self {
        Self::Launch {
            reason: reason.into(),
        }
    }

    /// Creates a `Navigation` error.
    #[must_use]
    pub fn navigation(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Navigation {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates an `Evaluation` error.
    #[must_use]
    pub fn evaluation(expression: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Evaluation {
            expression: expression.into(),
            reason: reason.into(),
        }
    }

    /// Creates an `Http` error.
    #[must_use]
    pub fn http(url: impl Into<String>, status: u16) -> Self {
        Self::Http {
            url: url.into(),
            status,
        }
    }

    /// Error returned by evidence queries before any page is open.
    pub(crate) fn not_open(query: &str) -> Self {
        Self::evaluation(query, "no page is open")
    }
}

/// One page opened in a browser-like engine.
///
/// Evidence queries are only valid after a successful [`open`](Self::open).
/// Implementations must release every external resource in
/// [`close`](Self::close) and should also do so on drop.
#[async_trait]
pub trait PageSession: Send {
    /// Returns the engine name (e.g. "chromium", "static").
    fn name(&self) -> &str;

    /// Navigates to `url` and returns the final URL after redirects.
    async fn open(&mut self, url: &str) -> Result<String, SessionError>;

    /// Lists rendered `<video>`/`<source>` elements.
    async fn media_elements(&mut self) -> Result<Vec<MediaElement>, SessionError>;

    /// Returns the page's HTML source.
    async fn page_source(&mut self) -> Result<String, SessionError>;

    /// Evaluates a script-state global and returns its JSON text, or `None`
    /// when it is undefined on this page.
    async fn script_state(&mut self, name: &str) -> Result<Option<String>, SessionError>;

    /// Returns the responses observed since [`open`](Self::open).
    async fn network_responses(&mut self) -> Result<Vec<NetworkResponse>, SessionError>;

    /// Releases the engine.
    async fn close(&mut self) -> Result<(), SessionError>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_media_element_deserializes_from_dom_json() {
        let element: MediaElement = serde_json::from_str(
            r#"{"tag":"video","src":null,"currentSrc":"https://cdn.example.com/a.mp4"}"#,
        )
        .unwrap();
        assert_eq!(element.tag, "video");
        assert_eq!(element.src, None);
        assert_eq!(
            element.current_src.as_deref(),
            Some("https://cdn.example.com/a.mp4")
        );
        assert_eq!(element.poster, None);
    }

    #[test]
    fn test_session_error_messages() {
        assert!(
            SessionError::launch("chrome missing")
                .to_string()
                .contains("chrome missing")
        );
        assert_eq!(
            SessionError::http("https://example.com/a", 404).to_string(),
            "HTTP 404 fetching https://example.com/a"
        );
        assert!(
            SessionError::not_open("page_source")
                .to_string()
                .contains("no page is open")
        );
    }
}
