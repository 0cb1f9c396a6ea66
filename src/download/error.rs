//! Error types for the download module.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while streaming a media file to disk.
///
/// Every variant is terminal for the run: the downloader does not retry and
/// leaves any partial file in place.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The media URL is malformed or not HTTP(S).
    #[error("invalid media URL: {url}")]
    InvalidUrl {
        /// The rejected URL.
        url: String,
    },

    /// Network-level error (DNS, connection reset, TLS, broken body stream).
    #[error("network error downloading {url}: {source}")]
    Network {
        /// The URL being downloaded.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Connect or read deadline elapsed.
    #[error("timeout downloading {url}\n  Suggestion: raise download_read_timeout_secs in the config file")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// The media host answered with a non-success status.
    #[error("HTTP {status} downloading {url}\n  Suggestion: {suggestion}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
        /// User-facing hint for resolving the failure.
        suggestion: &'static str,
    },

    /// The HTTP client could not be constructed.
    #[error("could not set up the download client: {reason}")]
    ClientSetup {
        /// Why construction failed.
        reason: String,
    },

    /// Creating the output directory or writing the file failed.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file or directory where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl DownloadError {
    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates a network error, promoting reqwest timeouts to [`Self::Timeout`].
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            return Self::timeout(url);
        }
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an HTTP status error.
    ///
    /// Signed media URLs expire quickly, so 403/404/410 suggest resolving
    /// the page again.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        let suggestion = match status {
            403 | 404 | 410 => "The media link may have expired; resolve the page again.",
            429 => "The host is rate limiting; wait before retrying.",
            500..=599 => "The media host is failing; try again later.",
            _ => "Check that the selected candidate is a direct media URL.",
        };
        Self::HttpStatus {
            url: url.into(),
            status,
            suggestion,
        }
    }

    /// Creates a client setup error.
    pub fn client_setup(reason: impl Into<String>) -> Self {
        Self::ClientSetup {
            reason: reason.into(),
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
