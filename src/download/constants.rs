//! Constants for the download module (timeouts, naming).

/// Default HTTP connect timeout (15 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 15;

/// Default per-read timeout (2 minutes between body chunks).
pub const READ_TIMEOUT_SECS: u64 = 120;

/// Extension appended to generated filenames.
pub const DEFAULT_EXTENSION: &str = ".mp4";

/// Prefix used when the caller supplies none.
pub const DEFAULT_FILENAME_PREFIX: &str = "video";
