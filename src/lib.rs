//! Streamgrab Core Library
//!
//! This library resolves the direct media-stream URL hidden behind a
//! client-rendered landing page and streams that asset to local storage.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`resolver`] - Pattern library, extraction strategies, resolution pipeline, selector
//! - [`session`] - Browser collaborator trait with Chromium and static-HTTP engines
//! - [`download`] - Streaming downloader with progress callbacks

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod download;
mod http_client;
pub mod resolver;
pub mod session;
mod user_agent;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use download::{
    DownloadError, DownloadOptions, DownloadProgress, DownloadResult, MediaDownloader,
};
pub use resolver::{
    Candidate, CandidateSource, MediaKind, PatternLibrary, Resolution, ResolutionPipeline,
    ResolveError, Selection, Selector, SiteProfile, build_default_pipeline, resolve_and_close,
};
pub use session::{PageSession, SessionError};
pub use user_agent::{BROWSER_USER_AGENT, default_referer};
