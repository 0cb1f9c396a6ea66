//! Streaming download of a resolved media URL to local storage.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use streamgrab_core::download::{DownloadOptions, MediaDownloader, output_path};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let downloader = MediaDownloader::new(DownloadOptions::default())?;
//! let destination = output_path(Path::new("./videos"), None, "dongchedi");
//! let result = downloader
//!     .download("https://cdn.example.com/a.mp4", &destination, |progress| {
//!         eprintln!("{} bytes", progress.downloaded);
//!     })
//!     .await?;
//! println!("Saved {}", result.path.display());
//! # Ok(())
//! # }
//! ```

mod client;
mod constants;
mod error;
mod filename;

pub use client::{DownloadOptions, DownloadProgress, DownloadResult, MediaDownloader};
pub use constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
pub use error::DownloadError;
pub use filename::{default_filename, output_path};
