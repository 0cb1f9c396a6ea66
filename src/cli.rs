//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Page engine used to open the landing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Engine {
    /// Headless Chromium over the DevTools protocol
    Chromium,
    /// Plain HTTP fetch of the page document (no JavaScript)
    Static,
}

impl Engine {
    /// Returns the stable label used in config files and logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Chromium => "chromium",
            Self::Static => "static",
        }
    }
}

/// Resolve and download the video hidden behind a landing page.
///
/// The page is opened in a browser engine, five extraction strategies run in
/// priority order until one finds a media URL, and the chosen URL is streamed
/// to disk with progress.
#[derive(Parser, Debug)]
#[command(name = "streamgrab")]
#[command(author, version, about)]
pub struct Args {
    /// Landing page URL (scheme optional)
    pub page_url: String,

    /// Directory to save into, created if absent [default: .]
    pub output_dir: Option<PathBuf>,

    /// Output filename [default: <site>_<unix-seconds>.mp4]
    pub filename: Option<String>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Disable colored log output
    #[arg(long)]
    pub no_color: bool,

    /// Page engine
    #[arg(long, value_enum, default_value_t = Engine::Chromium)]
    pub engine: Engine,

    /// Candidate to download when several are found (1-based; an invalid
    /// choice falls back to the first with a warning)
    #[arg(long, value_name = "N")]
    pub select: Option<String>,

    /// Keep the desktop host instead of rewriting to the mobile site
    #[arg(long)]
    pub no_mobile: bool,

    /// Milliseconds to let the page settle after navigation (0-60000)
    #[arg(long, default_value_t = 3000, value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub settle_ms: u64,

    /// Per-endpoint timeout for API fallback probing, in seconds (1-120)
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..=120))]
    pub api_timeout_secs: u64,

    /// Chrome/Chromium executable to launch
    #[arg(long, value_name = "PATH")]
    pub chrome: Option<PathBuf>,

    /// Show the browser window
    #[arg(long)]
    pub headful: bool,

    /// Write the page source here when no candidate is found
    #[arg(long, value_name = "PATH")]
    pub dump_source: Option<PathBuf>,

    /// Print the resolved candidates and exit without downloading
    #[arg(long)]
    pub resolve_only: bool,

    /// Print the resolution as JSON (requires --resolve-only)
    #[arg(long, requires = "resolve_only")]
    pub json: bool,
}
