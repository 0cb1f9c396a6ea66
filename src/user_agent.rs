//! Browser identity shared by page sessions, API probing, and downloads.

use url::Url;

/// Desktop Chrome User-Agent sent with every request.
///
/// Media CDNs behind client-rendered pages commonly reject non-browser agents,
/// so the tool always presents as a regular desktop browser.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";

/// Returns the origin of `page_url` with a trailing slash, for use as `Referer`.
///
/// Returns an empty string when the URL has no usable origin.
#[must_use]
pub fn default_referer(page_url: &str) -> String {
    match Url::parse(page_url.trim()) {
        Ok(url) if url.host_str().is_some() => {
            let origin = url.origin().ascii_serialization();
            format!("{origin}/")
        }
        _ => String::new(),
    }
}
