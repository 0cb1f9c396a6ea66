//! Streaming media downloader.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use reqwest::header::{ACCEPT, CONTENT_LENGTH, REFERER};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use super::error::DownloadError;
use crate::http_client::{HttpClientOptions, build_http_client};
use crate::user_agent::{BROWSER_USER_AGENT, default_referer};

/// Identity and timeouts for [`MediaDownloader`].
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// User-Agent sent with the media request.
    pub user_agent: String,
    /// Referer sent with the media request; the media URL's origin when `None`.
    pub referer: Option<String>,
    /// TCP/TLS connect deadline.
    pub connect_timeout: Duration,
    /// Longest gap allowed between body chunks.
    pub read_timeout: Duration,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            user_agent: BROWSER_USER_AGENT.to_string(),
            referer: None,
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            read_timeout: Duration::from_secs(READ_TIMEOUT_SECS),
        }
    }
}

/// Byte counts reported after every written chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadProgress {
    /// Bytes written so far.
    pub downloaded: u64,
    /// `Content-Length`, when the server sent one.
    pub total: Option<u64>,
}

impl DownloadProgress {
    /// Completion percentage, when the total size is known.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn percent(&self) -> Option<f64> {
        self.total
            .filter(|total| *total > 0)
            .map(|total| (self.downloaded as f64 / total as f64) * 100.0)
    }
}

/// Outcome of a completed download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadResult {
    /// File that was written.
    pub path: PathBuf,
    /// Bytes written.
    pub bytes_downloaded: u64,
    /// `Content-Length` reported by the server.
    pub content_length: Option<u64>,
}

/// Streams one media URL to one file.
///
/// The downloader never retries and never removes a partial file; a failure
/// mid-stream leaves whatever was written on disk.
#[derive(Debug, Clone)]
pub struct MediaDownloader {
    client: Client,
    referer: Option<String>,
}

impl MediaDownloader {
    /// Creates a downloader.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::ClientSetup`] when the HTTP client cannot be built.
    pub fn new(options: DownloadOptions) -> Result<Self, DownloadError> {
        let client_options = HttpClientOptions {
            user_agent: options.user_agent,
            connect_timeout: options.connect_timeout,
            request_timeout: None,
            read_timeout: Some(options.read_timeout),
        };
        let client = build_http_client("media_downloader", &client_options)
            .map_err(|e| DownloadError::client_setup(e.to_string()))?;
        Ok(Self {
            client,
            referer: options.referer,
        })
    }

    /// Streams `url` into `destination`, creating its parent directory.
    ///
    /// `on_progress` is called after every chunk is written.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if:
    /// - The URL is not absolute HTTP(S)
    /// - The request fails or times out
    /// - The server returns a non-success status
    /// - Creating the directory or writing the file fails
    #[must_use = "download result contains the written path and byte count"]
    #[instrument(skip(self, on_progress), fields(url = %url, path = %destination.display()))]
    pub async fn download<F>(
        &self,
        url: &str,
        destination: &Path,
        mut on_progress: F,
    ) -> Result<DownloadResult, DownloadError>
    where
        F: FnMut(DownloadProgress) + Send,
    {
        let parsed = Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(DownloadError::invalid_url(url));
        }

        if let Some(parent) = destination.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DownloadError::io(parent, e))?;
        }

        let referer = self.referer.clone().unwrap_or_else(|| default_referer(url));
        let response = self
            .client
            .get(parsed)
            .header(ACCEPT, "*/*")
            .header(REFERER, referer)
            .send()
            .await
            .map_err(|e| DownloadError::network(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::http_status(url, status.as_u16()));
        }

        let content_length = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        debug!(?content_length, "media response accepted");

        let file = File::create(destination)
            .await
            .map_err(|e| DownloadError::io(destination, e))?;
        let bytes_downloaded = stream_to_file(
            file,
            response,
            url,
            destination,
            content_length,
            &mut on_progress,
        )
        .await?;

        info!(
            path = %destination.display(),
            bytes = bytes_downloaded,
            "download complete"
        );

        Ok(DownloadResult {
            path: destination.to_path_buf(),
            bytes_downloaded,
            content_length,
        })
    }
}

async fn stream_to_file<F>(
    file: File,
    response: reqwest::Response,
    url: &str,
    file_path: &Path,
    total: Option<u64>,
    on_progress: &mut F,
) -> Result<u64, DownloadError>
where
    F: FnMut(DownloadProgress),
{
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| DownloadError::network(url, e))?;
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(file_path, e))?;
        downloaded += chunk.len() as u64;
        on_progress(DownloadProgress { downloaded, total });
    }

    writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(file_path, e))?;

    Ok(downloaded)
}
