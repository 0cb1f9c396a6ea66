//! HTTP fetching of site API endpoints for the API fallback strategy.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, REFERER};
use thiserror::Error;
use tracing::debug;

use crate::http_client::{HttpClientOptions, build_http_client};
use crate::session::SessionError;
use crate::user_agent::{BROWSER_USER_AGENT, default_referer};

use super::SiteProfile;

const PROBE_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Failure fetching one endpoint. Always local to that endpoint.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Transport-level failure (DNS, connect, TLS, body read).
    #[error("request to {endpoint} failed: {source}")]
    Request {
        /// Endpoint URL.
        endpoint: String,
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The endpoint answered with a non-success status.
    #[error("{endpoint} returned HTTP {status}")]
    HttpStatus {
        /// Endpoint URL.
        endpoint: String,
        /// HTTP status code.
        status: u16,
    },
}

impl ProbeError {
    /// Creates an HTTP status error.
    #[must_use]
    pub fn http_status(endpoint: &str, status: u16) -> Self {
        Self::HttpStatus {
            endpoint: endpoint.to_string(),
            status,
        }
    }
}

/// Fetches raw endpoint bodies for [`ApiFallbackStrategy`](super::ApiFallbackStrategy).
///
/// The pipeline wraps each call in its own timeout, so implementations may
/// block for as long as their transport allows.
#[async_trait]
pub trait EndpointProbe: Send + Sync {
    /// GETs `endpoint` and returns the response body text.
    async fn fetch(&self, endpoint: &str) -> Result<String, ProbeError>;
}

/// [`EndpointProbe`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpEndpointProbe {
    client: Client,
    referer: Option<String>,
}

impl HttpEndpointProbe {
    /// Creates a probe with the browser User-Agent and the profile's referer.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Launch`] when the HTTP client cannot be built.
    pub fn new(profile: &SiteProfile, timeout: Duration) -> Result<Self, SessionError> {
        Self::with_user_agent(profile, timeout, BROWSER_USER_AGENT)
    }

    /// Creates a probe sending a custom User-Agent.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Launch`] when the HTTP client cannot be built.
    pub fn with_user_agent(
        profile: &SiteProfile,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self, SessionError> {
        let options = HttpClientOptions {
            user_agent: user_agent.to_string(),
            connect_timeout: Duration::from_secs(PROBE_CONNECT_TIMEOUT_SECS).min(timeout),
            request_timeout: Some(timeout),
            read_timeout: None,
        };
        let client = build_http_client("endpoint_probe", &options)
            .map_err(|e| SessionError::launch(format!("API probe client: {e}")))?;
        Ok(Self {
            client,
            referer: profile.referer.clone(),
        })
    }
}

#[async_trait]
impl EndpointProbe for HttpEndpointProbe {
    async fn fetch(&self, endpoint: &str) -> Result<String, ProbeError> {
        let referer = self
            .referer
            .clone()
            .unwrap_or_else(|| default_referer(endpoint));
        let response = self
            .client
            .get(endpoint)
            .header(ACCEPT, "application/json, text/plain, */*")
            .header(REFERER, referer)
            .send()
            .await
            .map_err(|source| ProbeError::Request {
                endpoint: endpoint.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::http_status(endpoint, status.as_u16()));
        }

        let body = response.text().await.map_err(|source| ProbeError::Request {
            endpoint: endpoint.to_string(),
            source,
        })?;
        debug!(endpoint, bytes = body.len(), "endpoint fetched");
        Ok(body)
    }
}
