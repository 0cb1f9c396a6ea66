//! Plain-HTTP page session: no JavaScript, evidence recovered from markup.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, REFERER};
use tracing::{debug, instrument};
use url::Url;

use crate::http_client::{HttpClientOptions, build_http_client};
use crate::user_agent::{BROWSER_USER_AGENT, default_referer};

use super::{MediaElement, NetworkResponse, PageSession, SessionError};

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[allow(clippy::expect_used)]
static MEDIA_TAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(video|source)\b([^>]*)>")
        .expect("media tag regex is valid") // Static pattern, safe to panic
});

#[allow(clippy::expect_used)]
static ATTRIBUTE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)\b(src|poster)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .expect("attribute regex is valid") // Static pattern, safe to panic
});

/// Settings for [`StaticPageSession`].
#[derive(Debug, Clone)]
pub struct StaticSessionConfig {
    /// User-Agent header.
    pub user_agent: String,
    /// Fixed Referer; the page origin is used when `None`.
    pub referer: Option<String>,
    /// TCP/TLS connect deadline.
    pub connect_timeout: Duration,
    /// Whole-request deadline for the page document.
    pub request_timeout: Duration,
}

impl Default for StaticSessionConfig {
    fn default() -> Self {
        Self {
            user_agent: BROWSER_USER_AGENT.to_string(),
            referer: None,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug)]
struct LoadedPage {
    final_url: String,
    content_type: Option<String>,
    html: String,
}

/// [`PageSession`] that GETs the page document and inspects the raw HTML.
///
/// Media elements come from `<video>`/`<source>` tags, script state from
/// inline `NAME = {...};</script>` assignments, and the network log holds
/// only the document response itself.
#[derive(Debug)]
pub struct StaticPageSession {
    client: Client,
    referer: Option<String>,
    page: Option<LoadedPage>,
}

impl StaticPageSession {
    /// Creates the session.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Launch`] when the HTTP client cannot be built.
    pub fn new(config: StaticSessionConfig) -> Result<Self, SessionError> {
        let options = HttpClientOptions {
            user_agent: config.user_agent,
            connect_timeout: config.connect_timeout,
            request_timeout: Some(config.request_timeout),
            read_timeout: None,
        };
        let client = build_http_client("static_session", &options)
            .map_err(|e| SessionError::launch(e.to_string()))?;
        Ok(Self {
            client,
            referer: config.referer,
            page: None,
        })
    }

    fn loaded(&self, query: &str) -> Result<&LoadedPage, SessionError> {
        self.page
            .as_ref()
            .ok_or_else(|| SessionError::not_open(query))
    }
}

#[async_trait]
impl PageSession for StaticPageSession {
    fn name(&self) -> &'static str {
        "static"
    }

    #[instrument(skip(self), fields(engine = "static"))]
    async fn open(&mut self, url: &str) -> Result<String, SessionError> {
        let referer = self.referer.clone().unwrap_or_else(|| default_referer(url));
        let response = self
            .client
            .get(url)
            .header(
                ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header(ACCEPT_LANGUAGE, "zh-CN,zh;q=0.9,en;q=0.8")
            .header(REFERER, referer)
            .send()
            .await
            .map_err(|e| SessionError::navigation(url, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SessionError::http(url, status.as_u16()));
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let html = response
            .text()
            .await
            .map_err(|e| SessionError::navigation(url, e.to_string()))?;
        debug!(final_url = %final_url, bytes = html.len(), "page document fetched");

        self.page = Some(LoadedPage {
            final_url: final_url.clone(),
            content_type,
            html,
        });
        Ok(final_url)
    }

    async fn media_elements(&mut self) -> Result<Vec<MediaElement>, SessionError> {
        let page = self.loaded("media_elements")?;
        Ok(scan_media_elements(&page.html, &page.final_url))
    }

    async fn page_source(&mut self) -> Result<String, SessionError> {
        Ok(self.loaded("page_source")?.html.clone())
    }

    async fn script_state(&mut self, name: &str) -> Result<Option<String>, SessionError> {
        let page = self.loaded(name)?;
        inline_script_state(&page.html, name)
    }

    async fn network_responses(&mut self) -> Result<Vec<NetworkResponse>, SessionError> {
        let page = self.loaded("network_responses")?;
        Ok(vec![NetworkResponse {
            url: page.final_url.clone(),
            mime_type: page.content_type.clone(),
        }])
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        self.page = None;
        Ok(())
    }
}

/// Recovers `<video>`/`<source>` attributes from markup, resolving relative
/// values against `base_url` as a browser would.
fn scan_media_elements(html: &str, base_url: &str) -> Vec<MediaElement> {
    let base = Url::parse(base_url).ok();
    MEDIA_TAG_PATTERN
        .captures_iter(html)
        .map(|tag| {
            let mut element = MediaElement {
                tag: tag[1].to_ascii_lowercase(),
                ..MediaElement::default()
            };
            for attribute in ATTRIBUTE_PATTERN.captures_iter(&tag[2]) {
                let raw = attribute
                    .get(2)
                    .or_else(|| attribute.get(3))
                    .map_or("", |m| m.as_str());
                let value = resolve_attribute(base.as_ref(), raw);
                match attribute[1].to_ascii_lowercase().as_str() {
                    "src" => element.src = value,
                    _ => element.poster = value,
                }
            }
            element
        })
        .collect()
}

fn resolve_attribute(base: Option<&Url>, raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match base.and_then(|base| base.join(raw).ok()) {
        Some(joined) => Some(joined.to_string()),
        None => Some(raw.to_string()),
    }
}

/// Extracts the object literal assigned to `name` in an inline script.
///
/// `window.X`, `var X`, `let X`, and `const X` assignments all match.
fn inline_script_state(html: &str, name: &str) -> Result<Option<String>, SessionError> {
    let bare = name.strip_prefix("window.").unwrap_or(name);
    let pattern = format!(
        r"(?s)(?:window\.|var\s+|let\s+|const\s+)?{}\s*=\s*(\{{.*?\}})\s*;?\s*</script>",
        regex::escape(bare)
    );
    let regex = Regex::new(&pattern).map_err(|e| SessionError::evaluation(name, e.to_string()))?;
    Ok(regex.captures(html).map(|captures| captures[1].to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, ResponseTemplate};

    use super::*;
    use crate::test_support::socket_guard::start_mock_server_or_skip;

    #[test]
    fn test_scan_media_elements_resolves_relative_src() {
        let html = r#"<video poster='/cover.jpg' controls><source src="/media/a.mp4" type="video/mp4"></video>"#;
        let elements = scan_media_elements(html, "https://www.example.com/watch/1");
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].tag, "video");
        assert_eq!(elements[0].poster.as_deref(), Some("https://www.example.com/cover.jpg"));
        assert_eq!(elements[1].tag, "source");
        assert_eq!(
            elements[1].src.as_deref(),
            Some("https://www.example.com/media/a.mp4")
        );
    }

    #[test]
    fn test_inline_script_state_window_assignment() {
        let html = r#"<script>window.__INITIAL_STATE__ = {"video":{"play_url":"https://cdn.example.com/a.mp4"}};</script>"#;
        let state = inline_script_state(html, "window.__INITIAL_STATE__").unwrap();
        assert_eq!(
            state.as_deref(),
            Some(r#"{"video":{"play_url":"https://cdn.example.com/a.mp4"}}"#)
        );
    }

    #[test]
    fn test_inline_script_state_var_assignment_and_missing() {
        let html = "<script>var pageData = {\"a\":1}\n</script>";
        let state = inline_script_state(html, "window.pageData").unwrap();
        assert_eq!(state.as_deref(), Some("{\"a\":1}"));
        assert_eq!(inline_script_state(html, "window.videoData").unwrap(), None);
    }

    #[tokio::test]
    async fn test_queries_before_open_fail() {
        let mut session = StaticPageSession::new(StaticSessionConfig::default()).unwrap();
        assert!(session.page_source().await.is_err());
        assert!(session.network_responses().await.is_err());
    }

    #[tokio::test]
    async fn test_open_fetches_document_and_reports_network() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path("/video/1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(r#"<html><video src="/v.mp4"></video></html>"#, "text/html; charset=utf-8"),
            )
            .mount(&server)
            .await;

        let mut session = StaticPageSession::new(StaticSessionConfig::default()).unwrap();
        let page_url = format!("{}/video/1", server.uri());
        let final_url = session.open(&page_url).await.unwrap();
        assert_eq!(final_url, page_url);

        let elements = session.media_elements().await.unwrap();
        assert_eq!(elements[0].src.as_deref(), Some(format!("{}/v.mp4", server.uri()).as_str()));

        let network = session.network_responses().await.unwrap();
        assert_eq!(network.len(), 1);
        assert_eq!(network[0].mime_type.as_deref(), Some("text/html; charset=utf-8"));

        session.close().await.unwrap();
        assert!(session.page_source().await.is_err());
    }

    #[tokio::test]
    async fn test_open_error_status_is_http_error() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let mut session = StaticPageSession::new(StaticSessionConfig::default()).unwrap();
        let err = session
            .open(&format!("{}/missing", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Http { status: 404, .. }), "got: {err}");
    }
}
