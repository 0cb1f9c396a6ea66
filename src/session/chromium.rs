//! Headless Chromium session over the DevTools protocol.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{EnableParams, EventResponseReceived};
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use futures_util::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

use crate::user_agent::{BROWSER_USER_AGENT, default_referer};

use super::{MediaElement, NetworkResponse, PageSession, SessionError};

const DEFAULT_SETTLE_MS: u64 = 3000;

/// Serializes every rendered `<video>`/`<source>` element.
const MEDIA_ELEMENTS_JS: &str = r"
JSON.stringify(Array.from(document.querySelectorAll('video, source')).map((e) => ({
    tag: e.tagName.toLowerCase(),
    src: e.src || null,
    currentSrc: e.currentSrc || null,
    poster: e.poster || null,
})))
";

/// Settings for [`ChromiumSession`].
#[derive(Debug, Clone)]
pub struct ChromiumSessionConfig {
    /// Chrome/Chromium executable; auto-detected when `None`.
    pub chrome_path: Option<PathBuf>,
    /// Show the browser window.
    pub headful: bool,
    /// Wait after navigation for players and XHRs to start.
    pub settle: Duration,
    /// User-Agent override.
    pub user_agent: String,
    /// Fixed navigation Referer; the page origin is used when `None`.
    pub referer: Option<String>,
}

impl Default for ChromiumSessionConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            headful: false,
            settle: Duration::from_millis(DEFAULT_SETTLE_MS),
            user_agent: BROWSER_USER_AGENT.to_string(),
            referer: None,
        }
    }
}

/// [`PageSession`] backed by a launched Chromium process.
///
/// The network listener is attached before navigation so responses fired
/// during the initial load are captured. Background tasks are aborted on
/// [`close`](PageSession::close) and on drop.
pub struct ChromiumSession {
    browser: Option<Browser>,
    page: Option<Page>,
    settle: Duration,
    referer: Option<String>,
    handler_task: JoinHandle<()>,
    listener_task: Option<JoinHandle<()>>,
    responses: Arc<Mutex<Vec<NetworkResponse>>>,
}

impl std::fmt::Debug for ChromiumSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChromiumSession")
            .field("open", &self.page.is_some())
            .field("settle", &self.settle)
            .finish_non_exhaustive()
    }
}

impl ChromiumSession {
    /// Launches the browser.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Launch`] when no browser can be started.
    #[instrument(skip(config), fields(headful = config.headful))]
    pub async fn launch(config: ChromiumSessionConfig) -> Result<Self, SessionError> {
        let mut builder = BrowserConfig::builder()
            .arg(format!("--user-agent={}", config.user_agent))
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--mute-audio");
        if config.headful {
            builder = builder.with_head();
        }
        if let Some(path) = &config.chrome_path {
            builder = builder.chrome_executable(path);
        }
        let browser_config = builder.build().map_err(SessionError::launch)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| SessionError::launch(e.to_string()))?;
        let handler_task = tokio::spawn(async move { while handler.next().await.is_some() {} });

        debug!("browser launched");
        Ok(Self {
            browser: Some(browser),
            page: None,
            settle: config.settle,
            referer: config.referer,
            handler_task,
            listener_task: None,
            responses: Arc::new(Mutex::new(Vec::new())),
        })
    }

    fn page(&self, query: &str) -> Result<&Page, SessionError> {
        self.page
            .as_ref()
            .ok_or_else(|| SessionError::not_open(query))
    }

    async fn start_listener(&mut self, page: &Page, url: &str) -> Result<(), SessionError> {
        page.execute(EnableParams::default())
            .await
            .map_err(|e| SessionError::navigation(url, e.to_string()))?;
        let mut events = page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(|e| SessionError::navigation(url, e.to_string()))?;

        if let Some(previous) = self.listener_task.take() {
            previous.abort();
        }
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        let responses = Arc::clone(&self.responses);
        self.listener_task = Some(tokio::spawn(async move {
            while let Some(event) = events.next().await {
                let mime_type = Some(event.response.mime_type.clone()).filter(|m| !m.is_empty());
                responses
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(NetworkResponse {
                        url: event.response.url.clone(),
                        mime_type,
                    });
            }
        }));
        Ok(())
    }

    fn abort_tasks(&mut self) {
        if let Some(task) = self.listener_task.take() {
            task.abort();
        }
        self.handler_task.abort();
    }
}

#[async_trait]
impl PageSession for ChromiumSession {
    fn name(&self) -> &'static str {
        "chromium"
    }

    #[instrument(skip(self), fields(engine = "chromium"))]
    async fn open(&mut self, url: &str) -> Result<String, SessionError> {
        let browser = self
            .browser
            .as_ref()
            .ok_or_else(|| SessionError::launch("browser already closed"))?;
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| SessionError::navigation(url, e.to_string()))?;

        self.start_listener(&page, url).await?;

        let referer = self.referer.clone().unwrap_or_else(|| default_referer(url));
        let params = NavigateParams::builder()
            .url(url)
            .referrer(referer)
            .build()
            .map_err(|e| SessionError::navigation(url, e))?;
        page.goto(params)
            .await
            .map_err(|e| SessionError::navigation(url, e.to_string()))?;

        tokio::time::sleep(self.settle).await;

        let final_url = page
            .url()
            .await
            .map_err(|e| SessionError::navigation(url, e.to_string()))?
            .unwrap_or_else(|| url.to_string());
        debug!(final_url = %final_url, "page settled");
        self.page = Some(page);
        Ok(final_url)
    }

    async fn media_elements(&mut self) -> Result<Vec<MediaElement>, SessionError> {
        let page = self.page("media_elements")?;
        let json: String = page
            .evaluate(MEDIA_ELEMENTS_JS)
            .await
            .map_err(|e| SessionError::evaluation("media_elements", e.to_string()))?
            .into_value()
            .map_err(|e| SessionError::evaluation("media_elements", e.to_string()))?;
        serde_json::from_str(&json)
            .map_err(|e| SessionError::evaluation("media_elements", e.to_string()))
    }

    async fn page_source(&mut self) -> Result<String, SessionError> {
        self.page("page_source")?
            .content()
            .await
            .map_err(|e| SessionError::evaluation("page_source", e.to_string()))
    }

    async fn script_state(&mut self, name: &str) -> Result<Option<String>, SessionError> {
        let expression = script_state_expression(name)?;
        let page = self.page(name)?;
        let json: String = page
            .evaluate(expression)
            .await
            .map_err(|e| SessionError::evaluation(name, e.to_string()))?
            .into_value()
            .map_err(|e| SessionError::evaluation(name, e.to_string()))?;
        Ok(Some(json).filter(|j| !j.is_empty()))
    }

    async fn network_responses(&mut self) -> Result<Vec<NetworkResponse>, SessionError> {
        self.page("network_responses")?;
        Ok(self
            .responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        self.page = None;
        let result = match self.browser.take() {
            Some(mut browser) => {
                let closed = browser.close().await.map(|_| ());
                if let Err(e) = browser.wait().await {
                    warn!(error = %e, "browser process did not exit cleanly");
                }
                closed.map_err(|e| SessionError::launch(format!("closing browser: {e}")))
            }
            None => Ok(()),
        };
        self.abort_tasks();
        result
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        self.abort_tasks();
    }
}

/// Builds the JS that serializes a global, returning `''` when it is
/// undefined or not serializable.
fn script_state_expression(name: &str) -> Result<String, SessionError> {
    let is_identifier = |part: &str| {
        !part.is_empty()
            && part
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
    };
    let is_member_path = name.split('.').all(is_identifier);
    if !is_member_path {
        return Err(SessionError::evaluation(name, "not a global member path"));
    }
    Ok(format!(
        "(() => {{ try {{ const v = {name}; return v === undefined || v === null ? '' : JSON.stringify(v); }} catch (e) {{ return ''; }} }})()"
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_script_state_expression_wraps_global() {
        let js = script_state_expression("window.__INITIAL_STATE__").unwrap();
        assert!(js.contains("const v = window.__INITIAL_STATE__;"));
        assert!(js.contains("JSON.stringify(v)"));
    }

    #[test]
    fn test_script_state_expression_rejects_code() {
        for name in ["", "window.", "alert(1)", "window['x']", "a;b"] {
            assert!(script_state_expression(name).is_err(), "name: {name}");
        }
    }

    #[test]
    fn test_default_config_is_headless() {
        let config = ChromiumSessionConfig::default();
        assert!(!config.headful);
        assert_eq!(config.settle, Duration::from_millis(DEFAULT_SETTLE_MS));
        assert_eq!(config.user_agent, BROWSER_USER_AGENT);
    }
}
