//! Scripted page session and endpoint probe for pipeline tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use streamgrab_core::resolver::{EndpointProbe, ProbeError};
use streamgrab_core::session::{MediaElement, NetworkResponse, PageSession, SessionError};

/// Evidence a [`FakeSession`] serves after `open`.
#[derive(Debug, Clone, Default)]
pub struct FakePage {
    pub final_url: Option<String>,
    pub media_elements: Vec<MediaElement>,
    pub html: String,
    pub script_states: HashMap<String, String>,
    pub network: Vec<NetworkResponse>,
}

/// What the pipeline did to the session, readable after it is consumed.
#[derive(Debug, Default)]
pub struct SessionLog {
    pub opened: Mutex<Option<String>>,
    pub closed: AtomicBool,
    pub network_queries: AtomicUsize,
}

pub struct FakeSession {
    page: FakePage,
    fail_open: bool,
    log: Arc<SessionLog>,
}

impl FakeSession {
    pub fn new(page: FakePage) -> (Self, Arc<SessionLog>) {
        let log = Arc::new(SessionLog::default());
        (
            Self {
                page,
                fail_open: false,
                log: Arc::clone(&log),
            },
            log,
        )
    }

    pub fn failing_open() -> (Self, Arc<SessionLog>) {
        let (mut session, log) = Self::new(FakePage::default());
        session.fail_open = true;
        (session, log)
    }
}

#[async_trait]
impl PageSession for FakeSession {
    fn name(&self) -> &str {
        "fake"
    }

    async fn open(&mut self, url: &str) -> Result<String, SessionError> {
        if self.fail_open {
            return Err(SessionError::navigation(url, "net::ERR_NAME_NOT_RESOLVED"));
        }
        *self.log.opened.lock().unwrap() = Some(url.to_string());
        Ok(self
            .page
            .final_url
            .clone()
            .unwrap_or_else(|| url.to_string()))
    }

    async fn media_elements(&mut self) -> Result<Vec<MediaElement>, SessionError> {
        Ok(self.page.media_elements.clone())
    }

    async fn page_source(&mut self) -> Result<String, SessionError> {
        Ok(self.page.html.clone())
    }

    async fn script_state(&mut self, name: &str) -> Result<Option<String>, SessionError> {
        Ok(self.page.script_states.get(name).cloned())
    }

    async fn network_responses(&mut self) -> Result<Vec<NetworkResponse>, SessionError> {
        self.log.network_queries.fetch_add(1, Ordering::SeqCst);
        Ok(self.page.network.clone())
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        self.log.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Endpoint probe answering from a fixed map; unknown endpoints are 404.
#[derive(Debug, Default)]
pub struct MapProbe {
    pub bodies: HashMap<String, String>,
    pub calls: AtomicUsize,
}

#[async_trait]
impl EndpointProbe for MapProbe {
    async fn fetch(&self, endpoint: &str) -> Result<String, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.bodies
            .get(endpoint)
            .cloned()
            .ok_or_else(|| ProbeError::http_status(endpoint, 404))
    }
}
