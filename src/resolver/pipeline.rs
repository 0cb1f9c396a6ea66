//! Priority-ordered strategy chain with short-circuit fallback.
//!
//! The [`ResolutionPipeline`] opens the page once, then asks each strategy in
//! priority order for raw URL hits. Evidence for a strategy is gathered only
//! when that strategy is reached. The first strategy producing any raw hit
//! wins; its hits are normalized, validated, and deduplicated into
//! [`Candidate`]s.

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::session::PageSession;

use super::normalize::{dedup_normalized, normalize_page_url};
use super::{
    ApiFallbackStrategy, ApiPayload, Candidate, CandidateSource, Diagnostic, DomElementStrategy,
    EndpointProbe, Extraction, InputShape, MediaKind, NetworkObservationStrategy, PageInput,
    PatternLibrary, RawUrl, ResolveError, ScriptState, ScriptStateTraversalStrategy, SiteProfile,
    StaticHtmlRegexStrategy, Strategy,
};

/// Default per-endpoint deadline for API probing.
const DEFAULT_ENDPOINT_TIMEOUT_SECS: u64 = 10;

/// Successful outcome of one resolution run.
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    /// Normalized page URL that was opened.
    pub page_url: String,
    /// URL the session reported after navigation.
    pub final_url: String,
    /// Strategy whose hits produced the candidates.
    pub source: CandidateSource,
    /// Validated, deduplicated candidates in first-seen order.
    pub candidates: Vec<Candidate>,
    /// Local failures recorded along the way.
    #[serde(skip)]
    pub diagnostics: Vec<Diagnostic>,
    /// Number of strategies that ran, including the winner.
    pub strategies_run: usize,
}

/// Runs registered strategies in priority order against one page session.
pub struct ResolutionPipeline {
    strategies: Vec<Box<dyn Strategy>>,
    patterns: PatternLibrary,
    profile: SiteProfile,
    rewrite_mobile: bool,
    endpoint_timeout: Duration,
    source_dump_path: Option<PathBuf>,
}

impl ResolutionPipeline {
    /// Creates an empty pipeline for a site profile.
    #[must_use]
    pub fn new(profile: SiteProfile) -> Self {
        Self {
            strategies: Vec::new(),
            patterns: PatternLibrary::new(),
            profile,
            rewrite_mobile: true,
            endpoint_timeout: Duration::from_secs(DEFAULT_ENDPOINT_TIMEOUT_SECS),
            source_dump_path: None,
        }
    }

    /// Replaces the pattern library.
    #[must_use]
    pub fn with_patterns(mut self, patterns: PatternLibrary) -> Self {
        self.patterns = patterns;
        self
    }

    /// Enables or disables the desktop-to-mobile host rewrite.
    #[must_use]
    pub fn with_mobile_rewrite(mut self, enabled: bool) -> Self {
        self.rewrite_mobile = enabled;
        self
    }

    /// Sets the deadline applied to each API endpoint fetch.
    #[must_use]
    pub fn with_endpoint_timeout(mut self, timeout: Duration) -> Self {
        self.endpoint_timeout = timeout;
        self
    }

    /// Writes the page source to `path` when a run finds nothing.
    #[must_use]
    pub fn with_source_dump(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_dump_path = Some(path.into());
        self
    }

    /// Registers a strategy.
    ///
    /// Strategies run in [`CandidateSource`] priority order regardless of
    /// registration order; equal sources keep registration order.
    #[tracing::instrument(skip(self, strategy), fields(strategy_name))]
    pub fn register(&mut self, strategy: Box<dyn Strategy>) {
        tracing::Span::current().record("strategy_name", strategy.name());
        debug!(name = strategy.name(), source = %strategy.source(), "Registering strategy");
        self.strategies.push(strategy);
        self.strategies.sort_by_key(|s| s.source());
    }

    /// Returns the number of registered strategies.
    #[must_use]
    pub fn strategy_count(&self) -> usize {
        self.strategies.len()
    }

    /// Returns the site profile this pipeline resolves for.
    #[must_use]
    pub fn profile(&self) -> &SiteProfile {
        &self.profile
    }

    /// Returns the pattern library shared by every strategy.
    #[must_use]
    pub fn patterns(&self) -> &PatternLibrary {
        &self.patterns
    }

    /// Resolves `page_url` into candidates using an already-created session.
    ///
    /// The caller owns the session and must close it; see [`resolve_and_close`].
    ///
    /// # Errors
    ///
    /// - [`ResolveError::InvalidPageUrl`] when the page URL cannot be normalized.
    /// - [`ResolveError::Session`] when opening the page fails.
    /// - [`ResolveError::NoCandidatesFound`] when no strategy yields a valid URL.
    #[tracing::instrument(skip(self, session, probe), fields(engine = session.name()))]
    pub async fn resolve(
        &self,
        page_url: &str,
        session: &mut dyn PageSession,
        probe: &dyn EndpointProbe,
    ) -> Result<Resolution, ResolveError> {
        let page_url = normalize_page_url(page_url, &self.profile, self.rewrite_mobile)?;
        let final_url = session
            .open(&page_url)
            .await
            .map_err(|e| ResolveError::session(&page_url, e))?;
        debug!(page_url = %page_url, final_url = %final_url, "page opened");

        let mut diagnostics = Vec::new();
        let mut strategies_run = 0usize;
        let mut winner: Option<(CandidateSource, Vec<RawUrl>)> = None;

        for strategy in &self.strategies {
            let shape = strategy.input_shape(&page_url);
            let input = self
                .gather(strategy.source(), shape, session, probe, &mut diagnostics)
                .await;
            let Extraction {
                urls,
                diagnostics: local,
            } = strategy.extract(&input, &self.patterns);
            strategies_run += 1;

            for diagnostic in &local {
                warn!(
                    strategy = strategy.name(),
                    kind = ?diagnostic.kind,
                    detail = %diagnostic.detail,
                    "Strategy recorded a local failure"
                );
            }
            diagnostics.extend(local);

            debug!(strategy = strategy.name(), raw_hits = urls.len(), "Strategy finished");
            if !urls.is_empty() {
                winner = Some((strategy.source(), urls));
                break;
            }
        }

        let Some((source, raw)) = winner else {
            self.dump_source(session).await;
            return Err(ResolveError::no_candidates(&page_url, strategies_run));
        };

        let candidates: Vec<Candidate> = dedup_normalized(&raw)
            .into_iter()
            .map(|hit| {
                let kind = hit.kind.unwrap_or_else(|| MediaKind::infer(&hit.value));
                Candidate::new(hit.value, kind, source)
            })
            .collect();

        if candidates.is_empty() {
            debug!(
                source = %source,
                raw_hits = raw.len(),
                "Winning strategy produced no valid URLs"
            );
            self.dump_source(session).await;
            return Err(ResolveError::no_candidates(&page_url, strategies_run));
        }

        info!(
            source = %source,
            candidates = candidates.len(),
            strategies_run,
            "Resolution successful"
        );
        Ok(Resolution {
            page_url,
            final_url,
            source,
            candidates,
            diagnostics,
            strategies_run,
        })
    }

    /// Computes the evidence for one strategy. Failures become diagnostics
    /// and an empty input of the requested shape.
    async fn gather(
        &self,
        source: CandidateSource,
        shape: InputShape,
        session: &mut dyn PageSession,
        probe: &dyn EndpointProbe,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> PageInput {
        let mut unavailable = |what: &str, error: &dyn std::fmt::Display| {
            let diagnostic =
                Diagnostic::parse_failure(source, format!("{what} unavailable: {error}"));
            warn!(source = %source, detail = %diagnostic.detail, "Evidence unavailable");
            diagnostics.push(diagnostic);
        };

        match shape {
            InputShape::MediaElements => match session.media_elements().await {
                Ok(elements) => PageInput::MediaElements(elements),
                Err(e) => {
                    unavailable("media elements", &e);
                    PageInput::MediaElements(Vec::new())
                }
            },
            InputShape::PageSource => match session.page_source().await {
                Ok(html) => PageInput::PageSource(html),
                Err(e) => {
                    unavailable("page source", &e);
                    PageInput::PageSource(String::new())
                }
            },
            InputShape::ScriptStates(names) => {
                let mut states = Vec::with_capacity(names.len());
                for name in names {
                    match session.script_state(&name).await {
                        Ok(raw) => states.push(ScriptState { name, raw }),
                        Err(e) => unavailable(&name, &e),
                    }
                }
                PageInput::ScriptStates(states)
            }
            InputShape::NetworkResponses => match session.network_responses().await {
                Ok(responses) => PageInput::NetworkResponses(responses),
                Err(e) => {
                    unavailable("network log", &e);
                    PageInput::NetworkResponses(Vec::new())
                }
            },
            InputShape::ApiPayloads(endpoints) => {
                PageInput::ApiPayloads(self.fetch_endpoints(endpoints, probe, diagnostics).await)
            }
        }
    }

    /// Fetches every endpoint in order; one endpoint's failure never stops the next.
    async fn fetch_endpoints(
        &self,
        endpoints: Vec<String>,
        probe: &dyn EndpointProbe,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Vec<ApiPayload> {
        let mut payloads = Vec::new();
        for endpoint in endpoints {
            debug!(endpoint = %endpoint, "Probing API endpoint");
            match tokio::time::timeout(self.endpoint_timeout, probe.fetch(&endpoint)).await {
                Ok(Ok(body)) => payloads.push(ApiPayload { endpoint, body }),
                Ok(Err(e)) => {
                    warn!(endpoint = %endpoint, error = %e, "API endpoint failed");
                    diagnostics.push(Diagnostic::endpoint_failure(&endpoint, e));
                }
                Err(_) => {
                    let detail = format!(
                        "timed out after {}ms",
                        self.endpoint_timeout.as_millis()
                    );
                    warn!(endpoint = %endpoint, "API endpoint timed out");
                    diagnostics.push(Diagnostic::endpoint_failure(&endpoint, detail));
                }
            }
        }
        payloads
    }

    async fn dump_source(&self, session: &mut dyn PageSession) {
        let Some(path) = &self.source_dump_path else {
            return;
        };
        let html = match session.page_source().await {
            Ok(html) => html,
            Err(e) => {
                warn!(error = %e, "Could not read page source for dump");
                return;
            }
        };
        match tokio::fs::write(path, html.as_bytes()).await {
            Ok(()) => info!(path = %path.display(), bytes = html.len(), "Saved page source"),
            Err(e) => warn!(path = %path.display(), error = %e, "Could not save page source"),
        }
    }
}

impl std::fmt::Debug for ResolutionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.strategies.iter().map(|s| s.name()).collect();
        f.debug_struct("ResolutionPipeline")
            .field("profile", &self.profile.name)
            .field("strategies", &names)
            .field("rewrite_mobile", &self.rewrite_mobile)
            .field("endpoint_timeout", &self.endpoint_timeout)
            .finish_non_exhaustive()
    }
}

/// Builds the standard five-strategy pipeline for a site profile.
#[must_use]
pub fn build_default_pipeline(profile: &SiteProfile) -> ResolutionPipeline {
    let mut pipeline = ResolutionPipeline::new(profile.clone());
    pipeline.register(Box::new(DomElementStrategy::new()));
    pipeline.register(Box::new(StaticHtmlRegexStrategy::new()));
    pipeline.register(Box::new(ScriptStateTraversalStrategy::new()));
    pipeline.register(Box::new(NetworkObservationStrategy::new()));
    pipeline.register(Box::new(ApiFallbackStrategy::new(profile.clone())));
    pipeline
}

/// Runs `pipeline` on a session it owns and always closes that session.
///
/// A close failure is logged and never masks the resolution outcome.
///
/// # Errors
///
/// Returns the same errors as [`ResolutionPipeline::resolve`].
pub async fn resolve_and_close(
    pipeline: &ResolutionPipeline,
    page_url: &str,
    mut session: Box<dyn PageSession>,
    probe: &dyn EndpointProbe,
) -> Result<Resolution, ResolveError> {
    let outcome = pipeline.resolve(page_url, session.as_mut(), probe).await;
    if let Err(e) = session.close().await {
        warn!(engine = session.name(), error = %e, "Failed to close page session");
    }
    outcome
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::resolver::{DiagnosticKind, ProbeError};
    use crate::session::{MediaElement, NetworkResponse, SessionError};

    #[derive(Default)]
    struct ScriptedSession {
        elements: Vec<MediaElement>,
        html: String,
        fail_open: bool,
        fail_source: bool,
        closes: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl PageSession for ScriptedSession {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn open(&mut self, url: &str) -> Result<String, SessionError> {
            if self.fail_open {
                return Err(SessionError::navigation(url, "refused"));
            }
            Ok(url.to_string())
        }

        async fn media_elements(&mut self) -> Result<Vec<MediaElement>, SessionError> {
            Ok(self.elements.clone())
        }

        async fn page_source(&mut self) -> Result<String, SessionError> {
            if self.fail_source {
                return Err(SessionError::evaluation(
                    "document.documentElement.outerHTML",
                    "detached",
                ));
            }
            Ok(self.html.clone())
        }

        async fn script_state(&mut self, _name: &str) -> Result<Option<String>, SessionError> {
            Ok(None)
        }

        async fn network_responses(&mut self) -> Result<Vec<NetworkResponse>, SessionError> {
            Ok(Vec::new())
        }

        async fn close(&mut self) -> Result<(), SessionError> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct SlowProbe;

    #[async_trait]
    impl EndpointProbe for SlowProbe {
        async fn fetch(&self, endpoint: &str) -> Result<String, ProbeError> {
            if endpoint.ends_with("slow") {
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
            if endpoint.ends_with("broken") {
                return Err(ProbeError::http_status(endpoint, 500));
            }
            Ok(r#"{"video":{"url":"https://cdn.example.com/api.mp4"}}"#.to_string())
        }
    }

    struct CountingStrategy {
        source: CandidateSource,
        hits: Vec<&'static str>,
        calls: Arc<AtomicUsize>,
    }

    impl Strategy for CountingStrategy {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn source(&self) -> CandidateSource {
            self.source
        }

        fn input_shape(&self, _page_url: &str) -> InputShape {
            InputShape::PageSource
        }

        fn extract(&self, _input: &PageInput, _patterns: &PatternLibrary) -> Extraction {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Extraction::from_urls(self.hits.iter().map(|hit| RawUrl::new(*hit)).collect())
        }
    }

    fn counting(
        source: CandidateSource,
        hits: Vec<&'static str>,
    ) -> (Box<dyn Strategy>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let strategy = CountingStrategy {
            source,
            hits,
            calls: Arc::clone(&calls),
        };
        (Box::new(strategy), calls)
    }

    #[tokio::test]
    async fn test_register_sorts_by_priority() {
        let mut pipeline = ResolutionPipeline::new(SiteProfile::generic());
        let (late, late_calls) = counting(
            CandidateSource::NetworkObservation,
            vec!["https://cdn.example.com/late.mp4"],
        );
        let (early, early_calls) = counting(
            CandidateSource::DomElement,
            vec!["https://cdn.example.com/early.mp4"],
        );
        pipeline.register(late);
        pipeline.register(early);
        assert_eq!(pipeline.strategy_count(), 2);

        let mut session = ScriptedSession::default();
        let resolution = pipeline
            .resolve("https://www.example.com/v/1", &mut session, &SlowProbe)
            .await
            .unwrap();
        assert_eq!(resolution.source, CandidateSource::DomElement);
        assert_eq!(early_calls.load(Ordering::SeqCst), 1);
        assert_eq!(late_calls.load(Ordering::SeqCst), 0);
        assert_eq!(resolution.strategies_run, 1);
    }

    #[tokio::test]
    async fn test_short_circuit_stops_after_first_hit() {
        let mut pipeline = ResolutionPipeline::new(SiteProfile::generic());
        let (first, first_calls) = counting(CandidateSource::DomElement, vec![]);
        let (second, second_calls) = counting(
            CandidateSource::StaticHtmlRegex,
            vec!["https://cdn.example.com/a.mp4"],
        );
        let (third, third_calls) = counting(
            CandidateSource::ScriptStateTraversal,
            vec!["https://cdn.example.com/b.mp4"],
        );
        pipeline.register(first);
        pipeline.register(second);
        pipeline.register(third);

        let mut session = ScriptedSession::default();
        let resolution = pipeline
            .resolve("https://www.example.com/v/1", &mut session, &SlowProbe)
            .await
            .unwrap();
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 1);
        assert_eq!(third_calls.load(Ordering::SeqCst), 0);
        assert_eq!(resolution.candidates.len(), 1);
        assert_eq!(resolution.candidates[0].source, CandidateSource::StaticHtmlRegex);
    }

    #[tokio::test]
    async fn test_invalid_raw_hits_still_short_circuit() {
        let mut pipeline = ResolutionPipeline::new(SiteProfile::generic());
        let (first, _) = counting(CandidateSource::DomElement, vec!["/relative/only.mp4"]);
        let (second, second_calls) = counting(
            CandidateSource::StaticHtmlRegex,
            vec!["https://cdn.example.com/a.mp4"],
        );
        pipeline.register(first);
        pipeline.register(second);

        let mut session = ScriptedSession::default();
        let err = pipeline
            .resolve("https://www.example.com/v/1", &mut session, &SlowProbe)
            .await
            .unwrap_err();
        assert!(err.is_no_candidates());
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_candidates_are_normalized_and_deduplicated() {
        let mut pipeline = ResolutionPipeline::new(SiteProfile::generic());
        let (strategy, _) = counting(
            CandidateSource::StaticHtmlRegex,
            vec![
                r"https:\/\/cdn.example.com\/a.mp4",
                "https://cdn.example.com/a.mp4",
                "https://cdn.example.com/b.m3u8",
            ],
        );
        pipeline.register(strategy);

        let mut session = ScriptedSession::default();
        let resolution = pipeline
            .resolve("www.example.com/v/1", &mut session, &SlowProbe)
            .await
            .unwrap();
        let urls: Vec<&str> = resolution
            .candidates
            .iter()
            .map(|c| c.url.as_str())
            .collect();
        assert_eq!(
            urls,
            vec![
                "https://cdn.example.com/a.mp4",
                "https://cdn.example.com/b.m3u8",
            ]
        );
        assert_eq!(resolution.candidates[1].media_kind, MediaKind::Hls);
        assert_eq!(resolution.page_url, "https://www.example.com/v/1");
    }

    #[tokio::test]
    async fn test_open_failure_is_session_error() {
        let pipeline = build_default_pipeline(&SiteProfile::generic());
        let mut session = ScriptedSession {
            fail_open: true,
            ..ScriptedSession::default()
        };
        let err = pipeline
            .resolve("https://www.example.com/v/1", &mut session, &SlowProbe)
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::Session { .. }), "got: {err}");
    }

    #[tokio::test]
    async fn test_evidence_failure_does_not_abort_run() {
        let pipeline = build_default_pipeline(&SiteProfile::generic());
        let mut session = ScriptedSession {
            fail_source: true,
            ..ScriptedSession::default()
        };
        let err = pipeline
            .resolve("https://www.example.com/v/1", &mut session, &SlowProbe)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ResolveError::NoCandidatesFound {
                strategies_run: 5,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_endpoint_timeout_and_failure_do_not_block_next() {
        let pipeline = ResolutionPipeline::new(SiteProfile::generic())
            .with_endpoint_timeout(Duration::from_millis(100));
        let mut diagnostics = Vec::new();
        let payloads = pipeline
            .fetch_endpoints(
                vec![
                    "https://api.example.com/slow".to_string(),
                    "https://api.example.com/broken".to_string(),
                    "https://api.example.com/ok".to_string(),
                ],
                &SlowProbe,
                &mut diagnostics,
            )
            .await;
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0].endpoint, "https://api.example.com/ok");
        assert_eq!(diagnostics.len(), 2);
        assert!(
            diagnostics
                .iter()
                .all(|d| d.kind == DiagnosticKind::EndpointFailure)
        );
        assert!(diagnostics[0].detail.contains("timed out"));
    }

    #[tokio::test]
    async fn test_resolve_and_close_closes_on_success_and_failure() {
        let pipeline = build_default_pipeline(&SiteProfile::generic());
        let closes = Arc::new(AtomicUsize::new(0));

        let found = ScriptedSession {
            html: r#"<video src="https://cdn.example.com/a.mp4"></video>"#.to_string(),
            closes: Arc::clone(&closes),
            ..ScriptedSession::default()
        };
        let resolution = resolve_and_close(
            &pipeline,
            "https://www.example.com/v/1",
            Box::new(found),
            &SlowProbe,
        )
        .await
        .unwrap();
        assert_eq!(resolution.source, CandidateSource::StaticHtmlRegex);

        let failing = ScriptedSession {
            fail_open: true,
            closes: Arc::clone(&closes),
            ..ScriptedSession::default()
        };
        let outcome = resolve_and_close(
            &pipeline,
            "https://www.example.com/v/1",
            Box::new(failing),
            &SlowProbe,
        )
        .await;
        assert!(outcome.is_err());
        assert_eq!(closes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_source_dump_written_when_nothing_found() {
        let dir = tempfile::tempdir().unwrap();
        let dump = dir.path().join("page_source.html");
        let pipeline = build_default_pipeline(&SiteProfile::generic()).with_source_dump(&dump);
        let mut session = ScriptedSession {
            html: "<html>empty</html>".to_string(),
            ..ScriptedSession::default()
        };
        let err = pipeline
            .resolve("https://www.example.com/v/1", &mut session, &SlowProbe)
            .await
            .unwrap_err();
        assert!(err.is_no_candidates());
        assert_eq!(std::fs::read_to_string(&dump).unwrap(), "<html>empty</html>");
    }

    #[test]
    fn test_default_pipeline_has_five_strategies() {
        let pipeline = build_default_pipeline(&SiteProfile::dongchedi());
        assert_eq!(pipeline.strategy_count(), 5);
        let debug = format!("{pipeline:?}");
        assert!(debug.contains("dom_element"));
        assert!(debug.contains("api_fallback"));
    }
}
