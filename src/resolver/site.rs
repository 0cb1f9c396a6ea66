//! Per-site knobs: host matching, mobile rewrite, referer, API endpoints.

use url::Url;

use crate::user_agent::default_referer;

/// Site-specific configuration consumed by the pipeline and API fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteProfile {
    /// Short profile name used in logs and default filenames.
    pub name: String,
    /// Lowercase hosts that select this profile.
    pub hosts: Vec<String>,
    /// Host that desktop hosts are rewritten to, when the site has one.
    pub mobile_host: Option<String>,
    /// Fixed `Referer` header; derived from the page origin when `None`.
    pub referer: Option<String>,
    /// API endpoint templates; `{id}` is replaced with the resource id.
    pub api_endpoints: Vec<String>,
}

impl SiteProfile {
    /// Profile for dongchedi.com video pages.
    #[must_use]
    pub fn dongchedi() -> Self {
        Self {
            name: "dongchedi".to_string(),
            hosts: vec![
                "www.dongchedi.com".to_string(),
                "dongchedi.com".to_string(),
                "m.dongchedi.com".to_string(),
            ],
            mobile_host: Some("m.dongchedi.com".to_string()),
            referer: Some("https://www.dongchedi.com/".to_string()),
            api_endpoints: vec![
                "https://www.dongchedi.com/motor/api/video_info/?video_id={id}".to_string(),
                "https://m.dongchedi.com/motor/api/video_info/?video_id={id}".to_string(),
                "https://www.dongchedi.com/api/video/get_video_play_info/?video_id={id}"
                    .to_string(),
                "https://m.dongchedi.com/api/video/get_video_play_info/?video_id={id}"
                    .to_string(),
                "https://www.dongchedi.com/api/vrms/video/get_video_play_info/?video_id={id}"
                    .to_string(),
                "https://www.dongchedi.com/api/article/get_video_info_by_id/?video_id={id}"
                    .to_string(),
            ],
        }
    }

    /// Fallback profile: no rewrite, no API endpoints, origin referer.
    #[must_use]
    pub fn generic() -> Self {
        Self {
            name: "generic".to_string(),
            hosts: Vec::new(),
            mobile_host: None,
            referer: None,
            api_endpoints: Vec::new(),
        }
    }

    /// Picks the built-in profile whose hosts include the page host.
    ///
    /// Scheme-less input is accepted; anything unparseable gets [`Self::generic`].
    #[must_use]
    pub fn for_page_url(page_url: &str) -> Self {
        let dongchedi = Self::dongchedi();
        match page_host(page_url) {
            Some(host) if dongchedi.matches_host(&host) => dongchedi,
            _ => Self::generic(),
        }
    }

    /// Returns true when `host` (case-insensitive) belongs to this profile.
    #[must_use]
    pub fn matches_host(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        self.hosts.iter().any(|known| *known == host)
    }

    /// Returns the mobile host to rewrite `host` to, if any.
    ///
    /// The mobile host itself and foreign hosts are never rewritten.
    #[must_use]
    pub fn mobile_host_for(&self, host: &str) -> Option<&str> {
        let mobile = self.mobile_host.as_deref()?;
        if host.eq_ignore_ascii_case(mobile) || !self.matches_host(host) {
            return None;
        }
        Some(mobile)
    }

    /// Returns the `Referer` header to send for `page_url`.
    #[must_use]
    pub fn referer_for(&self, page_url: &str) -> String {
        self.referer
            .clone()
            .unwrap_or_else(|| default_referer(page_url))
    }

    /// Expands every endpoint template for `resource_id`.
    #[must_use]
    pub fn endpoint_urls(&self, resource_id: &str) -> Vec<String> {
        let encoded = urlencoding::encode(resource_id);
        self.api_endpoints
            .iter()
            .map(|template| template.replace("{id}", &encoded))
            .collect()
    }
}

fn page_host(page_url: &str) -> Option<String> {
    let trimmed = page_url.trim();
    let parsed = Url::parse(trimmed)
        .ok()
        .filter(|url| url.host_str().is_some())
        .or_else(|| Url::parse(&format!("https://{}", trimmed.trim_start_matches('/'))).ok())?;
    parsed.host_str().map(str::to_ascii_lowercase)
}
