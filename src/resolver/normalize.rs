//! URL normalization shared by the pipeline and its callers.

use tracing::debug;
use url::Url;

use super::{RawUrl, ResolveError, SiteProfile};

const QUOTE_AND_SPACE: &[char] = &['"', '\'', ' ', '\t', '\r', '\n'];

/// Cleans one raw URL hit.
///
/// Trims whitespace and surrounding quotes, decodes `\u002F` and `\/` to `/`,
/// `\u0026` to `&` and `\u003D` to `=`, then drops any remaining backslash.
/// Other `\uXXXX` escapes lose only their backslash. The function is
/// idempotent.
#[must_use]
pub fn normalize_raw_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches(QUOTE_AND_SPACE);
    let decoded = trimmed
        .replace(r"\u002F", "/")
        .replace(r"\u002f", "/")
        .replace(r"\/", "/")
        .replace(r"\u0026", "&")
        .replace(r"\u003D", "=")
        .replace(r"\u003d", "=")
        .replace('\\', "");
    decoded.trim().trim_matches(QUOTE_AND_SPACE).to_string()
}

/// Returns true for an absolute `http`/`https` URL with a host.
#[must_use]
pub fn is_absolute_http_url(candidate: &str) -> bool {
    match Url::parse(candidate) {
        Ok(url) => {
            matches!(url.scheme(), "http" | "https")
                && url.host_str().is_some_and(|host| !host.is_empty())
        }
        Err(_) => false,
    }
}

/// Normalizes, validates, and deduplicates raw hits, preserving first-seen order.
///
/// Hits that are not absolute `http(s)` URLs after normalization are dropped.
#[must_use]
pub fn dedup_normalized(raw: &[RawUrl]) -> Vec<RawUrl> {
    let mut seen = std::collections::HashSet::new();
    let mut kept = Vec::new();
    for hit in raw {
        let normalized = normalize_raw_url(&hit.value);
        if !is_absolute_http_url(&normalized) {
            debug!(raw = %hit.value, "discarding non-absolute media URL");
            continue;
        }
        if seen.insert(normalized.clone()) {
            kept.push(RawUrl {
                value: normalized,
                kind: hit.kind,
            });
        }
    }
    kept
}

/// Normalizes a landing-page URL before navigation.
///
/// Adds `https://` when the input has no scheme and, when `rewrite_mobile` is
/// set, swaps a known desktop host for the profile's mobile host.
///
/// # Errors
///
/// Returns [`ResolveError::InvalidPageUrl`] when the input is empty, does not
/// parse, or is not `http(s)`.
pub fn normalize_page_url(
    input: &str,
    profile: &SiteProfile,
    rewrite_mobile: bool,
) -> Result<String, ResolveError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ResolveError::invalid_page_url(input, "page URL is empty"));
    }

    let with_scheme = if has_scheme(trimmed) {
        trimmed.to_string()
    } else if let Some(rest) = trimmed.strip_prefix("//") {
        format!("https://{rest}")
    } else {
        format!("https://{trimmed}")
    };

    let mut url = Url::parse(&with_scheme)
        .map_err(|e| ResolveError::invalid_page_url(input, &e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ResolveError::invalid_page_url(
            input,
            &format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    let Some(host) = url.host_str().map(str::to_ascii_lowercase) else {
        return Err(ResolveError::invalid_page_url(input, "page URL has no host"));
    };

    if rewrite_mobile
        && let Some(mobile_host) = profile.mobile_host_for(&host)
    {
        url.set_host(Some(mobile_host))
            .map_err(|e| ResolveError::invalid_page_url(input, &e.to_string()))?;
        debug!(from = %host, to = %mobile_host, "rewrote page host to mobile");
    }

    Ok(url.to_string())
}

fn has_scheme(input: &str) -> bool {
    input.find("://").is_some_and(|idx| {
        idx > 0
            && input[..idx]
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::resolver::MediaKind;

    #[test]
    fn test_normalize_raw_url_decodes_escaped_slashes() {
        assert_eq!(
            normalize_raw_url(r"https://example.com/v.mp4?x=1\/y"),
            "https://example.com/v.mp4?x=1/y"
        );
        assert_eq!(
            normalize_raw_url(r"https:\/\/cdn.example.com\/a.mp4"),
            "https://cdn.example.com/a.mp4"
        );
        assert_eq!(
            normalize_raw_url(r"https:\u002F\u002Fcdn.example.com\u002fa.m3u8"),
            "https://cdn.example.com/a.m3u8"
        );
    }

    #[test]
    fn test_normalize_raw_url_keeps_signed_query_separators() {
        assert_eq!(
            normalize_raw_url(r"https:\/\/cdn.example.com\/a.mp4?expires=1\u0026sig\u003Dab"),
            "https://cdn.example.com/a.mp4?expires=1&sig=ab"
        );
    }

    #[test]
    fn test_normalize_raw_url_strips_quotes_and_whitespace() {
        assert_eq!(
            normalize_raw_url("  \"https://cdn.example.com/a.mp4\" "),
            "https://cdn.example.com/a.mp4"
        );
        assert_eq!(
            normalize_raw_url("'https://cdn.example.com/a.mp4'"),
            "https://cdn.example.com/a.mp4"
        );
    }

    #[test]
    fn test_normalize_raw_url_is_idempotent() {
        let inputs = [
            r"https:\\u002F\\u002Fcdn.example.com/a.mp4",
            r#" "https:\/\/cdn.example.com\/a.mp4" "#,
            r"https://cdn.example.com/a\.mp4",
            r"https://cdn.example.com/a.mp4?a=1\\u0026b=2",
            "plain",
        ];
        for input in inputs {
            let once = normalize_raw_url(input);
            assert_eq!(normalize_raw_url(&once), once, "input: {input}");
        }
    }

    #[test]
    fn test_is_absolute_http_url() {
        assert!(is_absolute_http_url("https://cdn.example.com/a.mp4"));
        assert!(is_absolute_http_url("http://cdn.example.com/a.mp4"));
        assert!(!is_absolute_http_url("//cdn.example.com/a.mp4"));
        assert!(!is_absolute_http_url("/video/a.mp4"));
        assert!(!is_absolute_http_url("blob:https://www.example.com/uuid"));
        assert!(!is_absolute_http_url("ftp://cdn.example.com/a.mp4"));
    }

    #[test]
    fn test_dedup_normalized_preserves_first_seen_order() {
        let raw = vec![
            RawUrl::with_kind(r"https:\/\/cdn.example.com\/b.mp4", MediaKind::Mp4),
            RawUrl::new("/relative.mp4"),
            RawUrl::with_kind("https://cdn.example.com/a.mp4", MediaKind::Mp4),
            RawUrl::with_kind("https://cdn.example.com/b.mp4", MediaKind::Mp4),
        ];
        let kept = dedup_normalized(&raw);
        let urls: Vec<&str> = kept.iter().map(|hit| hit.value.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://cdn.example.com/b.mp4",
                "https://cdn.example.com/a.mp4",
            ]
        );
    }

    #[test]
    fn test_dedup_normalized_is_idempotent() {
        let raw = vec![
            RawUrl::new(r#""https:\/\/cdn.example.com\/x.m3u8""#),
            RawUrl::new("https://cdn.example.com/x.m3u8"),
            RawUrl::new("https://cdn.example.com/y.mp4"),
        ];
        let once = dedup_normalized(&raw);
        let twice = dedup_normalized(&once);
        assert_eq!(once, twice);
        assert_eq!(once.len(), 2);
    }

    #[test]
    fn test_normalize_page_url_adds_scheme_and_rewrites_mobile() {
        let profile = SiteProfile::dongchedi();
        assert_eq!(
            normalize_page_url("www.dongchedi.com/video/123", &profile, true).unwrap(),
            "https://m.dongchedi.com/video/123"
        );
        assert_eq!(
            normalize_page_url("https://dongchedi.com/video/123?x=1", &profile, true).unwrap(),
            "https://m.dongchedi.com/video/123?x=1"
        );
    }

    #[test]
    fn test_normalize_page_url_without_rewrite_keeps_host() {
        let profile = SiteProfile::dongchedi();
        assert_eq!(
            normalize_page_url("https://www.dongchedi.com/video/123", &profile, false).unwrap(),
            "https://www.dongchedi.com/video/123"
        );
    }

    #[test]
    fn test_normalize_page_url_generic_profile_untouched() {
        let profile = SiteProfile::generic();
        assert_eq!(
            normalize_page_url("//www.example.com/watch/9", &profile, true).unwrap(),
            "https://www.example.com/watch/9"
        );
    }

    #[test]
    fn test_normalize_page_url_rejects_bad_input() {
        let profile = SiteProfile::generic();
        assert!(normalize_page_url("   ", &profile, true).is_err());
        assert!(normalize_page_url("ftp://example.com/a", &profile, true).is_err());
        assert!(matches!(
            normalize_page_url("https://", &profile, true),
            Err(ResolveError::InvalidPageUrl { .. })
        ));
    }
}
