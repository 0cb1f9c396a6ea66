use wiremock::Request;

/// Matches a request header against its exact raw value.
///
/// `wiremock::matchers::header` splits values on commas, so it cannot match a
/// browser User-Agent such as `(KHTML, like Gecko)`.
pub(crate) fn raw_header(
    name: &'static str,
    expected: &'static str,
) -> impl Fn(&Request) -> bool + Send + Sync + 'static {
    move |request: &Request| {
        request
            .headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            == Some(expected)
    }
}
