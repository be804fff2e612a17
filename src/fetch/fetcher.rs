// Network fetcher with mirror fallback.
// raw.githubusercontent.com failures are retried once on the jsDelivr CDN.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::error::{FetchError, Result};
use crate::http::{HttpTransport, RawResponse};

const RAW_GITHUB_PREFIX: &str = "https://raw.githubusercontent.com/";

/// owner / repo / ref / path of a raw GitHub content URL.
static RAW_GITHUB_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https://raw\.githubusercontent\.com/([^/]+)/([^/]+)/([^/]+)/(.*)$")
        .expect("Invalid RAW_GITHUB_RE regex")
});

const JSDELIVR_REPLACEMENT: &str = "https://cdn.jsdelivr.net/gh/$1/$2@$3/$4";

/// Equivalent jsDelivr URL for a raw GitHub content URL, if `url` is one.
pub fn mirror_url(url: &str) -> Option<String> {
    if !url.starts_with(RAW_GITHUB_PREFIX) || !RAW_GITHUB_RE.is_match(url) {
        return None;
    }
    Some(
        RAW_GITHUB_RE
            .replace(url, JSDELIVR_REPLACEMENT)
            .into_owned(),
    )
}

/// Fetches URLs through a transport, falling back to a mirror on network failure.
#[derive(Clone)]
pub struct Fetcher {
    transport: Arc<dyn HttpTransport>,
}

impl Fetcher {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    /// Fetch `url`, retrying once against its mirror if no response arrived.
    ///
    /// HTTP error statuses are returned as responses, not retried.
    pub async fn fetch(&self, url: &str, bypass_cache: bool) -> Result<RawResponse> {
        debug!(url, bypass_cache, "fetching data");

        let primary_error = match self.transport.get(url, bypass_cache).await {
            Ok(response) => return Ok(response),
            Err(err) if err.is_network() => err,
            Err(err) => return Err(err),
        };

        let Some(mirror) = mirror_url(url) else {
            return Err(primary_error);
        };

        debug!(url, mirror = %mirror, "retrying using mirror");
        match self.transport.get(&mirror, false).await {
            Ok(mut response) => {
                response.url = url.to_string();
                Ok(response)
            }
            Err(err) => Err(FetchError::MirrorFailed {
                url: url.to_string(),
                mirror,
                reason: format!("{} (after primary failure: {})", err, primary_error),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTransport;

    const RAW: &str = "https://raw.githubusercontent.com/misode/mcmeta/1.21.4-summary/registries/data.min.json";
    const CDN: &str =
        "https://cdn.jsdelivr.net/gh/misode/mcmeta@1.21.4-summary/registries/data.min.json";

    #[test]
    fn test_mirror_url() {
        assert_eq!(mirror_url(RAW).as_deref(), Some(CDN));
        assert_eq!(mirror_url("https://example.com/a/b/c/d.json"), None);
        // Too few path segments to carry owner/repo/ref/path
        assert_eq!(mirror_url("https://raw.githubusercontent.com/misode/mcmeta"), None);
    }

    #[tokio::test]
    async fn test_primary_success_skips_mirror() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(RAW, 200, "{}");

        let fetcher = Fetcher::new(transport.clone());
        let response = fetcher.fetch(RAW, true).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(transport.requests_with_flags(), vec![(RAW.to_string(), true)]);
    }

    #[tokio::test]
    async fn test_network_failure_retries_mirror() {
        let transport = Arc::new(MockTransport::new());
        transport.fail(RAW).respond(CDN, 200, r#"{"a":[]}"#);

        let fetcher = Fetcher::new(transport.clone());
        let response = fetcher.fetch(RAW, true).await.unwrap();

        assert_eq!(response.body, br#"{"a":[]}"#);
        assert_eq!(response.url, RAW);
        assert_eq!(
            transport.requests_with_flags(),
            vec![(RAW.to_string(), true), (CDN.to_string(), false)]
        );
    }

    #[tokio::test]
    async fn test_mirror_failure_names_both_urls() {
        let transport = Arc::new(MockTransport::new());
        transport.fail(RAW).fail(CDN);

        let fetcher = Fetcher::new(transport.clone());
        let err = fetcher.fetch(RAW, false).await.unwrap_err();

        match &err {
            FetchError::MirrorFailed { url, mirror, .. } => {
                assert_eq!(url, RAW);
                assert_eq!(mirror, CDN);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains(CDN));
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_error_status_not_retried() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(RAW, 404, "Not Found");

        let fetcher = Fetcher::new(transport.clone());
        let response = fetcher.fetch(RAW, false).await.unwrap();

        assert_eq!(response.status, 404);
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_non_github_failure_propagates() {
        let url = "https://example.com/presets/loot_table/a.json";
        let transport = Arc::new(MockTransport::new());
        transport.fail(url);

        let fetcher = Fetcher::new(transport.clone());
        let err = fetcher.fetch(url, false).await.unwrap_err();

        assert!(matches!(err, FetchError::Network { .. }));
        assert_eq!(transport.requests().len(), 1);
    }
}
