// HTTP transport.
// Abstracts the network behind a trait so the cache layer can be driven by a fake in tests.

use async_trait::async_trait;
use reqwest::{
    Client,
    header::{ACCEPT, CACHE_CONTROL, HeaderMap, HeaderValue, PRAGMA, USER_AGENT},
};
use tracing::debug;

use crate::error::{FetchError, Result};

use super::types::RawResponse;

/// Default user agent sent with every request.
pub const DEFAULT_USER_AGENT: &str = concat!("mcmeta-cache/", env!("CARGO_PKG_VERSION"));

/// Performs a single GET request.
///
/// Implementations return `Ok` for any response that arrived, whatever its
/// status. Only failures to obtain a response (DNS, connect, TLS, reset)
/// are errors, and those must satisfy [`FetchError::is_network`].
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &str, bypass_cache: bool) -> Result<RawResponse>;
}

/// reqwest-backed transport.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a transport sending the given user agent.
    pub fn new(user_agent: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();

        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(user_agent).map_err(|e| FetchError::Other(e.to_string()))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(FetchError::Http)?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str, bypass_cache: bool) -> Result<RawResponse> {
        let mut request = self.client.get(url);
        if bypass_cache {
            request = request
                .header(CACHE_CONTROL, "no-cache")
                .header(PRAGMA, "no-cache");
        }

        let network_error = |e: reqwest::Error| FetchError::Network {
            url: url.to_string(),
            reason: e.to_string(),
        };

        let response = request.send().await.map_err(network_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(network_error)?;

        debug!(url, status, bytes = body.len(), "received response");
        Ok(RawResponse::new(url, status, body.to_vec()))
    }
}
