// Test doubles.
// Scripted HTTP transport that records every request it receives.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::error::{FetchError, Result};
use crate::http::{HttpTransport, RawResponse};

#[derive(Debug, Clone)]
enum Reply {
    Response { status: u16, body: Vec<u8> },
    NetworkError,
}

/// Transport answering from a fixed table. Unknown URLs fail as network errors.
#[derive(Debug, Default)]
pub struct MockTransport {
    replies: Mutex<HashMap<String, Reply>>,
    requests: Mutex<Vec<(String, bool)>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, status: u16, body: impl Into<Vec<u8>>) -> &Self {
        self.replies.lock().unwrap_or_else(PoisonError::into_inner).insert(
            url.to_string(),
            Reply::Response {
                status,
                body: body.into(),
            },
        );
        self
    }

    pub fn fail(&self, url: &str) -> &Self {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.to_string(), Reply::NetworkError);
        self
    }

    /// Requested URLs, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }

    /// Requested URLs with their cache-bypass flag.
    pub fn requests_with_flags(&self) -> Vec<(String, bool)> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn request_count(&self, url: &str) -> usize {
        self.requests().iter().filter(|u| *u == url).count()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn get(&self, url: &str, bypass_cache: bool) -> Result<RawResponse> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((url.to_string(), bypass_cache));

        let reply = self
            .replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url)
            .cloned();

        match reply {
            Some(Reply::Response { status, body }) => Ok(RawResponse::new(url, status, body)),
            _ => Err(FetchError::Network {
                url: url.to_string(),
                reason: "connection refused".to_string(),
            }),
        }
    }
}
