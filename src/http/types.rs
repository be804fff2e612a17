// HTTP response types.
// A fully buffered response, shared by the network path and the cache store.

/// Buffered HTTP response.
///
/// The body is read into memory once, so decoding borrows it and the cache
/// can persist the same bytes afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// URL the response was fetched from.
    pub url: String,
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(url: impl Into<String>, status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            url: url.into(),
            status,
            body: body.into(),
        }
    }

    /// Whether the status is in the 2xx range.
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_ok() {
        assert!(RawResponse::new("u", 200, "").is_ok());
        assert!(RawResponse::new("u", 204, "").is_ok());
        assert!(!RawResponse::new("u", 304, "").is_ok());
        assert!(!RawResponse::new("u", 404, "").is_ok());
    }
}
