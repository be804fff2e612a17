// Response decoders.
// Typed decode functions; a non-2xx response is a decode failure and is never cached.

use serde::de::DeserializeOwned;

use crate::error::{FetchError, Result};
use crate::http::RawResponse;

fn ensure_ok(response: &RawResponse) -> Result<()> {
    if response.is_ok() {
        Ok(())
    } else {
        Err(FetchError::Status {
            url: response.url.clone(),
            status: response.status,
        })
    }
}

/// Decode a JSON body into `T`.
pub fn json<T: DeserializeOwned>(response: &RawResponse) -> Result<T> {
    ensure_ok(response)?;
    serde_json::from_slice(&response.body).map_err(|e| FetchError::Decode {
        url: response.url.clone(),
        reason: e.to_string(),
    })
}

/// Decode a UTF-8 text body.
pub fn text(response: &RawResponse) -> Result<String> {
    ensure_ok(response)?;
    String::from_utf8(response.body.clone()).map_err(|e| FetchError::Decode {
        url: response.url.clone(),
        reason: e.to_string(),
    })
}

/// Return the raw body.
pub fn bytes(response: &RawResponse) -> Result<Vec<u8>> {
    ensure_ok(response)?;
    Ok(response.body.clone())
}
