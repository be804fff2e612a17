// HTTP module.
// Provides the transport trait, the reqwest client, and buffered response type.

pub mod client;
pub mod types;

pub use client::{DEFAULT_USER_AGENT, HttpTransport, ReqwestTransport};
pub use types::RawResponse;
