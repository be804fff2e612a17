// Fetch module.
// Mirror-aware fetching, the cache decision policy, session refresh tracking, and decoders.

pub mod cached;
pub mod decode;
pub mod fetcher;
pub mod session;

pub use cached::{CachedFetch, FetchOptions};
pub use fetcher::{Fetcher, mirror_url};
pub use session::RefreshTracker;
