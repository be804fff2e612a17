// Cache module for persistent response caching.
// Named caches of request URL to response, on disk or in memory.

pub mod memory;
pub mod paths;
pub mod store;
pub mod traits;

pub use memory::{MemoryCache, MemoryCacheStorage};
pub use store::{EntryMeta, FsCache, FsCacheStorage};
pub use traits::{CacheStorage, ResponseCache};
