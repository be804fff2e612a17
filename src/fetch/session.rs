// Refresh tracking for one session.
// Caps forced refreshes to a single network round-trip per URL.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

/// URLs already force-refreshed during this session.
///
/// Never persisted; a new tracker starts a new session.
#[derive(Debug, Default)]
pub struct RefreshTracker {
    refreshed: Mutex<HashSet<String>>,
}

impl RefreshTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// True the first time it is asked about `url`, false afterwards.
    pub fn should_force_refresh(&self, url: &str) -> bool {
        self.refreshed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.to_string())
    }
}
