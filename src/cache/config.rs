//! Cache configuration.

use std::time::Duration;

/// Configuration for a cache instance.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries in the cache.
    pub max_capacity: u64,

    /// Entries are evicted this long after insertion.
    pub ttl: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 10_000,
            ttl: Some(Duration::from_secs(300)),
        }
    }
}

impl CacheConfig {
    /// Group metadata: admin lists go stale quickly after promote/demote.
    pub fn group_metadata() -> Self {
        Self {
            max_capacity: 5_000,
            ttl: Some(Duration::from_secs(60)),
        }
    }

    /// One-shot notice windows (antibot, anticall, ban notices).
    pub fn notice_window() -> Self {
        Self {
            max_capacity: 20_000,
            ttl: Some(Duration::from_secs(60)),
        }
    }

    /// Messages kept so a later delete-for-everyone can be reported.
    pub fn recent_messages() -> Self {
        Self {
            max_capacity: 5_000,
            ttl: Some(Duration::from_secs(6 * 3600)),
        }
    }
}
