//! One-notice-per-window suppression.

use super::{CacheConfig, CacheError, CacheRegistry, TypedCache};

/// Answers "may I post this notice now?" once per key per window (60s).
#[derive(Clone)]
pub struct NoticeWindow {
    seen: TypedCache<String, ()>,
}

impl NoticeWindow {
    pub fn new(registry: &CacheRegistry) -> Result<Self, CacheError> {
        Ok(Self {
            seen: registry.get_or_create("notice_window", CacheConfig::notice_window())?,
        })
    }

    /// `true` for the first claim of `key` in the current window.
    pub fn claim(&self, key: impl Into<String>) -> bool {
        self.seen.insert_if_absent(key.into(), ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_once() {
        let registry = CacheRegistry::new();
        let window = NoticeWindow::new(&registry).unwrap();
        assert!(window.claim("antibot:g:1"));
        assert!(!window.claim("antibot:g:1"));
        assert!(window.claim("antibot:g:2"));

        // Same underlying cache when created twice from one registry.
        let again = NoticeWindow::new(&registry).unwrap();
        assert!(!again.claim("antibot:g:2"));
    }
}
