//! Warning counters and per-chat thresholds.

use std::collections::HashMap;
use std::path::Path;

use super::{JsonFile, StoreError};
use crate::protocol::jid;

/// Result of recording one violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarnOutcome {
    /// Counter incremented and still below the threshold.
    Warned { count: u32, threshold: u32 },
    /// Counter reached the threshold and was reset to zero.
    LimitReached { threshold: u32 },
}

pub struct WarningStore {
    counts: JsonFile<HashMap<String, HashMap<String, u32>>>,
    thresholds: JsonFile<HashMap<String, u32>>,
    default_threshold: u32,
}

impl WarningStore {
    pub fn new(dir: &Path, default_threshold: u32) -> Self {
        Self {
            counts: JsonFile::new(dir, "warnings.json"),
            thresholds: JsonFile::new(dir, "warn_thresholds.json"),
            default_threshold: default_threshold.max(1),
        }
    }

    pub fn threshold(&self, chat_id: &str) -> Result<u32, StoreError> {
        self.thresholds.read(|t| {
            t.get(chat_id)
                .copied()
                .filter(|n| *n > 0)
                .unwrap_or(self.default_threshold)
        })
    }

    pub fn set_threshold(&self, chat_id: &str, threshold: u32) -> Result<(), StoreError> {
        self.thresholds.update(|t| {
            t.insert(chat_id.to_string(), threshold.max(1));
        })
    }

    pub fn count(&self, chat_id: &str, user: &str) -> Result<u32, StoreError> {
        let key = jid::bare_number(user);
        self.counts.read(|c| {
            c.get(chat_id)
                .and_then(|users| users.get(key))
                .copied()
                .unwrap_or(0)
        })
    }

    /// All non-zero counters in a chat as `(bare number, count)`.
    pub fn for_chat(&self, chat_id: &str) -> Result<Vec<(String, u32)>, StoreError> {
        self.counts.read(|c| {
            let mut entries: Vec<_> = c
                .get(chat_id)
                .map(|users| users.iter().map(|(u, n)| (u.clone(), *n)).collect())
                .unwrap_or_default();
            entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            entries
        })
    }

    /// Increment the user's counter; at the threshold reset it and report the limit.
    ///
    /// The increment and the reset happen in one locked update, so a user can
    /// never be reported at the limit twice for the same run of violations.
    pub fn record_violation(&self, chat_id: &str, user: &str) -> Result<WarnOutcome, StoreError> {
        let threshold = self.threshold(chat_id)?;
        let key = jid::bare_number(user).to_string();

        self.counts.update(|c| {
            let users = c.entry(chat_id.to_string()).or_default();
            let count = users.get(&key).copied().unwrap_or(0) + 1;
            if count >= threshold {
                users.remove(&key);
                if users.is_empty() {
                    c.remove(chat_id);
                }
                WarnOutcome::LimitReached { threshold }
            } else {
                users.insert(key, count);
                WarnOutcome::Warned { count, threshold }
            }
        })
    }

    /// Returns the count that was cleared.
    pub fn reset(&self, chat_id: &str, user: &str) -> Result<u32, StoreError> {
        let key = jid::bare_number(user);
        self.counts.update(|c| {
            let Some(users) = c.get_mut(chat_id) else {
                return 0;
            };
            let cleared = users.remove(key).unwrap_or(0);
            if users.is_empty() {
                c.remove(chat_id);
            }
            cleared
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHAT: &str = "g@g.us";
    const USER: &str = "1555:3@s.whatsapp.net";

    #[test]
    fn test_counter_resets_exactly_at_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let warnings = WarningStore::new(dir.path(), 3);

        assert_eq!(
            warnings.record_violation(CHAT, USER).unwrap(),
            WarnOutcome::Warned { count: 1, threshold: 3 }
        );
        assert_eq!(
            warnings.record_violation(CHAT, USER).unwrap(),
            WarnOutcome::Warned { count: 2, threshold: 3 }
        );
        assert_eq!(
            warnings.record_violation(CHAT, USER).unwrap(),
            WarnOutcome::LimitReached { threshold: 3 }
        );
        assert_eq!(warnings.count(CHAT, USER).unwrap(), 0);

        // Next violation starts a new run.
        assert_eq!(
            warnings.record_violation(CHAT, USER).unwrap(),
            WarnOutcome::Warned { count: 1, threshold: 3 }
        );
    }

    #[test]
    fn test_per_chat_threshold_override() {
        let dir = tempfile::tempdir().unwrap();
        let warnings = WarningStore::new(dir.path(), 3);
        warnings.set_threshold(CHAT, 1).unwrap();

        assert_eq!(warnings.threshold("other@g.us").unwrap(), 3);
        assert_eq!(
            warnings.record_violation(CHAT, USER).unwrap(),
            WarnOutcome::LimitReached { threshold: 1 }
        );
    }

    #[test]
    fn test_device_suffix_shares_counter_and_reset() {
        let dir = tempfile::tempdir().unwrap();
        let warnings = WarningStore::new(dir.path(), 5);
        warnings.record_violation(CHAT, "1555:1@s.whatsapp.net").unwrap();
        warnings.record_violation(CHAT, "1555@s.whatsapp.net").unwrap();

        assert_eq!(warnings.count(CHAT, USER).unwrap(), 2);
        assert_eq!(warnings.for_chat(CHAT).unwrap(), vec![("1555".to_string(), 2)]);
        assert_eq!(warnings.reset(CHAT, USER).unwrap(), 2);
        assert!(warnings.for_chat(CHAT).unwrap().is_empty());
    }
}
