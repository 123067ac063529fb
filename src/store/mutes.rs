//! Chat mute records.

use std::collections::HashMap;
use std::path::Path;

use super::models::MuteRecord;
use super::{JsonFile, StoreError};

pub const FILE: &str = "muted.json";

pub struct MuteStore {
    file: JsonFile<HashMap<String, MuteRecord>>,
}

impl MuteStore {
    pub fn new(dir: &Path) -> Self {
        Self {
            file: JsonFile::new(dir, FILE),
        }
    }

    pub fn mute_until(&self, chat_id: &str, until_ms: i64) -> Result<(), StoreError> {
        self.file.update(|records| {
            records.insert(chat_id.to_string(), MuteRecord { until: until_ms });
        })
    }

    /// Live mute record for the chat. An expired record is purged by this read.
    pub fn active(&self, chat_id: &str, now_ms: i64) -> Result<Option<MuteRecord>, StoreError> {
        let record = self.file.read(|records| records.get(chat_id).copied())?;
        match record {
            Some(r) if r.until > now_ms => Ok(Some(r)),
            Some(_) => {
                self.file.update(|records| {
                    if records.get(chat_id).is_some_and(|r| r.until <= now_ms) {
                        records.remove(chat_id);
                    }
                })?;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    pub fn is_muted(&self, chat_id: &str, now_ms: i64) -> Result<bool, StoreError> {
        Ok(self.active(chat_id, now_ms)?.is_some())
    }

    /// Returns `false` if the chat had no record.
    pub fn remove(&self, chat_id: &str) -> Result<bool, StoreError> {
        self.file.update(|records| records.remove(chat_id).is_some())
    }

    /// Timed mutes still on record, as `(chat, until)`.
    pub fn timed(&self) -> Result<Vec<(String, i64)>, StoreError> {
        self.file.read(|records| {
            records
                .iter()
                .filter(|(_, r)| r.until != i64::MAX)
                .map(|(chat, r)| (chat.clone(), r.until))
                .collect()
        })
    }

    #[cfg(test)]
    fn raw(&self, chat_id: &str) -> Result<Option<MuteRecord>, StoreError> {
        self.file.read(|records| records.get(chat_id).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expired_mute_is_purged_once() {
        let dir = tempfile::tempdir().unwrap();
        let mutes = MuteStore::new(dir.path());
        mutes.mute_until("g@g.us", 1_000).unwrap();

        assert!(mutes.is_muted("g@g.us", 999).unwrap());
        assert!(!mutes.is_muted("g@g.us", 1_000).unwrap());
        assert_eq!(mutes.raw("g@g.us").unwrap(), None);

        // Second read after purge is still a no-op false.
        assert!(!mutes.is_muted("g@g.us", 5_000).unwrap());
        assert_eq!(mutes.raw("g@g.us").unwrap(), None);
    }

    #[test]
    fn test_remove() {
        let dir = tempfile::tempdir().unwrap();
        let mutes = MuteStore::new(dir.path());
        mutes.mute_until("g@g.us", i64::MAX).unwrap();
        assert!(mutes.remove("g@g.us").unwrap());
        assert!(!mutes.remove("g@g.us").unwrap());
    }

    #[test]
    fn test_timed_skips_indefinite() {
        let dir = tempfile::tempdir().unwrap();
        let mutes = MuteStore::new(dir.path());
        mutes.mute_until("a@g.us", i64::MAX).unwrap();
        mutes.mute_until("b@g.us", 5_000).unwrap();
        assert_eq!(mutes.timed().unwrap(), vec![("b@g.us".to_string(), 5_000)]);
    }
}
