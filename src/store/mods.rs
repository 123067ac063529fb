//! Per-group moderator lists (`groupMods.json`).
//!
//! Group moderators may run commands in that group while the bot is in
//! private mode. Entries are bare numbers.

use std::collections::HashMap;
use std::path::Path;

use super::{JsonFile, StoreError};
use crate::protocol::jid;

pub struct GroupModStore {
    file: JsonFile<HashMap<String, Vec<String>>>,
}

impl GroupModStore {
    pub fn new(dir: &Path) -> Self {
        Self {
            file: JsonFile::new(dir, "groupMods.json"),
        }
    }

    pub fn is_mod(&self, chat_id: &str, user: &str) -> Result<bool, StoreError> {
        let number = jid::bare_number(user);
        self.file.read(|mods| {
            mods.get(chat_id)
                .is_some_and(|list| list.iter().any(|m| m == number))
        })
    }

    pub fn add(&self, chat_id: &str, user: &str) -> Result<bool, StoreError> {
        let number = jid::bare_number(user).to_string();
        self.file.update(|mods| {
            let list = mods.entry(chat_id.to_string()).or_default();
            if list.contains(&number) {
                false
            } else {
                list.push(number);
                true
            }
        })
    }

    pub fn remove(&self, chat_id: &str, user: &str) -> Result<bool, StoreError> {
        let number = jid::bare_number(user);
        self.file.update(|mods| {
            let Some(list) = mods.get_mut(chat_id) else {
                return false;
            };
            let before = list.len();
            list.retain(|m| m != number);
            let removed = list.len() != before;
            if list.is_empty() {
                mods.remove(chat_id);
            }
            removed
        })
    }

    pub fn list(&self, chat_id: &str) -> Result<Vec<String>, StoreError> {
        self.file
            .read(|mods| mods.get(chat_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mods_are_scoped_per_group() {
        let dir = tempfile::tempdir().unwrap();
        let mods = GroupModStore::new(dir.path());

        assert!(mods.add("a@g.us", "1555:2@s.whatsapp.net").unwrap());
        assert!(!mods.add("a@g.us", "1555@s.whatsapp.net").unwrap());
        assert!(mods.is_mod("a@g.us", "1555@s.whatsapp.net").unwrap());
        assert!(!mods.is_mod("b@g.us", "1555@s.whatsapp.net").unwrap());
        assert_eq!(mods.list("a@g.us").unwrap(), vec!["1555"]);

        assert!(mods.remove("a@g.us", "1555@s.whatsapp.net").unwrap());
        assert!(mods.list("a@g.us").unwrap().is_empty());
    }
}
