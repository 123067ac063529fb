//! Global user lists (bans, sudo).

use std::path::Path;

use super::{JsonFile, StoreError};
use crate::protocol::jid;

/// Set of users persisted as canonical jids.
pub struct UserList {
    file: JsonFile<Vec<String>>,
}

impl UserList {
    pub fn new(dir: &Path, file_name: &str) -> Self {
        Self {
            file: JsonFile::new(dir, file_name),
        }
    }

    pub fn contains(&self, user: &str) -> Result<bool, StoreError> {
        self.file
            .read(|users| users.iter().any(|u| jid::same_user(u, user)))
    }

    /// Returns `false` if the user was already listed.
    pub fn add(&self, user: &str) -> Result<bool, StoreError> {
        let canonical = jid::user_jid(user);
        self.file.update(|users| {
            if users.iter().any(|u| jid::same_user(u, &canonical)) {
                false
            } else {
                users.push(canonical);
                true
            }
        })
    }

    /// Returns `false` if the user was not listed.
    pub fn remove(&self, user: &str) -> Result<bool, StoreError> {
        self.file.update(|users| {
            let before = users.len();
            users.retain(|u| !jid::same_user(u, user));
            users.len() != before
        })
    }

    pub fn list(&self) -> Result<Vec<String>, StoreError> {
        self.file.read(Clone::clone)
    }
}
