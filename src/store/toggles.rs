use std::collections::HashMap;
use std::path::Path;

use super::models::ModerationToggle;
use super::{JsonFile, StoreError};

/// One moderation feature's switches, keyed by chat.
pub struct ToggleStore {
    feature: &'static str,
    file: JsonFile<HashMap<String, ModerationToggle>>,
}

impl ToggleStore {
    pub fn new(dir: &Path, feature: &'static str) -> Self {
        Self {
            feature,
            file: JsonFile::new(dir, &format!("{feature}.json")),
        }
    }

    pub fn feature(&self) -> &'static str {
        self.feature
    }

    /// The chat's toggle; disabled when never configured.
    pub fn get(&self, chat_id: &str) -> Result<ModerationToggle, StoreError> {
        self.file
            .read(|t| t.get(chat_id).copied().unwrap_or_default())
    }

    /// Enabled toggle for the chat, if any.
    pub fn active(&self, chat_id: &str) -> Result<Option<ModerationToggle>, StoreError> {
        Ok(Some(self.get(chat_id)?).filter(|t| t.enabled))
    }

    pub fn set(&self, chat_id: &str, toggle: ModerationToggle) -> Result<(), StoreError> {
        self.file.update(|t| {
            t.insert(chat_id.to_string(), toggle);
        })
    }

    /// Turn off but keep the configured action for the next `on`.
    pub fn disable(&self, chat_id: &str) -> Result<(), StoreError> {
        self.file.update(|t| {
            if let Some(toggle) = t.get_mut(chat_id) {
                toggle.enabled = false;
            }
        })
    }
}
