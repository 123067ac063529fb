//! Outbound capabilities of a live protocol session.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::event::ParticipantAction;
use super::jid;

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("protocol session is not connected")]
    Disconnected,

    #[error("request '{method}' timed out after {after:?}")]
    Timeout { method: String, after: Duration },

    #[error("protocol client rejected request: {0}")]
    Remote(String),

    #[error("bridge I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bridge codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Enough of a message key to quote, react to or delete it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRef {
    pub chat_id: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant: Option<String>,
    #[serde(default)]
    pub from_me: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutgoingMessage {
    Text {
        text: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        mentions: Vec<String>,
    },
    Reaction {
        emoji: String,
        key: MessageRef,
    },
}

impl OutgoingMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            mentions: Vec::new(),
        }
    }

    pub fn text_with_mentions(text: impl Into<String>, mentions: Vec<String>) -> Self {
        Self::Text {
            text: text.into(),
            mentions,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quoted: Option<MessageRef>,
}

impl SendOptions {
    pub fn quoting(key: MessageRef) -> Self {
        Self { quoted: Some(key) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockAction {
    Block,
    Unblock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceKind {
    Available,
    Unavailable,
    Composing,
    Paused,
}

/// Group-wide settings the bot toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupSetting {
    /// Only admins may send (mute).
    #[serde(rename = "announcement")]
    Announcement,
    /// Everyone may send (unmute).
    #[serde(rename = "not_announcement")]
    NotAnnouncement,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupParticipant {
    pub id: String,
    /// `admin` / `superadmin` when privileged.
    #[serde(default)]
    pub admin: Option<String>,
    /// Display name the account set for itself.
    #[serde(default)]
    pub notify: Option<String>,
}

impl GroupParticipant {
    pub fn is_admin(&self) -> bool {
        self.admin.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMetadata {
    pub id: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub participants: Vec<GroupParticipant>,
}

impl GroupMetadata {
    pub fn is_admin(&self, user: &str) -> bool {
        self.participants
            .iter()
            .any(|p| p.is_admin() && jid::same_user(&p.id, user))
    }

    pub fn admins(&self) -> impl Iterator<Item = &GroupParticipant> {
        self.participants.iter().filter(|p| p.is_admin())
    }

    pub fn participant(&self, user: &str) -> Option<&GroupParticipant> {
        self.participants.iter().find(|p| jid::same_user(&p.id, user))
    }

    pub fn participant_ids(&self) -> Vec<String> {
        self.participants.iter().map(|p| p.id.clone()).collect()
    }
}

/// Outbound operations on the current protocol session.
///
/// Implemented by the bridge for production and by a recording mock in tests.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Logged-in account jid; empty until the session opens.
    fn self_id(&self) -> String;

    async fn send_message(
        &self,
        chat_id: &str,
        message: OutgoingMessage,
        options: SendOptions,
    ) -> Result<(), ConnectionError>;

    async fn delete_message(&self, key: &MessageRef) -> Result<(), ConnectionError>;

    async fn group_participants_update(
        &self,
        chat_id: &str,
        participants: &[String],
        action: ParticipantAction,
    ) -> Result<(), ConnectionError>;

    async fn group_setting_update(
        &self,
        chat_id: &str,
        setting: GroupSetting,
    ) -> Result<(), ConnectionError>;

    async fn group_metadata(&self, chat_id: &str) -> Result<GroupMetadata, ConnectionError>;

    async fn update_block_status(
        &self,
        user: &str,
        action: BlockAction,
    ) -> Result<(), ConnectionError>;

    /// `target` of `None` broadcasts the presence globally.
    async fn send_presence_update(
        &self,
        presence: PresenceKind,
        target: Option<&str>,
    ) -> Result<(), ConnectionError>;

    async fn presence_subscribe(&self, user: &str) -> Result<(), ConnectionError>;

    async fn reject_call(&self, call_id: &str, from: &str) -> Result<(), ConnectionError>;

    /// Plain text to a chat.
    async fn send_text(&self, chat_id: &str, text: &str) -> Result<(), ConnectionError> {
        self.send_message(chat_id, OutgoingMessage::text(text), SendOptions::default())
            .await
    }

    /// Text with mention metadata so `@number` renders as a tag.
    async fn send_mentions(
        &self,
        chat_id: &str,
        text: &str,
        mentions: Vec<String>,
    ) -> Result<(), ConnectionError> {
        self.send_message(
            chat_id,
            OutgoingMessage::text_with_mentions(text, mentions),
            SendOptions::default(),
        )
        .await
    }
}
