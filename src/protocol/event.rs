//! Inbound events as emitted by the protocol client.
//!
//! Field names follow the client's camelCase JSON; everything optional is
//! `Option` or defaulted so unknown message shapes deserialize instead of
//! failing the whole batch.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::jid;

/// Every event the adapter consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ProtocolEvent {
    MessagesUpsert(MessagesUpsert),
    GroupParticipantsUpdate(ParticipantsUpdate),
    ConnectionUpdate(ConnectionUpdate),
    PresenceUpdate(PresenceUpdate),
    Call(CallBatch),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertKind {
    /// Live message.
    Notify,
    /// History sync or self-append; never dispatched.
    #[serde(other)]
    Append,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesUpsert {
    #[serde(default)]
    pub messages: Vec<WireMessage>,
    #[serde(rename = "type")]
    pub kind: UpsertKind,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageKey {
    pub remote_jid: String,
    #[serde(default)]
    pub from_me: bool,
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMessage {
    pub key: MessageKey,
    #[serde(default)]
    pub message: Option<MessageContent>,
    #[serde(default)]
    pub push_name: Option<String>,
    #[serde(default)]
    pub message_timestamp: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextInfo {
    #[serde(default)]
    pub mentioned_jid: Vec<String>,
    /// Author of the quoted message.
    #[serde(default)]
    pub participant: Option<String>,
    /// Id of the quoted message.
    #[serde(default)]
    pub stanza_id: Option<String>,
    /// Chat the quoted message came from (`status@broadcast` for status replies).
    #[serde(default)]
    pub remote_jid: Option<String>,
    #[serde(default)]
    pub quoted_message: Option<Box<MessageContent>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedText {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub context_info: Option<ContextInfo>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaMessage {
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub context_info: Option<ContextInfo>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ButtonsResponse {
    #[serde(default)]
    pub selected_button_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EphemeralMessage {
    #[serde(default)]
    pub message: Option<MessageContent>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProtocolMessage {
    #[serde(rename = "type", default)]
    pub kind: Option<i64>,
    #[serde(default)]
    pub key: Option<MessageKey>,
}

impl ProtocolMessage {
    pub const REVOKE: i64 = 0;
}

/// Message body. Exactly one of the fields is normally set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extended_text_message: Option<ExtendedText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_message: Option<MediaMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_message: Option<MediaMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buttons_response_message: Option<ButtonsResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sticker_message: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_message: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_message: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_status_mention_message: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol_message: Option<ProtocolMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ephemeral_message: Option<Box<EphemeralMessage>>,
}

/// Coarse classification used for logging and handler decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Conversation,
    ExtendedText,
    Image,
    Video,
    ButtonReply,
    Sticker,
    Audio,
    Document,
    StatusMention,
    Protocol,
    Other,
}

impl MessageContent {
    /// Peel one disappearing-message layer, if present.
    pub fn unwrap_ephemeral(mut self) -> Self {
        match self.ephemeral_message.take().and_then(|e| e.message) {
            Some(inner) => inner,
            None => self,
        }
    }

    pub fn kind(&self) -> MessageKind {
        if self.conversation.is_some() {
            MessageKind::Conversation
        } else if self.extended_text_message.is_some() {
            MessageKind::ExtendedText
        } else if self.image_message.is_some() {
            MessageKind::Image
        } else if self.video_message.is_some() {
            MessageKind::Video
        } else if self.buttons_response_message.is_some() {
            MessageKind::ButtonReply
        } else if self.sticker_message.is_some() {
            MessageKind::Sticker
        } else if self.audio_message.is_some() {
            MessageKind::Audio
        } else if self.document_message.is_some() {
            MessageKind::Document
        } else if self.group_status_mention_message.is_some() {
            MessageKind::StatusMention
        } else if self.protocol_message.is_some() {
            MessageKind::Protocol
        } else {
            MessageKind::Other
        }
    }

    pub fn context_info(&self) -> Option<&ContextInfo> {
        self.extended_text_message
            .as_ref()
            .and_then(|m| m.context_info.as_ref())
            .or_else(|| self.image_message.as_ref().and_then(|m| m.context_info.as_ref()))
            .or_else(|| self.video_message.as_ref().and_then(|m| m.context_info.as_ref()))
    }

    pub fn is_revocation(&self) -> bool {
        self.protocol_message
            .as_ref()
            .is_some_and(|p| p.kind == Some(ProtocolMessage::REVOKE))
    }

    /// Best-effort plain text of any text-bearing kind, original casing.
    pub fn plain_text(&self) -> Option<&str> {
        self.conversation
            .as_deref()
            .or_else(|| {
                self.extended_text_message
                    .as_ref()
                    .and_then(|m| m.text.as_deref())
            })
            .or_else(|| self.image_message.as_ref().and_then(|m| m.caption.as_deref()))
            .or_else(|| self.video_message.as_ref().and_then(|m| m.caption.as_deref()))
    }
}

/// A single live message after adapter unwrapping.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub id: String,
    pub chat_id: String,
    /// Author: the group participant, or the chat itself for direct messages.
    pub sender_id: String,
    pub from_self: bool,
    pub push_name: Option<String>,
    /// Unix seconds.
    pub timestamp: i64,
    pub content: MessageContent,
}

impl InboundMessage {
    /// `None` for messages without a body.
    pub fn from_wire(wire: WireMessage) -> Option<Self> {
        let content = wire.message?.unwrap_ephemeral();
        let key = wire.key;
        let sender_id = match key.participant {
            Some(ref p) if !p.is_empty() => p.clone(),
            _ => key.remote_jid.clone(),
        };

        Some(Self {
            id: key.id,
            chat_id: key.remote_jid,
            sender_id,
            from_self: key.from_me,
            push_name: wire.push_name,
            timestamp: wire
                .message_timestamp
                .unwrap_or_else(|| chrono::Utc::now().timestamp()),
            content,
        })
    }

    pub fn is_group(&self) -> bool {
        jid::is_group(&self.chat_id)
    }

    /// Ids the client tags on its own outgoing messages.
    pub fn is_echo(&self) -> bool {
        self.id.starts_with("BAE5") && self.id.len() == 16
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantAction {
    Add,
    Remove,
    Promote,
    Demote,
    /// Joined through an invite link.
    Invite,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantsUpdate {
    /// Group id.
    pub id: String,
    #[serde(default)]
    pub participants: Vec<String>,
    pub action: ParticipantAction,
    #[serde(default)]
    pub author: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connecting,
    Open,
    Close,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastDisconnect {
    #[serde(default)]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionUpdate {
    #[serde(default)]
    pub connection: Option<ConnectionState>,
    #[serde(default)]
    pub last_disconnect: Option<LastDisconnect>,
    /// Pairing code to show the operator.
    #[serde(default)]
    pub qr: Option<String>,
    /// Logged-in account, reported once the connection opens.
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceEntry {
    #[serde(default)]
    pub last_known_presence: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PresenceUpdate {
    pub id: String,
    #[serde(default)]
    pub presences: HashMap<String, PresenceEntry>,
}

impl PresenceUpdate {
    /// `(jid, presence)` pairs; an empty map means the chat id itself changed.
    pub fn entries(&self) -> Vec<(&str, &str)> {
        self.presences
            .iter()
            .filter_map(|(jid, entry)| {
                entry
                    .last_known_presence
                    .as_deref()
                    .map(|p| (jid.as_str(), p))
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallOffer {
    pub id: String,
    pub from: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallBatch {
    #[serde(default)]
    pub calls: Vec<CallOffer>,
}
