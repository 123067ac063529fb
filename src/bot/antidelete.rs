//! Antidelete: remember recent messages and show the owner anything deleted
//! for everyone.

use std::sync::Arc;

use chrono::{Local, TimeZone};
use tracing::{debug, info, warn};

use super::Services;
use crate::cache::{CacheConfig, CacheError, CacheRegistry, TypedCache};
use crate::protocol::{Connection, InboundMessage, MessageKind, jid};

#[derive(Debug, Clone)]
pub struct RecordedMessage {
    pub chat_id: String,
    pub sender_id: String,
    pub from_self: bool,
    pub text: Option<String>,
    pub kind: MessageKind,
    pub timestamp: i64,
}

/// Recent messages keyed by chat and message id, bounded and expiring.
#[derive(Clone)]
pub struct RecentMessages {
    messages: TypedCache<(String, String), RecordedMessage>,
}

impl RecentMessages {
    pub fn new(registry: &CacheRegistry) -> Result<Self, CacheError> {
        Ok(Self {
            messages: registry.get_or_create("recent_messages", CacheConfig::recent_messages())?,
        })
    }

    pub fn remember(&self, message: &InboundMessage) {
        self.messages.insert(
            (message.chat_id.clone(), message.id.clone()),
            RecordedMessage {
                chat_id: message.chat_id.clone(),
                sender_id: message.sender_id.clone(),
                from_self: message.from_self,
                text: message.content.plain_text().map(str::to_string),
                kind: message.content.kind(),
                timestamp: message.timestamp,
            },
        );
    }

    /// Remove and return a remembered message.
    pub fn take(&self, chat_id: &str, id: &str) -> Option<RecordedMessage> {
        let key = (chat_id.to_string(), id.to_string());
        let found = self.messages.get(&key);
        self.messages.invalidate(&key);
        found
    }
}

pub fn enabled(services: &Services) -> bool {
    services
        .stores
        .antidelete
        .get()
        .map(|f| f.enabled)
        .unwrap_or(false)
}

fn report(message: &RecordedMessage) -> String {
    let when = Local
        .timestamp_opt(message.timestamp, 0)
        .single()
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default();
    let body = match &message.text {
        Some(text) => text.clone(),
        None => format!("[{:?}]", message.kind),
    };
    format!(
        "🗑️ *Deleted message*\nFrom: {}\nChat: {}\nSent: {}\n\n{}",
        jid::mention_tag(&message.sender_id),
        message.chat_id,
        when,
        body
    )
}

/// Repost a revoked message to every owner. Returns `true` when a report was sent.
pub async fn handle_revocation(
    services: &Services,
    conn: &Arc<dyn Connection>,
    revocation: &InboundMessage,
) -> anyhow::Result<bool> {
    if !enabled(services) {
        return Ok(false);
    }
    let Some(key) = revocation
        .content
        .protocol_message
        .as_ref()
        .and_then(|p| p.key.as_ref())
    else {
        return Ok(false);
    };
    let chat_id = if key.remote_jid.is_empty() {
        revocation.chat_id.as_str()
    } else {
        key.remote_jid.as_str()
    };

    let Some(original) = services.recent_messages.take(chat_id, &key.id) else {
        debug!("Deleted message {} in {} was not remembered", key.id, chat_id);
        return Ok(false);
    };
    if original.from_self {
        return Ok(false);
    }

    let text = report(&original);
    for number in services.permissions.owner_numbers() {
        let owner = jid::user_jid(number);
        if let Err(e) = conn
            .send_mentions(&owner, &text, vec![original.sender_id.clone()])
            .await
        {
            warn!("Antidelete report to {} failed: {}", owner, e);
        }
    }
    info!("🗑️ Reported deleted message from {} in {}", original.sender_id, chat_id);
    Ok(true)
}
