//! Shared fixtures for unit tests.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::bot::{NoopHooks, Services};
use crate::config::Config;
use crate::protocol::{
    BlockAction, Connection, ConnectionError, ContextInfo, ExtendedText, GroupMetadata,
    GroupParticipant, GroupSetting, InboundMessage, MessageContent, MessageRef, OutgoingMessage,
    ParticipantAction, PresenceKind, SendOptions,
};

pub const BOT: &str = "999@s.whatsapp.net";
pub const OWNER: &str = "1000@s.whatsapp.net";
pub const GROUP: &str = "120363001@g.us";
pub const ADMIN: &str = "2000@s.whatsapp.net";
pub const MEMBER: &str = "3000@s.whatsapp.net";

/// One recorded outbound call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Send {
        chat: String,
        message: OutgoingMessage,
        options: SendOptions,
    },
    Delete(MessageRef),
    Participants {
        chat: String,
        users: Vec<String>,
        action: ParticipantAction,
    },
    Setting {
        chat: String,
        setting: GroupSetting,
    },
    Block {
        user: String,
        action: BlockAction,
    },
    Presence {
        presence: PresenceKind,
        target: Option<String>,
    },
    Subscribe(String),
    RejectCall {
        id: String,
        from: String,
    },
}

/// In-memory connection recording every outbound call.
pub struct MockConnection {
    self_id: String,
    groups: Mutex<HashMap<String, GroupMetadata>>,
    calls: Mutex<Vec<Call>>,
    pub metadata_fetches: AtomicUsize,
    pub fail_metadata: AtomicBool,
    pub fail_sends: AtomicBool,
    /// While set, `reject_call` waits for `release_calls`.
    pub hold_calls: AtomicBool,
    pub release_calls: Notify,
}

impl MockConnection {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            self_id: format!("{}:7@s.whatsapp.net", crate::protocol::jid::bare_number(BOT)),
            groups: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            metadata_fetches: AtomicUsize::new(0),
            fail_metadata: AtomicBool::new(false),
            fail_sends: AtomicBool::new(false),
            hold_calls: AtomicBool::new(false),
            release_calls: Notify::new(),
        })
    }

    /// Group where `admins` (and optionally the bot) are admins.
    pub fn with_group(self: Arc<Self>, chat: &str, admins: &[&str], members: &[&str], bot_admin: bool) -> Arc<Self> {
        let mut participants: Vec<GroupParticipant> = admins
            .iter()
            .map(|id| GroupParticipant {
                id: id.to_string(),
                admin: Some("admin".into()),
                ..Default::default()
            })
            .collect();
        participants.extend(members.iter().map(|id| GroupParticipant {
            id: id.to_string(),
            admin: None,
            ..Default::default()
        }));
        participants.push(GroupParticipant {
            id: BOT.to_string(),
            admin: bot_admin.then(|| "admin".to_string()),
            ..Default::default()
        });

        self.groups.lock().insert(
            chat.to_string(),
            GroupMetadata {
                id: chat.to_string(),
                subject: "Test Group".into(),
                participants,
            },
        );
        self
    }

    /// Give a participant of a registered group a display name.
    pub fn with_notify(self: Arc<Self>, chat: &str, user: &str, name: &str) -> Arc<Self> {
        if let Some(group) = self.groups.lock().get_mut(chat) {
            for p in group.participants.iter_mut().filter(|p| p.id == user) {
                p.notify = Some(name.to_string());
            }
        }
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    /// Text bodies sent to `chat`, in order.
    pub fn texts(&self, chat: &str) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                Call::Send {
                    chat: to,
                    message: OutgoingMessage::Text { text, .. },
                    ..
                } if to == chat => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn reactions(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                Call::Send {
                    message: OutgoingMessage::Reaction { emoji, .. },
                    ..
                } => Some(emoji.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn deletions(&self) -> usize {
        self.count(|c| matches!(c, Call::Delete(_)))
    }

    pub fn removals(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                Call::Participants {
                    users,
                    action: ParticipantAction::Remove,
                    ..
                } => Some(users.clone()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl Connection for MockConnection {
    fn self_id(&self) -> String {
        self.self_id.clone()
    }

    async fn send_message(
        &self,
        chat_id: &str,
        message: OutgoingMessage,
        options: SendOptions,
    ) -> Result<(), ConnectionError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(ConnectionError::Disconnected);
        }
        self.record(Call::Send {
            chat: chat_id.to_string(),
            message,
            options,
        });
        Ok(())
    }

    async fn delete_message(&self, key: &MessageRef) -> Result<(), ConnectionError> {
        self.record(Call::Delete(key.clone()));
        Ok(())
    }

    async fn group_participants_update(
        &self,
        chat_id: &str,
        participants: &[String],
        action: ParticipantAction,
    ) -> Result<(), ConnectionError> {
        self.record(Call::Participants {
            chat: chat_id.to_string(),
            users: participants.to_vec(),
            action,
        });
        Ok(())
    }

    async fn group_setting_update(
        &self,
        chat_id: &str,
        setting: GroupSetting,
    ) -> Result<(), ConnectionError> {
        self.record(Call::Setting {
            chat: chat_id.to_string(),
            setting,
        });
        Ok(())
    }

    async fn group_metadata(&self, chat_id: &str) -> Result<GroupMetadata, ConnectionError> {
        self.metadata_fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_metadata.load(Ordering::SeqCst) {
            return Err(ConnectionError::Remote("item-not-found".into()));
        }
        self.groups
            .lock()
            .get(chat_id)
            .cloned()
            .ok_or_else(|| ConnectionError::Remote("item-not-found".into()))
    }

    async fn update_block_status(
        &self,
        user: &str,
        action: BlockAction,
    ) -> Result<(), ConnectionError> {
        self.record(Call::Block {
            user: user.to_string(),
            action,
        });
        Ok(())
    }

    async fn send_presence_update(
        &self,
        presence: PresenceKind,
        target: Option<&str>,
    ) -> Result<(), ConnectionError> {
        self.record(Call::Presence {
            presence,
            target: target.map(str::to_string),
        });
        Ok(())
    }

    async fn presence_subscribe(&self, user: &str) -> Result<(), ConnectionError> {
        self.record(Call::Subscribe(user.to_string()));
        Ok(())
    }

    async fn reject_call(&self, call_id: &str, from: &str) -> Result<(), ConnectionError> {
        if self.hold_calls.load(Ordering::SeqCst) {
            self.release_calls.notified().await;
        }
        self.record(Call::RejectCall {
            id: call_id.to_string(),
            from: from.to_string(),
        });
        Ok(())
    }
}

pub fn test_config(dir: &Path) -> Config {
    Config {
        owner_numbers: vec![crate::protocol::jid::bare_number(OWNER).to_string()],
        data_dir: dir.to_path_buf(),
        default_prefixes: vec!['.'],
        ..Config::default()
    }
}

pub fn test_services(dir: &Path) -> Arc<Services> {
    Services::new(test_config(dir), Arc::new(NoopHooks)).expect("services")
}

pub fn message(chat: &str, sender: &str, text: &str) -> InboundMessage {
    InboundMessage {
        id: format!("MSG{}", text.len()),
        chat_id: chat.to_string(),
        sender_id: sender.to_string(),
        from_self: false,
        push_name: None,
        timestamp: 1_700_000_000,
        content: MessageContent {
            conversation: Some(text.to_string()),
            ..Default::default()
        },
    }
}

/// Extended-text message that tags `mentions`.
pub fn mentioning(chat: &str, sender: &str, text: &str, mentions: &[&str]) -> InboundMessage {
    let mut msg = message(chat, sender, text);
    msg.content = MessageContent {
        extended_text_message: Some(ExtendedText {
            text: Some(text.to_string()),
            context_info: Some(ContextInfo {
                mentioned_jid: mentions.iter().map(|m| m.to_string()).collect(),
                ..Default::default()
            }),
        }),
        ..Default::default()
    };
    msg
}
