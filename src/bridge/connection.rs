//! [`Connection`] over the sidecar's stdin, replies matched by request id.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde_json::{Value, json};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use super::frame::{Reply, Request};
use crate::protocol::{
    BlockAction, Connection, ConnectionError, GroupMetadata, GroupSetting, MessageRef,
    OutgoingMessage, ParticipantAction, PresenceKind, SendOptions,
};

type ReplySender = oneshot::Sender<Result<Value, String>>;

/// Requests waiting for a reply, keyed by id.
#[derive(Clone, Default)]
pub struct Pending(Arc<DashMap<u64, ReplySender>>);

impl Pending {
    /// Hand a reply to its waiter. Returns false for unknown or abandoned ids.
    pub fn resolve(&self, reply: Reply) -> bool {
        let id = reply.reply_to;
        match self.0.remove(&id) {
            Some((_, tx)) => tx.send(reply.into_result()).is_ok(),
            None => {
                debug!("Reply for unknown request {}", id);
                false
            }
        }
    }

    /// Drop every waiter; they observe a disconnect.
    pub fn fail_all(&self) {
        self.0.clear();
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.0.len()
    }
}

pub struct BridgeConnection {
    writer: mpsc::Sender<String>,
    pending: Pending,
    next_id: AtomicU64,
    self_id: Arc<RwLock<String>>,
    timeout: Duration,
}

impl BridgeConnection {
    pub fn new(
        writer: mpsc::Sender<String>,
        pending: Pending,
        self_id: Arc<RwLock<String>>,
        timeout: Duration,
    ) -> Self {
        Self {
            writer,
            pending,
            next_id: AtomicU64::new(1),
            self_id,
            timeout,
        }
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, ConnectionError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let line = Request { id, method, params }.encode()?;

        let (tx, rx) = oneshot::channel();
        self.pending.0.insert(id, tx);

        if self.writer.send(line).await.is_err() {
            self.pending.0.remove(&id);
            return Err(ConnectionError::Disconnected);
        }

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(Ok(result))) => Ok(result),
            Ok(Ok(Err(remote))) => Err(ConnectionError::Remote(remote)),
            Ok(Err(_)) => Err(ConnectionError::Disconnected),
            Err(_) => {
                self.pending.0.remove(&id);
                warn!("Bridge request {} ({}) timed out", id, method);
                Err(ConnectionError::Timeout {
                    method: method.to_string(),
                    after: self.timeout,
                })
            }
        }
    }

    async fn call(&self, method: &str, params: Value) -> Result<(), ConnectionError> {
        self.request(method, params).await.map(|_| ())
    }
}

#[async_trait]
impl Connection for BridgeConnection {
    fn self_id(&self) -> String {
        self.self_id.read().clone()
    }

    async fn send_message(
        &self,
        chat_id: &str,
        message: OutgoingMessage,
        options: SendOptions,
    ) -> Result<(), ConnectionError> {
        self.call(
            "sendMessage",
            json!({ "chatId": chat_id, "message": message, "options": options }),
        )
        .await
    }

    async fn delete_message(&self, key: &MessageRef) -> Result<(), ConnectionError> {
        self.call("deleteMessage", json!({ "key": key })).await
    }

    async fn group_participants_update(
        &self,
        chat_id: &str,
        participants: &[String],
        action: ParticipantAction,
    ) -> Result<(), ConnectionError> {
        self.call(
            "groupParticipantsUpdate",
            json!({ "chatId": chat_id, "participants": participants, "action": action }),
        )
        .await
    }

    async fn group_setting_update(
        &self,
        chat_id: &str,
        setting: GroupSetting,
    ) -> Result<(), ConnectionError> {
        self.call(
            "groupSettingUpdate",
            json!({ "chatId": chat_id, "setting": setting }),
        )
        .await
    }

    async fn group_metadata(&self, chat_id: &str) -> Result<GroupMetadata, ConnectionError> {
        let value = self
            .request("groupMetadata", json!({ "chatId": chat_id }))
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn update_block_status(
        &self,
        user: &str,
        action: BlockAction,
    ) -> Result<(), ConnectionError> {
        self.call("updateBlockStatus", json!({ "user": user, "action": action }))
            .await
    }

    async fn send_presence_update(
        &self,
        presence: PresenceKind,
        target: Option<&str>,
    ) -> Result<(), ConnectionError> {
        self.call(
            "sendPresenceUpdate",
            json!({ "presence": presence, "target": target }),
        )
        .await
    }

    async fn presence_subscribe(&self, user: &str) -> Result<(), ConnectionError> {
        self.call("presenceSubscribe", json!({ "user": user })).await
    }

    async fn reject_call(&self, call_id: &str, from: &str) -> Result<(), ConnectionError> {
        self.call("rejectCall", json!({ "callId": call_id, "from": from }))
            .await
    }
}
