//! Lazily resolved permissions for one message.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use tokio::sync::OnceCell as AsyncOnceCell;

use crate::normalizer::InboundEvent;
use crate::protocol::Connection;

use super::{AdminStatus, Permissions};

/// Memoized answers for a single dispatch.
///
/// Local lookups (stores, owner list) resolve synchronously; the two admin
/// flags share one metadata fetch.
pub struct PermissionSnapshot {
    permissions: Permissions,
    conn: Arc<dyn Connection>,
    chat_id: String,
    sender_id: String,
    is_group: bool,
    from_self: bool,

    sudo: OnceCell<bool>,
    owner_or_sudo: OnceCell<bool>,
    banned: OnceCell<bool>,
    muted: OnceCell<bool>,
    group_mod: OnceCell<bool>,
    admin: AsyncOnceCell<AdminStatus>,
}

impl PermissionSnapshot {
    pub(super) fn new(
        permissions: Permissions,
        conn: Arc<dyn Connection>,
        event: &InboundEvent,
    ) -> Self {
        Self {
            permissions,
            conn,
            chat_id: event.chat_id.clone(),
            sender_id: event.sender_id.clone(),
            is_group: event.is_group,
            from_self: event.from_self,
            sudo: OnceCell::new(),
            owner_or_sudo: OnceCell::new(),
            banned: OnceCell::new(),
            muted: OnceCell::new(),
            group_mod: OnceCell::new(),
            admin: AsyncOnceCell::new(),
        }
    }

    pub fn from_self(&self) -> bool {
        self.from_self
    }

    pub fn is_sudo(&self) -> bool {
        *self
            .sudo
            .get_or_init(|| self.permissions.is_sudo(&self.sender_id))
    }

    /// Self-sent, configured owner, or sudo.
    pub fn is_owner_or_sudo(&self) -> bool {
        *self.owner_or_sudo.get_or_init(|| {
            self.from_self || self.permissions.is_bot_owner(&self.sender_id) || self.is_sudo()
        })
    }

    pub fn is_banned(&self) -> bool {
        *self
            .banned
            .get_or_init(|| self.permissions.is_banned(&self.sender_id))
    }

    pub fn is_muted(&self) -> bool {
        *self.muted.get_or_init(|| {
            self.is_group && self.permissions.is_muted(&self.chat_id)
        })
    }

    pub fn is_group_mod(&self) -> bool {
        *self.group_mod.get_or_init(|| {
            self.is_group && self.permissions.is_group_mod(&self.chat_id, &self.sender_id)
        })
    }

    pub async fn admin(&self) -> AdminStatus {
        *self
            .admin
            .get_or_init(|| async {
                self.permissions
                    .admin_status(self.conn.as_ref(), &self.chat_id, &self.sender_id)
                    .await
            })
            .await
    }

    pub async fn is_sender_admin(&self) -> bool {
        self.admin().await.is_sender_admin
    }

    pub async fn is_bot_admin(&self) -> bool {
        self.admin().await.is_bot_admin
    }

    /// Sender admin, self-sent, or owner/sudo: who may configure a group feature.
    pub async fn can_manage_group(&self) -> bool {
        self.from_self || self.is_owner_or_sudo() || self.is_sender_admin().await
    }
}
