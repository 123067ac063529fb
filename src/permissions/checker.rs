//! Permission resolver with cached group metadata.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::cache::{CacheConfig, CacheError, CacheRegistry, TypedCache};
use crate::normalizer::InboundEvent;
use crate::protocol::{Connection, ConnectionError, GroupMetadata, jid};
use crate::store::Stores;
use crate::utils::now_ms;

use super::PermissionSnapshot;

/// Admin flags for one user in one group, plus the bot's own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdminStatus {
    pub is_sender_admin: bool,
    pub is_bot_admin: bool,
}

/// Shared permission resolver.
///
/// Owners (from `OWNER_NUMBER`) and sudo users bypass the owner tier.
/// Store failures resolve to the safe answer and are logged.
#[derive(Clone)]
pub struct Permissions {
    stores: Arc<Stores>,
    metadata: TypedCache<String, Arc<GroupMetadata>>,
    owner_numbers: Arc<[String]>,
}

impl Permissions {
    pub fn new(
        stores: Arc<Stores>,
        cache_registry: &CacheRegistry,
        owner_numbers: Vec<String>,
    ) -> Result<Self, CacheError> {
        let metadata =
            cache_registry.get_or_create("group_metadata", CacheConfig::group_metadata())?;

        Ok(Self {
            stores,
            metadata,
            owner_numbers: owner_numbers.into(),
        })
    }

    #[inline]
    pub fn is_bot_owner(&self, user: &str) -> bool {
        let number = jid::bare_number(user);
        self.owner_numbers.iter().any(|o| o == number)
    }

    pub fn owner_numbers(&self) -> &[String] {
        &self.owner_numbers
    }

    pub fn is_sudo(&self, user: &str) -> bool {
        self.stores.sudo.contains(user).unwrap_or_else(|e| {
            warn!("Sudo lookup failed: {}", e);
            false
        })
    }

    pub fn is_owner_or_sudo(&self, user: &str) -> bool {
        self.is_bot_owner(user) || self.is_sudo(user)
    }

    pub fn is_banned(&self, user: &str) -> bool {
        self.stores.banned.contains(user).unwrap_or_else(|e| {
            warn!("Ban lookup failed: {}", e);
            false
        })
    }

    /// Reading an expired mute purges it.
    pub fn is_muted(&self, chat_id: &str) -> bool {
        self.stores
            .mutes
            .is_muted(chat_id, now_ms())
            .unwrap_or_else(|e| {
                warn!("Mute lookup failed for {}: {}", chat_id, e);
                false
            })
    }

    pub fn is_group_mod(&self, chat_id: &str, user: &str) -> bool {
        self.stores
            .group_mods
            .is_mod(chat_id, user)
            .unwrap_or_else(|e| {
                warn!("Group mod lookup failed for {}: {}", chat_id, e);
                false
            })
    }

    /// Group metadata, served from cache for up to a minute.
    pub async fn group_metadata(
        &self,
        conn: &dyn Connection,
        chat_id: &str,
    ) -> Result<Arc<GroupMetadata>, ConnectionError> {
        let key = chat_id.to_string();
        if let Some(cached) = self.metadata.get(&key) {
            debug!("Metadata cache hit for {}", chat_id);
            return Ok(cached);
        }

        debug!("Metadata cache miss for {}", chat_id);
        let fetched = Arc::new(conn.group_metadata(chat_id).await?);
        self.metadata.insert(key, Arc::clone(&fetched));
        Ok(fetched)
    }

    /// Admin flags for `user` and for the bot; both `false` when the lookup fails.
    pub async fn admin_status(
        &self,
        conn: &dyn Connection,
        chat_id: &str,
        user: &str,
    ) -> AdminStatus {
        if !jid::is_group(chat_id) {
            return AdminStatus::default();
        }

        match self.group_metadata(conn, chat_id).await {
            Ok(metadata) => AdminStatus {
                is_sender_admin: metadata.is_admin(user),
                is_bot_admin: metadata.is_admin(&conn.self_id()),
            },
            Err(e) => {
                warn!("Admin lookup failed for {}: {}", chat_id, e);
                AdminStatus::default()
            }
        }
    }

    pub async fn is_admin(&self, conn: &dyn Connection, chat_id: &str, user: &str) -> bool {
        self.admin_status(conn, chat_id, user).await.is_sender_admin
    }

    /// Drop cached metadata after membership or role changes.
    pub fn invalidate(&self, chat_id: &str) {
        self.metadata.invalidate(&chat_id.to_string());
    }

    /// Lazy per-message view.
    pub fn snapshot(&self, conn: Arc<dyn Connection>, event: &InboundEvent) -> PermissionSnapshot {
        PermissionSnapshot::new(self.clone(), conn, event)
    }
}
