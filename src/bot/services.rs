//! Shared application state handed to every stage.

use std::sync::Arc;
use std::time::Instant;

use tracing::warn;

use super::antidelete::RecentMessages;
use super::{EventHooks, MuteTimers, PresenceMirror};
use crate::cache::{CacheRegistry, NoticeWindow};
use crate::config::Config;
use crate::moderation::ModerationPipeline;
use crate::permissions::Permissions;
use crate::store::Stores;

/// Everything a stage may need, built once at startup.
///
/// Never holds a connection: the connection changes on every reconnect and
/// is passed alongside instead.
pub struct Services {
    pub config: Arc<Config>,

    /// Cache registry for creating/accessing caches.
    pub cache: CacheRegistry,

    pub stores: Arc<Stores>,

    /// Permission resolver with group metadata caching.
    pub permissions: Permissions,

    pub moderation: ModerationPipeline,

    /// 60s de-duplication for ban, antibot and anticall notices.
    pub notices: NoticeWindow,

    pub recent_messages: RecentMessages,

    pub mute_timers: MuteTimers,
    pub presence: PresenceMirror,
    pub hooks: Arc<dyn EventHooks>,
    pub started_at: Instant,
}

impl Services {
    pub fn new(config: Config, hooks: Arc<dyn EventHooks>) -> anyhow::Result<Arc<Self>> {
        let cache = CacheRegistry::new();
        let stores = Arc::new(Stores::open(&config));
        let permissions = Permissions::new(stores.clone(), &cache, config.owner_numbers.clone())?;
        let notices = NoticeWindow::new(&cache)?;
        let recent_messages = RecentMessages::new(&cache)?;
        let moderation = ModerationPipeline::standard(&config.bad_words, config.tag_sensitivity)?;

        Ok(Arc::new(Self {
            config: Arc::new(config),
            cache,
            stores,
            permissions,
            moderation,
            notices,
            recent_messages,
            mute_timers: MuteTimers::new(),
            presence: PresenceMirror::new(),
            hooks,
            started_at: Instant::now(),
        }))
    }

    /// Prefixes currently in force.
    pub fn prefixes(&self) -> Vec<char> {
        self.stores.prefixes.get().unwrap_or_else(|e| {
            warn!("Prefix lookup failed, using defaults: {}", e);
            self.config.default_prefixes.clone()
        })
    }

    pub fn bot_is_on(&self) -> bool {
        self.stores
            .bot_state
            .get()
            .map(|s| s.is_on)
            .unwrap_or_else(|e| {
                warn!("Bot state lookup failed: {}", e);
                true
            })
    }

    pub fn is_public(&self) -> bool {
        self.stores
            .mode
            .get()
            .map(|m| m.is_public)
            .unwrap_or_else(|e| {
                warn!("Mode lookup failed: {}", e);
                true
            })
    }

    pub fn autotyping_enabled(&self) -> bool {
        self.stores
            .autotyping
            .get()
            .map(|f| f.enabled)
            .unwrap_or(false)
    }

    /// Mirroring is on when either the config or the stored switch says so.
    pub fn mirror_enabled(&self) -> bool {
        self.config.mirror_owner_presence
            || self
                .stores
                .mirror_presence
                .get()
                .map(|f| f.enabled)
                .unwrap_or(false)
    }
}
