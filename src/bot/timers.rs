//! Mute expiry timers.
//!
//! One task per timed mute. Re-muting or unmuting a chat aborts the pending
//! task; a task that fires re-checks the store before reopening the group,
//! so a stale timer never lifts a newer mute.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use super::Services;
use crate::protocol::{Connection, GroupSetting};
use crate::utils::now_ms;

pub const MUTE_OVER_NOTICE: &str = "🔊 Mute time is over, the group is open again.";

#[derive(Default)]
pub struct MuteTimers {
    tasks: DashMap<String, (u64, AbortHandle)>,
    generation: AtomicU64,
}

impl MuteTimers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reopen `chat_id` after `after`, replacing any pending timer for it.
    pub fn schedule(
        &self,
        conn: Arc<dyn Connection>,
        services: Arc<Services>,
        chat_id: String,
        after: Duration,
    ) {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);

        // Hold the shard lock across the spawn so `finish` sees this entry.
        let slot = self.tasks.entry(chat_id.clone());
        let task = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            services.mute_timers.finish(&chat_id, generation);
            if let Err(e) = expire(&services, conn.as_ref(), &chat_id).await {
                warn!("Failed to lift mute in {}: {:#}", chat_id, e);
            }
        })
        .abort_handle();

        match slot {
            Entry::Occupied(mut slot) => {
                let (_, previous) = slot.insert((generation, task));
                previous.abort();
            }
            Entry::Vacant(slot) => {
                slot.insert((generation, task));
            }
        }
    }

    /// Abort the pending timer for `chat_id`, if any.
    pub fn cancel(&self, chat_id: &str) {
        if let Some((_, (_, handle))) = self.tasks.remove(chat_id) {
            handle.abort();
            debug!("Cancelled mute timer for {}", chat_id);
        }
    }

    /// Re-arm timers for mutes persisted before a restart or reconnect.
    pub fn restore(&self, conn: &Arc<dyn Connection>, services: &Arc<Services>) {
        let timed = match services.stores.mutes.timed() {
            Ok(timed) => timed,
            Err(e) => {
                warn!("Failed to read mutes for timer restore: {}", e);
                return;
            }
        };

        let now = now_ms();
        for (chat_id, until) in timed {
            let after = Duration::from_millis(until.saturating_sub(now).max(0) as u64);
            self.schedule(Arc::clone(conn), Arc::clone(services), chat_id, after);
        }
    }

    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    fn finish(&self, chat_id: &str, generation: u64) {
        self.tasks
            .remove_if(chat_id, |_, (current, _)| *current == generation);
    }
}

/// Lift an expired mute. A chat whose record was replaced by a longer mute
/// is left closed.
async fn expire(services: &Services, conn: &dyn Connection, chat_id: &str) -> anyhow::Result<()> {
    if services.stores.mutes.is_muted(chat_id, now_ms())? {
        debug!("Mute in {} was extended, leaving it closed", chat_id);
        return Ok(());
    }

    conn.group_setting_update(chat_id, GroupSetting::NotAnnouncement)
        .await?;
    conn.send_text(chat_id, MUTE_OVER_NOTICE).await?;
    info!("🔊 Mute expired in {}", chat_id);
    Ok(())
}
