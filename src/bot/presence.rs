//! Owner presence tracking and mirroring.
//!
//! While an owner is online the bot is forced ON. With mirroring enabled the
//! bot also sends `available` to the owners every 25s until they go offline,
//! then `unavailable` once.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::Services;
use crate::protocol::{Connection, PresenceKind, PresenceUpdate, jid};
use crate::store::{BotState, OwnerPresence};
use crate::utils::now_ms;

const HEARTBEAT_EVERY: Duration = Duration::from_secs(25);

/// Presence values that count as online.
fn is_online(presence: &str) -> bool {
    matches!(presence, "available" | "online" | "present")
}

#[derive(Default)]
pub struct PresenceMirror {
    heartbeat: Mutex<Option<JoinHandle<()>>>,
    /// Bare numbers of owners currently online.
    online: Mutex<HashSet<String>>,
}

impl PresenceMirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to every owner's presence on a fresh connection.
    pub async fn subscribe_owners(&self, services: &Services, conn: &dyn Connection) {
        let subscriptions = services
            .permissions
            .owner_numbers()
            .iter()
            .map(|number| async move {
                let owner = jid::user_jid(number);
                if let Err(e) = conn.presence_subscribe(&owner).await {
                    warn!("Presence subscribe for {} failed: {}", owner, e);
                }
            });
        join_all(subscriptions).await;
    }

    pub async fn handle_update(
        &self,
        services: &Services,
        conn: &Arc<dyn Connection>,
        update: &PresenceUpdate,
    ) -> anyhow::Result<()> {
        for (user, presence) in update.entries() {
            if !services.permissions.is_bot_owner(user) {
                continue;
            }
            self.owner_changed(services, conn, user, is_online(presence))
                .await?;
        }
        Ok(())
    }

    async fn owner_changed(
        &self,
        services: &Services,
        conn: &Arc<dyn Connection>,
        owner: &str,
        online: bool,
    ) -> anyhow::Result<()> {
        let any_online = {
            let mut set = self.online.lock();
            let number = jid::bare_number(owner).to_string();
            if online {
                set.insert(number);
            } else {
                set.remove(&number);
            }
            !set.is_empty()
        };

        services.stores.owner_presence.set(OwnerPresence {
            is_online: any_online,
            updated_at: Some(now_ms()),
        })?;

        if online {
            let was_on = services
                .stores
                .bot_state
                .update(|state| std::mem::replace(state, BotState { is_on: true }).is_on)?;
            if !was_on {
                info!("👤 Owner is online, bot turned back ON");
            } else {
                debug!("Owner {} is online", owner);
            }
        } else {
            debug!("Owner {} went offline", owner);
        }

        if !services.mirror_enabled() {
            self.stop();
            return Ok(());
        }

        let owners = owner_jids(services);
        if online {
            send_to_all(conn.as_ref(), &owners, PresenceKind::Available).await;
            self.start_heartbeat(Arc::clone(conn), owners);
        } else if any_online {
            debug!("Another owner is still online, keeping the keepalive");
        } else if self.stop() {
            send_to_all(conn.as_ref(), &owners, PresenceKind::Unavailable).await;
            info!("🌙 Mirror presence: stopped keepalive");
        }
        Ok(())
    }

    fn start_heartbeat(&self, conn: Arc<dyn Connection>, owners: Vec<String>) {
        let mut slot = self.heartbeat.lock();
        if slot.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }

        *slot = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(HEARTBEAT_EVERY);
            // The first tick completes immediately; the caller already sent one.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                send_to_all(conn.as_ref(), &owners, PresenceKind::Available).await;
            }
        }));
        info!("☀️ Mirror presence: started keepalive");
    }

    /// Abort the heartbeat. Returns whether one was running.
    pub fn stop(&self) -> bool {
        match self.heartbeat.lock().take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.heartbeat
            .lock()
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }
}

fn owner_jids(services: &Services) -> Vec<String> {
    services
        .permissions
        .owner_numbers()
        .iter()
        .map(|n| jid::user_jid(n))
        .collect()
}

async fn send_to_all(conn: &dyn Connection, owners: &[String], presence: PresenceKind) {
    for owner in owners {
        if let Err(e) = conn.send_presence_update(presence, Some(owner)).await {
            debug!("Presence {:?} to {} failed: {}", presence, owner, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::protocol::PresenceEntry;
    use crate::store::Flag;
    use crate::bot::NoopHooks;
    use crate::testing::{Call, MockConnection, OWNER, test_config, test_services};

    const SECOND_OWNER: &str = "1001@s.whatsapp.net";

    fn update(user: &str, presence: &str) -> PresenceUpdate {
        PresenceUpdate {
            id: user.to_string(),
            presences: HashMap::from([(
                user.to_string(),
                PresenceEntry {
                    last_known_presence: Some(presence.to_string()),
                },
            )]),
        }
    }

    fn presences(conn: &MockConnection, kind: PresenceKind) -> usize {
        conn.count(|c| matches!(c, Call::Presence { presence, .. } if *presence == kind))
    }

    #[tokio::test(start_paused = true)]
    async fn test_owner_online_turns_bot_on_and_mirrors() {
        let dir = tempfile::tempdir().unwrap();
        let services = test_services(dir.path());
        services.stores.bot_state.set(BotState { is_on: false }).unwrap();
        services.stores.mirror_presence.set(Flag { enabled: true }).unwrap();

        let mock = MockConnection::new();
        let conn: Arc<dyn Connection> = mock.clone();
        let mirror = &services.presence;

        mirror
            .handle_update(&services, &conn, &update(OWNER, "available"))
            .await
            .unwrap();
        assert!(services.bot_is_on());
        assert!(services.stores.owner_presence.get().unwrap().is_online);
        assert!(mirror.is_running());
        assert_eq!(presences(&mock, PresenceKind::Available), 1);

        tokio::time::sleep(Duration::from_secs(51)).await;
        assert_eq!(presences(&mock, PresenceKind::Available), 3);

        mirror
            .handle_update(&services, &conn, &update(OWNER, "unavailable"))
            .await
            .unwrap();
        assert!(!mirror.is_running());
        assert_eq!(presences(&mock, PresenceKind::Unavailable), 1);

        // A second offline update sends nothing more.
        mirror
            .handle_update(&services, &conn, &update(OWNER, "unavailable"))
            .await
            .unwrap();
        assert_eq!(presences(&mock, PresenceKind::Unavailable), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keepalive_runs_while_any_owner_is_online() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.owner_numbers.push(jid::bare_number(SECOND_OWNER).to_string());
        let services = Services::new(config, Arc::new(NoopHooks)).unwrap();
        services.stores.mirror_presence.set(Flag { enabled: true }).unwrap();

        let mock = MockConnection::new();
        let conn: Arc<dyn Connection> = mock.clone();
        let mirror = &services.presence;

        for (user, presence) in [(OWNER, "available"), (SECOND_OWNER, "available"), (OWNER, "unavailable")] {
            mirror
                .handle_update(&services, &conn, &update(user, presence))
                .await
                .unwrap();
        }
        assert!(mirror.is_running());
        assert!(services.stores.owner_presence.get().unwrap().is_online);
        assert_eq!(presences(&mock, PresenceKind::Unavailable), 0);

        mirror
            .handle_update(&services, &conn, &update(SECOND_OWNER, "unavailable"))
            .await
            .unwrap();
        assert!(!mirror.is_running());
        assert!(!services.stores.owner_presence.get().unwrap().is_online);
        assert_eq!(presences(&mock, PresenceKind::Unavailable), 2);
    }

    #[tokio::test]
    async fn test_non_owner_presence_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let services = test_services(dir.path());
        let mock = MockConnection::new();
        let conn: Arc<dyn Connection> = mock.clone();

        services
            .presence
            .handle_update(&services, &conn, &update("5555@s.whatsapp.net", "available"))
            .await
            .unwrap();
        assert!(!services.stores.owner_presence.get().unwrap().is_online);
        assert!(mock.calls().is_empty());
    }
}
