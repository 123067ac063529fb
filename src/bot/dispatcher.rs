//! Per-message pipeline.
//!
//! ```text
//! InboundMessage ──► normalize ──► snapshot ──► private-mode DM drop
//!   ──► entry gate (bot off, ban) ──► moderation (groups) ──► PM blocker ──► router
//! ```

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::Services;
use crate::commands::{Rejection, RouteOutcome, Router};
use crate::moderation::{ModerationContext, Verdict};
use crate::normalizer::{self, InboundEvent};
use crate::permissions::PermissionSnapshot;
use crate::protocol::{BlockAction, Connection, InboundMessage};

const PM_BLOCK_AFTER: Duration = Duration::from_millis(1500);

/// Where a message stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handled {
    /// Direct message from a non-owner while the bot is private.
    PrivateDm,
    Rejected(Rejection),
    /// A moderation check acted on the message.
    Moderated(&'static str),
    PmBlocked,
    Routed(RouteOutcome),
}

pub struct Dispatcher {
    services: Arc<Services>,
    router: Router,
}

impl Dispatcher {
    pub fn new(services: Arc<Services>, router: Router) -> Self {
        info!("📋 {} commands registered", router.registry().len());
        Self { services, router }
    }

    pub fn services(&self) -> &Arc<Services> {
        &self.services
    }

    pub async fn handle_message(
        &self,
        conn: Arc<dyn Connection>,
        message: InboundMessage,
    ) -> Handled {
        let services = &self.services;
        let event = Arc::new(normalizer::normalize(message, &services.prefixes()));
        let perms = Arc::new(services.permissions.snapshot(Arc::clone(&conn), &event));

        if !event.is_group && !services.is_public() && !perms.is_owner_or_sudo() {
            debug!("Dropping DM from {} in private mode", event.sender_id);
            return Handled::PrivateDm;
        }

        if let Some(rejection) = Router::entry_gate(services, &event, &perms) {
            Router::reject(services, conn.as_ref(), &event, rejection).await;
            return Handled::Rejected(rejection);
        }

        if event.is_group && !event.from_self {
            if let Some(check) = self.moderate(&conn, &event, &perms).await {
                return Handled::Moderated(check);
            }
        }

        if self.pm_blocked(&conn, &event, &perms).await {
            return Handled::PmBlocked;
        }

        Handled::Routed(self.router.route(services, &conn, &event, &perms).await)
    }

    /// Name of the first check that acted, if any.
    async fn moderate(
        &self,
        conn: &Arc<dyn Connection>,
        event: &InboundEvent,
        perms: &PermissionSnapshot,
    ) -> Option<&'static str> {
        let ctx = ModerationContext {
            conn,
            services: &self.services,
            event,
            perms,
        };

        self.services
            .moderation
            .run(&ctx)
            .await
            .into_iter()
            .find_map(|(name, verdict)| matches!(verdict, Verdict::Acted(_)).then_some(name))
    }

    /// Notice, short pause, block. Owners and sudo users are never blocked.
    async fn pm_blocked(
        &self,
        conn: &Arc<dyn Connection>,
        event: &InboundEvent,
        perms: &PermissionSnapshot,
    ) -> bool {
        if event.is_group || event.from_self || perms.is_owner_or_sudo() {
            return false;
        }
        let setting = match self.services.stores.pmblocker.get() {
            Ok(setting) if setting.enabled => setting,
            Ok(_) => return false,
            Err(e) => {
                warn!("PM blocker lookup failed: {}", e);
                return false;
            }
        };

        if let Err(e) = conn.send_text(&event.chat_id, &setting.message).await {
            warn!("Failed to send PM blocker notice to {}: {}", event.chat_id, e);
        }
        tokio::time::sleep(PM_BLOCK_AFTER).await;
        match conn
            .update_block_status(&event.sender_id, BlockAction::Block)
            .await
        {
            Ok(()) => info!("🚫 PM blocker blocked {}", event.sender_id),
            Err(e) => warn!("PM blocker failed to block {}: {}", event.sender_id, e),
        }
        true
    }
}
