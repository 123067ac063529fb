//! Command router: gates, supervised dispatch, post-dispatch effects.
//!
//! ```text
//! NotCommand ──► fallback hooks (groups) ──► done
//! Command ──► lookup ──► private-mode gate ──► scope/tier gate ──► Dispatch ──► reaction / typing
//! ```
//!
//! Bot-off and ban gates run earlier, before moderation, through
//! [`Router::entry_gate`].

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};

use super::{CommandContext, CommandRegistry, CommandSpec, Scope, Tier};
use crate::bot::Services;
use crate::normalizer::InboundEvent;
use crate::permissions::PermissionSnapshot;
use crate::protocol::{Connection, OutgoingMessage, PresenceKind, SendOptions, jid};

pub const BOT_OFF_NOTICE: &str =
    "⚠️ Bot is currently turned OFF by the owner. Only owner can run commands or turn it back on.";
pub const BANNED_NOTICE: &str =
    "❌ You are banned from using the bot. Contact an admin to get unbanned.";
pub const BOT_NOT_ADMIN_NOTICE: &str = "Please make the bot an admin to use admin commands.";
pub const SENDER_NOT_ADMIN_NOTICE: &str = "Sorry, only group admins can use this command.";
pub const OWNER_ONLY_NOTICE: &str = "❌ This command is only available for the owner or sudo!";
pub const GROUP_ONLY_NOTICE: &str = "This command can only be used in groups.";
pub const FAILURE_NOTICE: &str = "❌ Failed to process command!";

const TYPING_FOR: Duration = Duration::from_millis(1200);

/// Why a message was stopped before reaching a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    BotOff,
    Banned,
    /// Private mode and the sender is neither owner, sudo nor group mod.
    PrivateMode,
    GroupOnly,
    BotNotAdmin,
    SenderNotAdmin,
    OwnerOnly,
}

impl Rejection {
    /// Reply for the sender; `None` means drop silently.
    pub fn notice(self) -> Option<&'static str> {
        match self {
            Self::BotOff => Some(BOT_OFF_NOTICE),
            Self::Banned => Some(BANNED_NOTICE),
            Self::PrivateMode => None,
            Self::GroupOnly => Some(GROUP_ONLY_NOTICE),
            Self::BotNotAdmin => Some(BOT_NOT_ADMIN_NOTICE),
            Self::SenderNotAdmin => Some(SENDER_NOT_ADMIN_NOTICE),
            Self::OwnerOnly => Some(OWNER_ONLY_NOTICE),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    NotCommand,
    Unmatched,
    Rejected(Rejection),
    Executed(&'static str),
    Failed(&'static str),
}

pub struct Router {
    registry: Arc<CommandRegistry>,
}

impl Router {
    pub fn new(registry: CommandRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Bot-off and ban gates.
    ///
    /// The ban gate applies to every message (commands or not) except `unban`.
    pub fn entry_gate(
        services: &Services,
        event: &InboundEvent,
        perms: &PermissionSnapshot,
    ) -> Option<Rejection> {
        let token = event.command.token.as_str();

        if event.is_command() && token != "bot" && !perms.is_owner_or_sudo() && !services.bot_is_on()
        {
            return Some(Rejection::BotOff);
        }

        if token != "unban" && perms.is_banned() {
            return Some(Rejection::Banned);
        }

        None
    }

    /// Send the rejection notice, if it has one.
    ///
    /// Ban notices go out at most once per user per notice window.
    pub async fn reject(
        services: &Services,
        conn: &dyn Connection,
        event: &InboundEvent,
        rejection: Rejection,
    ) {
        debug!(
            "Rejected '{}' from {} in {}: {:?}",
            event.command.token, event.sender_id, event.chat_id, rejection
        );

        let Some(notice) = rejection.notice() else {
            return;
        };
        if rejection == Rejection::Banned {
            if !event.is_command() {
                return;
            }
            let key = format!("banned:{}", jid::bare_number(&event.sender_id));
            if !services.notices.claim(key) {
                return;
            }
        }

        if let Err(e) = conn
            .send_message(
                &event.chat_id,
                OutgoingMessage::text(notice),
                SendOptions::quoting(event.message_ref()),
            )
            .await
        {
            warn!("Failed to send rejection notice to {}: {}", event.chat_id, e);
        }
    }

    /// Route one event that already passed the entry gate and moderation.
    pub async fn route(
        &self,
        services: &Arc<Services>,
        conn: &Arc<dyn Connection>,
        event: &Arc<InboundEvent>,
        perms: &Arc<PermissionSnapshot>,
    ) -> RouteOutcome {
        if !event.is_command() {
            self.fallback(services, conn, event, perms).await;
            return RouteOutcome::NotCommand;
        }

        if !services.is_public()
            && !perms.is_owner_or_sudo()
            && !(event.is_group && perms.is_group_mod())
        {
            Self::reject(services, conn.as_ref(), event, Rejection::PrivateMode).await;
            return RouteOutcome::Rejected(Rejection::PrivateMode);
        }

        let Some(spec) = self.registry.lookup(&event.command) else {
            debug!("No handler for '{}'", event.command.token);
            self.fallback(services, conn, event, perms).await;
            return RouteOutcome::Unmatched;
        };

        if let Some(rejection) = Self::permission_gate(spec, event, perms).await {
            Self::reject(services, conn.as_ref(), event, rejection).await;
            return RouteOutcome::Rejected(rejection);
        }

        let outcome = Self::dispatch(spec, services, conn, event, perms).await;
        if matches!(outcome, RouteOutcome::Executed(_)) {
            Self::post_dispatch(spec, services, conn.as_ref(), event).await;
        }
        outcome
    }

    async fn permission_gate(
        spec: &CommandSpec,
        event: &InboundEvent,
        perms: &PermissionSnapshot,
    ) -> Option<Rejection> {
        if spec.scope == Scope::GroupOnly && !event.is_group {
            return Some(Rejection::GroupOnly);
        }

        match spec.tier {
            Tier::Public => None,
            Tier::Owner => (!perms.is_owner_or_sudo()).then_some(Rejection::OwnerOnly),
            Tier::Admin { .. } if !event.is_group => {
                (!perms.is_owner_or_sudo()).then_some(Rejection::OwnerOnly)
            }
            Tier::Admin { sender_admin } => {
                let admin = perms.admin().await;
                if !admin.is_bot_admin {
                    Some(Rejection::BotNotAdmin)
                } else if sender_admin && !perms.from_self() && !admin.is_sender_admin {
                    Some(Rejection::SenderNotAdmin)
                } else {
                    None
                }
            }
        }
    }

    /// Run the handler in its own task; errors and panics become a notice.
    async fn dispatch(
        spec: &CommandSpec,
        services: &Arc<Services>,
        conn: &Arc<dyn Connection>,
        event: &Arc<InboundEvent>,
        perms: &Arc<PermissionSnapshot>,
    ) -> RouteOutcome {
        let name = spec.name;
        let ctx = CommandContext {
            conn: Arc::clone(conn),
            services: Arc::clone(services),
            event: Arc::clone(event),
            perms: Arc::clone(perms),
            name,
        };
        let handler = Arc::clone(&spec.handler);

        debug!("Dispatching .{} for {} in {}", name, event.sender_id, event.chat_id);
        let failure = match tokio::spawn(async move { handler.handle(ctx).await }).await {
            Ok(Ok(())) => return RouteOutcome::Executed(name),
            Ok(Err(e)) => format!("{:#}", e),
            Err(join) => format!("handler panicked: {}", join),
        };

        error!("❌ Command .{} failed in {}: {}", name, event.chat_id, failure);
        if let Err(e) = conn
            .send_message(
                &event.chat_id,
                OutgoingMessage::text(FAILURE_NOTICE),
                SendOptions::quoting(event.message_ref()),
            )
            .await
        {
            warn!("Failed to send failure notice: {}", e);
        }
        RouteOutcome::Failed(name)
    }

    async fn post_dispatch(
        spec: &CommandSpec,
        services: &Services,
        conn: &dyn Connection,
        event: &InboundEvent,
    ) {
        match services.stores.autoreact.get() {
            Ok(react) if react.enabled => {
                let reaction = OutgoingMessage::Reaction {
                    emoji: react.emoji,
                    key: event.message_ref(),
                };
                if let Err(e) = conn
                    .send_message(&event.chat_id, reaction, SendOptions::default())
                    .await
                {
                    debug!("Reaction failed: {}", e);
                }
            }
            Ok(_) => {}
            Err(e) => warn!("Autoreact lookup failed: {}", e),
        }

        if spec.typing && services.autotyping_enabled() {
            show_typing(conn, &event.chat_id).await;
        }
    }

    /// Groups only: chatbot / mention hooks, unless muted or private to this sender.
    async fn fallback(
        &self,
        services: &Arc<Services>,
        conn: &Arc<dyn Connection>,
        event: &Arc<InboundEvent>,
        perms: &PermissionSnapshot,
    ) {
        if !event.is_group || event.from_self {
            return;
        }
        if services.autotyping_enabled() && !event.text.is_empty() {
            show_typing(conn.as_ref(), &event.chat_id).await;
        }
        if perms.is_muted() {
            return;
        }
        if !services.is_public() && !perms.is_owner_or_sudo() {
            return;
        }

        if let Err(e) = services.hooks.on_group_chat(conn, event).await {
            warn!("Group chat hook failed in {}: {:#}", event.chat_id, e);
        }
    }
}

/// Composing indicator for a moment, then paused.
pub async fn show_typing(conn: &dyn Connection, chat_id: &str) {
    if let Err(e) = conn
        .send_presence_update(PresenceKind::Composing, Some(chat_id))
        .await
    {
        debug!("Typing indicator failed: {}", e);
        return;
    }
    tokio::time::sleep(TYPING_FOR).await;
    if let Err(e) = conn
        .send_presence_update(PresenceKind::Paused, Some(chat_id))
        .await
    {
        debug!("Clearing typing indicator failed: {}", e);
    }
}
