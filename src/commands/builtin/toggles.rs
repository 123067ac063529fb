//! Per-group moderation switches: antilink, antitag, antibadword, antistatus, antibot.
//!
//! Every switch takes the same arguments:
//! `on [action]`, `off`, `set <delete|warn|kick|block>`, `status`.

use std::sync::Arc;

use async_trait::async_trait;

use crate::commands::router::SENDER_NOT_ADMIN_NOTICE;
use crate::commands::{CommandContext, CommandRegistry, CommandSpec, Handler, RegistryError};
use crate::store::{ModerationAction, ModerationToggle, Stores, ToggleStore};
use crate::utils::parse_toggle;

/// Handler for one moderation feature.
pub struct ToggleCommand {
    label: &'static str,
    store: fn(&Stores) -> &ToggleStore,
}

impl ToggleCommand {
    pub fn new(label: &'static str, store: fn(&Stores) -> &ToggleStore) -> Arc<dyn Handler> {
        Arc::new(Self { label, store })
    }

    fn usage(&self, ctx: &CommandContext) -> String {
        format!(
            "🛡️ *{}*\n{}\n\nActions: delete, warn, kick, block",
            self.label,
            ctx.usage("on [action] | off | set <action> | status")
        )
    }
}

#[async_trait]
impl Handler for ToggleCommand {
    async fn handle(&self, ctx: CommandContext) -> anyhow::Result<()> {
        if !ctx.perms.can_manage_group().await {
            return ctx.reply(SENDER_NOT_ADMIN_NOTICE).await;
        }

        let store = (self.store)(&ctx.services.stores);
        let chat_id = ctx.chat_id();
        let current = store.get(chat_id)?;

        let Some(sub) = ctx.arg_lower(0) else {
            return ctx.reply(self.usage(&ctx)).await;
        };

        if sub == "status" {
            let state = if current.enabled { "ON" } else { "OFF" };
            return ctx
                .reply(format!(
                    "🛡️ {} is {} (action: {}).",
                    self.label, state, current.action
                ))
                .await;
        }

        if sub == "set" {
            let Some(action) = ctx.arg_lower(1).and_then(|a| a.parse::<ModerationAction>().ok())
            else {
                return ctx.reply(self.usage(&ctx)).await;
            };
            store.set(
                chat_id,
                ModerationToggle {
                    enabled: current.enabled,
                    action,
                },
            )?;
            return ctx
                .reply(format!("✅ {} action set to {}.", self.label, action))
                .await;
        }

        match parse_toggle(&sub) {
            Some(true) => {
                let action = match ctx.arg_lower(1) {
                    None => current.action,
                    Some(arg) => match arg.parse::<ModerationAction>() {
                        Ok(action) => action,
                        Err(()) => return ctx.reply(self.usage(&ctx)).await,
                    },
                };
                store.set(chat_id, ModerationToggle::enabled(action))?;
                ctx.reply(format!(
                    "✅ {} has been turned ON (action: {}).",
                    self.label, action
                ))
                .await
            }
            Some(false) => {
                store.disable(chat_id)?;
                ctx.reply(format!("✅ {} has been turned OFF.", self.label))
                    .await
            }
            None => ctx.reply(self.usage(&ctx)).await,
        }
    }
}

pub fn register(registry: &mut CommandRegistry) -> Result<(), RegistryError> {
    let toggles: [(&'static str, &'static str, fn(&Stores) -> &ToggleStore); 5] = [
        ("antilink", "Antilink", |s| &s.antilink),
        ("antitag", "Antitag", |s| &s.antitag),
        ("antibadword", "Antibadword", |s| &s.antibadword),
        ("antistatus", "Antistatus", |s| &s.antistatus),
        ("antibot", "Antibot", |s| &s.antibot),
    ];

    for (name, label, store) in toggles {
        registry.register(
            CommandSpec::new(name, ToggleCommand::new(label, store))
                .admin()
                .group_only()
                .describe("Moderation switch: on/off/set/status"),
        )?;
    }
    Ok(())
}
