//! Informational commands: ping, alive, uptime, help, owner, jid.

use std::sync::Arc;

use crate::commands::{
    CommandContext, CommandRegistry, CommandSpec, Handler, RegistryError, Tier, handler_fn,
};
use crate::protocol::jid;
use crate::utils::{format_duration_full, now_ms};

pub fn register(registry: &mut CommandRegistry) -> Result<(), RegistryError> {
    registry.register(CommandSpec::new("ping", handler_fn(ping)).describe("Check response time"))?;
    registry.register(CommandSpec::new("alive", handler_fn(alive)).describe("Bot status"))?;
    registry.register(CommandSpec::new("uptime", handler_fn(uptime)).describe("Time since start"))?;
    registry.register(CommandSpec::new("owner", handler_fn(owner)).describe("Bot owner contact"))?;
    registry.register(CommandSpec::new("jid", handler_fn(show_jid)).describe("Show chat and sender ids"))?;
    Ok(())
}

async fn ping(ctx: CommandContext) -> anyhow::Result<()> {
    let latency = (now_ms() - ctx.event.timestamp * 1000).max(0);
    ctx.reply(format!("🏓 Pong! Response time: {} ms", latency)).await
}

fn uptime_text(ctx: &CommandContext) -> String {
    format_duration_full(ctx.services.started_at.elapsed().as_secs())
}

async fn alive(ctx: CommandContext) -> anyhow::Result<()> {
    let services = &ctx.services;
    let text = format!(
        "✅ *{}* is alive!\n\n⏱️ Uptime: {}\n🌐 Mode: {}\n🤖 Bot: {}",
        services.config.bot_name,
        uptime_text(&ctx),
        if services.is_public() { "public" } else { "private" },
        if services.bot_is_on() { "ON" } else { "OFF" },
    );
    ctx.reply(text).await
}

async fn uptime(ctx: CommandContext) -> anyhow::Result<()> {
    ctx.reply(format!("⏱️ Uptime: {}", uptime_text(&ctx))).await
}

async fn owner(ctx: CommandContext) -> anyhow::Result<()> {
    let Some(number) = ctx.services.config.primary_owner() else {
        return ctx.reply("No owner is configured.").await;
    };
    let owner_jid = jid::user_jid(number);
    ctx.reply_mentions(
        format!("👑 Owner of {}: {}", ctx.services.config.bot_name, jid::mention_tag(&owner_jid)),
        vec![owner_jid],
    )
    .await
}

async fn show_jid(ctx: CommandContext) -> anyhow::Result<()> {
    ctx.reply(format!(
        "💬 Chat: {}\n👤 Sender: {}",
        ctx.chat_id(),
        ctx.sender_id()
    ))
    .await
}

/// Menu text from the registry, grouped by tier.
pub fn menu_text(bot_name: &str, registry: &CommandRegistry) -> String {
    let mut public = Vec::new();
    let mut admin = Vec::new();
    let mut owner = Vec::new();

    for spec in registry.specs() {
        let bucket = match spec.tier {
            Tier::Public => &mut public,
            Tier::Admin { .. } => &mut admin,
            Tier::Owner => &mut owner,
        };
        bucket.push(if spec.description.is_empty() {
            format!("• .{}", spec.name)
        } else {
            format!("• .{} - {}", spec.name, spec.description)
        });
    }

    format!(
        "📖 *{} Menu*\n\n*General*\n{}\n\n*Group admin*\n{}\n\n*Owner*\n{}",
        bot_name,
        public.join("\n"),
        admin.join("\n"),
        owner.join("\n"),
    )
}

/// `help` renders a menu computed once all other commands are registered.
pub fn help_handler(menu: String) -> Arc<dyn Handler> {
    let menu: Arc<str> = menu.into();
    handler_fn(move |ctx: CommandContext| {
        let menu = Arc::clone(&menu);
        async move {
            let prefix = ctx.prefix();
            let text = if prefix == '.' {
                menu.to_string()
            } else {
                menu.replace("• .", &format!("• {}", prefix))
            };
            ctx.reply(text).await
        }
    })
}
