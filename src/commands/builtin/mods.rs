//! Group moderators: users allowed to run commands in one group while the
//! bot is in private mode.

use crate::commands::{CommandContext, CommandRegistry, CommandSpec, RegistryError, handler_fn};
use crate::protocol::jid;
use crate::utils::resolve_target;

pub fn register(registry: &mut CommandRegistry) -> Result<(), RegistryError> {
    registry.register(
        CommandSpec::new("addmod", handler_fn(addmod))
            .owner()
            .group_only()
            .describe("Add a group moderator"),
    )?;
    registry.register(
        CommandSpec::new("delmod", handler_fn(delmod))
            .owner()
            .group_only()
            .describe("Remove a group moderator"),
    )?;
    registry.register(
        CommandSpec::new("listmods", handler_fn(listmods))
            .group_only()
            .describe("List group moderators"),
    )?;
    Ok(())
}

async fn addmod(ctx: CommandContext) -> anyhow::Result<()> {
    let Some(target) = resolve_target(&ctx.event) else {
        return ctx.reply(ctx.usage("@user")).await;
    };
    let tag = jid::mention_tag(&target);
    let text = if ctx.services.stores.group_mods.add(ctx.chat_id(), &target)? {
        format!("✅ {} is now a moderator of this group.", tag)
    } else {
        format!("{} is already a moderator here.", tag)
    };
    ctx.reply_mentions(text, vec![target]).await
}

async fn delmod(ctx: CommandContext) -> anyhow::Result<()> {
    let Some(target) = resolve_target(&ctx.event) else {
        return ctx.reply(ctx.usage("@user")).await;
    };
    let tag = jid::mention_tag(&target);
    let text = if ctx.services.stores.group_mods.remove(ctx.chat_id(), &target)? {
        format!("✅ {} is no longer a moderator here.", tag)
    } else {
        format!("{} is not a moderator here.", tag)
    };
    ctx.reply_mentions(text, vec![target]).await
}

async fn listmods(ctx: CommandContext) -> anyhow::Result<()> {
    let numbers = ctx.services.stores.group_mods.list(ctx.chat_id())?;
    if numbers.is_empty() {
        return ctx.reply("This group has no moderators.").await;
    }
    let lines: Vec<String> = numbers.iter().map(|n| format!("• @{}", n)).collect();
    let mentions = numbers.iter().map(|n| jid::user_jid(n)).collect();
    ctx.reply_mentions(format!("🛡️ *Group moderators*\n{}", lines.join("\n")), mentions)
        .await
}
