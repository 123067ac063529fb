//! Group moderation commands.

use crate::commands::router::SENDER_NOT_ADMIN_NOTICE;
use crate::commands::{CommandContext, CommandRegistry, CommandSpec, RegistryError, handler_fn};
use crate::protocol::{GroupSetting, ParticipantAction, jid};
use crate::store::WarnOutcome;
use crate::utils::{format_duration_full, now_ms, parse_mute_duration, resolve_target, resolve_targets};

pub const MUTE_USAGE: &str =
    "Please provide a valid number of minutes or use .mute with no number to mute immediately.";

pub fn register(registry: &mut CommandRegistry) -> Result<(), RegistryError> {
    registry.register(
        CommandSpec::new("mute", handler_fn(mute))
            .destructive()
            .group_only()
            .describe("Close the group, optionally for N minutes"),
    )?;
    registry.register(
        CommandSpec::new("unmute", handler_fn(unmute))
            .destructive()
            .group_only()
            .describe("Reopen the group"),
    )?;
    registry.register(
        CommandSpec::new("ban", handler_fn(ban))
            .destructive()
            .describe("Ban a user from using the bot"),
    )?;
    registry.register(
        CommandSpec::new("unban", handler_fn(unban))
            .destructive()
            .describe("Lift a bot ban"),
    )?;
    registry.register(
        CommandSpec::new("promote", handler_fn(promote))
            .destructive()
            .group_only()
            .describe("Make users admin"),
    )?;
    registry.register(
        CommandSpec::new("demote", handler_fn(demote))
            .destructive()
            .group_only()
            .describe("Remove admin rights"),
    )?;
    registry.register(
        CommandSpec::new("kick", handler_fn(kick))
            .admin()
            .group_only()
            .describe("Remove users from the group"),
    )?;
    registry.register(
        CommandSpec::new("warn", handler_fn(warn))
            .admin()
            .group_only()
            .describe("Warn a user; kicked at the limit"),
    )?;
    registry.register(
        CommandSpec::new("warnings", handler_fn(warnings))
            .group_only()
            .describe("Show warning counts"),
    )?;
    registry.register(
        CommandSpec::new("resetwarn", handler_fn(resetwarn))
            .admin()
            .group_only()
            .describe("Clear a user's warnings"),
    )?;
    registry.register(
        CommandSpec::new("warnlimit", handler_fn(warnlimit))
            .admin()
            .group_only()
            .describe("Show or set the warning limit"),
    )?;
    registry.register(
        CommandSpec::new("tagall", handler_fn(tagall))
            .admin()
            .group_only()
            .describe("Mention every member"),
    )?;
    registry.register(
        CommandSpec::new("hidetag", handler_fn(hidetag))
            .admin()
            .group_only()
            .describe("Message everyone without a visible list"),
    )?;
    registry.register(
        CommandSpec::new("tag", handler_fn(tag))
            .admin()
            .group_only()
            .describe("Repeat the quoted message to everyone"),
    )?;
    Ok(())
}

/// Internal admin check for admin-tier commands outside the destructive set.
async fn require_manager(ctx: &CommandContext) -> anyhow::Result<bool> {
    if ctx.perms.can_manage_group().await {
        return Ok(true);
    }
    ctx.reply(SENDER_NOT_ADMIN_NOTICE).await?;
    Ok(false)
}

/// Users the bot must never act against: itself and the owners.
fn is_protected(ctx: &CommandContext, user: &str) -> bool {
    jid::same_user(user, &ctx.conn.self_id()) || ctx.services.permissions.is_bot_owner(user)
}

fn tags(users: &[String]) -> String {
    users
        .iter()
        .map(|u| jid::mention_tag(u))
        .collect::<Vec<_>>()
        .join(", ")
}

async fn mute(ctx: CommandContext) -> anyhow::Result<()> {
    let duration = match ctx.args().first() {
        None => None,
        Some(arg) => match parse_mute_duration(arg) {
            Some(d) => Some(d),
            None => return ctx.reply(MUTE_USAGE).await,
        },
    };

    let chat_id = ctx.chat_id().to_string();
    ctx.conn
        .group_setting_update(&chat_id, GroupSetting::Announcement)
        .await?;

    let services = &ctx.services;
    match duration {
        None => {
            services.mute_timers.cancel(&chat_id);
            services.stores.mutes.mute_until(&chat_id, i64::MAX)?;
            ctx.reply("🔇 The group has been muted.").await
        }
        Some(duration) => {
            let until = now_ms() + duration.as_millis() as i64;
            services.stores.mutes.mute_until(&chat_id, until)?;
            services
                .mute_timers
                .schedule(ctx.conn.clone(), ctx.services.clone(), chat_id, duration);
            ctx.reply(format!(
                "🔇 The group has been muted for {}.",
                format_duration_full(duration.as_secs())
            ))
            .await
        }
    }
}

async fn unmute(ctx: CommandContext) -> anyhow::Result<()> {
    let chat_id = ctx.chat_id();
    ctx.services.mute_timers.cancel(chat_id);
    ctx.services.stores.mutes.remove(chat_id)?;
    ctx.conn
        .group_setting_update(chat_id, GroupSetting::NotAnnouncement)
        .await?;
    ctx.reply("🔊 The group has been unmuted.").await
}

async fn ban(ctx: CommandContext) -> anyhow::Result<()> {
    let Some(target) = resolve_target(&ctx.event) else {
        return ctx
            .reply(ctx.usage("@user (or reply to their message)"))
            .await;
    };
    if is_protected(&ctx, &target) {
        return ctx.reply("❌ You cannot ban the bot or its owner.").await;
    }

    let text = if ctx.services.stores.banned.add(&target)? {
        format!("🚫 {} has been banned from using the bot.", jid::mention_tag(&target))
    } else {
        format!("{} is already banned.", jid::mention_tag(&target))
    };
    ctx.reply_mentions(text, vec![target]).await
}

async fn unban(ctx: CommandContext) -> anyhow::Result<()> {
    let Some(target) = resolve_target(&ctx.event) else {
        return ctx
            .reply(ctx.usage("@user (or reply to their message)"))
            .await;
    };

    let text = if ctx.services.stores.banned.remove(&target)? {
        format!("✅ {} has been unbanned.", jid::mention_tag(&target))
    } else {
        format!("{} is not banned.", jid::mention_tag(&target))
    };
    ctx.reply_mentions(text, vec![target]).await
}

async fn change_role(ctx: CommandContext, action: ParticipantAction) -> anyhow::Result<()> {
    let targets = resolve_targets(&ctx.event);
    if targets.is_empty() {
        return ctx.reply(ctx.usage("@user (or reply to their message)")).await;
    }

    let verb = if action == ParticipantAction::Promote {
        "promoted to admin"
    } else {
        "demoted from admin"
    };
    ctx.conn
        .group_participants_update(ctx.chat_id(), &targets, action)
        .await?;
    ctx.services.permissions.invalidate(ctx.chat_id());

    ctx.reply_mentions(format!("✅ {} {}.", tags(&targets), verb), targets)
        .await
}

async fn promote(ctx: CommandContext) -> anyhow::Result<()> {
    change_role(ctx, ParticipantAction::Promote).await
}

async fn demote(ctx: CommandContext) -> anyhow::Result<()> {
    change_role(ctx, ParticipantAction::Demote).await
}

async fn kick(ctx: CommandContext) -> anyhow::Result<()> {
    if !require_manager(&ctx).await? {
        return Ok(());
    }

    let targets: Vec<String> = resolve_targets(&ctx.event)
        .into_iter()
        .filter(|t| !is_protected(&ctx, t))
        .collect();
    if targets.is_empty() {
        return ctx
            .reply("Please mention the user or reply to their message to kick!")
            .await;
    }

    ctx.conn
        .group_participants_update(ctx.chat_id(), &targets, ParticipantAction::Remove)
        .await?;
    ctx.services.permissions.invalidate(ctx.chat_id());
    ctx.reply_mentions(format!("👢 Removed {}.", tags(&targets)), targets)
        .await
}

async fn warn(ctx: CommandContext) -> anyhow::Result<()> {
    if !require_manager(&ctx).await? {
        return Ok(());
    }
    let Some(target) = resolve_target(&ctx.event) else {
        return ctx.reply(ctx.usage("@user [reason]")).await;
    };
    if is_protected(&ctx, &target) {
        return ctx.reply("❌ You cannot warn the bot or its owner.").await;
    }

    let chat_id = ctx.chat_id();
    let tag = jid::mention_tag(&target);
    let outcome = ctx.services.stores.warnings.record_violation(chat_id, &target)?;
    let text = match outcome {
        WarnOutcome::Warned { count, threshold } => {
            format!("⚠️ {} has been warned ({}/{}).", tag, count, threshold)
        }
        WarnOutcome::LimitReached { threshold } => {
            ctx.conn
                .group_participants_update(
                    chat_id,
                    std::slice::from_ref(&target),
                    ParticipantAction::Remove,
                )
                .await?;
            format!("🚫 {} reached {} warnings and was removed.", tag, threshold)
        }
    };
    ctx.reply_mentions(text, vec![target]).await
}

async fn warnings(ctx: CommandContext) -> anyhow::Result<()> {
    let warnings = &ctx.services.stores.warnings;
    let chat_id = ctx.chat_id();
    let threshold = warnings.threshold(chat_id)?;

    if let Some(target) = resolve_target(&ctx.event) {
        let count = warnings.count(chat_id, &target)?;
        return ctx
            .reply_mentions(
                format!("⚠️ {} has {}/{} warnings.", jid::mention_tag(&target), count, threshold),
                vec![target],
            )
            .await;
    }

    let entries = warnings.for_chat(chat_id)?;
    if entries.is_empty() {
        return ctx.reply("✅ Nobody in this group has warnings.").await;
    }
    let mentions: Vec<String> = entries.iter().map(|(n, _)| jid::user_jid(n)).collect();
    let lines: Vec<String> = entries
        .iter()
        .map(|(number, count)| format!("• @{}: {}/{}", number, count, threshold))
        .collect();
    ctx.reply_mentions(format!("⚠️ *Warnings*\n{}", lines.join("\n")), mentions)
        .await
}

async fn resetwarn(ctx: CommandContext) -> anyhow::Result<()> {
    if !require_manager(&ctx).await? {
        return Ok(());
    }
    let Some(target) = resolve_target(&ctx.event) else {
        return ctx.reply(ctx.usage("@user")).await;
    };
    let cleared = ctx.services.stores.warnings.reset(ctx.chat_id(), &target)?;
    ctx.reply_mentions(
        format!(
            "✅ Cleared {} warning(s) for {}.",
            cleared,
            jid::mention_tag(&target)
        ),
        vec![target],
    )
    .await
}

async fn warnlimit(ctx: CommandContext) -> anyhow::Result<()> {
    let warnings = &ctx.services.stores.warnings;
    let Some(arg) = ctx.args().first() else {
        let current = warnings.threshold(ctx.chat_id())?;
        return ctx
            .reply(format!("⚠️ Warning limit: {}\n{}", current, ctx.usage("<1-20>")))
            .await;
    };
    if !require_manager(&ctx).await? {
        return Ok(());
    }

    match arg.parse::<u32>().ok().filter(|n| (1..=20).contains(n)) {
        Some(limit) => {
            warnings.set_threshold(ctx.chat_id(), limit)?;
            ctx.reply(format!("✅ Warning limit set to {}.", limit)).await
        }
        None => ctx.reply(ctx.usage("<1-20>")).await,
    }
}

async fn tagall(ctx: CommandContext) -> anyhow::Result<()> {
    if !require_manager(&ctx).await? {
        return Ok(());
    }
    let metadata = ctx
        .services
        .permissions
        .group_metadata(ctx.conn.as_ref(), ctx.chat_id())
        .await?;
    let members = metadata.participant_ids();
    let lines: Vec<String> = members
        .iter()
        .map(|m| format!("• {}", jid::mention_tag(m)))
        .collect();

    let header = if ctx.args_raw().is_empty() {
        "📢 *Attention everyone*".to_string()
    } else {
        format!("📢 {}", ctx.args_raw())
    };
    ctx.send_mentions(format!("{}\n\n{}", header, lines.join("\n")), members)
        .await
}

/// Text from the quoted message, if it carries any.
fn quoted_text(ctx: &CommandContext) -> Option<String> {
    ctx.event
        .quoted
        .as_ref()
        .and_then(|q| q.content.as_ref())
        .and_then(|c| c.plain_text())
        .map(str::to_string)
        .filter(|t| !t.trim().is_empty())
}

async fn broadcast_hidden(ctx: &CommandContext, text: String) -> anyhow::Result<()> {
    let metadata = ctx
        .services
        .permissions
        .group_metadata(ctx.conn.as_ref(), ctx.chat_id())
        .await?;
    ctx.send_mentions(text, metadata.participant_ids()).await
}

async fn hidetag(ctx: CommandContext) -> anyhow::Result<()> {
    if !require_manager(&ctx).await? {
        return Ok(());
    }
    let text = Some(ctx.args_raw().to_string())
        .filter(|t| !t.is_empty())
        .or_else(|| quoted_text(&ctx));
    match text {
        Some(text) => broadcast_hidden(&ctx, text).await,
        None => ctx.reply(ctx.usage("<message>")).await,
    }
}

async fn tag(ctx: CommandContext) -> anyhow::Result<()> {
    if !require_manager(&ctx).await? {
        return Ok(());
    }
    let text = quoted_text(&ctx)
        .or_else(|| Some(ctx.args_raw().to_string()).filter(|t| !t.is_empty()));
    match text {
        Some(text) => broadcast_hidden(&ctx, text).await,
        None => ctx.reply("Please reply to a message or add text to tag everyone.").await,
    }
}
