//! Shared enforcement for toggle-driven checks.

use anyhow::Context;

use super::{ModerationContext, Verdict};
use crate::protocol::{BlockAction, ParticipantAction, jid};
use crate::store::{ModerationAction, ModerationToggle, WarnOutcome};

/// Owners, sudo users and group admins are never moderated.
pub(super) async fn is_exempt(ctx: &ModerationContext<'_>) -> bool {
    ctx.perms.is_owner_or_sudo() || ctx.perms.is_sender_admin().await
}

/// Delete the message, then apply the toggle's follow-up action.
pub(super) async fn enforce(
    ctx: &ModerationContext<'_>,
    toggle: ModerationToggle,
    reason: &str,
) -> anyhow::Result<Verdict> {
    if !ctx.perms.is_bot_admin().await {
        return Ok(Verdict::Powerless);
    }

    let event = ctx.event;
    let conn = ctx.conn;
    let sender = event.sender_id.clone();
    let tag = jid::mention_tag(&sender);

    conn.delete_message(&event.message_ref())
        .await
        .context("delete offending message")?;

    let notice = match toggle.action {
        ModerationAction::Delete => format!("⚠️ {tag}, {reason} is not allowed here."),
        ModerationAction::Warn => {
            let outcome = ctx
                .services
                .stores
                .warnings
                .record_violation(&event.chat_id, &sender)?;
            match outcome {
                WarnOutcome::Warned { count, threshold } => {
                    format!("⚠️ {tag} warning {count}/{threshold}: {reason} is not allowed here.")
                }
                WarnOutcome::LimitReached { threshold } => {
                    conn.group_participants_update(
                        &event.chat_id,
                        std::slice::from_ref(&sender),
                        ParticipantAction::Remove,
                    )
                    .await
                    .context("kick after warning limit")?;
                    format!("🚫 {tag} was removed after {threshold} warnings.")
                }
            }
        }
        ModerationAction::Kick => {
            conn.group_participants_update(
                &event.chat_id,
                std::slice::from_ref(&sender),
                ParticipantAction::Remove,
            )
            .await
            .context("kick offender")?;
            format!("🚫 {tag} was removed: {reason} is not allowed here.")
        }
        ModerationAction::Block => {
            conn.update_block_status(&sender, BlockAction::Block)
                .await
                .context("block offender")?;
            format!("🚫 {tag} was blocked: {reason} is not allowed here.")
        }
    };

    conn.send_mentions(&event.chat_id, &notice, vec![sender])
        .await
        .context("send moderation notice")?;

    Ok(Verdict::Acted(toggle.action))
}
