//! Bot-like account removal.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::{ModerationCheck, ModerationContext, Verdict};
use crate::bot::Services;
use crate::protocol::{Connection, ParticipantAction, jid};
use crate::store::ModerationAction;

const BOT_PATTERNS: &[&str] = &[
    " bot ",
    "bot",
    "whatsappbot",
    "wa_bot",
    "auto",
    "automation",
    "autobot",
    "bot_",
];

/// Heuristic match on id and display name together.
pub fn looks_like_bot(id: &str, name: Option<&str>) -> bool {
    let combined = format!(
        "{} {}",
        id.to_lowercase(),
        name.unwrap_or_default().to_lowercase()
    );
    BOT_PATTERNS.iter().any(|p| combined.contains(p))
}

fn notice_key(chat_id: &str, user: &str) -> String {
    format!("antibot:{}:{}", chat_id, jid::bare_number(user))
}

async fn post_notice(conn: &dyn Connection, chat_id: &str, user: &str, removed: bool) {
    let tag = jid::mention_tag(user);
    let text = if removed {
        format!("Antibot: removed bot-like sender {tag}")
    } else {
        format!(
            "Antibot: detected bot-like sender {tag}, but I am not an admin and cannot remove them."
        )
    };
    if let Err(e) = conn.send_mentions(chat_id, &text, vec![user.to_string()]).await {
        warn!("Antibot notice failed in {}: {}", chat_id, e);
    }
}

pub struct AntibotCheck;

#[async_trait]
impl ModerationCheck for AntibotCheck {
    fn name(&self) -> &'static str {
        "antibot"
    }

    async fn check(&self, ctx: &ModerationContext<'_>) -> anyhow::Result<Verdict> {
        let chat_id = &ctx.event.chat_id;
        if ctx.services.stores.antibot.active(chat_id)?.is_none() {
            return Ok(Verdict::Clean);
        }
        let sender = &ctx.event.sender_id;
        if !looks_like_bot(sender, ctx.event.push_name.as_deref()) {
            return Ok(Verdict::Clean);
        }

        let admin = ctx.perms.admin().await;
        if admin.is_sender_admin || ctx.perms.is_owner_or_sudo() {
            return Ok(Verdict::Exempt);
        }

        let first_notice = ctx.services.notices.claim(notice_key(chat_id, sender));

        if !admin.is_bot_admin {
            if first_notice {
                post_notice(ctx.conn.as_ref(), chat_id, sender, false).await;
            }
            return Ok(Verdict::Powerless);
        }

        ctx.conn
            .group_participants_update(chat_id, std::slice::from_ref(sender), ParticipantAction::Remove)
            .await?;
        if first_notice {
            post_notice(ctx.conn.as_ref(), chat_id, sender, true).await;
        } else {
            debug!("Antibot notice for {} suppressed (window)", sender);
        }

        Ok(Verdict::Acted(ModerationAction::Kick))
    }
}

/// Run the antibot heuristic over users joining a group.
///
/// Returns the users that were removed.
pub async fn screen_joiners(
    services: &Services,
    conn: &dyn Connection,
    chat_id: &str,
    joiners: &[String],
) -> anyhow::Result<Vec<String>> {
    if services.stores.antibot.active(chat_id)?.is_none() {
        return Ok(Vec::new());
    }

    // Fresh metadata: the joiners are not in the cached copy yet.
    services.permissions.invalidate(chat_id);
    let metadata = services.permissions.group_metadata(conn, chat_id).await?;

    let suspects: Vec<&String> = joiners
        .iter()
        .filter(|j| {
            let name = metadata.participant(j).and_then(|p| p.notify.as_deref());
            looks_like_bot(j, name)
        })
        .collect();
    if suspects.is_empty() {
        return Ok(Vec::new());
    }
    let bot_admin = metadata.is_admin(&conn.self_id());

    let mut removed = Vec::new();
    for suspect in suspects {
        if metadata.is_admin(suspect) {
            continue;
        }
        let first_notice = services.notices.claim(notice_key(chat_id, suspect));

        if !bot_admin {
            if first_notice {
                post_notice(conn, chat_id, suspect, false).await;
            }
            continue;
        }

        match conn
            .group_participants_update(chat_id, std::slice::from_ref(suspect), ParticipantAction::Remove)
            .await
        {
            Ok(()) => {
                info!("🤖 Antibot removed joiner {} from {}", suspect, chat_id);
                if first_notice {
                    post_notice(conn, chat_id, suspect, true).await;
                }
                removed.push(suspect.clone());
            }
            Err(e) => warn!("Antibot removal of {} failed: {}", suspect, e),
        }
    }

    Ok(removed)
}
