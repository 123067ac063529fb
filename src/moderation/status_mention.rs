use async_trait::async_trait;

use super::enforce::{enforce, is_exempt};
use super::{ModerationCheck, ModerationContext, Verdict};
use crate::normalizer::InboundEvent;
use crate::protocol::{MessageKind, jid};

/// A group-status mention, or a status reply that drags group members in.
pub fn is_status_mention(event: &InboundEvent) -> bool {
    if event.kind == MessageKind::StatusMention {
        return true;
    }

    let from_status = event
        .quoted
        .as_ref()
        .and_then(|q| q.remote_chat.as_deref())
        .is_some_and(jid::is_status_broadcast);

    from_status && !event.mentioned.is_empty()
}

pub struct StatusMentionCheck;

#[async_trait]
impl ModerationCheck for StatusMentionCheck {
    fn name(&self) -> &'static str {
        "antistatus"
    }

    async fn check(&self, ctx: &ModerationContext<'_>) -> anyhow::Result<Verdict> {
        let Some(toggle) = ctx.services.stores.antistatus.active(&ctx.event.chat_id)? else {
            return Ok(Verdict::Clean);
        };
        if !is_status_mention(ctx.event) {
            return Ok(Verdict::Clean);
        }
        if is_exempt(ctx).await {
            return Ok(Verdict::Exempt);
        }

        enforce(ctx, toggle, "status mentions").await
    }
}
