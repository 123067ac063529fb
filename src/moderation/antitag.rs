use std::collections::HashSet;

use async_trait::async_trait;
use tracing::debug;

use super::enforce::{enforce, is_exempt};
use super::{ModerationCheck, ModerationContext, Verdict};
use crate::protocol::jid;

/// Smallest mention count that may count as "half the group".
const MIN_GROUP_SHARE_MENTIONS: usize = 3;

/// Mass mentions: at least `sensitivity` users, or at least half the group.
pub struct TagCheck {
    sensitivity: usize,
}

impl TagCheck {
    pub fn new(sensitivity: usize) -> Self {
        Self {
            sensitivity: sensitivity.max(1),
        }
    }

    fn mention_count(ctx: &ModerationContext<'_>) -> usize {
        let quoted = ctx
            .event
            .quoted
            .as_ref()
            .and_then(|q| q.content.as_ref())
            .and_then(|c| c.context_info())
            .map(|c| c.mentioned_jid.as_slice())
            .unwrap_or_default();

        ctx.event
            .mentioned
            .iter()
            .chain(quoted)
            .map(|m| jid::bare_number(m))
            .collect::<HashSet<_>>()
            .len()
    }

    async fn is_mass_mention(&self, ctx: &ModerationContext<'_>, count: usize) -> bool {
        if count >= self.sensitivity {
            return true;
        }
        if count < MIN_GROUP_SHARE_MENTIONS {
            return false;
        }

        match ctx
            .services
            .permissions
            .group_metadata(ctx.conn.as_ref(), &ctx.event.chat_id)
            .await
        {
            Ok(metadata) => count * 2 >= metadata.participants.len(),
            Err(e) => {
                debug!("antitag: no metadata for {}: {}", ctx.event.chat_id, e);
                false
            }
        }
    }
}

#[async_trait]
impl ModerationCheck for TagCheck {
    fn name(&self) -> &'static str {
        "antitag"
    }

    async fn check(&self, ctx: &ModerationContext<'_>) -> anyhow::Result<Verdict> {
        let Some(toggle) = ctx.services.stores.antitag.active(&ctx.event.chat_id)? else {
            return Ok(Verdict::Clean);
        };

        let count = Self::mention_count(ctx);
        if count == 0 || !self.is_mass_mention(ctx, count).await {
            return Ok(Verdict::Clean);
        }
        if is_exempt(ctx).await {
            return Ok(Verdict::Exempt);
        }

        enforce(ctx, toggle, "mass tagging").await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::normalizer::{InboundEvent, normalize};
    use crate::protocol::{Connection, ContextInfo, ExtendedText, MessageContent};
    use crate::store::{ModerationAction, ModerationToggle};
    use crate::testing::{GROUP, MEMBER, MockConnection, message, test_services};

    fn mentioning(count: usize) -> InboundEvent {
        let mut msg = message(GROUP, MEMBER, "");
        msg.content = MessageContent {
            extended_text_message: Some(ExtendedText {
                text: Some("hey all".into()),
                context_info: Some(ContextInfo {
                    mentioned_jid: (0..count).map(|i| format!("{}@s.whatsapp.net", 5000 + i)).collect(),
                    ..Default::default()
                }),
            }),
            ..Default::default()
        };
        normalize(msg, &['.'])
    }

    async fn verdict(event: InboundEvent, members: usize, sensitivity: usize) -> Verdict {
        let dir = tempfile::tempdir().unwrap();
        let services = test_services(dir.path());
        services
            .stores
            .antitag
            .set(GROUP, ModerationToggle::enabled(ModerationAction::Delete))
            .unwrap();

        let ids: Vec<String> = (0..members).map(|i| format!("{}@s.whatsapp.net", 7000 + i)).collect();
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let mock = MockConnection::new().with_group(GROUP, &[], &refs, true);
        let conn: Arc<dyn Connection> = mock;
        let perms = services.permissions.snapshot(conn.clone(), &event);
        let ctx = ModerationContext {
            conn: &conn,
            services: &services,
            event: &event,
            perms: &perms,
        };
        TagCheck::new(sensitivity).check(&ctx).await.unwrap()
    }

    #[tokio::test]
    async fn test_sensitivity_threshold() {
        assert_eq!(
            verdict(mentioning(10), 200, 10).await,
            Verdict::Acted(ModerationAction::Delete)
        );
        assert_eq!(verdict(mentioning(9), 200, 10).await, Verdict::Clean);
    }

    #[tokio::test]
    async fn test_half_of_small_group() {
        // 5 members + bot = 6 participants; 3 mentions is half.
        assert_eq!(
            verdict(mentioning(3), 5, 10).await,
            Verdict::Acted(ModerationAction::Delete)
        );
        assert_eq!(verdict(mentioning(2), 3, 10).await, Verdict::Clean);
    }
}
