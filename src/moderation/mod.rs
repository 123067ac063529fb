//! Cross-cutting moderation checks.
//!
//! Every group message that is not self-sent runs through the pipeline
//! before command routing, command or not. Checks are independent: each
//! reads its own toggle, a failing check is logged and the next one still
//! runs.
//!
//! Order: bad-word, link, tag, status-mention, antibot.

mod antibot;
mod antilink;
mod antitag;
mod badword;
mod enforce;
mod status_mention;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info};

use crate::bot::Services;
use crate::normalizer::InboundEvent;
use crate::permissions::PermissionSnapshot;
use crate::protocol::Connection;
use crate::store::ModerationAction;

pub use antibot::{AntibotCheck, looks_like_bot, screen_joiners};
pub use antilink::{LinkCheck, contains_link};
pub use antitag::TagCheck;
pub use badword::BadWordCheck;
pub use status_mention::{StatusMentionCheck, is_status_mention};

/// What a check did with the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Nothing to do (feature off or content fine).
    Clean,
    /// Content matched but the sender is exempt.
    Exempt,
    /// Content matched and the configured action ran.
    Acted(ModerationAction),
    /// Content matched but the bot lacks admin rights to act.
    Powerless,
}

/// Everything a check may look at.
pub struct ModerationContext<'a> {
    pub conn: &'a Arc<dyn Connection>,
    pub services: &'a Services,
    pub event: &'a InboundEvent,
    pub perms: &'a PermissionSnapshot,
}

#[async_trait]
pub trait ModerationCheck: Send + Sync {
    fn name(&self) -> &'static str;

    async fn check(&self, ctx: &ModerationContext<'_>) -> anyhow::Result<Verdict>;
}

/// Ordered list of checks.
pub struct ModerationPipeline {
    checks: Vec<Box<dyn ModerationCheck>>,
}

impl ModerationPipeline {
    pub fn new(checks: Vec<Box<dyn ModerationCheck>>) -> Self {
        Self { checks }
    }

    /// The built-in checks in their fixed order.
    pub fn standard(bad_words: &[String], tag_sensitivity: usize) -> anyhow::Result<Self> {
        Ok(Self::new(vec![
            Box::new(BadWordCheck::new(bad_words)?),
            Box::new(LinkCheck),
            Box::new(TagCheck::new(tag_sensitivity)),
            Box::new(StatusMentionCheck),
            Box::new(AntibotCheck),
        ]))
    }

    /// Run every check; returns each check's verdict in order.
    pub async fn run(&self, ctx: &ModerationContext<'_>) -> Vec<(&'static str, Verdict)> {
        let mut verdicts = Vec::with_capacity(self.checks.len());

        for check in &self.checks {
            let verdict = match check.check(ctx).await {
                Ok(verdict) => verdict,
                Err(e) => {
                    error!(
                        "Moderation check '{}' failed in {}: {:#}",
                        check.name(),
                        ctx.event.chat_id,
                        e
                    );
                    Verdict::Clean
                }
            };

            match verdict {
                Verdict::Acted(action) => info!(
                    "🛡️ {} acted ({}) on {} in {}",
                    check.name(),
                    action,
                    ctx.event.sender_id,
                    ctx.event.chat_id
                ),
                Verdict::Powerless => debug!(
                    "{} matched in {} but bot is not admin",
                    check.name(),
                    ctx.event.chat_id
                ),
                Verdict::Exempt | Verdict::Clean => {}
            }

            verdicts.push((check.name(), verdict));
        }

        verdicts
    }
}
