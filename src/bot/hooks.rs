//! Extension points for behavior that lives outside the dispatch core.
//!
//! The chatbot, mention replies, auto-status viewing and welcome/goodbye
//! messages plug in here. Every hook defaults to a no-op.

use std::sync::Arc;

use async_trait::async_trait;

use crate::normalizer::InboundEvent;
use crate::protocol::{Connection, InboundMessage, ParticipantsUpdate};

#[async_trait]
pub trait EventHooks: Send + Sync {
    /// Group message that was not a recognized command.
    async fn on_group_chat(
        &self,
        _conn: &Arc<dyn Connection>,
        _event: &Arc<InboundEvent>,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    /// Message posted to `status@broadcast`.
    async fn on_status(
        &self,
        _conn: &Arc<dyn Connection>,
        _message: &InboundMessage,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    /// A message was deleted for everyone, after the antidelete report.
    async fn on_revocation(
        &self,
        _conn: &Arc<dyn Connection>,
        _message: &InboundMessage,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    /// Participants changed, after antibot screening.
    async fn on_participants(
        &self,
        _conn: &Arc<dyn Connection>,
        _update: &ParticipantsUpdate,
    ) -> anyhow::Result<()> {
        Ok(())
    }
}

pub struct NoopHooks;

impl EventHooks for NoopHooks {}
