//! Handler trait and the per-dispatch context handed to it.

use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;

use crate::bot::Services;
use crate::normalizer::InboundEvent;
use crate::permissions::PermissionSnapshot;
use crate::protocol::{Connection, OutgoingMessage, SendOptions};

/// Everything a handler needs for one command.
#[derive(Clone)]
pub struct CommandContext {
    pub conn: Arc<dyn Connection>,
    pub services: Arc<Services>,
    pub event: Arc<InboundEvent>,
    pub perms: Arc<PermissionSnapshot>,
    /// Canonical name of the matched command.
    pub name: &'static str,
}

impl CommandContext {
    pub fn chat_id(&self) -> &str {
        &self.event.chat_id
    }

    pub fn sender_id(&self) -> &str {
        &self.event.sender_id
    }

    pub fn is_group(&self) -> bool {
        self.event.is_group
    }

    pub fn args(&self) -> &[String] {
        &self.event.command.args
    }

    pub fn arg_lower(&self, index: usize) -> Option<String> {
        self.event.command.arg_lower(index)
    }

    /// Arguments in their original casing.
    pub fn args_raw(&self) -> &str {
        &self.event.command.args_raw
    }

    /// Prefix the user typed, for usage hints.
    pub fn prefix(&self) -> char {
        self.event.command.prefix.unwrap_or('.')
    }

    /// `Usage: .name <rest>`
    pub fn usage(&self, rest: &str) -> String {
        format!("Usage: {}{} {}", self.prefix(), self.name, rest)
    }

    /// Quoted reply to the command message.
    pub async fn reply(&self, text: impl Into<String>) -> anyhow::Result<()> {
        self.conn
            .send_message(
                self.chat_id(),
                OutgoingMessage::text(text),
                SendOptions::quoting(self.event.message_ref()),
            )
            .await
            .with_context(|| format!("reply to .{}", self.name))
    }

    /// Quoted reply that tags `mentions`.
    pub async fn reply_mentions(
        &self,
        text: impl Into<String>,
        mentions: Vec<String>,
    ) -> anyhow::Result<()> {
        self.conn
            .send_message(
                self.chat_id(),
                OutgoingMessage::text_with_mentions(text, mentions),
                SendOptions::quoting(self.event.message_ref()),
            )
            .await
            .with_context(|| format!("reply to .{}", self.name))
    }

    /// Unquoted message to the chat.
    pub async fn send_mentions(
        &self,
        text: impl Into<String>,
        mentions: Vec<String>,
    ) -> anyhow::Result<()> {
        self.conn
            .send_message(
                self.chat_id(),
                OutgoingMessage::text_with_mentions(text, mentions),
                SendOptions::default(),
            )
            .await
            .with_context(|| format!("send for .{}", self.name))
    }
}

/// A command implementation.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, ctx: CommandContext) -> anyhow::Result<()>;
}

/// Adapts an `async fn(CommandContext) -> anyhow::Result<()>`.
pub struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(CommandContext) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn handle(&self, ctx: CommandContext) -> anyhow::Result<()> {
        (self.0)(ctx).await
    }
}

pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn Handler>
where
    F: Fn(CommandContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(FnHandler(f))
}

/// Bound to commands whose bodies live outside this crate (media, AI, games).
pub struct Unavailable;

#[async_trait]
impl Handler for Unavailable {
    async fn handle(&self, ctx: CommandContext) -> anyhow::Result<()> {
        ctx.reply(format!(
            "❌ {}{} is not available on this deployment.",
            ctx.prefix(),
            ctx.name
        ))
        .await
    }
}
