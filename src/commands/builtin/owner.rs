//! Owner-only switches and lists.

use crate::commands::{CommandContext, CommandRegistry, CommandSpec, RegistryError, handler_fn};
use crate::config::parse_prefixes;
use crate::protocol::jid;
use crate::store::{BotState, Flag, ModeSetting};
use crate::utils::{parse_toggle, resolve_target};

pub fn register(registry: &mut CommandRegistry) -> Result<(), RegistryError> {
    registry.register(
        CommandSpec::new("mode", handler_fn(mode))
            .owner()
            .describe("Public or private mode"),
    )?;
    registry.register(
        CommandSpec::new("bot", handler_fn(bot_power))
            .owner()
            .describe("Turn the bot on or off"),
    )?;
    registry.register(
        CommandSpec::new("mirrorpresence", handler_fn(mirror_presence))
            .owner()
            .describe("Appear online while the owner is online"),
    )?;
    registry.register(
        CommandSpec::new("anticall", handler_fn(anticall))
            .owner()
            .describe("Reject and block callers"),
    )?;
    registry.register(
        CommandSpec::new("antidelete", handler_fn(antidelete))
            .owner()
            .describe("Report deleted messages to the owner"),
    )?;
    registry.register(
        CommandSpec::new("pmblocker", handler_fn(pmblocker))
            .owner()
            .typing()
            .describe("Block direct messages"),
    )?;
    registry.register(
        CommandSpec::new("autotyping", handler_fn(autotyping))
            .owner()
            .typing()
            .describe("Show typing while working"),
    )?;
    registry.register(
        CommandSpec::new("autoreact", handler_fn(autoreact))
            .aliases(&["areact", "autoreaction"])
            .owner()
            .describe("React to every command"),
    )?;
    registry.register(
        CommandSpec::new("prefixes", handler_fn(prefixes))
            .aliases(&["setprefixes"])
            .owner()
            .describe("Show or change command prefixes"),
    )?;
    registry.register(
        CommandSpec::new("sudo", handler_fn(sudo))
            .owner()
            .describe("Manage sudo users"),
    )?;
    Ok(())
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "ON" } else { "OFF" }
}

async fn mode(ctx: CommandContext) -> anyhow::Result<()> {
    let store = &ctx.services.stores.mode;
    let is_public = match ctx.arg_lower(0).as_deref() {
        None | Some("status") => {
            let current = if store.get()?.is_public { "public" } else { "private" };
            return ctx
                .reply(format!(
                    "🌐 Current mode: *{}*\n{}",
                    current,
                    ctx.usage("public|private")
                ))
                .await;
        }
        Some("public") => true,
        Some("private") => false,
        Some(_) => return ctx.reply(ctx.usage("public|private")).await,
    };

    store.set(ModeSetting { is_public })?;
    let text = if is_public {
        "✅ Bot is now in *public* mode. Everyone can use commands."
    } else {
        "✅ Bot is now in *private* mode. Only the owner and sudo users can use commands."
    };
    ctx.reply(text).await
}

async fn bot_power(ctx: CommandContext) -> anyhow::Result<()> {
    let stores = &ctx.services.stores;
    match ctx.arg_lower(0).as_deref() {
        Some("mirror") => toggle_mirror(&ctx, ctx.arg_lower(1)).await,
        None | Some("status") => {
            ctx.reply(format!(
                "⚡ Bot power state: *{}*",
                on_off(ctx.services.bot_is_on())
            ))
            .await
        }
        Some("on") => {
            stores.bot_state.set(BotState { is_on: true })?;
            ctx.reply("✅ Bot turned *ON*. Responding to commands now.")
                .await
        }
        Some("off") => {
            let force = ctx
                .args()
                .iter()
                .skip(1)
                .any(|a| matches!(a.to_lowercase().as_str(), "--force" | "force"));
            if stores.owner_presence.get()?.is_online && !force {
                return ctx
                    .reply(format!(
                        "⚠️ Cannot turn bot *OFF* while the owner is online. Use `{}bot off --force` to override.",
                        ctx.prefix()
                    ))
                    .await;
            }
            stores.bot_state.set(BotState { is_on: false })?;
            ctx.reply("✅ Bot turned *OFF*. Only owner can turn it back on.")
                .await
        }
        Some(_) => ctx.reply(ctx.usage("on|off|status|mirror")).await,
    }
}

async fn toggle_mirror(ctx: &CommandContext, arg: Option<String>) -> anyhow::Result<()> {
    let store = &ctx.services.stores.mirror_presence;
    match arg.as_deref() {
        None | Some("status") => {
            let mut text = if ctx.services.mirror_enabled() {
                "✅ Mirror owner presence: *ENABLED*".to_string()
            } else {
                "❌ Mirror owner presence: *DISABLED*".to_string()
            };
            if ctx.services.presence.is_running() {
                text.push_str("\n💓 Heartbeat: *running*");
            }
            ctx.reply(text).await
        }
        Some(arg) => match parse_toggle(arg) {
            Some(true) => {
                store.set(Flag { enabled: true })?;
                ctx.reply("✅ Mirror owner presence *ENABLED*. The bot will appear online when you are online.")
                    .await
            }
            Some(false) => {
                store.set(Flag { enabled: false })?;
                ctx.services.presence.stop();
                ctx.reply("✅ Mirror owner presence *DISABLED*.").await
            }
            None => ctx.reply(ctx.usage("on|off|status")).await,
        },
    }
}

async fn mirror_presence(ctx: CommandContext) -> anyhow::Result<()> {
    toggle_mirror(&ctx, ctx.arg_lower(0)).await
}

/// Shared `on|off|status` handling for a plain flag.
async fn flag_command(
    ctx: &CommandContext,
    label: &str,
    store: &crate::store::SettingStore<Flag>,
) -> anyhow::Result<()> {
    match ctx.arg_lower(0).as_deref() {
        None | Some("status") => {
            ctx.reply(format!("{} is *{}*.", label, on_off(store.get()?.enabled)))
                .await
        }
        Some(arg) => match parse_toggle(arg) {
            Some(enabled) => {
                store.set(Flag { enabled })?;
                ctx.reply(format!("✅ {} turned *{}*.", label, on_off(enabled)))
                    .await
            }
            None => ctx.reply(ctx.usage("on|off|status")).await,
        },
    }
}

async fn anticall(ctx: CommandContext) -> anyhow::Result<()> {
    flag_command(&ctx, "📵 Anticall", &ctx.services.stores.anticall).await
}

async fn antidelete(ctx: CommandContext) -> anyhow::Result<()> {
    flag_command(&ctx, "🗑️ Antidelete", &ctx.services.stores.antidelete).await
}

async fn autotyping(ctx: CommandContext) -> anyhow::Result<()> {
    flag_command(&ctx, "⌨️ Auto-typing", &ctx.services.stores.autotyping).await
}

async fn pmblocker(ctx: CommandContext) -> anyhow::Result<()> {
    let store = &ctx.services.stores.pmblocker;
    let usage = ctx.usage("on|off|status|setmsg <text>");

    match ctx.arg_lower(0).as_deref() {
        None | Some("status") => {
            let setting = store.get()?;
            ctx.reply(format!(
                "🚫 PM blocker is *{}*.\nMessage: {}\n\n{}",
                on_off(setting.enabled),
                setting.message,
                usage
            ))
            .await
        }
        Some("setmsg") => {
            let message = ctx
                .args_raw()
                .split_once(char::is_whitespace)
                .map(|(_, rest)| rest.trim())
                .unwrap_or("");
            if message.is_empty() {
                return ctx.reply(usage).await;
            }
            let message = message.to_string();
            store.update(|s| s.message = message)?;
            ctx.reply("✅ PM blocker message updated.").await
        }
        Some(arg) => match parse_toggle(arg) {
            Some(enabled) => {
                store.update(|s| s.enabled = enabled)?;
                ctx.reply(format!("✅ PM blocker turned *{}*.", on_off(enabled)))
                    .await
            }
            None => ctx.reply(usage).await,
        },
    }
}

async fn autoreact(ctx: CommandContext) -> anyhow::Result<()> {
    let store = &ctx.services.stores.autoreact;
    match ctx.arg_lower(0).as_deref() {
        None | Some("status") => {
            let setting = store.get()?;
            ctx.reply(format!(
                "{} Auto-react is *{}*.\n{}",
                setting.emoji,
                on_off(setting.enabled),
                ctx.usage("on|off|status|emoji <emoji>")
            ))
            .await
        }
        Some("emoji") => {
            let Some(emoji) = ctx.args().get(1).cloned() else {
                return ctx.reply(ctx.usage("emoji <emoji>")).await;
            };
            store.update(|s| s.emoji = emoji.clone())?;
            ctx.reply(format!("✅ Auto-react emoji set to {}.", emoji))
                .await
        }
        Some(arg) => match parse_toggle(arg) {
            Some(enabled) => {
                store.update(|s| s.enabled = enabled)?;
                ctx.reply(format!("✅ Auto-react turned *{}*.", on_off(enabled)))
                    .await
            }
            None => ctx.reply(ctx.usage("on|off|status")).await,
        },
    }
}

fn describe_prefixes(prefixes: &[char]) -> String {
    prefixes
        .iter()
        .map(|p| format!("`{}`", p))
        .collect::<Vec<_>>()
        .join(" ")
}

async fn prefixes(ctx: CommandContext) -> anyhow::Result<()> {
    let store = &ctx.services.stores.prefixes;
    let usage = ctx.usage("<chars> | reset");

    if ctx.args().is_empty() {
        return ctx
            .reply(format!(
                "🔣 Current prefixes: {}\n{}",
                describe_prefixes(&store.get()?),
                usage
            ))
            .await;
    }

    if ctx.arg_lower(0).as_deref() == Some("reset") {
        store.reset()?;
        return ctx
            .reply(format!(
                "✅ Prefixes reset to {}.",
                describe_prefixes(&store.get()?)
            ))
            .await;
    }

    match parse_prefixes(ctx.args_raw()) {
        Some(prefixes) => {
            let shown = describe_prefixes(&prefixes);
            store.set(prefixes)?;
            ctx.reply(format!("✅ Prefixes set to {}.", shown)).await
        }
        None => ctx.reply(usage).await,
    }
}

async fn sudo(ctx: CommandContext) -> anyhow::Result<()> {
    let sudo = &ctx.services.stores.sudo;
    let usage = ctx.usage("add|del @user | list");

    match ctx.arg_lower(0).as_deref() {
        Some("list") => {
            let users = sudo.list()?;
            if users.is_empty() {
                return ctx.reply("No sudo users yet.").await;
            }
            let lines: Vec<String> = users
                .iter()
                .enumerate()
                .map(|(i, u)| format!("{}. {}", i + 1, jid::mention_tag(u)))
                .collect();
            ctx.reply_mentions(format!("👮 *Sudo users*\n{}", lines.join("\n")), users)
                .await
        }
        Some(sub @ ("add" | "del" | "remove" | "rm")) => {
            let Some(target) = resolve_target(&ctx.event) else {
                return ctx.reply(usage).await;
            };
            let tag = jid::mention_tag(&target);
            let text = if sub == "add" {
                if ctx.services.permissions.is_bot_owner(&target) {
                    return ctx.reply("The owner already has full access.").await;
                }
                if sudo.add(&target)? {
                    format!("✅ {} is now a sudo user.", tag)
                } else {
                    format!("{} is already a sudo user.", tag)
                }
            } else if sudo.remove(&target)? {
                format!("✅ {} is no longer a sudo user.", tag)
            } else {
                format!("{} is not a sudo user.", tag)
            };
            ctx.reply_mentions(text, vec![target]).await
        }
        _ => ctx.reply(usage).await,
    }
}
