//! The full command table.
//!
//! Built-in handlers live in [`super::builtin`]. Everything else the bot
//! answers to (media, downloads, AI, games, text effects) is registered with
//! its tier and aliases and bound to [`Unavailable`], so permission gates,
//! reactions and typing behave the same for every command.

use std::sync::Arc;

use super::builtin::{self, general};
use super::{CommandRegistry, CommandSpec, Handler, RegistryError, Tier, Unavailable};

/// One command implemented outside this crate.
struct External {
    name: &'static str,
    aliases: &'static [&'static str],
    tier: Tier,
    group_only: bool,
    typing: bool,
}

const fn public(name: &'static str, aliases: &'static [&'static str]) -> External {
    External {
        name,
        aliases,
        tier: Tier::Public,
        group_only: false,
        typing: false,
    }
}

const fn typing(name: &'static str, aliases: &'static [&'static str]) -> External {
    External {
        typing: true,
        ..public(name, aliases)
    }
}

const fn admin(name: &'static str) -> External {
    External {
        tier: Tier::Admin {
            sender_admin: false,
        },
        group_only: true,
        ..public(name, &[])
    }
}

const fn owner(name: &'static str, aliases: &'static [&'static str]) -> External {
    External {
        tier: Tier::Owner,
        ..public(name, aliases)
    }
}

const EXTERNAL: &[External] = &[
    // group admin
    admin("tagnotadmin"),
    admin("setgdesc"),
    admin("setgname"),
    admin("setgpp"),
    // owner
    owner("autostatus", &[]),
    owner("cleartmp", &[]),
    owner("setpp", &[]),
    owner("clearsession", &["clearsesi"]),
    owner("setaikey", &[]),
    owner("clearaikey", &[]),
    owner("testaikey", &[]),
    External {
        typing: true,
        ..owner("autoread", &[])
    },
    // stickers and images
    typing("sticker", &["s"]),
    typing("simage", &[]),
    typing("crop", &[]),
    typing("pies", &[]),
    typing("china", &[]),
    typing("indonesia", &[]),
    typing("japan", &[]),
    typing("korea", &[]),
    typing("hijab", &[]),
    public("take", &["steal"]),
    public("attp", &[]),
    public("emojimix", &["emix"]),
    public("tg", &["stickertelegram", "tgsticker", "telesticker"]),
    public("removebg", &["rmbg", "nobg"]),
    public("remini", &["enhance", "upscale"]),
    public("blur", &[]),
    public("tourl", &["url"]),
    public("vv", &[]),
    // downloads
    public("play", &["mp3", "ytmp3", "song"]),
    public("video", &["ytmp4"]),
    public("youtube", &["yt"]),
    public("spotify", &[]),
    public("music", &[]),
    public("instagram", &["insta", "ig"]),
    public("igs", &[]),
    public("igsc", &[]),
    public("fb", &["facebook"]),
    public("tiktok", &["tt"]),
    public("lyrics", &[]),
    // AI
    public("ai", &[]),
    public("gpt", &["gemini"]),
    public("imagine", &["flux", "dalle"]),
    public("sora", &[]),
    public("chatbot", &[]),
    public("chat", &[]),
    public("tts", &[]),
    public("translate", &["trt"]),
    // group tools
    public("add", &[]),
    public("delete", &["del"]),
    public("clear", &[]),
    public("welcome", &[]),
    public("goodbye", &[]),
    public("groupinfo", &["infogp", "infogrupo"]),
    public("resetlink", &["revoke", "anularlink"]),
    public("staff", &["admins", "listadmin"]),
    public("topmembers", &[]),
    public("mention", &[]),
    public("setmention", &[]),
    public("settings", &[]),
    public("getpp", &["getprofile"]),
    public("pair", &[]),
    typing("update", &[]),
    // games
    public("tictactoe", &["ttt"]),
    public("surrender", &[]),
    public("hangman", &[]),
    public("guess", &[]),
    public("trivia", &[]),
    public("answer", &[]),
    public("truth", &[]),
    public("dare", &[]),
    // fun and text
    public("8ball", &[]),
    public("meme", &[]),
    public("joke", &[]),
    public("quote", &[]),
    public("fact", &[]),
    public("news", &[]),
    public("weather", &[]),
    public("compliment", &[]),
    public("insult", &[]),
    public("flirt", &[]),
    public("ship", &[]),
    public("simp", &[]),
    public("character", &[]),
    public("goodnight", &["lovenight", "gn"]),
    public("shayari", &["shayri"]),
    public("roseday", &[]),
    public("ss", &["ssweb", "screenshot"]),
    public("animu", &[]),
    public("animuquote", &[]),
    public("hug", &[]),
    public("kiss", &[]),
    public("pat", &[]),
    public("poke", &[]),
    public("cry", &[]),
    public("wink", &[]),
    public("nom", &[]),
    public("facepalm", &["face-palm"]),
    public("loli", &[]),
    // image effects
    public("heart", &[]),
    public("horny", &[]),
    public("circle", &[]),
    public("lgbt", &[]),
    public("lolice", &[]),
    public("simpcard", &[]),
    public("tonikawa", &[]),
    public("stupid", &["itssostupid", "its-so-stupid", "iss"]),
    public("namecard", &[]),
    public("oogway", &[]),
    public("oogway2", &[]),
    public("tweet", &[]),
    public("ytcomment", &[]),
    public("comrade", &[]),
    public("gay", &[]),
    public("glass", &[]),
    public("jail", &[]),
    public("passed", &[]),
    public("triggered", &[]),
    public("wasted", &["waste"]),
    // text makers
    public("metallic", &[]),
    public("ice", &[]),
    public("snow", &[]),
    public("impressive", &[]),
    public("matrix", &[]),
    public("light", &[]),
    public("neon", &[]),
    public("devil", &[]),
    public("purple", &[]),
    public("thunder", &[]),
    public("leaves", &[]),
    public("1917", &[]),
    public("arena", &[]),
    public("hacker", &[]),
    public("sand", &[]),
    public("blackpink", &[]),
    public("glitch", &[]),
    public("fire", &[]),
    public("move", &[]),
];

fn external_spec(entry: &External, handler: Arc<dyn Handler>) -> CommandSpec {
    let mut spec = CommandSpec::new(entry.name, handler)
        .aliases(entry.aliases)
        .word();
    spec.tier = entry.tier;
    if entry.group_only {
        spec = spec.group_only();
    }
    if entry.typing {
        spec = spec.typing();
    }
    spec
}

/// Every command the bot answers to. `help` goes last so its menu lists
/// the rest.
pub fn build_registry(bot_name: &str) -> Result<CommandRegistry, RegistryError> {
    let mut registry = CommandRegistry::new();
    builtin::register(&mut registry)?;

    let unavailable: Arc<dyn Handler> = Arc::new(Unavailable);
    for entry in EXTERNAL {
        registry.register(external_spec(entry, Arc::clone(&unavailable)))?;
    }

    let menu = general::menu_text(bot_name, &registry);
    registry.register(
        CommandSpec::new("help", general::help_handler(menu))
            .aliases(&["menu", "list"])
            .typing()
            .describe("Show this menu"),
    )?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Scope;
    use crate::normalizer::parse_command;

    fn lookup<'a>(registry: &'a CommandRegistry, text: &str) -> Option<&'a CommandSpec> {
        registry.lookup(&parse_command(text, text, &['.']))
    }

    #[test]
    fn test_table_has_no_duplicates() {
        let registry = build_registry("Warden").unwrap();
        assert!(registry.len() > 150);
    }

    #[test]
    fn test_tiers_and_aliases() {
        let registry = build_registry("Warden").unwrap();

        let mute = registry.get("mute").unwrap();
        assert_eq!(mute.tier, Tier::Admin { sender_admin: true });
        assert_eq!(mute.scope, Scope::GroupOnly);

        assert_eq!(registry.get("kick").unwrap().tier, Tier::Admin { sender_admin: false });
        assert_eq!(registry.get("clearsesi").unwrap().name, "clearsession");
        assert_eq!(registry.get("areact").unwrap().tier, Tier::Owner);
        assert_eq!(registry.get("ping").unwrap().tier, Tier::Public);
        assert!(registry.get("s").unwrap().typing);
        assert!(registry.get("menu").unwrap().typing);
        assert!(!registry.get("ping").unwrap().typing);
    }

    #[test]
    fn test_external_commands_word_match() {
        let registry = build_registry("Warden").unwrap();
        assert_eq!(lookup(&registry, ".tts,hello").map(|s| s.name), Some("tts"));
        assert_eq!(lookup(&registry, ".ytmp3 some song").map(|s| s.name), Some("play"));
        assert!(lookup(&registry, ".nosuchcommand").is_none());
    }

    #[test]
    fn test_menu_lists_builtins() {
        let registry = build_registry("Warden").unwrap();
        let menu = general::menu_text("Warden", &registry);
        assert!(menu.contains(".mute"));
        assert!(menu.contains(".sudo"));
        assert!(menu.starts_with("📖 *Warden Menu*"));
    }
}
