//! Configuration module for Warden.
//!
//! Loads configuration from environment variables (and `.env` via dotenvy).

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};

/// Default command prefixes when neither `PREFIXES` nor `prefixes.json` say otherwise.
pub const DEFAULT_PREFIXES: &[char] = &['.', '!'];

/// Built-in bad-word list used when `BAD_WORDS` is unset.
const DEFAULT_BAD_WORDS: &[&str] = &[
    "fuck", "shit", "bitch", "bastard", "asshole", "dick", "pussy", "cunt", "motherfucker",
];

/// How to reach the protocol client sidecar.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Executable that speaks the JSON-lines bridge protocol on stdio.
    pub command: String,
    pub args: Vec<String>,
    /// Credential directory handed to the sidecar; wiped on logout.
    pub session_dir: PathBuf,
    /// Upper bound for a single request/response round trip.
    pub request_timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            command: "node".to_string(),
            args: vec!["bridge/index.js".to_string()],
            session_dir: PathBuf::from("./session"),
            request_timeout: Duration::from_secs(90),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Display name used in replies.
    pub bot_name: String,

    /// Owner phone numbers (bare, no domain). First entry is the primary owner.
    pub owner_numbers: Vec<String>,

    /// Directory holding every persisted JSON store.
    pub data_dir: PathBuf,

    /// Prefixes used until an owner persists a different set.
    pub default_prefixes: Vec<char>,

    /// Warnings before an automatic kick, unless a chat overrides it.
    pub warn_threshold: u32,

    /// Words the bad-word detector looks for (lowercase).
    pub bad_words: Vec<String>,

    /// Mentions in one message at which antitag fires.
    pub tag_sensitivity: usize,

    /// Mirror presence regardless of `mirrorPresence.json`.
    pub mirror_owner_presence: bool,

    pub bridge: BridgeConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bot_name: "Warden".to_string(),
            owner_numbers: Vec::new(),
            data_dir: PathBuf::from("./data"),
            default_prefixes: DEFAULT_PREFIXES.to_vec(),
            warn_threshold: 3,
            bad_words: DEFAULT_BAD_WORDS.iter().map(|w| w.to_string()).collect(),
            tag_sensitivity: 10,
            mirror_owner_presence: false,
            bridge: BridgeConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// `OWNER_NUMBER` is required; everything else falls back to defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let owner_numbers = parse_owner_numbers(&env::var("OWNER_NUMBER").unwrap_or_default());
        if owner_numbers.is_empty() {
            bail!("OWNER_NUMBER must be set (comma-separated phone numbers)");
        }

        let default_prefixes = match env::var("PREFIXES") {
            Ok(raw) => parse_prefixes(&raw).context("PREFIXES must be single characters")?,
            Err(_) => defaults.default_prefixes,
        };

        let warn_threshold = match env::var("WARN_THRESHOLD") {
            Ok(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .context("WARN_THRESHOLD must be a positive integer")?,
            Err(_) => defaults.warn_threshold,
        };

        let bad_words = env::var("BAD_WORDS")
            .map(|raw| parse_list(&raw))
            .ok()
            .filter(|words| !words.is_empty())
            .unwrap_or(defaults.bad_words);

        let tag_sensitivity = env::var("TAG_SENSITIVITY")
            .ok()
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(defaults.tag_sensitivity);

        let mirror_owner_presence = env::var("MIRROR_OWNER_PRESENCE")
            .map(|v| v.trim() == "1" || v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let bridge = BridgeConfig {
            command: env::var("BRIDGE_COMMAND").unwrap_or(defaults.bridge.command),
            args: env::var("BRIDGE_ARGS")
                .map(|raw| raw.split_whitespace().map(str::to_string).collect())
                .unwrap_or(defaults.bridge.args),
            session_dir: env::var("SESSION_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.bridge.session_dir),
            request_timeout: env::var("BRIDGE_TIMEOUT_SECS")
                .ok()
                .and_then(|raw| raw.trim().parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.bridge.request_timeout),
        };

        Ok(Self {
            bot_name: env::var("BOT_NAME").unwrap_or(defaults.bot_name),
            owner_numbers,
            data_dir: env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            default_prefixes,
            warn_threshold,
            bad_words,
            tag_sensitivity,
            mirror_owner_presence,
            bridge,
        })
    }

    /// Primary owner number, if any.
    pub fn primary_owner(&self) -> Option<&str> {
        self.owner_numbers.first().map(String::as_str)
    }
}

/// Strip `+`, spaces, device suffixes and domains: `+1 555-0100:3@s.whatsapp.net` -> `15550100`.
fn parse_owner_numbers(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|entry| {
            let bare = entry.split(':').next().unwrap_or(entry);
            let bare = bare.split('@').next().unwrap_or(bare);
            bare.chars().filter(char::is_ascii_digit).collect::<String>()
        })
        .filter(|n| !n.is_empty())
        .collect()
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|w| w.trim().to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Accepts `".,!"`, `". !"` or `".!"`.
pub fn parse_prefixes(raw: &str) -> Option<Vec<char>> {
    let mut prefixes = Vec::new();
    for token in raw.split(|c: char| c == ',' || c.is_whitespace()) {
        if token.is_empty() {
            continue;
        }
        for c in token.chars() {
            if c.is_alphanumeric() {
                return None;
            }
            if !prefixes.contains(&c) {
                prefixes.push(c);
            }
        }
    }
    if prefixes.is_empty() { None } else { Some(prefixes) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_owner_numbers() {
        let owners = parse_owner_numbers("+1 555 0100, 447911123456:4@s.whatsapp.net,,");
        assert_eq!(owners, vec!["15550100", "447911123456"]);
    }

    #[test]
    fn test_parse_prefixes() {
        assert_eq!(parse_prefixes(".,!"), Some(vec!['.', '!']));
        assert_eq!(parse_prefixes(". ! ."), Some(vec!['.', '!']));
        assert_eq!(parse_prefixes("#/"), Some(vec!['#', '/']));
        assert_eq!(parse_prefixes("a"), None);
        assert_eq!(parse_prefixes("  "), None);
    }
}
