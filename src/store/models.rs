//! Persisted state shapes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// What a moderation check does to an offending message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationAction {
    #[default]
    Delete,
    /// Delete and add a warning; kick at the threshold.
    Warn,
    /// Delete and remove the sender.
    Kick,
    /// Delete and block the sender.
    Block,
}

impl FromStr for ModerationAction {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "delete" | "del" => Ok(Self::Delete),
            "warn" => Ok(Self::Warn),
            "kick" | "remove" => Ok(Self::Kick),
            "block" => Ok(Self::Block),
            _ => Err(()),
        }
    }
}

impl fmt::Display for ModerationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Delete => "delete",
            Self::Warn => "warn",
            Self::Kick => "kick",
            Self::Block => "block",
        };
        f.write_str(name)
    }
}

/// Per chat, per feature switch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModerationToggle {
    pub enabled: bool,
    #[serde(default)]
    pub action: ModerationAction,
}

impl ModerationToggle {
    pub fn enabled(action: ModerationAction) -> Self {
        Self {
            enabled: true,
            action,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MuteRecord {
    /// Unix milliseconds.
    pub until: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotState {
    pub is_on: bool,
}

impl Default for BotState {
    fn default() -> Self {
        Self { is_on: true }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerPresence {
    pub is_online: bool,
    #[serde(default)]
    pub updated_at: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeSetting {
    pub is_public: bool,
}

impl Default for ModeSetting {
    fn default() -> Self {
        Self { is_public: true }
    }
}

/// Plain on/off switch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flag {
    pub enabled: bool,
}

pub const DEFAULT_PM_NOTICE: &str = "⚠️ Direct messages are blocked!\nYou cannot DM this bot. Please contact the owner in group chats only.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PmBlockerSetting {
    pub enabled: bool,
    #[serde(default = "default_pm_notice")]
    pub message: String,
}

fn default_pm_notice() -> String {
    DEFAULT_PM_NOTICE.to_string()
}

impl Default for PmBlockerSetting {
    fn default() -> Self {
        Self {
            enabled: false,
            message: default_pm_notice(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoreactSetting {
    pub enabled: bool,
    #[serde(default = "default_reaction")]
    pub emoji: String,
}

fn default_reaction() -> String {
    "⏳".to_string()
}

impl Default for AutoreactSetting {
    fn default() -> Self {
        Self {
            enabled: true,
            emoji: default_reaction(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_parse() {
        assert_eq!("KICK".parse::<ModerationAction>(), Ok(ModerationAction::Kick));
        assert_eq!("del".parse::<ModerationAction>(), Ok(ModerationAction::Delete));
        assert!("explode".parse::<ModerationAction>().is_err());
    }

    #[test]
    fn test_toggle_without_action_defaults_to_delete() {
        let toggle: ModerationToggle = serde_json::from_str(r#"{"enabled":true}"#).unwrap();
        assert_eq!(toggle.action, ModerationAction::Delete);
    }

    #[test]
    fn test_defaults() {
        assert!(BotState::default().is_on);
        assert!(ModeSetting::default().is_public);
        assert!(AutoreactSetting::default().enabled);
        assert!(!PmBlockerSetting::default().enabled);
        let state: BotState = serde_json::from_str(r#"{"isOn":false}"#).unwrap();
        assert!(!state.is_on);
    }
}
