//! JSON-file backed state.
//!
//! Each concern has its own file under the configured data directory. All
//! stores are cheap to construct; nothing touches disk until first use.

mod file;
mod lists;
pub mod models;
mod mods;
mod mutes;
mod settings;
mod toggles;
mod warnings;

use std::path::PathBuf;

use thiserror::Error;

use crate::config::Config;

pub use file::JsonFile;
pub use lists::UserList;
pub use models::{
    AutoreactSetting, BotState, Flag, ModeSetting, ModerationAction, ModerationToggle,
    MuteRecord, OwnerPresence, PmBlockerSetting,
};
pub use mods::GroupModStore;
pub use mutes::MuteStore;
pub use settings::{PrefixStore, SettingStore};
pub use toggles::ToggleStore;
pub use warnings::{WarnOutcome, WarningStore};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("store encode failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Every persisted store the bot uses.
pub struct Stores {
    pub banned: UserList,
    pub sudo: UserList,
    pub mutes: MuteStore,
    pub warnings: WarningStore,
    pub group_mods: GroupModStore,

    pub antilink: ToggleStore,
    pub antitag: ToggleStore,
    pub antibadword: ToggleStore,
    pub antibot: ToggleStore,
    pub antistatus: ToggleStore,

    pub bot_state: SettingStore<BotState>,
    pub owner_presence: SettingStore<OwnerPresence>,
    pub mirror_presence: SettingStore<Flag>,
    pub mode: SettingStore<ModeSetting>,
    pub anticall: SettingStore<Flag>,
    pub antidelete: SettingStore<Flag>,
    pub pmblocker: SettingStore<PmBlockerSetting>,
    pub autotyping: SettingStore<Flag>,
    pub autoreact: SettingStore<AutoreactSetting>,
    pub prefixes: PrefixStore,
}

impl Stores {
    pub fn open(config: &Config) -> Self {
        let dir = config.data_dir.as_path();
        Self {
            banned: UserList::new(dir, "banned.json"),
            sudo: UserList::new(dir, "sudo.json"),
            mutes: MuteStore::new(dir),
            warnings: WarningStore::new(dir, config.warn_threshold),
            group_mods: GroupModStore::new(dir),

            antilink: ToggleStore::new(dir, "antilink"),
            antitag: ToggleStore::new(dir, "antitag"),
            antibadword: ToggleStore::new(dir, "antibadword"),
            antibot: ToggleStore::new(dir, "antibot"),
            antistatus: ToggleStore::new(dir, "antistatus"),

            bot_state: SettingStore::new(dir, "botState.json"),
            owner_presence: SettingStore::new(dir, "ownerPresence.json"),
            mirror_presence: SettingStore::new(dir, "mirrorPresence.json"),
            mode: SettingStore::new(dir, "mode.json"),
            anticall: SettingStore::new(dir, "anticall.json"),
            antidelete: SettingStore::new(dir, "antidelete.json"),
            pmblocker: SettingStore::new(dir, "pmblocker.json"),
            autotyping: SettingStore::new(dir, "autotyping.json"),
            autoreact: SettingStore::new(dir, "autoreact.json"),
            prefixes: PrefixStore::new(dir, config.default_prefixes.clone()),
        }
    }
}
