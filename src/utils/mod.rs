//! Utility functions.
//!
//! Collection of helper functions used across the bot.

pub mod parser;
pub mod target;

pub use parser::{format_duration_full, parse_mute_duration, parse_toggle};
pub use target::{resolve_target, resolve_targets};

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
