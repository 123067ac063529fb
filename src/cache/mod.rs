//! Named, typed caches over Moka.
//!
//! Warden keeps three kinds of short-lived state in memory:
//! - group metadata fetched from the protocol client (admin lookups)
//! - notice windows that suppress repeated warnings to the same chat/user
//! - recent messages, for reporting deletions
//!
//! All live in a `CacheRegistry` so services can look them up by name.

mod config;
mod notice;
mod registry;
mod typed;

pub use config::CacheConfig;
pub use notice::NoticeWindow;
pub use registry::{CacheError, CacheRegistry};
pub use typed::TypedCache;
