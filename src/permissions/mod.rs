//! Permission system for checking user roles.
//!
//! Two layers:
//! - [`Permissions`]: the shared resolver. Knows the owners, reads the sudo,
//!   ban, mute and moderator stores and caches group metadata for admin lookups.
//! - [`PermissionSnapshot`]: one message's view. Each answer is computed on
//!   first access and memoized, so a public command in a group never pays
//!   for a metadata fetch and an admin command pays for exactly one.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let perms = services.permissions.snapshot(conn.clone(), &event);
//!
//! if perms.is_banned() && event.command.token != "unban" {
//!     return Ok(());
//! }
//! if perms.is_bot_admin().await {
//!     // ...
//! }
//! ```

mod checker;
mod snapshot;

pub use checker::{AdminStatus, Permissions};
pub use snapshot::PermissionSnapshot;
