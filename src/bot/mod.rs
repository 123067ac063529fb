//! Bot module - Core bot functionality.

mod antidelete;
mod calls;
mod dispatcher;
mod hooks;
mod presence;
mod reconnect;
mod runtime;
mod services;
mod timers;

pub use dispatcher::Dispatcher;
pub use hooks::{EventHooks, NoopHooks};
pub use presence::PresenceMirror;
pub use runtime::run;
pub use services::Services;
pub use timers::MuteTimers;
