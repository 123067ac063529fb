//! Command layer: registration table, router and handlers.

pub mod builtin;
mod handler;
mod registry;
pub mod router;
mod table;

pub use handler::{CommandContext, Handler, Unavailable, handler_fn};
pub use registry::{CommandRegistry, CommandSpec, RegistryError, Scope, Tier};
pub use router::{Rejection, RouteOutcome, Router};
pub use table::build_registry;
