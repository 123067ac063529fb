//! Commands implemented inside the crate.

pub mod general;
pub mod group;
pub mod mods;
pub mod owner;
pub mod toggles;

use super::{CommandRegistry, RegistryError};

/// Everything except `help`, which is registered last by the table.
pub fn register(registry: &mut CommandRegistry) -> Result<(), RegistryError> {
    general::register(registry)?;
    group::register(registry)?;
    toggles::register(registry)?;
    owner::register(registry)?;
    mods::register(registry)?;
    Ok(())
}
