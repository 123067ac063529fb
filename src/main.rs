//! Warden - group moderation bot core
//!
//! Turns raw protocol events into moderation actions and command replies.
//!
//! ## Architecture
//!
//! - `config` - Environment configuration
//! - `store` - JSON-file persistence for settings, lists and counters
//! - `cache` - Moka-backed caches (group metadata, notice window, recent messages)
//! - `protocol` - Event and connection types shared with the bridge
//! - `bridge` - Sidecar process that owns the messaging protocol
//! - `normalizer` - Raw message to uniform view
//! - `permissions` - Owner/sudo/admin/mod resolution
//! - `moderation` - Antilink, antitag, antibadword, antistatus, antibot
//! - `commands` - Registry, router and built-in handlers
//! - `bot` - Dispatcher, timers, presence mirror and the event loop
//! - `utils` - Parsing helpers

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

mod bot;
mod bridge;
mod cache;
mod commands;
mod config;
mod moderation;
mod normalizer;
mod permissions;
mod protocol;
mod store;
mod utils;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use bot::{Dispatcher, NoopHooks, Services};
use bridge::SidecarClient;
use commands::{Router, build_registry};
use config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file first (before anything else)
    dotenvy::dotenv().ok();

    // If RUST_LOG is not set, default to "info" level for our crate
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warden=info"));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting Warden...");

    let config = Config::from_env()?;
    info!("Configuration loaded successfully");
    info!("Bot owners: {:?}", config.owner_numbers);
    info!("Data directory: {:?}", config.data_dir);

    let client = Arc::new(SidecarClient::new(config.bridge.clone()));
    let registry = build_registry(&config.bot_name)?;

    let services = Services::new(config, Arc::new(NoopHooks))?;
    info!("Cache registry initialized: {:?}", services.cache.cache_names());
    let dispatcher = Arc::new(Dispatcher::new(services, Router::new(registry)));

    tokio::select! {
        result = bot::run(client, dispatcher) => result?,
        _ = tokio::signal::ctrl_c() => warn!("Interrupted, shutting down"),
    }

    info!("👋 Warden stopped");
    Ok(())
}
