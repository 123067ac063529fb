//! Production [`ProtocolClient`](crate::protocol::ProtocolClient): an external
//! sidecar process that owns the messaging protocol and talks JSON lines over
//! stdio.

mod connection;
mod frame;
mod sidecar;

pub use sidecar::SidecarClient;
