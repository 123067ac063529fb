use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{Connection, ProtocolEvent};

/// One live session: an outbound handle plus the inbound event stream.
///
/// The stream ends when the underlying client goes away.
pub struct Session {
    pub connection: Arc<dyn Connection>,
    pub events: mpsc::Receiver<ProtocolEvent>,
}

/// Factory for protocol sessions.
#[async_trait]
pub trait ProtocolClient: Send + Sync {
    async fn connect(&self) -> anyhow::Result<Session>;

    /// Forget stored credentials so the next connect requires pairing.
    async fn clear_credentials(&self) -> anyhow::Result<()>;
}
