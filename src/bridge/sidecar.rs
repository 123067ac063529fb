//! Sidecar process speaking the JSON-lines bridge protocol on stdio.

use std::io::ErrorKind;
use std::process::Stdio;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::connection::{BridgeConnection, Pending};
use super::frame::{Inbound, decode};
use crate::config::BridgeConfig;
use crate::protocol::{
    ConnectionState, ConnectionUpdate, LastDisconnect, ProtocolClient, ProtocolEvent, Session,
};

/// Environment variable carrying the credential directory to the sidecar.
pub const SESSION_DIR_ENV: &str = "WARDEN_SESSION_DIR";

const EVENT_BUFFER: usize = 256;
const WRITE_BUFFER: usize = 64;

pub struct SidecarClient {
    config: BridgeConfig,
}

impl SidecarClient {
    pub fn new(config: BridgeConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ProtocolClient for SidecarClient {
    async fn connect(&self) -> anyhow::Result<Session> {
        tokio::fs::create_dir_all(&self.config.session_dir)
            .await
            .with_context(|| {
                format!("Failed to create session dir {:?}", self.config.session_dir)
            })?;

        let mut child = Command::new(&self.config.command)
            .args(&self.config.args)
            .env(SESSION_DIR_ENV, &self.config.session_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to spawn bridge '{}'", self.config.command))?;

        let stdin = child.stdin.take().context("Bridge stdin unavailable")?;
        let stdout = child.stdout.take().context("Bridge stdout unavailable")?;
        info!("🌉 Bridge started (pid {:?})", child.id());

        let (write_tx, write_rx) = mpsc::channel(WRITE_BUFFER);
        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
        let pending = Pending::default();
        let self_id = Arc::new(RwLock::new(String::new()));

        tokio::spawn(write_loop(stdin, write_rx));
        tokio::spawn(read_loop(
            child,
            stdout,
            event_tx,
            pending.clone(),
            self_id.clone(),
        ));

        let connection = BridgeConnection::new(
            write_tx,
            pending,
            self_id,
            self.config.request_timeout,
        );
        Ok(Session {
            connection: Arc::new(connection),
            events: event_rx,
        })
    }

    async fn clear_credentials(&self) -> anyhow::Result<()> {
        match tokio::fs::remove_dir_all(&self.config.session_dir).await {
            Ok(()) => {
                info!("🧹 Removed session dir {:?}", self.config.session_dir);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| {
                format!("Failed to remove session dir {:?}", self.config.session_dir)
            }),
        }
    }
}

async fn write_loop(mut stdin: ChildStdin, mut lines: mpsc::Receiver<String>) {
    while let Some(line) = lines.recv().await {
        let written = async {
            stdin.write_all(line.as_bytes()).await?;
            stdin.write_all(b"\n").await?;
            stdin.flush().await
        }
        .await;

        if let Err(e) = written {
            warn!("Bridge write failed: {}", e);
            break;
        }
    }
    debug!("Bridge writer stopped");
}

/// Route replies to waiters and forward events until EOF or until the session
/// is dropped. Dropping the child kills the process.
async fn read_loop(
    mut child: Child,
    stdout: ChildStdout,
    events: mpsc::Sender<ProtocolEvent>,
    pending: Pending,
    self_id: Arc<RwLock<String>>,
) {
    let mut lines = BufReader::new(stdout).lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line,
            _ = events.closed() => {
                debug!("Session dropped, stopping bridge");
                pending.fail_all();
                return;
            }
        };

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!("Bridge read failed: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match decode(&line) {
            Ok(Inbound::Reply(reply)) => {
                pending.resolve(reply);
            }
            Ok(Inbound::Event(event)) => {
                if let ProtocolEvent::ConnectionUpdate(ConnectionUpdate {
                    user_id: Some(user),
                    ..
                }) = &*event
                {
                    *self_id.write() = user.clone();
                }
                if events.send(*event).await.is_err() {
                    pending.fail_all();
                    return;
                }
            }
            Err(e) => warn!("Undecodable bridge line ({}): {}", e, line),
        }
    }

    pending.fail_all();
    let status = child.wait().await;
    warn!("Bridge exited: {:?}", status);

    let _ = events.send(bridge_closed()).await;
}

fn bridge_closed() -> ProtocolEvent {
    ProtocolEvent::ConnectionUpdate(ConnectionUpdate {
        connection: Some(ConnectionState::Close),
        last_disconnect: Some(LastDisconnect {
            status_code: None,
            error: Some("bridge process exited".to_string()),
        }),
        ..Default::default()
    })
}
