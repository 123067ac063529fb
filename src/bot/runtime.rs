//! Bot runtime: connect, pump events, reconnect.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::reconnect::CloseReason;
use super::{Dispatcher, Services, antidelete, calls};
use crate::moderation::screen_joiners;
use crate::protocol::{
    Connection, ConnectionState, ConnectionUpdate, InboundMessage, MessagesUpsert,
    ParticipantAction, ParticipantsUpdate, PresenceUpdate, ProtocolClient, ProtocolEvent, Session,
    UpsertKind, jid,
};

const CONNECT_RETRY: Duration = Duration::from_secs(5);
const PRESENCE_BUFFER: usize = 64;

/// Run sessions until the account is logged out.
pub async fn run(
    client: Arc<dyn ProtocolClient>,
    dispatcher: Arc<Dispatcher>,
) -> anyhow::Result<()> {
    loop {
        info!("🔌 Connecting to the messaging network...");
        let session = match client.connect().await {
            Ok(session) => session,
            Err(e) => {
                error!("Connect failed: {:#}. Retrying in {:?}", e, CONNECT_RETRY);
                tokio::time::sleep(CONNECT_RETRY).await;
                continue;
            }
        };

        let reason = run_session(&dispatcher, session).await;
        dispatcher.services().presence.stop();

        match reason.retry_after() {
            Some(delay) => {
                warn!("Connection closed ({:?}), reconnecting in {:?}", reason, delay);
                tokio::time::sleep(delay).await;
            }
            None => {
                error!("🚪 Logged out. Clearing credentials; pair the device again to continue.");
                client.clear_credentials().await?;
                return Ok(());
            }
        }
    }
}

/// Pump one session's events. Returns why it ended.
///
/// Nothing here awaits the network: every handler that talks to the
/// connection runs in its own task so replies keep flowing through the
/// event stream.
async fn run_session(dispatcher: &Arc<Dispatcher>, session: Session) -> CloseReason {
    let Session {
        connection: conn,
        mut events,
    } = session;

    // Presence updates must apply in order, so they share one worker.
    let (presence_tx, presence_rx) = mpsc::channel(PRESENCE_BUFFER);
    let presence_worker = tokio::spawn(presence_loop(
        Arc::clone(dispatcher.services()),
        Arc::clone(&conn),
        presence_rx,
    ));

    let reason = loop {
        let Some(event) = events.recv().await else {
            warn!("Event stream ended without a close event");
            break CloseReason::Abnormal;
        };
        match event {
            ProtocolEvent::MessagesUpsert(upsert) => on_upsert(dispatcher, &conn, upsert),
            ProtocolEvent::GroupParticipantsUpdate(update) => {
                on_participants(dispatcher, &conn, update)
            }
            ProtocolEvent::ConnectionUpdate(update) => {
                if let Some(reason) = on_connection(dispatcher, &conn, update) {
                    break reason;
                }
            }
            ProtocolEvent::PresenceUpdate(update) => {
                if let Err(e) = presence_tx.try_send(update) {
                    warn!("Presence update dropped: {}", e);
                }
            }
            ProtocolEvent::Call(batch) => {
                let services = Arc::clone(dispatcher.services());
                let conn = Arc::clone(&conn);
                tokio::spawn(async move {
                    if let Err(e) = calls::handle_calls(&services, &conn, &batch.calls).await {
                        warn!("Call handling failed: {:#}", e);
                    }
                });
            }
        }
    };

    presence_worker.abort();
    reason
}

async fn presence_loop(
    services: Arc<Services>,
    conn: Arc<dyn Connection>,
    mut updates: mpsc::Receiver<PresenceUpdate>,
) {
    while let Some(update) = updates.recv().await {
        if let Err(e) = services.presence.handle_update(&services, &conn, &update).await {
            warn!("Presence update failed: {:#}", e);
        }
    }
}

/// First message of a live batch only; each gets its own task.
fn on_upsert(dispatcher: &Arc<Dispatcher>, conn: &Arc<dyn Connection>, upsert: MessagesUpsert) {
    if upsert.kind != UpsertKind::Notify {
        return;
    }
    let Some(message) = upsert
        .messages
        .into_iter()
        .next()
        .and_then(InboundMessage::from_wire)
    else {
        return;
    };

    let hooks = Arc::clone(&dispatcher.services().hooks);
    let conn = Arc::clone(conn);

    if jid::is_status_broadcast(&message.chat_id) {
        tokio::spawn(async move {
            if let Err(e) = hooks.on_status(&conn, &message).await {
                warn!("Status hook failed: {:#}", e);
            }
        });
        return;
    }
    if message.is_echo() {
        debug!("Skipping client echo {}", message.id);
        return;
    }
    if message.content.is_revocation() {
        let services = Arc::clone(dispatcher.services());
        tokio::spawn(async move {
            if let Err(e) = antidelete::handle_revocation(&services, &conn, &message).await {
                warn!("Antidelete failed: {:#}", e);
            }
            if let Err(e) = hooks.on_revocation(&conn, &message).await {
                warn!("Revocation hook failed: {:#}", e);
            }
        });
        return;
    }

    if antidelete::enabled(dispatcher.services()) {
        dispatcher.services().recent_messages.remember(&message);
    }

    let dispatcher = Arc::clone(dispatcher);
    tokio::spawn(async move {
        let chat_id = message.chat_id.clone();
        let handled = dispatcher.handle_message(conn, message).await;
        debug!("Message in {} handled: {:?}", chat_id, handled);
    });
}

fn on_participants(
    dispatcher: &Arc<Dispatcher>,
    conn: &Arc<dyn Connection>,
    update: ParticipantsUpdate,
) {
    let services = Arc::clone(dispatcher.services());
    let conn = Arc::clone(conn);

    tokio::spawn(async move {
        services.permissions.invalidate(&update.id);

        if matches!(update.action, ParticipantAction::Add | ParticipantAction::Invite) {
            match screen_joiners(&services, conn.as_ref(), &update.id, &update.participants).await {
                Ok(removed) if !removed.is_empty() => {
                    debug!("Antibot removed {} joiner(s) from {}", removed.len(), update.id);
                }
                Ok(_) => {}
                Err(e) => warn!("Antibot screening failed in {}: {:#}", update.id, e),
            }
        }

        if let Err(e) = services.hooks.on_participants(&conn, &update).await {
            warn!("Participants hook failed in {}: {:#}", update.id, e);
        }
    });
}

/// Returns a close reason when the session is over.
fn on_connection(
    dispatcher: &Arc<Dispatcher>,
    conn: &Arc<dyn Connection>,
    update: ConnectionUpdate,
) -> Option<CloseReason> {
    if let Some(code) = update.qr.as_deref() {
        info!("📱 Pairing required. Code: {}", code);
    }

    match update.connection? {
        ConnectionState::Connecting => {
            debug!("Connecting...");
            None
        }
        ConnectionState::Open => {
            info!("✅ Connected as {}", conn.self_id());
            let services = Arc::clone(dispatcher.services());
            let conn = Arc::clone(conn);
            tokio::spawn(async move {
                services.presence.subscribe_owners(&services, conn.as_ref()).await;
                services.mute_timers.restore(&conn, &services);
            });
            None
        }
        ConnectionState::Close => {
            let reason = CloseReason::classify(update.last_disconnect.as_ref());
            info!("Connection closed: {:?}", update.last_disconnect);
            Some(reason)
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::commands::{Router, build_registry};
    use crate::protocol::{
        CallBatch, CallOffer, LastDisconnect, MessageContent, MessageKey, ProtocolMessage, WireMessage,
    };
    use crate::store::Flag;
    use crate::testing::{Call, GROUP, MEMBER, MockConnection, OWNER, test_services};

    /// Hands out scripted sessions; counts credential wipes.
    struct ScriptedClient {
        sessions: Mutex<Vec<Session>>,
        cleared: Mutex<u32>,
    }

    #[async_trait]
    impl ProtocolClient for ScriptedClient {
        async fn connect(&self) -> anyhow::Result<Session> {
            self.sessions
                .lock()
                .pop()
                .ok_or_else(|| anyhow::anyhow!("no more sessions"))
        }

        async fn clear_credentials(&self) -> anyhow::Result<()> {
            *self.cleared.lock() += 1;
            Ok(())
        }
    }

    fn close(code: u16, error: &str) -> ProtocolEvent {
        ProtocolEvent::ConnectionUpdate(ConnectionUpdate {
            connection: Some(ConnectionState::Close),
            last_disconnect: Some(LastDisconnect {
                status_code: Some(code),
                error: Some(error.into()),
            }),
            ..Default::default()
        })
    }

    fn key(id: &str) -> MessageKey {
        MessageKey {
            remote_jid: GROUP.into(),
            from_me: false,
            id: id.into(),
            participant: Some(MEMBER.into()),
        }
    }

    fn upsert(id: &str, content: MessageContent) -> ProtocolEvent {
        ProtocolEvent::MessagesUpsert(MessagesUpsert {
            kind: UpsertKind::Notify,
            messages: vec![WireMessage {
                key: key(id),
                message: Some(content),
                push_name: None,
                message_timestamp: Some(chrono::Utc::now().timestamp()),
            }],
        })
    }

    fn text(id: &str, body: &str) -> ProtocolEvent {
        upsert(
            id,
            MessageContent {
                conversation: Some(body.into()),
                ..Default::default()
            },
        )
    }

    fn ping(id: &str) -> ProtocolEvent {
        text(id, ".ping")
    }

    fn session(conn: &Arc<MockConnection>, events: Vec<ProtocolEvent>) -> Session {
        let (tx, rx) = mpsc::channel(16);
        for event in events {
            tx.try_send(event).unwrap();
        }
        Session {
            connection: conn.clone(),
            events: rx,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnects_then_stops_on_logout() {
        let dir = tempfile::tempdir().unwrap();
        let services = test_services(dir.path());
        let registry = build_registry(&services.config.bot_name).unwrap();
        let dispatcher = Arc::new(Dispatcher::new(services, Router::new(registry)));
        let conn = MockConnection::new().with_group(GROUP, &[], &[MEMBER], true);

        // Popped from the back: the abnormal close comes first.
        let client = Arc::new(ScriptedClient {
            sessions: Mutex::new(vec![
                session(&conn, vec![close(401, "logged out")]),
                session(
                    &conn,
                    vec![
                        ping("3EB0AAA1"),
                        ping("BAE5ECHO00000000"),
                        close(428, "Connection Closed"),
                    ],
                ),
            ]),
            cleared: Mutex::new(0),
        });

        run(client.clone(), dispatcher).await.unwrap();
        tokio::task::yield_now().await;

        assert_eq!(*client.cleared.lock(), 1);
        assert!(client.sessions.lock().is_empty());
        // The echo is skipped; the real ping is answered once.
        assert_eq!(
            conn.texts(GROUP)
                .iter()
                .filter(|t| t.starts_with("🏓 Pong!"))
                .count(),
            1
        );
    }

    fn incoming_call(id: &str, from: &str) -> ProtocolEvent {
        ProtocolEvent::Call(CallBatch {
            calls: vec![CallOffer {
                id: id.into(),
                from: from.into(),
                status: Some("offer".into()),
            }],
        })
    }

    fn pongs(conn: &MockConnection) -> usize {
        conn.texts(GROUP)
            .iter()
            .filter(|t| t.starts_with("🏓 Pong!"))
            .count()
    }

    #[tokio::test]
    async fn test_slow_call_does_not_hold_up_messages() {
        let dir = tempfile::tempdir().unwrap();
        let services = test_services(dir.path());
        services.stores.anticall.set(Flag { enabled: true }).unwrap();
        let registry = build_registry(&services.config.bot_name).unwrap();
        let dispatcher = Arc::new(Dispatcher::new(services, Router::new(registry)));

        let conn = MockConnection::new().with_group(GROUP, &[], &[MEMBER], true);
        conn.hold_calls.store(true, Ordering::SeqCst);

        let events = vec![
            incoming_call("C1", "4444@s.whatsapp.net"),
            ping("3EB0BBB1"),
            close(428, "Connection Closed"),
        ];
        let reason = tokio::time::timeout(
            Duration::from_secs(5),
            run_session(&dispatcher, session(&conn, events)),
        )
        .await
        .expect("session pump blocked on a call");
        assert_eq!(reason, CloseReason::Abnormal);

        tokio::time::timeout(Duration::from_secs(5), async {
            while pongs(&conn) == 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("message was not dispatched");
        assert_eq!(conn.count(|c| matches!(c, Call::RejectCall { .. })), 0);

        conn.release_calls.notify_one();
        tokio::time::timeout(Duration::from_secs(5), async {
            while conn.count(|c| matches!(c, Call::RejectCall { .. })) == 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("call was never rejected");
    }

    #[tokio::test]
    async fn test_deleted_message_reported_to_owner() {
        let dir = tempfile::tempdir().unwrap();
        let services = test_services(dir.path());
        services.stores.antidelete.set(Flag { enabled: true }).unwrap();
        let registry = build_registry(&services.config.bot_name).unwrap();
        let dispatcher = Arc::new(Dispatcher::new(services, Router::new(registry)));
        let conn = MockConnection::new().with_group(GROUP, &[], &[MEMBER], true);

        let revoke = upsert(
            "3EB0REVOKE01",
            MessageContent {
                protocol_message: Some(ProtocolMessage {
                    kind: Some(ProtocolMessage::REVOKE),
                    key: Some(key("3EB0ORIGINAL")),
                }),
                ..Default::default()
            },
        );
        let events = vec![
            text("3EB0ORIGINAL", "meet at noon"),
            revoke,
            close(428, "Connection Closed"),
        ];
        run_session(&dispatcher, session(&conn, events)).await;

        tokio::time::timeout(Duration::from_secs(5), async {
            while conn.texts(OWNER).is_empty() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("deleted message was not reported");
        assert!(conn.texts(OWNER)[0].ends_with("meet at noon"));
    }
}
