//! Anticall: reject incoming calls, tell the caller once, then block them.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use super::Services;
use crate::protocol::{BlockAction, CallOffer, Connection, jid};

pub const ANTICALL_NOTICE: &str =
    "📵 Anticall is enabled. Your call was rejected and you will be blocked.";

const BLOCK_AFTER: Duration = Duration::from_millis(800);

/// Handle one batch of call offers. Returns the callers scheduled for a block.
pub async fn handle_calls(
    services: &Services,
    conn: &Arc<dyn Connection>,
    calls: &[CallOffer],
) -> anyhow::Result<Vec<String>> {
    if !services.stores.anticall.get()?.enabled {
        return Ok(Vec::new());
    }

    let mut blocked = Vec::new();
    for call in calls.iter().filter(|c| !c.from.is_empty()) {
        let caller = call.from.clone();

        if let Err(e) = conn.reject_call(&call.id, &caller).await {
            warn!("Failed to reject call {} from {}: {}", call.id, caller, e);
        }

        let key = format!("anticall:{}", jid::bare_number(&caller));
        if services.notices.claim(key) {
            if let Err(e) = conn.send_text(&caller, ANTICALL_NOTICE).await {
                warn!("Failed to notify caller {}: {}", caller, e);
            }
        }

        let conn = Arc::clone(conn);
        let target = caller.clone();
        tokio::spawn(async move {
            tokio::time::sleep(BLOCK_AFTER).await;
            match conn.update_block_status(&target, BlockAction::Block).await {
                Ok(()) => info!("📵 Blocked caller {}", target),
                Err(e) => warn!("Failed to block caller {}: {}", target, e),
            }
        });
        blocked.push(caller);
    }
    Ok(blocked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Flag;
    use crate::testing::{Call, MockConnection, test_services};

    fn offer(id: &str, from: &str) -> CallOffer {
        CallOffer {
            id: id.to_string(),
            from: from.to_string(),
            status: Some("offer".into()),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_reject_notify_once_then_block() {
        let dir = tempfile::tempdir().unwrap();
        let services = test_services(dir.path());
        services.stores.anticall.set(Flag { enabled: true }).unwrap();
        let mock = MockConnection::new();
        let conn: Arc<dyn Connection> = mock.clone();
        let caller = "4444@s.whatsapp.net";

        handle_calls(&services, &conn, &[offer("C1", caller)]).await.unwrap();
        handle_calls(&services, &conn, &[offer("C2", caller)]).await.unwrap();

        assert_eq!(mock.count(|c| matches!(c, Call::RejectCall { .. })), 2);
        assert_eq!(mock.texts(caller), vec![ANTICALL_NOTICE]);
        assert_eq!(mock.count(|c| matches!(c, Call::Block { .. })), 0);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(
            mock.count(|c| matches!(c, Call::Block { action: BlockAction::Block, .. })),
            2
        );
    }

    #[tokio::test]
    async fn test_disabled_does_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let services = test_services(dir.path());
        let mock = MockConnection::new();
        let conn: Arc<dyn Connection> = mock.clone();

        let blocked = handle_calls(&services, &conn, &[offer("C1", "4444@s.whatsapp.net")])
            .await
            .unwrap();
        assert!(blocked.is_empty());
        assert!(mock.calls().is_empty());
    }
}
