use tracing::{debug, error, info, warn};

use crate::models::{JoinMessage, LeaveMessage, SendMessage, SyncMessage, UserInfoMessage};
use crate::state::AppState;
use crate::websocket::registry::{ConnectionId, Peer};

/// Handle JoinMessage
///
/// Binds the connection to the document, sends the joiner a full snapshot if
/// the document exists and announces the joiner to everyone else on it. The
/// document lock is held throughout so no update to it can slip in between
/// the binding and the snapshot read; the registry is locked only around the
/// in-memory steps.
pub async fn handle_join_message(join_msg: &JoinMessage, connection_id: ConnectionId, state: &AppState) {
    let document_id = join_msg.document_id;
    info!(
        "Join message received for document {}: user={}, username={}",
        document_id, join_msg.user_id, join_msg.username
    );

    let _document = state.registry.lock_document(document_id).await;

    {
        let mut registry = state.registry.lock().await;
        let previous = registry.document_of(connection_id);
        let peer = Peer {
            user_id: join_msg.user_id.clone(),
            username: join_msg.username.clone(),
        };
        if !registry.join(connection_id, document_id, peer) {
            warn!("Join from unregistered connection {}", connection_id);
            return;
        }

        if state.config.announce_departures {
            if let Some(old_doc) = previous.filter(|old| *old != document_id) {
                let leave = SendMessage::Leave(LeaveMessage {
                    user_id: join_msg.user_id.clone(),
                });
                registry.broadcast_to_document(old_doc, Some(connection_id), &leave);
            }
        }
    }

    let snapshot = state.store.get(document_id).await;
    let registry = state.registry.lock().await;
    match snapshot {
        Ok(Some(doc)) => {
            let sync = SendMessage::Sync(SyncMessage {
                document_id,
                content: doc.content,
                filename: doc.filename,
            });
            if !registry.send_to(connection_id, &sync) {
                error!("Failed to queue sync message for document {}", document_id);
            }
        }
        Ok(None) => {
            info!("Document {} not found, no sync sent", document_id);
        }
        Err(e) => {
            error!("Failed to load document {} for join: {}", document_id, e);
        }
    }

    let presence = SendMessage::UserInfo(UserInfoMessage {
        user_id: join_msg.user_id.clone(),
        username: join_msg.username.clone(),
        cursor: None,
    });
    let notified = registry.broadcast_to_document(document_id, Some(connection_id), &presence);
    debug!("Announced {} to {} peers on document {}", join_msg.username, notified, document_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::{DocumentStore, MemStore};
    use crate::models::NewDocument;
    use std::sync::Arc;
    use tokio::sync::mpsc::{self, UnboundedReceiver};
    use uuid::Uuid;

    async fn state_with_doc(content: &str, config: Config) -> AppState {
        let store = Arc::new(MemStore::new());
        store
            .create(NewDocument {
                filename: "Untitled".into(),
                content: content.into(),
                last_modified: "t0".into(),
            })
            .await
            .unwrap();
        AppState::new(store, config)
    }

    async fn connect(state: &AppState) -> (ConnectionId, UnboundedReceiver<String>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        state.registry.connect(id, tx).await;
        (id, rx)
    }

    fn join(document_id: i64, user: &str) -> JoinMessage {
        JoinMessage {
            document_id,
            user_id: format!("id-{user}"),
            username: user.into(),
        }
    }

    fn frames(rx: &mut UnboundedReceiver<String>) -> Vec<SendMessage> {
        let mut out = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            out.push(serde_json::from_str(&frame).unwrap());
        }
        out
    }

    #[tokio::test]
    async fn joiner_gets_one_sync_and_peers_get_presence() {
        let state = state_with_doc("hello", Config::default()).await;
        let (a, mut rx_a) = connect(&state).await;
        let (b, mut rx_b) = connect(&state).await;

        handle_join_message(&join(1, "alice"), a, &state).await;
        handle_join_message(&join(1, "bob"), b, &state).await;

        let to_a = frames(&mut rx_a);
        assert_eq!(to_a.len(), 2);
        assert!(matches!(&to_a[0], SendMessage::Sync(s) if s.content == "hello" && s.filename == "Untitled"));
        assert!(matches!(&to_a[1], SendMessage::UserInfo(u) if u.username == "bob" && u.cursor.is_none()));

        let to_b = frames(&mut rx_b);
        assert_eq!(to_b.len(), 1);
        assert!(matches!(&to_b[0], SendMessage::Sync(_)));
    }

    #[tokio::test]
    async fn missing_document_sends_nothing_to_joiner() {
        let state = state_with_doc("", Config::default()).await;
        let (a, mut rx_a) = connect(&state).await;

        handle_join_message(&join(99, "alice"), a, &state).await;

        assert!(frames(&mut rx_a).is_empty());
        assert_eq!(state.registry.lock().await.document_of(a), Some(99));
    }

    #[tokio::test]
    async fn switching_documents_announces_leave_only_when_enabled() {
        for announce in [false, true] {
            let config = Config {
                announce_departures: announce,
                ..Config::default()
            };
            let state = state_with_doc("", config).await;
            let (a, _rx_a) = connect(&state).await;
            let (b, mut rx_b) = connect(&state).await;
            handle_join_message(&join(1, "bob"), b, &state).await;
            handle_join_message(&join(1, "alice"), a, &state).await;
            frames(&mut rx_b);

            handle_join_message(&join(2, "alice"), a, &state).await;

            let got_leave = frames(&mut rx_b)
                .iter()
                .any(|m| matches!(m, SendMessage::Leave(l) if l.user_id == "id-alice"));
            assert_eq!(got_leave, announce);
        }
    }
}
