use tracing::{debug, error, info, warn};

use crate::models::{DocumentPatch, SendMessage, UpdateMessage};
use crate::state::AppState;
use crate::websocket::registry::ConnectionId;

/// Handle UpdateMessage
///
/// Persists the whole content and then fans it out to every other session on
/// the document. No merge happens: whichever update the store applies last
/// is what everyone ends up with. The document lock is held from the store
/// write through the fan-out, so peers see updates in store order; the
/// registry itself is only locked around the membership check and the
/// fan-out.
pub async fn handle_update_message(update_msg: &UpdateMessage, connection_id: ConnectionId, state: &AppState) {
    let document_id = update_msg.document_id;
    info!(
        "Update message received for document {}: {} bytes",
        document_id,
        update_msg.content.len()
    );

    let _document = state.registry.lock_document(document_id).await;

    let joined = state.registry.lock().await.document_of(connection_id);
    match joined {
        Some(joined) if joined == document_id => {}
        Some(joined) => {
            warn!(
                "Dropping update for document {} from connection {} joined to {}",
                document_id, connection_id, joined
            );
            return;
        }
        None => {
            warn!("Dropping update for document {} from unjoined connection {}", document_id, connection_id);
            return;
        }
    }

    match state.store.update(document_id, DocumentPatch::content_now(update_msg.content.clone())).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            warn!("Document {} no longer exists, update dropped", document_id);
            return;
        }
        Err(e) => {
            error!("Failed to persist update for document {}: {}", document_id, e);
            return;
        }
    }

    let registry = state.registry.lock().await;
    let broadcast = SendMessage::Update(UpdateMessage {
        document_id,
        content: update_msg.content.clone(),
        cursor: update_msg.cursor,
        user_id: registry.peer_of(connection_id).map(|p| p.user_id),
    });
    let delivered = registry.broadcast_to_document(document_id, Some(connection_id), &broadcast);
    debug!("Update for document {} fanned out to {} peers", document_id, delivered);
}
