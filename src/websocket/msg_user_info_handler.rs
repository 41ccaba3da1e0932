use tracing::{debug, warn};

use crate::models::{SendMessage, UserInfoMessage};
use crate::state::AppState;
use crate::websocket::registry::{ConnectionId, Peer};

/// Handle UserInfoMessage
///
/// Presence is relayed as-is to the other sessions on the sender's document
/// and never persisted.
pub async fn handle_user_info_message(info_msg: &UserInfoMessage, connection_id: ConnectionId, state: &AppState) {
    let mut registry = state.registry.lock().await;

    let Some(document_id) = registry.document_of(connection_id) else {
        warn!("Dropping user_info from unjoined connection {}", connection_id);
        return;
    };

    registry.set_peer(connection_id, Peer {
        user_id: info_msg.user_id.clone(),
        username: info_msg.username.clone(),
    });

    let presence = SendMessage::UserInfo(info_msg.clone());
    let delivered = registry.broadcast_to_document(document_id, Some(connection_id), &presence);
    debug!(
        "Presence of {} on document {} relayed to {} peers",
        info_msg.username, document_id, delivered
    );
}
