use axum::{
    extract::{ws::{Message, WebSocket, WebSocketUpgrade}, State},
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::models::{LeaveMessage, ReceivedMessage, SendMessage};
use crate::state::AppState;
use crate::websocket::msg_join_handler::handle_join_message;
use crate::websocket::msg_update_handler::handle_update_message;
use crate::websocket::msg_user_info_handler::handle_user_info_message;
use crate::websocket::registry::ConnectionId;

/// WebSocket handler
pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    info!("New WebSocket connection attempt");
    // Frames between the soft and the hard limit are read and then dropped
    let hard_limit = state.config.max_message_bytes.saturating_mul(4);
    ws.max_message_size(hard_limit)
        .on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection_id = Uuid::new_v4();
    info!("WebSocket connection established with connection_id: {}", connection_id);

    let (mut sender, mut receiver) = socket.split();

    // Everything bound for this client goes through one queue to keep order
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
    state.registry.connect(connection_id, outbound_tx).await;

    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            if sender.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
    });

    let recv_state = state.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(incoming) = receiver.next().await {
            match incoming {
                Ok(Message::Text(text)) => dispatch_frame(&text, connection_id, &recv_state).await,
                Ok(Message::Close(_)) => break,
                Ok(_) => continue,
                Err(e) => {
                    warn!("WebSocket read error on {}: {}", connection_id, e);
                    break;
                }
            }
        }
    });

    // Wait for either task to finish (and finish the other)
    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    handle_disconnect(connection_id, &state).await;
    info!("WebSocket connection {} terminated", connection_id);
}

/// Parse one text frame and route it. Oversized or malformed frames are
/// logged and dropped; the connection stays open and nothing is sent back.
pub async fn dispatch_frame(text: &str, connection_id: ConnectionId, state: &AppState) {
    if text.len() > state.config.max_message_bytes {
        warn!(
            "Dropping {} byte frame from {} (limit {})",
            text.len(),
            connection_id,
            state.config.max_message_bytes
        );
        return;
    }

    let msg: ReceivedMessage = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(e) => {
            error!("Failed to parse message from {}: {}", connection_id, e);
            return;
        }
    };

    match msg {
        ReceivedMessage::Join(join_msg) => handle_join_message(&join_msg, connection_id, state).await,
        ReceivedMessage::Update(update_msg) => handle_update_message(&update_msg, connection_id, state).await,
        ReceivedMessage::UserInfo(info_msg) => handle_user_info_message(&info_msg, connection_id, state).await,
    }
}

/// Drop the session. Remaining participants only hear about it when
/// departure notices are enabled.
pub async fn handle_disconnect(connection_id: ConnectionId, state: &AppState) {
    let mut registry = state.registry.lock().await;
    let Some(departed) = registry.remove(connection_id) else {
        return;
    };

    if !state.config.announce_departures {
        return;
    }
    if let (Some(document_id), Some(peer)) = (departed.document_id, departed.peer) {
        let leave = SendMessage::Leave(LeaveMessage { user_id: peer.user_id });
        registry.broadcast_to_document(document_id, None, &leave);
    }
}
