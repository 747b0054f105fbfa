use std::sync::Arc;

use axum::extract::ws::{CloseFrame, Message, WebSocket, close_code};
use futures_util::{SinkExt, StreamExt};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use tracing::{info, warn};

use parley_store::ConversationStore;
use parley_types::api::Claims;
use parley_types::events::{ClientFrame, RoomEvent};

use crate::registry::RoomRegistry;

/// Handle one WebSocket connection to `/ws/{conversation_id}?token=...`.
///
/// The socket authenticates via its `token` query parameter and must belong
/// to a participant of the conversation; any failure before that point
/// closes the socket with a policy-violation code and the peer never enters
/// the registry. Once open, inbound text is appended to the conversation
/// and fanned out to the whole room.
pub async fn handle_connection(
    socket: WebSocket,
    registry: RoomRegistry,
    store: Arc<ConversationStore>,
    secret: String,
    algorithm: Algorithm,
    conversation_id: u64,
    token: Option<String>,
) {
    let claims = token.as_deref().and_then(|t| verify_token(t, &secret, algorithm));
    let Some(claims) = claims else {
        warn!("socket for conversation {} failed authentication", conversation_id);
        reject(socket, "invalid token").await;
        return;
    };
    let username = claims.sub;

    let member = match store.get(conversation_id) {
        Some(conversation) => conversation.participants.iter().any(|p| p == &username),
        None => false,
    };
    if !member {
        warn!(
            "{} denied socket access to conversation {}",
            username, conversation_id
        );
        reject(socket, "not a participant").await;
        return;
    }

    let (conn_id, mut rx) = registry.join(conversation_id, &username).await;
    info!("{} connected to conversation {}", username, conversation_id);

    let (mut sender, mut receiver) = socket.split();

    let ready = RoomEvent::Ready {
        conversation_id,
        username: username.clone(),
    };
    if sender
        .send(Message::Text(serde_json::to_string(&ready).unwrap().into()))
        .await
        .is_err()
    {
        registry.leave(conversation_id, conn_id).await;
        return;
    }

    registry
        .broadcast(
            conversation_id,
            RoomEvent::Joined {
                username: username.clone(),
            },
        )
        .await;

    // Forward room events -> client
    let mut send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = serde_json::to_string(&event).unwrap();
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    // Relay client text -> room
    let registry_recv = registry.clone();
    let store_recv = store.clone();
    let username_recv = username.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    // JSON frame if it parses, raw message content otherwise
                    let content = match serde_json::from_str::<ClientFrame>(&text) {
                        Ok(ClientFrame::Message { content }) => content,
                        Err(_) => text.to_string(),
                    };

                    if let Err(e) =
                        store_recv.append_message(conversation_id, &username_recv, content.clone())
                    {
                        warn!("failed to record socket message: {}", e);
                    }

                    registry_recv
                        .broadcast(
                            conversation_id,
                            RoomEvent::Message {
                                sender: username_recv.clone(),
                                content,
                            },
                        )
                        .await;
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Whichever side finishes first tears the other down
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    registry.leave(conversation_id, conn_id).await;
    registry
        .broadcast(
            conversation_id,
            RoomEvent::Left {
                username: username.clone(),
            },
        )
        .await;
    info!("{} disconnected from conversation {}", username, conversation_id);
}

/// Verify signature and expiry. Every failure kind (bad signature, expired,
/// malformed token) collapses to `None`.
pub fn verify_token(token: &str, secret: &str, algorithm: Algorithm) -> Option<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(algorithm),
    )
    .map(|data| data.claims)
    .ok()
}

/// Close an unauthenticated socket with a policy-violation code (1008).
async fn reject(mut socket: WebSocket, reason: &'static str) {
    let frame = CloseFrame {
        code: close_code::POLICY,
        reason: reason.into(),
    };
    let _ = socket.send(Message::Close(Some(frame))).await;
}
