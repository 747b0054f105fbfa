use anyhow::Context;
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use futures_util::StreamExt;
use tracing::error;

use parley_types::api::SendMessageRequest;
use parley_types::events::RoomEvent;
use parley_types::models::Message;

use crate::middleware::CurrentUser;
use crate::state::AppState;

/// Append a message to a conversation and fan it out to the room. When the
/// conversation is bound to an assistant thread, the reply relay is spawned
/// in the background; its failures are logged, never surfaced here.
pub async fn create_message(
    State(state): State<AppState>,
    Path(conversation_id): Path<u64>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let conversation = state
        .conversations
        .get(conversation_id)
        .ok_or(StatusCode::NOT_FOUND)?;
    if !conversation.participants.iter().any(|p| p == &user.username) {
        return Err(StatusCode::FORBIDDEN);
    }

    let message = state
        .conversations
        .append_message(conversation_id, &user.username, req.content)
        .map_err(|_| StatusCode::NOT_FOUND)?;

    state
        .registry
        .broadcast(
            conversation_id,
            RoomEvent::Message {
                sender: message.sender.clone(),
                content: message.content.clone(),
            },
        )
        .await;

    if state.assistant.is_some() && conversation.assistant_thread_id.is_some() {
        tokio::spawn(run_assistant_relay(
            state.clone(),
            conversation_id,
            message.clone(),
        ));
    }

    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn list_messages(
    State(state): State<AppState>,
    Path(conversation_id): Path<u64>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, StatusCode> {
    let conversation = state
        .conversations
        .get(conversation_id)
        .ok_or(StatusCode::NOT_FOUND)?;
    if !conversation.participants.iter().any(|p| p == &user.username) {
        return Err(StatusCode::FORBIDDEN);
    }
    Ok(Json(conversation.messages))
}

async fn run_assistant_relay(state: AppState, conversation_id: u64, message: Message) {
    if let Err(e) = relay_assistant_reply(&state, conversation_id, &message).await {
        error!(
            "assistant relay for message {} in conversation {} failed: {}",
            message.id, conversation_id, e
        );
    }
}

/// Forward the message to the conversation's assistant thread, stream the
/// run back as room events, then store the finished reply on the message.
async fn relay_assistant_reply(
    state: &AppState,
    conversation_id: u64,
    message: &Message,
) -> anyhow::Result<()> {
    let client = state
        .assistant
        .as_ref()
        .context("assistant client not configured")?;
    let conversation = state
        .conversations
        .get(conversation_id)
        .context("conversation disappeared")?;
    let (Some(thread_id), Some(assistant_id)) =
        (conversation.assistant_thread_id, conversation.assistant_id)
    else {
        return Ok(());
    };

    client.add_message(&thread_id, &message.content).await?;

    let stream = client.stream_run(thread_id, assistant_id);
    futures_util::pin_mut!(stream);

    let mut response = String::new();
    while let Some(delta) = stream.next().await {
        let delta = delta?;
        response.push_str(&delta);
        state
            .registry
            .broadcast(
                conversation_id,
                RoomEvent::AssistantChunk {
                    message_id: message.id,
                    delta,
                },
            )
            .await;
    }

    state
        .conversations
        .set_response(conversation_id, message.id, response.clone())?;
    state
        .registry
        .broadcast(
            conversation_id,
            RoomEvent::AssistantDone {
                message_id: message.id,
                response,
            },
        )
        .await;
    Ok(())
}
