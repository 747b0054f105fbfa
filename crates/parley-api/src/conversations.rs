use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{error, info};

use parley_types::api::{AddParticipantRequest, CreateConversationRequest};

use crate::middleware::CurrentUser;
use crate::state::AppState;

const ASSISTANT_INSTRUCTIONS: &str =
    "You are a helpful assistant participating in a group chat. Keep replies short.";

/// Create a conversation owned by the caller. When the assistant client is
/// configured, an assistant and thread are provisioned up front and their
/// handles stored on the conversation.
pub async fn create_conversation(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<CreateConversationRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let mut assistant_id = None;
    let mut assistant_thread_id = None;
    if let Some(client) = &state.assistant {
        let aid = client
            .create_assistant(ASSISTANT_INSTRUCTIONS)
            .await
            .map_err(|e| {
                error!("assistant provisioning failed: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            })?;
        let tid = client.create_thread().await.map_err(|e| {
            error!("assistant thread provisioning failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
        assistant_id = Some(aid);
        assistant_thread_id = Some(tid);
    }

    let conversation = state.conversations.create(
        req.title,
        &user.username,
        &req.participant_ids,
        &state.users,
        assistant_id,
        assistant_thread_id,
    );
    info!("{} created conversation {}", user.username, conversation.id);

    Ok((StatusCode::CREATED, Json(conversation)))
}

/// Conversations the caller participates in.
pub async fn list_conversations(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> impl IntoResponse {
    Json(state.conversations.list_for(&user.username))
}

pub async fn get_conversation(
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
    Ok(Json(conversation))
}

/// Add a known user to the participant list. Adding an existing
/// participant is a no-op.
pub async fn add_participant(
    State(state): State<AppState>,
    Path(conversation_id): Path<u64>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<AddParticipantRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let conversation = state
        .conversations
        .get(conversation_id)
        .ok_or(StatusCode::NOT_FOUND)?;
    if !conversation.participants.iter().any(|p| p == &user.username) {
        return Err(StatusCode::FORBIDDEN);
    }
    if !state.users.contains(&req.username) {
        return Err(StatusCode::NOT_FOUND);
    }

    state
        .conversations
        .add_participant(conversation_id, &req.username)
        .map_err(|_| StatusCode::NOT_FOUND)?;

    let updated = state
        .conversations
        .get(conversation_id)
        .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(Json(updated))
}
