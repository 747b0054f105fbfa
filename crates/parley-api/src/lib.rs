//! HTTP route layer: request validation, bearer-token middleware, and CRUD
//! handlers over the in-memory stores.

pub mod auth;
pub mod conversations;
pub mod messages;
pub mod middleware;
pub mod password;
pub mod state;
pub mod token;

use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};

use crate::middleware::require_auth;
use crate::state::AppState;

/// Assemble the HTTP router. The WebSocket route is mounted separately by
/// the server binary.
pub fn routes(state: AppState) -> Router {
    let public = Router::new()
        .route("/login", post(auth::login))
        .with_state(state.clone());

    let protected = Router::new()
        .route("/protected-route", get(auth::protected_route))
        .route(
            "/conversations/",
            get(conversations::list_conversations).post(conversations::create_conversation),
        )
        .route(
            "/conversations/{conversation_id}",
            get(conversations::get_conversation),
        )
        .route(
            "/conversations/{conversation_id}/participants",
            post(conversations::add_participant),
        )
        .route(
            "/conversations/{conversation_id}/messages/",
            get(messages::list_messages).post(messages::create_message),
        )
        .layer(from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    Router::new().merge(public).merge(protected)
}
