mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, Query, State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use parley_api::password::hash_password;
use parley_api::state::{AppState, AppStateInner};
use parley_assistant::AssistantClient;
use parley_gateway::{RoomRegistry, connection};
use parley_store::{ConversationStore, UserRecord, UserStore};

use crate::config::Config;

/// Demo accounts seeded at startup; there is no registration flow.
const SEED_USERS: [&str; 3] = ["admin", "aasim", "dummy"];
const SEED_PASSWORD: &str = "123";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parley=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Seed users
    let mut records = Vec::with_capacity(SEED_USERS.len());
    for username in SEED_USERS {
        records.push(UserRecord {
            username: username.to_string(),
            password_hash: hash_password(SEED_PASSWORD)?,
        });
    }
    let users = UserStore::new(records);
    info!("seeded {} demo users", users.len());

    let assistant = config
        .assistant_api_key
        .as_deref()
        .map(|key| AssistantClient::new(&config.assistant_base_url, key, &config.assistant_model));
    if assistant.is_some() {
        info!("assistant integration enabled ({})", config.assistant_base_url);
    }

    // Shared state
    let state: AppState = Arc::new(AppStateInner {
        users,
        conversations: Arc::new(ConversationStore::new()),
        registry: RoomRegistry::new(),
        assistant,
        secret_key: config.secret_key.clone(),
        algorithm: config.algorithm,
        token_ttl_minutes: config.access_token_expire_minutes,
    });

    // Routes
    let ws_route = Router::new()
        .route("/ws/{conversation_id}", get(ws_upgrade))
        .with_state(state.clone());

    let mut app = parley_api::routes(state)
        .merge(ws_route)
        .layer(TraceLayer::new_for_http());
    if config.dev_cors {
        app = app.layer(CorsLayer::permissive());
    }

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("parley server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Debug, Deserialize)]
struct WsQuery {
    token: Option<String>,
}

async fn ws_upgrade(
    State(state): State<AppState>,
    Path(conversation_id): Path<u64>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        connection::handle_connection(
            socket,
            state.registry.clone(),
            state.conversations.clone(),
            state.secret_key.clone(),
            state.algorithm,
            conversation_id,
            query.token,
        )
    })
}
