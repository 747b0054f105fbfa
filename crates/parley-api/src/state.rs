use std::sync::Arc;

use jsonwebtoken::Algorithm;

use parley_assistant::AssistantClient;
use parley_gateway::RoomRegistry;
use parley_store::{ConversationStore, UserStore};

pub type AppState = Arc<AppStateInner>;

/// Shared server state. The conversation store is separately `Arc`ed
/// because the gateway's connection handler holds its own reference.
pub struct AppStateInner {
    pub users: UserStore,
    pub conversations: Arc<ConversationStore>,
    pub registry: RoomRegistry,
    /// Present only when an assistant API key is configured.
    pub assistant: Option<AssistantClient>,
    pub secret_key: String,
    pub algorithm: Algorithm,
    pub token_ttl_minutes: i64,
}
