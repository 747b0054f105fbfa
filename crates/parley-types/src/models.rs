use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A chat room: title, participant list, ordered message history.
/// Created on POST, mutated by message append and participant add,
/// never deleted. Lives in process memory only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: u64,
    pub title: String,
    pub participants: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub messages: Vec<Message>,
    /// Handle of the external assistant bound to this conversation, if any.
    pub assistant_id: Option<String>,
    /// Handle of the external assistant thread bound to this conversation, if any.
    pub assistant_thread_id: Option<String>,
}

/// Immutable after append, except `response` which a streamed
/// assistant reply fills in once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: u64,
    pub content: String,
    pub sender: String,
    pub response: Option<String>,
    pub timestamp: DateTime<Utc>,
}
