use serde::{Deserialize, Serialize};

/// Events fanned out to the members of a conversation room, serialized
/// as JSON text frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum RoomEvent {
    /// Sent to a peer right after it joins its room
    Ready {
        conversation_id: u64,
        username: String,
    },

    /// A peer joined the room
    Joined { username: String },

    /// A peer left the room
    Left { username: String },

    /// A chat message, posted over HTTP or relayed from a socket
    Message { sender: String, content: String },

    /// One text delta of a streamed assistant reply
    AssistantChunk { message_id: u64, delta: String },

    /// The assistant reply finished streaming
    AssistantDone { message_id: u64, response: String },
}

/// Frames sent FROM client TO server over WebSocket. Clients may also
/// send raw non-JSON text, which the server treats as message content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientFrame {
    /// Post a message into the room
    Message { content: String },
}
