//! WebSocket gateway: the per-conversation connection registry and the
//! connection loop that relays room traffic.

pub mod connection;
pub mod registry;

pub use registry::RoomRegistry;
