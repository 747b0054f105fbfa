//! In-memory stores backing the API and gateway crates.
//!
//! All state here is process-memory and is lost on restart. Id allocation
//! is atomic so concurrent requests never observe duplicate ids, but
//! multi-step mutations are not transactional.

pub mod conversations;
pub mod users;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("conversation {0} not found")]
    ConversationNotFound(u64),
    #[error("message {0} not found")]
    MessageNotFound(u64),
}

pub use conversations::ConversationStore;
pub use users::{UserRecord, UserStore};
