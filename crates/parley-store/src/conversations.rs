use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use tracing::debug;

use parley_types::models::{Conversation, Message};

use crate::{StoreError, UserStore};

/// In-memory conversation map with atomic id allocation. Conversation and
/// message ids both start at 1 and are strictly increasing; a fetched id is
/// never reused even if the insert that follows loses a race.
pub struct ConversationStore {
    conversations: RwLock<HashMap<u64, Conversation>>,
    next_conversation_id: AtomicU64,
    next_message_id: AtomicU64,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self {
            conversations: RwLock::new(HashMap::new()),
            next_conversation_id: AtomicU64::new(1),
            next_message_id: AtomicU64::new(1),
        }
    }

    /// Create a conversation. The participant list is the creator first,
    /// then every requested participant that names a known user,
    /// deduplicated.
    pub fn create(
        &self,
        title: String,
        creator: &str,
        requested: &[String],
        users: &UserStore,
        assistant_id: Option<String>,
        assistant_thread_id: Option<String>,
    ) -> Conversation {
        let mut participants = vec![creator.to_string()];
        for username in requested {
            if users.contains(username) && !participants.contains(username) {
                participants.push(username.clone());
            }
        }

        let id = self.next_conversation_id.fetch_add(1, Ordering::Relaxed);
        let conversation = Conversation {
            id,
            title,
            participants,
            created_at: Utc::now(),
            messages: Vec::new(),
            assistant_id,
            assistant_thread_id,
        };

        self.conversations
            .write()
            .expect("conversation store lock poisoned")
            .insert(id, conversation.clone());

        debug!("created conversation {} ({})", id, conversation.title);
        conversation
    }

    pub fn get(&self, id: u64) -> Option<Conversation> {
        self.conversations
            .read()
            .expect("conversation store lock poisoned")
            .get(&id)
            .cloned()
    }

    /// Conversations whose participant list contains `username`.
    pub fn list_for(&self, username: &str) -> Vec<Conversation> {
        let mut list: Vec<Conversation> = self
            .conversations
            .read()
            .expect("conversation store lock poisoned")
            .values()
            .filter(|c| c.participants.iter().any(|p| p == username))
            .cloned()
            .collect();
        list.sort_by_key(|c| c.id);
        list
    }

    pub fn is_participant(&self, id: u64, username: &str) -> Result<bool, StoreError> {
        let conversations = self
            .conversations
            .read()
            .expect("conversation store lock poisoned");
        let conversation = conversations
            .get(&id)
            .ok_or(StoreError::ConversationNotFound(id))?;
        Ok(conversation.participants.iter().any(|p| p == username))
    }

    /// Append a message with the next message id. The message is immutable
    /// afterward except for `response`, filled in via [`set_response`].
    ///
    /// [`set_response`]: ConversationStore::set_response
    pub fn append_message(
        &self,
        conversation_id: u64,
        sender: &str,
        content: String,
    ) -> Result<Message, StoreError> {
        let mut conversations = self
            .conversations
            .write()
            .expect("conversation store lock poisoned");
        let conversation = conversations
            .get_mut(&conversation_id)
            .ok_or(StoreError::ConversationNotFound(conversation_id))?;

        let message = Message {
            id: self.next_message_id.fetch_add(1, Ordering::Relaxed),
            content,
            sender: sender.to_string(),
            response: None,
            timestamp: Utc::now(),
        };
        conversation.messages.push(message.clone());
        Ok(message)
    }

    /// Returns true if the participant was added, false if already present.
    pub fn add_participant(&self, conversation_id: u64, username: &str) -> Result<bool, StoreError> {
        let mut conversations = self
            .conversations
            .write()
            .expect("conversation store lock poisoned");
        let conversation = conversations
            .get_mut(&conversation_id)
            .ok_or(StoreError::ConversationNotFound(conversation_id))?;

        if conversation.participants.iter().any(|p| p == username) {
            return Ok(false);
        }
        conversation.participants.push(username.to_string());
        Ok(true)
    }

    /// Store the finished assistant reply on an existing message.
    pub fn set_response(
        &self,
        conversation_id: u64,
        message_id: u64,
        response: String,
    ) -> Result<(), StoreError> {
        let mut conversations = self
            .conversations
            .write()
            .expect("conversation store lock poisoned");
        let conversation = conversations
            .get_mut(&conversation_id)
            .ok_or(StoreError::ConversationNotFound(conversation_id))?;
        let message = conversation
            .messages
            .iter_mut()
            .find(|m| m.id == message_id)
            .ok_or(StoreError::MessageNotFound(message_id))?;
        message.response = Some(response);
        Ok(())
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::UserRecord;

    fn users() -> UserStore {
        UserStore::new(["admin", "aasim", "dummy"].map(|u| UserRecord {
            username: u.to_string(),
            password_hash: "x".to_string(),
        }))
    }

    #[test]
    fn conversation_ids_start_at_one_and_increase() {
        let store = ConversationStore::new();
        let users = users();
        let a = store.create("a".into(), "admin", &[], &users, None, None);
        let b = store.create("b".into(), "admin", &[], &users, None, None);
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
    }

    #[test]
    fn creator_leads_participants_and_unknowns_are_dropped() {
        let store = ConversationStore::new();
        let conversation = store.create(
            "t".into(),
            "admin",
            &["dummy".into(), "ghost".into(), "dummy".into(), "admin".into()],
            &users(),
            None,
            None,
        );
        assert_eq!(conversation.participants, vec!["admin", "dummy"]);
    }

    #[test]
    fn message_ids_are_strictly_increasing() {
        let store = ConversationStore::new();
        let users = users();
        let a = store.create("a".into(), "admin", &[], &users, None, None);
        let b = store.create("b".into(), "admin", &[], &users, None, None);

        let m1 = store.append_message(a.id, "admin", "one".into()).unwrap();
        let m2 = store.append_message(b.id, "admin", "two".into()).unwrap();
        let m3 = store.append_message(a.id, "admin", "three".into()).unwrap();
        assert!(m1.id < m2.id);
        assert!(m2.id < m3.id);

        let history = store.get(a.id).unwrap().messages;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "one");
        assert_eq!(history[1].content, "three");
    }

    #[test]
    fn append_to_unknown_conversation_is_not_found() {
        let store = ConversationStore::new();
        let err = store.append_message(42, "admin", "hi".into()).unwrap_err();
        assert!(matches!(err, StoreError::ConversationNotFound(42)));
    }

    #[test]
    fn add_participant_deduplicates() {
        let store = ConversationStore::new();
        let users = users();
        let conversation = store.create("t".into(), "admin", &[], &users, None, None);

        assert!(store.add_participant(conversation.id, "dummy").unwrap());
        assert!(!store.add_participant(conversation.id, "dummy").unwrap());
        assert_eq!(
            store.get(conversation.id).unwrap().participants,
            vec!["admin", "dummy"]
        );
        assert!(store.is_participant(conversation.id, "dummy").unwrap());
        assert!(!store.is_participant(conversation.id, "aasim").unwrap());
    }

    #[test]
    fn set_response_fills_message() {
        let store = ConversationStore::new();
        let users = users();
        let conversation = store.create("t".into(), "admin", &[], &users, None, None);
        let message = store
            .append_message(conversation.id, "admin", "what's the weather".into())
            .unwrap();

        store
            .set_response(conversation.id, message.id, "sunny".into())
            .unwrap();
        let stored = store.get(conversation.id).unwrap().messages[0].clone();
        assert_eq!(stored.response.as_deref(), Some("sunny"));

        let err = store
            .set_response(conversation.id, 999, "x".into())
            .unwrap_err();
        assert!(matches!(err, StoreError::MessageNotFound(999)));
    }

    #[test]
    fn list_for_scopes_to_membership() {
        let store = ConversationStore::new();
        let users = users();
        store.create("a".into(), "admin", &["dummy".into()], &users, None, None);
        store.create("b".into(), "aasim", &[], &users, None, None);

        let dummy = store.list_for("dummy");
        assert_eq!(dummy.len(), 1);
        assert_eq!(dummy[0].title, "a");
        assert!(store.list_for("ghost").is_empty());
    }
}
