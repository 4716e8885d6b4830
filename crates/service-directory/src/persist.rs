//! Reply Persister
//!
//! Writes the assistant's final answer into the room as a new message.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::model::Message;
use crate::store::{DocumentStore, messages_path};

pub struct ReplyPersister {
    store: Arc<dyn DocumentStore>,
    assistant_id: String,
}

impl ReplyPersister {
    pub fn new(store: Arc<dyn DocumentStore>, assistant_id: impl Into<String>) -> Self {
        Self {
            store,
            assistant_id: assistant_id.into(),
        }
    }

    /// Persist `text` stamped with the current time; returns the new message id
    pub async fn persist(&self, room_id: &str, text: &str) -> Result<String> {
        self.persist_at(room_id, text, Utc::now()).await
    }

    /// Persist `text` with `createdAt` and `updatedAt` set to `at`
    pub async fn persist_at(&self, room_id: &str, text: &str, at: DateTime<Utc>) -> Result<String> {
        let reply = Message::assistant_text(self.assistant_id.as_str(), text, at);
        let id = self.store.add(&messages_path(room_id), reply.to_fields()).await?;

        tracing::info!(
            room = room_id,
            message = %id,
            chars = text.chars().count(),
            "Reply persisted"
        );
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_persist_stamps_reply() {
        let store = Arc::new(MemoryStore::new());
        let persister = ReplyPersister::new(store.clone(), "bot");

        let id = persister.persist("R1", "Juan Perez").await.unwrap();
        let doc = store.get(&messages_path("R1"), &id).await.unwrap().unwrap();
        let message = Message::from_document(&doc);

        assert_eq!(message.text.as_deref(), Some("Juan Perez"));
        assert_eq!(message.author_id.as_deref(), Some("bot"));
        assert_eq!(message.kind.as_deref(), Some("text"));
        assert!(message.created_at.is_some());
        assert_eq!(message.created_at, message.updated_at);
    }

    #[tokio::test]
    async fn test_each_persist_is_a_new_document() {
        let store = Arc::new(MemoryStore::new());
        let persister = ReplyPersister::new(store.clone(), "bot");
        persister.persist("R1", "uno").await.unwrap();
        persister.persist("R1", "uno").await.unwrap();
        assert_eq!(store.count(&messages_path("R1")).await, 2);
    }
}
