//! Conversation History
//!
//! Replays the tail of a room as alternating user/model turns.

use std::sync::Arc;

use chat_core::Conversation;

use crate::error::Result;
use crate::model::Message;
use crate::store::{Direction, DocumentStore, Query, messages_path};

/// Messages read per invocation unless configured otherwise
pub const DEFAULT_HISTORY_WINDOW: usize = 20;

/// Loads recent room messages as a replayable conversation
pub struct HistoryLoader {
    store: Arc<dyn DocumentStore>,
    assistant_id: String,
    window: usize,
}

impl HistoryLoader {
    pub fn new(store: Arc<dyn DocumentStore>, assistant_id: impl Into<String>) -> Self {
        Self {
            store,
            assistant_id: assistant_id.into(),
            window: DEFAULT_HISTORY_WINDOW,
        }
    }

    #[must_use]
    pub const fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    /// The `window` most recent messages, oldest first
    pub async fn recent_messages(&self, room_id: &str) -> Result<Vec<Message>> {
        let query = Query::collection(messages_path(room_id))
            .order_by("createdAt", Direction::Ascending)
            .limit_to_last(self.window);

        Ok(self
            .store
            .query(&query)
            .await?
            .iter()
            .map(Message::from_document)
            .collect())
    }

    /// Split by author and pair user turns with assistant turns in order
    pub async fn load(&self, room_id: &str) -> Result<Conversation> {
        let messages = self.recent_messages(room_id).await?;
        Ok(self.interleave(room_id, &messages))
    }

    /// Like `load`, leaving out `message_id` (the message being answered)
    pub async fn load_excluding(&self, room_id: &str, message_id: &str) -> Result<Conversation> {
        let mut messages = self.recent_messages(room_id).await?;
        messages.retain(|m| m.id != message_id);
        Ok(self.interleave(room_id, &messages))
    }

    fn interleave(&self, room_id: &str, messages: &[Message]) -> Conversation {
        let (model, user): (Vec<&Message>, Vec<&Message>) = messages
            .iter()
            .filter(|m| m.body().is_some())
            .partition(|m| m.is_authored_by(&self.assistant_id));

        let texts = |turns: Vec<&Message>| -> Vec<String> {
            turns
                .into_iter()
                .filter_map(|m| m.body().map(str::to_string))
                .collect()
        };
        let conversation = Conversation::interleave(texts(user), texts(model));

        tracing::debug!(
            room = room_id,
            messages = messages.len(),
            pairs = conversation.pairs(),
            "Loaded history"
        );
        conversation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Fields, MemoryStore};
    use chat_core::Turn;
    use chrono::{Duration, TimeZone, Utc};

    const BOT: &str = "bot";

    async fn post(store: &MemoryStore, room: &str, minute: i64, author: &str, text: Option<&str>) {
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap() + Duration::minutes(minute);
        let mut fields = Fields::new();
        fields.insert("authorId".into(), author.into());
        fields.insert("createdAt".into(), at.into());
        if let Some(text) = text {
            fields.insert("text".into(), text.into());
        }
        store.add(&messages_path(room), fields).await.unwrap();
    }

    #[tokio::test]
    async fn test_pairs_in_order() {
        let store = Arc::new(MemoryStore::new());
        post(&store, "R1", 0, "u1", Some("hola")).await;
        post(&store, "R1", 1, BOT, Some("¿en qué te ayudo?")).await;
        post(&store, "R1", 2, "u1", Some("busco un plomero")).await;

        let conv = HistoryLoader::new(store, BOT).load("R1").await.unwrap();
        assert_eq!(
            conv.turns(),
            &[Turn::user("hola"), Turn::model("¿en qué te ayudo?")]
        );
    }

    #[tokio::test]
    async fn test_any_other_author_is_user() {
        let store = Arc::new(MemoryStore::new());
        post(&store, "R1", 0, "u1", Some("a")).await;
        post(&store, "R1", 1, "u2", Some("b")).await;
        post(&store, "R1", 2, BOT, Some("c")).await;
        post(&store, "R1", 3, BOT, Some("d")).await;

        let conv = HistoryLoader::new(store, BOT).load("R1").await.unwrap();
        assert_eq!(
            conv.turns(),
            &[Turn::user("a"), Turn::model("c"), Turn::user("b"), Turn::model("d")]
        );
    }

    #[tokio::test]
    async fn test_window_and_textless_messages() {
        let store = Arc::new(MemoryStore::new());
        post(&store, "R1", 0, "u1", Some("old")).await;
        post(&store, "R1", 1, BOT, Some("old reply")).await;
        post(&store, "R1", 2, "u1", None).await;
        post(&store, "R1", 3, "u1", Some("new")).await;
        post(&store, "R1", 4, BOT, Some("new reply")).await;

        let loader = HistoryLoader::new(store, BOT).with_window(3);
        assert_eq!(loader.recent_messages("R1").await.unwrap().len(), 3);

        let conv = loader.load("R1").await.unwrap();
        assert_eq!(conv.turns(), &[Turn::user("new"), Turn::model("new reply")]);
    }

    #[tokio::test]
    async fn test_empty_room() {
        let store = Arc::new(MemoryStore::new());
        let conv = HistoryLoader::new(store, BOT).load("R9").await.unwrap();
        assert!(conv.is_empty());
    }

    #[tokio::test]
    async fn test_excluded_message_is_not_replayed() {
        let store = Arc::new(MemoryStore::new());
        post(&store, "R1", 0, "u1", Some("hola")).await;
        post(&store, "R1", 1, BOT, Some("Bienvenido")).await;
        post(&store, "R1", 2, BOT, Some("¿En qué te ayudo?")).await;
        post(&store, "R1", 3, "u1", Some("busco un plomero")).await;

        let loader = HistoryLoader::new(store, BOT);
        let trigger = loader.recent_messages("R1").await.unwrap().pop().unwrap();

        let conv = loader.load_excluding("R1", &trigger.id).await.unwrap();
        assert_eq!(conv.turns(), &[Turn::user("hola"), Turn::model("Bienvenido")]);
    }
}
