//! Document Store Integration
//!
//! Abstractions over the document database holding rooms, messages, tags
//! and profiles, with an in-memory and a Firestore implementation.

mod firestore;
mod memory;
pub mod value;

pub use firestore::{FirestoreConfig, FirestoreStore};
pub use memory::MemoryStore;
pub use value::{FieldValue, Fields, GeoPoint};

use async_trait::async_trait;

use crate::error::Result;

/// A stored document
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    /// Last path segment
    pub id: String,
    pub fields: Fields,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Value at a dotted field path
    pub fn get(&self, path: &str) -> Option<&FieldValue> {
        value::field_at(&self.fields, path)
    }

    /// String value at a dotted field path
    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(FieldValue::as_str)
    }
}

/// Sort direction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    #[must_use]
    pub const fn reversed(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }
}

/// Equality filter on a field path
#[derive(Clone, Debug, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub value: FieldValue,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// Query over a single collection
#[derive(Clone, Debug, PartialEq)]
pub struct Query {
    /// Collection path, e.g. `rooms/R1/messages`
    pub collection: String,
    pub filters: Vec<FieldFilter>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<usize>,
    /// Keep the last `limit` results of the ordering instead of the first
    pub limit_to_last: bool,
}

impl Query {
    pub fn collection(path: impl Into<String>) -> Self {
        Self {
            collection: path.into(),
            filters: Vec::new(),
            order_by: None,
            limit: None,
            limit_to_last: false,
        }
    }

    #[must_use]
    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.filters.push(FieldFilter {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    #[must_use]
    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    #[must_use]
    pub const fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self.limit_to_last = false;
        self
    }

    /// Requires an `order_by`
    #[must_use]
    pub const fn limit_to_last(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self.limit_to_last = true;
        self
    }

    /// Split the collection path into parent document path and collection id
    pub fn parent_and_collection_id(&self) -> (&str, &str) {
        self.collection
            .rsplit_once('/')
            .unwrap_or(("", self.collection.as_str()))
    }
}

/// Document store client trait (Strategy pattern)
///
/// Implement this for each backend: Firestore, in-memory, etc.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch one document
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    /// Run a query; results follow the query's ordering
    async fn query(&self, query: &Query) -> Result<Vec<Document>>;

    /// Create a document with a generated id, returning the id
    async fn add(&self, collection: &str, fields: Fields) -> Result<String>;

    /// Create or replace a document
    async fn set(&self, collection: &str, id: &str, fields: Fields) -> Result<()>;

    /// Backend name
    fn name(&self) -> &str;
}

/// Collection holding a room's messages
pub fn messages_path(room_id: &str) -> String {
    format!("rooms/{room_id}/messages")
}
