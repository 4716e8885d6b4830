//! In-Memory Document Store
//!
//! For testing and local runs. Mirrors the query semantics of the hosted
//! store: documents lacking the order-by field are excluded, ties break on
//! document id.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Direction, Document, DocumentStore, Fields, Query};
use crate::error::{DirectoryError, Result};

/// Collections keyed by path, documents keyed by id
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, BTreeMap<String, Fields>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every document in a collection, by id
    pub async fn documents(&self, collection: &str) -> Vec<Document> {
        self.collections
            .read()
            .await
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, fields)| Document::new(id.clone(), fields.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub async fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, BTreeMap::len)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|fields| Document::new(id, fields.clone())))
    }

    async fn query(&self, query: &Query) -> Result<Vec<Document>> {
        if query.limit_to_last && query.order_by.is_none() {
            return Err(DirectoryError::InvalidQuery(
                "limit_to_last requires an order_by clause".into(),
            ));
        }

        let mut results: Vec<Document> = self
            .documents(&query.collection)
            .await
            .into_iter()
            .filter(|doc| {
                query.filters.iter().all(|f| {
                    doc.get(&f.field)
                        .is_some_and(|v| v.compare(&f.value).is_eq())
                })
            })
            .collect();

        if let Some(order) = &query.order_by {
            results.retain(|doc| doc.get(&order.field).is_some());
            results.sort_by(|a, b| {
                let ordering = match (a.get(&order.field), b.get(&order.field)) {
                    (Some(x), Some(y)) => x.compare(y),
                    _ => std::cmp::Ordering::Equal,
                };
                let ordering = ordering.then_with(|| a.id.cmp(&b.id));
                match order.direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                }
            });
        }

        if let Some(limit) = query.limit {
            if query.limit_to_last {
                let skip = results.len().saturating_sub(limit);
                results.drain(..skip);
            } else {
                results.truncate(limit);
            }
        }

        Ok(results)
    }

    async fn add(&self, collection: &str, fields: Fields) -> Result<String> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        self.set(collection, &id, fields).await?;
        Ok(id)
    }

    async fn set(&self, collection: &str, id: &str, fields: Fields) -> Result<()> {
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), fields);
        Ok(())
    }

    fn name(&self) -> &str {
        "Memory"
    }
}
