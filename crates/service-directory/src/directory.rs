//! Provider Directory
//!
//! Read-only lookups over category tags, the category catalog and provider
//! profiles. Empty result sets are empty vectors; only a named profile
//! lookup can fail with `NotFound`.

use std::sync::Arc;

use crate::error::{DirectoryError, Result};
use crate::model::{Profile, Tag};
use crate::store::{Direction, DocumentStore, Query};

pub const TAGS: &str = "tags";
pub const CATEGORIES: &str = "categories";
pub const PROFILES: &str = "profiles";

/// Tags kept by `list_categories` unless configured otherwise
pub const DEFAULT_CATEGORY_LIMIT: usize = 100;

/// Gateway to provider data
#[derive(Clone)]
pub struct ProviderDirectory {
    store: Arc<dyn DocumentStore>,
    category_limit: usize,
}

impl ProviderDirectory {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            category_limit: DEFAULT_CATEGORY_LIMIT,
        }
    }

    #[must_use]
    pub const fn with_category_limit(mut self, limit: usize) -> Self {
        self.category_limit = limit;
        self
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Most used category labels, in ascending usage order
    pub async fn list_categories(&self) -> Result<Vec<String>> {
        let query = Query::collection(TAGS)
            .order_by("usedBy", Direction::Ascending)
            .limit_to_last(self.category_limit);

        let categories: Vec<String> = self
            .store
            .query(&query)
            .await?
            .iter()
            .filter_map(Tag::from_document)
            .map(|tag| tag.text)
            .collect();

        tracing::debug!(count = categories.len(), "Listed categories");
        Ok(categories)
    }

    /// Every named entry of the category catalog
    pub async fn catalog_categories(&self) -> Result<Vec<String>> {
        let names = self
            .store
            .query(&Query::collection(CATEGORIES))
            .await?
            .iter()
            .filter_map(|doc| doc.get_str("name").map(str::to_string))
            .collect();
        Ok(names)
    }

    /// Display names of providers offering exactly `tag`
    pub async fn find_providers_by_category(&self, tag: &str) -> Result<Vec<String>> {
        let query = Query::collection(PROFILES).where_eq("service.text", tag);
        let names: Vec<String> = self
            .store
            .query(&query)
            .await?
            .iter()
            .filter_map(|doc| doc.get_str("displayName").map(str::to_string))
            .collect();

        tracing::debug!(tag, count = names.len(), "Found providers");
        Ok(names)
    }

    /// First profile whose display name is exactly `name`
    pub async fn find_profile_by_name(&self, name: &str) -> Result<Profile> {
        let query = Query::collection(PROFILES).where_eq("displayName", name).limit(1);
        let doc = self
            .store
            .query(&query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DirectoryError::not_found("profile", name))?;

        Profile::from_document(&doc)
    }
}
