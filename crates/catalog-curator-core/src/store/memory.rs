//! In-memory [`CatalogStore`] implementation for tests and dry runs.
//!
//! Items live in a `Vec` behind `std::sync::RwLock`, preserving insertion
//! order.

use std::sync::RwLock;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::models::{CanonicalCategory, CatalogItem, ItemPatch};

use super::CatalogStore;

/// In-memory catalog store.
pub struct InMemoryStore {
    items: RwLock<Vec<CatalogItem>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            items: RwLock::new(Vec::new()),
        }
    }

    pub fn with_items(items: Vec<CatalogItem>) -> Self {
        Self {
            items: RwLock::new(items),
        }
    }

    /// Every stored item regardless of status.
    pub fn snapshot(&self) -> Vec<CatalogItem> {
        self.items.read().unwrap().clone()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn list_approved(&self, category: Option<CanonicalCategory>) -> Result<Vec<CatalogItem>> {
        let items = self.items.read().unwrap();
        Ok(items
            .iter()
            .filter(|i| i.is_approved())
            .filter(|i| category.is_none() || i.canonical_category == category)
            .cloned()
            .collect())
    }

    async fn update_item(&self, id: &str, patch: &ItemPatch) -> Result<()> {
        let mut items = self.items.write().unwrap();
        let Some(item) = items.iter_mut().find(|i| i.id == id) else {
            bail!("item not found: {}", id);
        };
        item.apply_patch(patch);
        item.updated_at = chrono::Utc::now().timestamp();
        Ok(())
    }

    async fn insert_item(&self, item: &CatalogItem) -> Result<String> {
        let mut items = self.items.write().unwrap();
        if items.iter().any(|i| i.id == item.id) {
            bail!("item already exists: {}", item.id);
        }
        items.push(item.clone());
        Ok(item.id.clone())
    }
}
