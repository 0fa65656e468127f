//! Storage abstraction for the catalog.
//!
//! The [`CatalogStore`] trait is the core's only boundary to persistence.
//! The curation pipeline reads approved items and issues partial updates;
//! `insert_item` exists for seeding and is never called by the pipeline.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`list_approved`](CatalogStore::list_approved) | Read approved items, optionally one category |
//! | [`update_item`](CatalogStore::update_item) | Apply an [`ItemPatch`] to one item |
//! | [`insert_item`](CatalogStore::insert_item) | Seed a new item |

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{CanonicalCategory, CatalogItem, ItemPatch};

/// Abstract catalog backend.
///
/// Reads must return items in a stable order (insertion order or an
/// equivalent) so repair plans are deterministic across runs.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// List approved items, optionally restricted to a stored category.
    async fn list_approved(&self, category: Option<CanonicalCategory>) -> Result<Vec<CatalogItem>>;

    /// Partially update one item. Errors if the item does not exist.
    async fn update_item(&self, id: &str, patch: &ItemPatch) -> Result<()>;

    /// Insert a new item and return its ID.
    async fn insert_item(&self, item: &CatalogItem) -> Result<String>;
}
