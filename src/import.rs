//! Seed import from a JSON file.
//!
//! The file holds a JSON array of guides:
//!
//! ```json
//! [
//!   { "title": "Risk Policy", "legacy_category": "Policies", "unit": "Finance" },
//!   { "id": "bp-7", "title": "Cloud Landing Zone", "type_label": "Blueprint",
//!     "tags": ["Cloud"], "status": "draft" }
//! ]
//! ```
//!
//! Only `title` is required. Items without an `id` get a fresh UUID, items
//! without a `status` are approved, and every approved item is classified
//! before it is inserted. Tags may not contain the `,` tag separator.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use uuid::Uuid;

use catalog_curator_core::classify::Classifier;
use catalog_curator_core::models::{parse_tag_list, CatalogItem, ItemStatus, TAG_SEPARATOR};
use catalog_curator_core::store::CatalogStore;

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;

/// One entry of the seed file.
#[derive(Debug, Deserialize)]
pub struct SeedItem {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub legacy_category: Option<String>,
    #[serde(default, alias = "legacy_type_label")]
    pub type_label: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub status: Option<ItemStatus>,
}

impl SeedItem {
    fn into_item(self, classifier: &Classifier, now: i64) -> CatalogItem {
        let id = self
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let mut item = CatalogItem::new(id, self.title);
        item.legacy_category = self.legacy_category;
        item.legacy_type_label = self.type_label;
        item.tags = parse_tag_list(&self.tags.join(","));
        item.unit = self.unit;
        item.location = self.location;
        item.status = self.status.unwrap_or(ItemStatus::Approved);
        item.created_at = now;
        item.updated_at = now;
        if item.is_approved() {
            item.canonical_category = Some(classifier.category_of(&item));
        }
        item
    }
}

/// Parse a seed file without touching the database.
pub fn read_seed_file(path: &Path) -> Result<Vec<SeedItem>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read seed file: {}", path.display()))?;
    let seeds: Vec<SeedItem> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse seed file: {}", path.display()))?;
    for (i, seed) in seeds.iter().enumerate() {
        if seed.title.trim().is_empty() {
            bail!("seed item #{} has an empty title", i + 1);
        }
        if let Some(tag) = seed.tags.iter().find(|t| t.contains(TAG_SEPARATOR)) {
            bail!(
                "seed item #{} has tag '{}' containing '{}'; list tags separately",
                i + 1,
                tag,
                TAG_SEPARATOR
            );
        }
    }
    Ok(seeds)
}

/// Import every item in `path` into the configured database.
///
/// Returns the number of items inserted. Stops at the first insert error;
/// items before it stay inserted.
pub async fn run_import(config: &Config, path: &Path) -> Result<usize> {
    let seeds = read_seed_file(path)?;
    let classifier = Classifier::new(&config.classifier_rules()?)?;
    let store = SqliteStore::new(db::connect(config).await?);
    let now = chrono::Utc::now().timestamp();

    let mut inserted = 0;
    for seed in seeds {
        let item = seed.into_item(&classifier, now);
        log::debug!(
            "importing {} '{}' as {}",
            item.id,
            item.title,
            item.canonical_category
                .map(|c| c.to_string())
                .unwrap_or_else(|| "-".to_string())
        );
        store.insert_item(&item).await?;
        inserted += 1;
    }

    store.close().await;
    log::info!("imported {} item(s) from {}", inserted, path.display());
    Ok(inserted)
}
