//! SQLite-backed [`CatalogStore`] implementation.
//!
//! Items live in the `catalog_items` table created by
//! [`migrate::run_migrations`](crate::migrate::run_migrations). The tag list
//! is stored comma-joined in `tag_list`; categories and statuses are stored
//! as their lower-case names.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use catalog_curator_core::models::{
    join_tag_list, parse_tag_list, CanonicalCategory, CatalogItem, ItemPatch,
};
use catalog_curator_core::store::CatalogStore;

/// SQLite implementation of the [`CatalogStore`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn item_from_row(row: &SqliteRow) -> Result<CatalogItem> {
    let id: String = row.get("id");
    let category: Option<String> = row.get("canonical_category");
    let status: String = row.get("status");
    let tag_list: String = row.get("tag_list");

    Ok(CatalogItem {
        canonical_category: category
            .as_deref()
            .map(str::parse)
            .transpose()
            .with_context(|| format!("item {} has a bad canonical_category", id))?,
        status: status
            .parse()
            .with_context(|| format!("item {} has a bad status", id))?,
        title: row.get("title"),
        legacy_category: row.get("legacy_category"),
        legacy_type_label: row.get("legacy_type_label"),
        tags: parse_tag_list(&tag_list),
        unit: row.get("unit"),
        location: row.get("location"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        id,
    })
}

#[async_trait]
impl CatalogStore for SqliteStore {
    async fn list_approved(&self, category: Option<CanonicalCategory>) -> Result<Vec<CatalogItem>> {
        let category = category.map(|c| c.as_str());
        let rows = sqlx::query(
            r#"
            SELECT id, title, canonical_category, legacy_category, legacy_type_label,
                   tag_list, unit, location, status, created_at, updated_at
            FROM catalog_items
            WHERE status = 'approved'
              AND (? IS NULL OR canonical_category = ?)
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(category)
        .bind(category)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(item_from_row).collect()
    }

    async fn update_item(&self, id: &str, patch: &ItemPatch) -> Result<()> {
        if patch.is_empty() {
            return Ok(());
        }
        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query(
            r#"
            UPDATE catalog_items SET
                canonical_category = COALESCE(?, canonical_category),
                unit = COALESCE(?, unit),
                location = COALESCE(?, location),
                legacy_type_label = COALESCE(?, legacy_type_label),
                tag_list = COALESCE(?, tag_list),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(patch.canonical_category.map(|c| c.as_str()))
        .bind(&patch.unit)
        .bind(&patch.location)
        .bind(&patch.legacy_type_label)
        .bind(patch.tags.as_deref().map(join_tag_list))
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            bail!("item not found: {}", id);
        }
        Ok(())
    }

    async fn insert_item(&self, item: &CatalogItem) -> Result<String> {
        sqlx::query(
            r#"
            INSERT INTO catalog_items (id, title, canonical_category, legacy_category,
                                       legacy_type_label, tag_list, unit, location,
                                       status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&item.id)
        .bind(&item.title)
        .bind(item.canonical_category.map(|c| c.as_str()))
        .bind(&item.legacy_category)
        .bind(&item.legacy_type_label)
        .bind(join_tag_list(&item.tags))
        .bind(&item.unit)
        .bind(&item.location)
        .bind(item.status.as_str())
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to insert item {}", item.id))?;

        Ok(item.id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::{db, migrate};
    use catalog_curator_core::models::ItemStatus;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    async fn open_store(tmp: &TempDir) -> SqliteStore {
        let cfg = Config::with_db(&tmp.path().join("catalog.sqlite"));
        migrate::run_migrations(&cfg).await.unwrap();
        SqliteStore::new(db::connect(&cfg).await.unwrap())
    }

    fn item(id: &str, created_at: i64) -> CatalogItem {
        let mut item = CatalogItem::new(id, format!("Guide {}", id));
        item.created_at = created_at;
        item.updated_at = created_at;
        item
    }

    #[tokio::test]
    async fn test_round_trips_item_fields() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp).await;
        let mut original = item("a", 10);
        original.canonical_category = Some(CanonicalCategory::Blueprint);
        original.legacy_category = Some("Templates".to_string());
        original.tags = vec!["Cloud".to_string(), "Identity".to_string()];
        original.location = Some("Dubai".to_string());
        store.insert_item(&original).await.unwrap();

        let listed = store.list_approved(None).await.unwrap();
        assert_eq!(listed, vec![original]);
    }

    #[tokio::test]
    async fn test_list_approved_filters_and_orders() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp).await;
        let mut late = item("late", 20);
        late.canonical_category = Some(CanonicalCategory::Strategy);
        let mut early = item("early", 10);
        early.canonical_category = Some(CanonicalCategory::Strategy);
        let mut draft = item("draft", 5);
        draft.status = ItemStatus::Draft;
        let mut other = item("other", 1);
        other.canonical_category = Some(CanonicalCategory::Testimonial);
        for i in [&late, &early, &draft, &other] {
            store.insert_item(i).await.unwrap();
        }

        let all: Vec<String> = store
            .list_approved(None)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(all, vec!["other", "early", "late"]);

        let strategy = store
            .list_approved(Some(CanonicalCategory::Strategy))
            .await
            .unwrap();
        assert_eq!(strategy.len(), 2);
    }

    #[tokio::test]
    async fn test_update_applies_only_patched_fields() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp).await;
        let mut original = item("a", 10);
        original.unit = Some("Finance".to_string());
        original.tags = vec!["OKR".to_string()];
        store.insert_item(&original).await.unwrap();

        let patch = ItemPatch {
            location: Some("Riyadh".to_string()),
            tags: Some(vec!["OKR".to_string(), "SWOT".to_string()]),
            ..ItemPatch::default()
        };
        store.update_item("a", &patch).await.unwrap();

        let updated = &store.list_approved(None).await.unwrap()[0];
        assert_eq!(updated.unit.as_deref(), Some("Finance"));
        assert_eq!(updated.location.as_deref(), Some("Riyadh"));
        assert_eq!(updated.tags, vec!["OKR", "SWOT"]);
        assert_eq!(updated.title, "Guide a");
        assert!(updated.updated_at >= original.updated_at);
    }

    #[tokio::test]
    async fn test_update_missing_item_errors() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp).await;
        let err = store
            .update_item("ghost", &ItemPatch::category(CanonicalCategory::Strategy))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }
}
