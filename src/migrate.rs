//! Database schema migrations (idempotent).

use anyhow::Result;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS catalog_items (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            canonical_category TEXT,
            legacy_category TEXT,
            legacy_type_label TEXT,
            tag_list TEXT NOT NULL DEFAULT '',
            unit TEXT,
            location TEXT,
            status TEXT NOT NULL DEFAULT 'approved',
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_catalog_items_status_category ON catalog_items(status, canonical_category)",
    )
    .execute(&pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_catalog_items_created_at ON catalog_items(created_at, id)",
    )
    .execute(&pool)
    .await?;

    pool.close().await;
    Ok(())
}
