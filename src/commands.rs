//! Command implementations behind the `curate` subcommands.
//!
//! Each command opens its own pool, wires a [`SqliteStore`] into the core
//! [`Curator`], prints a rendered result to stdout, and closes the pool.

use anyhow::{Context, Result};

use catalog_curator_core::classify::Classifier;
use catalog_curator_core::models::CanonicalCategory;
use catalog_curator_core::pipeline::{CurationOptions, Curator};
use catalog_curator_core::report::RunReport;
use catalog_curator_core::store::CatalogStore;

use crate::config::Config;
use crate::db;
use crate::render;
use crate::sqlite_store::SqliteStore;

async fn open_store(config: &Config) -> Result<SqliteStore> {
    let pool = db::connect(config)
        .await
        .with_context(|| format!("Failed to open database: {}", config.db.path.display()))?;
    Ok(SqliteStore::new(pool))
}

/// `curate list`: print approved items, optionally one stored category.
pub async fn run_list(config: &Config, category: Option<CanonicalCategory>) -> Result<()> {
    let store = open_store(config).await?;
    let items = store.list_approved(category).await?;
    print!("{}", render::render_items(&items));
    store.close().await;
    Ok(())
}

/// `curate classify`: classify every approved item and persist changes.
pub async fn run_classify(config: &Config, dry_run: bool) -> Result<()> {
    let classifier = Classifier::new(&config.classifier_rules()?)?;
    let sets = config.facet_sets()?;
    let store = open_store(config).await?;

    let (_, summary) = Curator::new(&store, &classifier, &sets)
        .classify_all(CurationOptions { dry_run })
        .await?;
    print!("{}", render::render_classification(&summary, dry_run));
    store.close().await;
    Ok(())
}

/// `curate coverage`: read-only coverage, optionally one category's facets.
///
/// Returns the number of uncovered values.
pub async fn run_coverage(config: &Config, category: Option<CanonicalCategory>) -> Result<usize> {
    let classifier = Classifier::new(&config.classifier_rules()?)?;
    let mut sets = config.facet_sets()?;
    if let Some(category) = category {
        sets.retain(|s| s.category == category);
    }
    let store = open_store(config).await?;

    let reports = Curator::new(&store, &classifier, &sets).coverage().await?;
    print!("{}", render::render_coverage(&reports));
    store.close().await;
    Ok(reports.iter().map(|r| r.gaps().len()).sum())
}

/// `curate run`: classify, repair every facet set once, verify, report.
pub async fn run_curation(config: &Config, dry_run: bool, json: bool) -> Result<RunReport> {
    let classifier = Classifier::new(&config.classifier_rules()?)?;
    let sets = config.facet_sets()?;
    let store = open_store(config).await?;

    let report = Curator::new(&store, &classifier, &sets)
        .run(CurationOptions { dry_run })
        .await?;
    store.close().await;

    if json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", render::render_run(&report));
    }
    Ok(report)
}
