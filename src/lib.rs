//! # Catalog Curator
//!
//! Taxonomy classification and facet-coverage repair for a guide catalog.
//!
//! Every approved guide is resolved to one of four canonical categories.
//! Each category has a configured set of facets (type, framework, unit,
//! location) with expected values; a run finds values no item carries and
//! rewrites existing items so every value is covered at least once.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────────────────────────┐   ┌──────────┐
//! │ seed JSON  │──▶│ catalog-curator-core         │◀─▶│  SQLite  │
//! │ (import)   │   │ classify → analyze → repair  │   │ (sqlx)   │
//! └────────────┘   └──────────────┬───────────────┘   └──────────┘
//!                                 ▼
//!                          ┌─────────────┐
//!                          │ CLI (curate)│
//!                          └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! curate init                   # create database
//! curate import seed.json       # load guides
//! curate coverage               # read-only gap report
//! curate run --dry-run          # plan repairs without writing
//! curate run                    # classify, repair, verify
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite `CatalogStore` backend |
//! | [`import`] | JSON seed import |
//! | [`commands`] | Subcommand implementations |
//! | [`render`] | Text tables for items, coverage, and run reports |

pub mod commands;
pub mod config;
pub mod db;
pub mod import;
pub mod migrate;
pub mod render;
pub mod sqlite_store;

pub use catalog_curator_core;
