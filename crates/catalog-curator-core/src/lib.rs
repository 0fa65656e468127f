//! # Catalog Curator Core
//!
//! Runtime-agnostic logic for keeping a guide catalog's search facets
//! populated: item model, text normalization, category classification,
//! facet coverage analysis, and gap repair.
//!
//! This crate contains no tokio, sqlx, or filesystem I/O. Persistence is
//! reached only through the [`store::CatalogStore`] trait.
//!
//! ## Pipeline
//!
//! ```text
//! ┌────────────┐   ┌──────────┐   ┌────────────┐   ┌──────────┐
//! │ Classifier │──▶│ Analyzer │──▶│   Repair   │──▶│ Analyzer │
//! │ (category) │   │ (before) │   │ plan+apply │   │ (after)  │
//! └────────────┘   └──────────┘   └────────────┘   └──────────┘
//! ```
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`models`] | `CatalogItem`, `CanonicalCategory`, `ItemStatus`, `ItemPatch` |
//! | [`normalize`] | Case and punctuation folding into comparable tokens |
//! | [`classify`] | Ranked-rule category classifier |
//! | [`facet`] | Facet declarations, match rules, composite match keys |
//! | [`coverage`] | Per-value coverage counting |
//! | [`repair`] | Donor selection, repair plans, applying plans |
//! | [`pipeline`] | classify → analyze → repair → verify |
//! | [`report`] | Run report and audit trail |
//! | [`store`] | Storage trait and in-memory backend |
//! | [`error`] | Error taxonomy |

pub mod classify;
pub mod coverage;
pub mod error;
pub mod facet;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod repair;
pub mod report;
pub mod store;
