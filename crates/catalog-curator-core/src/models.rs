//! Core data models for the guide catalog.
//!
//! A [`CatalogItem`] is one published guide. Its `canonical_category` is
//! derived by the [`Classifier`](crate::classify::Classifier); `unit`,
//! `location`, `legacy_type_label`, and `tags` are the facet attributes the
//! repair engine may rewrite through an [`ItemPatch`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::normalize::normalize;

/// The closed set of top-level classifications every item resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CanonicalCategory {
    Strategy,
    Guidelines,
    Blueprint,
    Testimonial,
}

impl CanonicalCategory {
    pub const ALL: [CanonicalCategory; 4] = [
        CanonicalCategory::Strategy,
        CanonicalCategory::Guidelines,
        CanonicalCategory::Blueprint,
        CanonicalCategory::Testimonial,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalCategory::Strategy => "strategy",
            CanonicalCategory::Guidelines => "guidelines",
            CanonicalCategory::Blueprint => "blueprint",
            CanonicalCategory::Testimonial => "testimonial",
        }
    }

    /// Exact match of already-normalized text against a canonical name.
    pub fn from_normalized(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == token)
    }
}

impl fmt::Display for CanonicalCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CanonicalCategory {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_normalized(&normalize(s)).ok_or_else(|| {
            anyhow::anyhow!(
                "unknown category '{}'. Must be strategy, guidelines, blueprint, or testimonial.",
                s
            )
        })
    }
}

/// Lifecycle flag. Only [`ItemStatus::Approved`] items take part in coverage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Draft,
    Approved,
    Archived,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Draft => "draft",
            ItemStatus::Approved => "approved",
            ItemStatus::Archived => "archived",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "draft" => Ok(ItemStatus::Draft),
            "approved" => Ok(ItemStatus::Approved),
            "archived" => Ok(ItemStatus::Archived),
            _ => anyhow::bail!(
                "unknown status '{}'. Must be draft, approved, or archived.",
                s
            ),
        }
    }
}

/// One published guide as persisted in the catalog store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Store-assigned identifier. Never changes.
    pub id: String,
    pub title: String,
    /// `None` until the classifier has run for this item.
    pub canonical_category: Option<CanonicalCategory>,
    pub legacy_category: Option<String>,
    pub legacy_type_label: Option<String>,
    /// Secondary facet values (framework, sub-category). Unique by
    /// normalized form.
    pub tags: Vec<String>,
    pub unit: Option<String>,
    pub location: Option<String>,
    pub status: ItemStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

impl CatalogItem {
    /// A bare approved item with only a title. Used by seeding and tests.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            canonical_category: None,
            legacy_category: None,
            legacy_type_label: None,
            tags: Vec::new(),
            unit: None,
            location: None,
            status: ItemStatus::Approved,
            created_at: 0,
            updated_at: 0,
        }
    }

    pub fn is_approved(&self) -> bool {
        self.status == ItemStatus::Approved
    }

    /// True if `tag` is already present, compared by normalized form.
    pub fn has_tag(&self, tag: &str) -> bool {
        let wanted = normalize(tag);
        !wanted.is_empty() && self.tags.iter().any(|t| normalize(t) == wanted)
    }

    /// Overlay a patch in memory. Mirrors what a store does on update.
    pub fn apply_patch(&mut self, patch: &ItemPatch) {
        if let Some(category) = patch.canonical_category {
            self.canonical_category = Some(category);
        }
        if let Some(unit) = &patch.unit {
            self.unit = Some(unit.clone());
        }
        if let Some(location) = &patch.location {
            self.location = Some(location.clone());
        }
        if let Some(label) = &patch.legacy_type_label {
            self.legacy_type_label = Some(label.clone());
        }
        if let Some(tags) = &patch.tags {
            self.tags = dedup_tags(tags.iter().cloned());
        }
    }
}

/// Partial update accepted by [`CatalogStore::update_item`](crate::store::CatalogStore::update_item).
///
/// Only facet attributes and the canonical category are representable;
/// `id` and `title` can never be changed through a patch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ItemPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical_category: Option<CanonicalCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legacy_type_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl ItemPatch {
    pub fn category(category: CanonicalCategory) -> Self {
        Self {
            canonical_category: Some(category),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.canonical_category.is_none()
            && self.unit.is_none()
            && self.location.is_none()
            && self.legacy_type_label.is_none()
            && self.tags.is_none()
    }
}

/// Separator of the stored tag list. Never valid inside a tag.
pub const TAG_SEPARATOR: char = ',';

/// Split a comma-joined tag list into unique, trimmed tokens.
///
/// Blank tokens are dropped; duplicates (by normalized form) keep the
/// first spelling.
pub fn parse_tag_list(raw: &str) -> Vec<String> {
    dedup_tags(raw.split(TAG_SEPARATOR).map(|t| t.trim().to_string()))
}

/// Join tags back into the stored comma-separated form.
pub fn join_tag_list(tags: &[String]) -> String {
    let mut buf = [0; 4];
    let separator: &str = TAG_SEPARATOR.encode_utf8(&mut buf);
    tags.join(separator)
}

fn dedup_tags(tags: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    tags.filter(|t| {
        let key = normalize(t);
        !key.is_empty() && seen.insert(key)
    })
    .collect()
}
