//! Facet declarations and match rules.
//!
//! A [`Facet`] is one filter axis of the search UI: an item attribute plus
//! the fixed list of values the UI must be able to filter by. Facets are
//! grouped into a [`FacetSet`] per canonical category.
//!
//! Matching never scans a concatenated blob of fields. Each item is reduced
//! to a [`MatchKey`] holding the normalized scalar value(s) and tag tokens
//! for the facet's attribute, and the [`MatchRule`] states which part it
//! reads.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{CurateError, Result};
use crate::models::{CanonicalCategory, CatalogItem, ItemPatch, TAG_SEPARATOR};
use crate::normalize::{normalize, normalize_opt};

/// Facet role. Also fixes the repair order: type facets get first claim on
/// donors, then framework, unit, location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacetKind {
    Type,
    Framework,
    Unit,
    Location,
}

/// Item attribute a facet reads and the repair engine writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributePath {
    Unit,
    Location,
    #[serde(alias = "legacy_type_label")]
    TypeLabel,
    Tags,
}

/// How a facet attribute is mutated to close a gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MutationKind {
    ReplaceScalar,
    AppendTag,
}

impl AttributePath {
    pub fn is_scalar(&self) -> bool {
        !matches!(self, AttributePath::Tags)
    }

    pub fn mutation_kind(&self) -> MutationKind {
        if self.is_scalar() {
            MutationKind::ReplaceScalar
        } else {
            MutationKind::AppendTag
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AttributePath::Unit => "unit",
            AttributePath::Location => "location",
            AttributePath::TypeLabel => "legacy_type_label",
            AttributePath::Tags => "tags",
        }
    }

    /// Current raw scalar value, or `None` for the tag list.
    pub fn scalar<'a>(&self, item: &'a CatalogItem) -> Option<&'a str> {
        match self {
            AttributePath::Unit => item.unit.as_deref(),
            AttributePath::Location => item.location.as_deref(),
            AttributePath::TypeLabel => item.legacy_type_label.as_deref(),
            AttributePath::Tags => None,
        }
    }

    /// Patch that writes `value` into this attribute of `item`.
    ///
    /// Scalars are replaced. Tags are appended to the item's current list
    /// unless an equivalent token is already there.
    pub fn patch_for(&self, item: &CatalogItem, value: &str) -> ItemPatch {
        let value = value.to_string();
        match self {
            AttributePath::Unit => ItemPatch {
                unit: Some(value),
                ..ItemPatch::default()
            },
            AttributePath::Location => ItemPatch {
                location: Some(value),
                ..ItemPatch::default()
            },
            AttributePath::TypeLabel => ItemPatch {
                legacy_type_label: Some(value),
                ..ItemPatch::default()
            },
            AttributePath::Tags => {
                let mut tags = item.tags.clone();
                if !item.has_tag(&value) {
                    tags.push(value);
                }
                ItemPatch {
                    tags: Some(tags),
                    ..ItemPatch::default()
                }
            }
        }
    }
}

/// Normalized view of one attribute of one item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchKey {
    pub scalar_fields: Vec<String>,
    pub tag_tokens: Vec<String>,
}

impl MatchKey {
    pub fn for_attribute(item: &CatalogItem, attribute: AttributePath) -> Self {
        match attribute {
            AttributePath::Tags => Self {
                scalar_fields: Vec::new(),
                tag_tokens: item
                    .tags
                    .iter()
                    .map(|t| normalize(t))
                    .filter(|t| !t.is_empty())
                    .collect(),
            },
            scalar => Self {
                scalar_fields: normalize_opt(scalar.scalar(item)).into_iter().collect(),
                tag_tokens: Vec::new(),
            },
        }
    }

    fn candidates(&self) -> impl Iterator<Item = &str> {
        self.scalar_fields
            .iter()
            .chain(self.tag_tokens.iter())
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.scalar_fields.is_empty() && self.tag_tokens.is_empty()
    }
}

/// Rule deciding whether a [`MatchKey`] satisfies an expected value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum MatchRule {
    /// Normalized equality.
    Exact,
    /// Normalized substring, either direction.
    Substring,
    /// Equality or containment of the expected value or any of its alias
    /// fragments (e.g. `BSC` ↔ `Balanced Scorecard`).
    Alias {
        #[serde(default)]
        aliases: BTreeMap<String, Vec<String>>,
    },
}

impl MatchRule {
    pub fn matches(&self, expected: &str, key: &MatchKey) -> bool {
        let wanted = normalize(expected);
        if wanted.is_empty() {
            return false;
        }
        match self {
            MatchRule::Exact => key.candidates().any(|c| c == wanted),
            MatchRule::Substring => key
                .candidates()
                .any(|c| c.contains(wanted.as_str()) || wanted.contains(c)),
            MatchRule::Alias { aliases } => {
                let fragments = Self::fragments(&wanted, aliases);
                key.candidates()
                    .any(|c| fragments.iter().any(|f| c == f || c.contains(f.as_str())))
            }
        }
    }

    fn fragments(wanted: &str, aliases: &BTreeMap<String, Vec<String>>) -> Vec<String> {
        let mut out = vec![wanted.to_string()];
        for (key, extra) in aliases {
            if normalize(key) == wanted {
                out.extend(extra.iter().map(|e| normalize(e)).filter(|e| !e.is_empty()));
            }
        }
        out
    }
}

/// One declared filter axis, scoped to a single canonical category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Facet {
    pub name: String,
    pub category: CanonicalCategory,
    pub kind: FacetKind,
    pub attribute: AttributePath,
    pub expected_values: Vec<String>,
    pub match_rule: MatchRule,
}

impl Facet {
    /// True if `item` currently satisfies `expected` for this facet.
    pub fn item_matches(&self, item: &CatalogItem, expected: &str) -> bool {
        let key = MatchKey::for_attribute(item, self.attribute);
        !key.is_empty() && self.match_rule.matches(expected, &key)
    }

    /// Expected values `item` currently satisfies.
    pub fn values_matched_by<'a>(&'a self, item: &CatalogItem) -> Vec<&'a str> {
        let key = MatchKey::for_attribute(item, self.attribute);
        if key.is_empty() {
            return Vec::new();
        }
        self.expected_values
            .iter()
            .filter(|v| self.match_rule.matches(v, &key))
            .map(String::as_str)
            .collect()
    }

    /// Number of distinct expected values after normalization.
    pub fn distinct_values(&self) -> usize {
        self.expected_values
            .iter()
            .map(|v| normalize(v))
            .collect::<HashSet<_>>()
            .len()
    }
}

/// The facets the UI exposes for one canonical category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacetSet {
    pub category: CanonicalCategory,
    pub facets: Vec<Facet>,
}

impl FacetSet {
    /// Build a set and check its declarations.
    pub fn new(category: CanonicalCategory, facets: Vec<Facet>) -> Result<Self> {
        let set = Self { category, facets };
        set.validate()?;
        Ok(set)
    }

    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for facet in &self.facets {
            let invalid = |msg: String| {
                Err(CurateError::InvalidRules(format!(
                    "facet '{}' ({}): {}",
                    facet.name, self.category, msg
                )))
            };
            if facet.category != self.category {
                return invalid(format!("belongs to category '{}'", facet.category));
            }
            if !names.insert(facet.name.as_str()) {
                return invalid("declared twice".to_string());
            }
            if facet.expected_values.is_empty() {
                return invalid("has no expected values".to_string());
            }
            if facet.expected_values.iter().any(|v| normalize(v).is_empty()) {
                return invalid("has a blank expected value".to_string());
            }
            if facet.distinct_values() != facet.expected_values.len() {
                return invalid("expected values repeat after normalization".to_string());
            }
            if facet.attribute == AttributePath::Tags {
                let aliases: Vec<&String> = match &facet.match_rule {
                    MatchRule::Alias { aliases } => aliases.values().flatten().collect(),
                    _ => Vec::new(),
                };
                if let Some(v) = facet
                    .expected_values
                    .iter()
                    .chain(aliases)
                    .find(|v| v.contains(TAG_SEPARATOR))
                {
                    return invalid(format!(
                        "tag value '{}' contains the tag separator '{}'",
                        v, TAG_SEPARATOR
                    ));
                }
            }
            if let MatchRule::Alias { aliases } = &facet.match_rule {
                let expected: HashSet<String> =
                    facet.expected_values.iter().map(|v| normalize(v)).collect();
                if let Some(key) = aliases.keys().find(|k| !expected.contains(&normalize(k))) {
                    return invalid(format!("alias key '{}' is not an expected value", key));
                }
            }
        }
        Ok(())
    }

    /// Facets in repair order: by [`FacetKind`], declaration order within
    /// a kind.
    pub fn in_repair_order(&self) -> Vec<&Facet> {
        let mut ordered: Vec<&Facet> = self.facets.iter().collect();
        ordered.sort_by_key(|f| f.kind);
        ordered
    }
}
