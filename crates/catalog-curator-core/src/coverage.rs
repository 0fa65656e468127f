//! Facet coverage analysis.
//!
//! For one facet, counts how many in-scope items satisfy each expected
//! value. In scope means `Approved` and classified into the facet's
//! category. Pure: inputs are only borrowed, and the result depends only on
//! the item set. Cost is `O(items × expected_values)`.

use serde::Serialize;

use crate::facet::{Facet, MatchKey};
use crate::models::CatalogItem;

/// Coverage of one expected value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueCoverage {
    pub value: String,
    pub count: usize,
    pub item_ids: Vec<String>,
}

/// Coverage of every expected value of one facet, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoverageReport {
    pub facet: String,
    pub category: String,
    pub values: Vec<ValueCoverage>,
}

impl CoverageReport {
    /// Expected values with zero matching items.
    pub fn gaps(&self) -> Vec<&str> {
        self.values
            .iter()
            .filter(|v| v.count == 0)
            .map(|v| v.value.as_str())
            .collect()
    }

    pub fn is_covered(&self) -> bool {
        self.values.iter().all(|v| v.count > 0)
    }

    pub fn count_for(&self, value: &str) -> usize {
        self.values
            .iter()
            .find(|v| v.value == value)
            .map(|v| v.count)
            .unwrap_or(0)
    }
}

/// Items the facet counts: approved and in the facet's category.
pub fn in_scope<'a>(items: &'a [CatalogItem], facet: &'a Facet) -> impl Iterator<Item = &'a CatalogItem> {
    items
        .iter()
        .filter(move |i| i.is_approved() && i.canonical_category == Some(facet.category))
}

/// Count matching items for each expected value of `facet`.
pub fn analyze(items: &[CatalogItem], facet: &Facet) -> CoverageReport {
    let keyed: Vec<(&CatalogItem, MatchKey)> = in_scope(items, facet)
        .map(|i| (i, MatchKey::for_attribute(i, facet.attribute)))
        .filter(|(_, k)| !k.is_empty())
        .collect();

    let values = facet
        .expected_values
        .iter()
        .map(|expected| {
            let item_ids: Vec<String> = keyed
                .iter()
                .filter(|(_, key)| facet.match_rule.matches(expected, key))
                .map(|(item, _)| item.id.clone())
                .collect();
            ValueCoverage {
                value: expected.clone(),
                count: item_ids.len(),
                item_ids,
            }
        })
        .collect();

    CoverageReport {
        facet: facet.name.clone(),
        category: facet.category.to_string(),
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facet::{AttributePath, FacetKind, MatchRule};
    use crate::models::{CanonicalCategory, ItemStatus};
    use pretty_assertions::assert_eq;

    fn unit_facet(values: &[&str]) -> Facet {
        Facet {
            name: "unit".to_string(),
            category: CanonicalCategory::Strategy,
            kind: FacetKind::Unit,
            attribute: AttributePath::Unit,
            expected_values: values.iter().map(|v| v.to_string()).collect(),
            match_rule: MatchRule::Exact,
        }
    }

    fn strategy_item(id: &str, unit: Option<&str>) -> CatalogItem {
        let mut item = CatalogItem::new(id, format!("Item {}", id));
        item.canonical_category = Some(CanonicalCategory::Strategy);
        item.unit = unit.map(String::from);
        item
    }

    #[test]
    fn test_counts_matches_and_gaps() {
        let items = vec![strategy_item("a", Some("A")), strategy_item("b", Some("a"))];
        let report = analyze(&items, &unit_facet(&["A", "B"]));
        assert_eq!(report.values[0].count, 2);
        assert_eq!(report.values[0].item_ids, vec!["a", "b"]);
        assert_eq!(report.values[1].count, 0);
        assert_eq!(report.gaps(), vec!["B"]);
        assert!(!report.is_covered());
    }

    #[test]
    fn test_only_approved_items_in_category_count() {
        let mut draft = strategy_item("draft", Some("A"));
        draft.status = ItemStatus::Draft;
        let mut other = strategy_item("other", Some("A"));
        other.canonical_category = Some(CanonicalCategory::Blueprint);
        let mut unclassified = strategy_item("unclassified", Some("A"));
        unclassified.canonical_category = None;

        let report = analyze(&[draft, other, unclassified], &unit_facet(&["A"]));
        assert_eq!(report.count_for("A"), 0);
    }

    #[test]
    fn test_analyze_does_not_mutate_items() {
        let items = vec![strategy_item("a", Some("A")), strategy_item("b", None)];
        let before = items.clone();
        let _ = analyze(&items, &unit_facet(&["A", "B"]));
        assert_eq!(items, before);
    }

    #[test]
    fn test_tag_facet_counts_any_token() {
        let mut item = strategy_item("a", None);
        item.tags = vec!["Balanced Scorecard".to_string(), "OKR".to_string()];
        let mut aliases = std::collections::BTreeMap::new();
        aliases.insert("BSC".to_string(), vec!["balanced scorecard".to_string()]);
        let facet = Facet {
            name: "framework".to_string(),
            category: CanonicalCategory::Strategy,
            kind: FacetKind::Framework,
            attribute: AttributePath::Tags,
            expected_values: vec!["BSC".to_string(), "OKR".to_string(), "SWOT".to_string()],
            match_rule: MatchRule::Alias { aliases },
        };
        let report = analyze(&[item], &facet);
        assert_eq!(report.gaps(), vec!["SWOT"]);
    }
}
