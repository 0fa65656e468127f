//! Gap repair: choose donor items for zero-coverage facet values.
//!
//! Planning is a single pass per [`FacetSet`]. Facets are visited in
//! [`FacetKind`](crate::facet::FacetKind) order so that type facets get
//! first claim on donors. For each gap the donor is chosen by tier:
//!
//! 1. an item not yet used in this pass whose current facet values are all
//!    covered by some other item as well (overwriting it opens no new gap);
//! 2. any item not yet used in this pass;
//! 3. round-robin over the whole pool, skipping items whose same scalar
//!    attribute was already rewritten in this pass.
//!
//! If no tier yields a donor the gap is left unresolved. There are no
//! retries: one mutation attempt per gap, one pass per facet set.
//!
//! The planner works on a private projection of the snapshot, so the
//! caller's items are never mutated and every action is computed against
//! the same pre-repair state plus the actions planned before it.

use std::collections::HashSet;

use serde::Serialize;

use crate::coverage::analyze;
use crate::error::{CurateError, WriteFailure};
use crate::facet::{AttributePath, Facet, FacetSet, MutationKind};
use crate::models::{CatalogItem, ItemPatch};
use crate::store::CatalogStore;

/// Which selection tier produced a donor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DonorTier {
    /// Not yet used in this pass; every value it carries stays covered.
    UnusedRedundant,
    /// Already used for another attribute or tag in this pass.
    RoundRobin,
}

/// One planned mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepairAction {
    pub item_id: String,
    pub item_title: String,
    pub facet: String,
    pub value: String,
    pub kind: MutationKind,
    pub attribute: AttributePath,
    /// Scalar value being overwritten, if any.
    pub previous: Option<String>,
    pub tier: DonorTier,
    /// Full update to persist for this action.
    pub patch: ItemPatch,
}

/// A scalar facet with more distinct values than eligible items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PigeonholeShortfall {
    pub facet: String,
    pub pool_size: usize,
    pub expected: usize,
}

/// A gap for which no donor could be found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DonorlessGap {
    pub facet: String,
    pub value: String,
}

/// Ordered mutations for one facet set, plus what could not be planned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepairPlan {
    pub category: String,
    pub actions: Vec<RepairAction>,
    pub donorless: Vec<DonorlessGap>,
    pub shortfalls: Vec<PigeonholeShortfall>,
}

impl RepairPlan {
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn actions_for<'a>(&'a self, facet: &'a str) -> impl Iterator<Item = &'a RepairAction> {
        self.actions.iter().filter(move |a| a.facet == facet)
    }

    pub fn shortfall_for(&self, facet: &str) -> Option<&PigeonholeShortfall> {
        self.shortfalls.iter().find(|s| s.facet == facet)
    }

    /// Items as they would look after every action succeeded.
    pub fn project(&self, items: &[CatalogItem]) -> Vec<CatalogItem> {
        let mut projected = items.to_vec();
        for action in &self.actions {
            if let Some(item) = projected.iter_mut().find(|i| i.id == action.item_id) {
                item.apply_patch(&action.patch);
            }
        }
        projected
    }
}

/// Result of persisting a plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyOutcome {
    pub applied: usize,
    pub failures: Vec<WriteFailure>,
}

impl ApplyOutcome {
    pub fn failed(&self, facet: &str, value: &str) -> Option<&WriteFailure> {
        self.failures
            .iter()
            .find(|f| f.facet == facet && f.value == value)
    }
}

struct Planner<'a> {
    set: &'a FacetSet,
    pool: Vec<CatalogItem>,
    used: HashSet<String>,
    rewritten: HashSet<(String, AttributePath)>,
    cursor: usize,
}

/// Plan repairs for every zero-coverage value in `set`.
pub fn plan_repair(items: &[CatalogItem], set: &FacetSet) -> RepairPlan {
    let pool: Vec<CatalogItem> = items
        .iter()
        .filter(|i| i.is_approved() && i.canonical_category == Some(set.category))
        .cloned()
        .collect();

    let mut planner = Planner {
        set,
        pool,
        used: HashSet::new(),
        rewritten: HashSet::new(),
        cursor: 0,
    };
    planner.run()
}

impl<'a> Planner<'a> {
    fn run(&mut self) -> RepairPlan {
        let mut plan = RepairPlan {
            category: self.set.category.to_string(),
            actions: Vec::new(),
            donorless: Vec::new(),
            shortfalls: Vec::new(),
        };

        let set = self.set;
        for facet in set.in_repair_order() {
            let expected = facet.distinct_values();
            let pool_size = self.pool.len();
            if pool_size == 0 || (facet.attribute.is_scalar() && pool_size < expected) {
                log::warn!(
                    "{}/{}: {} eligible item(s) for {} value(s); full coverage is impossible",
                    self.set.category,
                    facet.name,
                    pool_size,
                    expected
                );
                plan.shortfalls.push(PigeonholeShortfall {
                    facet: facet.name.clone(),
                    pool_size,
                    expected,
                });
            }

            let gaps: Vec<String> = analyze(&self.pool, facet)
                .gaps()
                .into_iter()
                .map(String::from)
                .collect();

            for gap in gaps {
                // An earlier action in this facet may already cover it.
                if self.pool.iter().any(|i| facet.item_matches(i, &gap)) {
                    continue;
                }
                match self.select_donor(facet, &gap) {
                    Some((idx, tier)) => plan.actions.push(self.commit(facet, &gap, idx, tier)),
                    None => {
                        log::debug!("{}/{}: no donor for '{}'", self.set.category, facet.name, gap);
                        plan.donorless.push(DonorlessGap {
                            facet: facet.name.clone(),
                            value: gap,
                        });
                    }
                }
            }
        }

        plan
    }

    fn select_donor(&mut self, facet: &Facet, gap: &str) -> Option<(usize, DonorTier)> {
        let unused = (0..self.pool.len()).find(|&i| {
            !self.used.contains(&self.pool[i].id)
                && self.eligible(facet, i, gap)
                && !self.loses_coverage(facet.attribute, i)
        });
        if let Some(idx) = unused {
            return Some((idx, DonorTier::UnusedRedundant));
        }

        let n = self.pool.len();
        for step in 0..n {
            let idx = (self.cursor + step) % n;
            if self.eligible(facet, idx, gap) && !self.loses_coverage(facet.attribute, idx) {
                self.cursor = (idx + 1) % n;
                return Some((idx, DonorTier::RoundRobin));
            }
        }
        None
    }

    fn eligible(&self, facet: &Facet, idx: usize, gap: &str) -> bool {
        let item = &self.pool[idx];
        match facet.attribute {
            AttributePath::Tags => !item.has_tag(gap),
            attr => !self.rewritten.contains(&(item.id.clone(), attr)),
        }
    }

    /// Would overwriting this item's `attribute` drop a value of any facet
    /// reading that attribute to zero? Appends never lose coverage.
    /// A donor that fails this check is never taken, in any tier.
    fn loses_coverage(&self, attribute: AttributePath, idx: usize) -> bool {
        if !attribute.is_scalar() {
            return false;
        }
        let donor = &self.pool[idx];
        self.set
            .facets
            .iter()
            .filter(|f| f.attribute == attribute)
            .any(|f| {
                f.values_matched_by(donor).into_iter().any(|value| {
                    !self
                        .pool
                        .iter()
                        .enumerate()
                        .any(|(j, other)| j != idx && f.item_matches(other, value))
                })
            })
    }

    fn commit(&mut self, facet: &Facet, gap: &str, idx: usize, tier: DonorTier) -> RepairAction {
        let donor = &mut self.pool[idx];
        let patch = facet.attribute.patch_for(donor, gap);
        let action = RepairAction {
            item_id: donor.id.clone(),
            item_title: donor.title.clone(),
            facet: facet.name.clone(),
            value: gap.to_string(),
            kind: facet.attribute.mutation_kind(),
            attribute: facet.attribute,
            previous: facet.attribute.scalar(donor).map(String::from),
            tier,
            patch,
        };
        log::debug!(
            "{}/{}: '{}' ← item {} ({:?})",
            self.set.category,
            facet.name,
            gap,
            action.item_id,
            tier
        );

        donor.apply_patch(&action.patch);
        self.used.insert(action.item_id.clone());
        if facet.attribute.is_scalar() {
            self.rewritten
                .insert((action.item_id.clone(), facet.attribute));
        }
        action
    }
}

/// Persist every action as an independent update.
///
/// A failed update is logged and recorded; the remaining actions still run.
pub async fn apply_plan(store: &dyn CatalogStore, plan: &RepairPlan) -> ApplyOutcome {
    let mut outcome = ApplyOutcome::default();
    for action in &plan.actions {
        match store.update_item(&action.item_id, &action.patch).await {
            Ok(()) => outcome.applied += 1,
            Err(e) => {
                let failure = WriteFailure {
                    item_id: action.item_id.clone(),
                    facet: action.facet.clone(),
                    value: action.value.clone(),
                    message: format!("{:#}", e),
                };
                log::warn!("{}", CurateError::from(&failure));
                outcome.failures.push(failure);
            }
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facet::{FacetKind, MatchRule};
    use crate::models::CanonicalCategory;
    use crate::store::memory::InMemoryStore;
    use pretty_assertions::assert_eq;

    const CAT: CanonicalCategory = CanonicalCategory::Strategy;

    fn facet(name: &str, kind: FacetKind, attribute: AttributePath, values: &[&str]) -> Facet {
        Facet {
            name: name.to_string(),
            category: CAT,
            kind,
            attribute,
            expected_values: values.iter().map(|v| v.to_string()).collect(),
            match_rule: MatchRule::Exact,
        }
    }

    fn item(id: &str, unit: Option<&str>) -> CatalogItem {
        let mut item = CatalogItem::new(id, format!("Guide {}", id));
        item.canonical_category = Some(CAT);
        item.unit = unit.map(String::from);
        item
    }

    fn unit_set(values: &[&str]) -> FacetSet {
        FacetSet::new(CAT, vec![facet("unit", FacetKind::Unit, AttributePath::Unit, values)]).unwrap()
    }

    #[test]
    fn test_fills_gap_with_redundant_donor() {
        // a and b both cover Finance; c alone covers Deals.
        let items = vec![
            item("c", Some("Deals")),
            item("a", Some("Finance")),
            item("b", Some("Finance")),
        ];
        let plan = plan_repair(&items, &unit_set(&["Finance", "Deals", "Operations"]));
        assert_eq!(plan.len(), 1);
        let action = &plan.actions[0];
        assert_eq!(action.item_id, "a");
        assert_eq!(action.value, "Operations");
        assert_eq!(action.previous.as_deref(), Some("Finance"));
        assert_eq!(action.tier, DonorTier::UnusedRedundant);
        assert_eq!(action.kind, MutationKind::ReplaceScalar);
    }

    #[test]
    fn test_planner_does_not_mutate_input() {
        let items = vec![item("a", None), item("b", None)];
        let before = items.clone();
        let plan = plan_repair(&items, &unit_set(&["Finance", "Deals"]));
        assert_eq!(plan.len(), 2);
        assert_eq!(items, before);
    }

    #[test]
    fn test_pigeonhole_leaves_values_unresolved() {
        let items = vec![item("a", None), item("b", None), item("c", None)];
        let plan = plan_repair(&items, &unit_set(&["U1", "U2", "U3", "U4", "U5"]));
        assert_eq!(plan.len(), 3);
        assert_eq!(plan.donorless.len(), 2);
        let shortfall = plan.shortfall_for("unit").unwrap();
        assert_eq!((shortfall.pool_size, shortfall.expected), (3, 5));

        let projected = plan.project(&items);
        let report = analyze(&projected, &unit_set(&["U1"]).facets[0]);
        assert_eq!(report.count_for("U1"), 1);
    }

    #[test]
    fn test_single_item_takes_first_gap_only() {
        let items = vec![item("only", None)];
        let plan = plan_repair(&items, &unit_set(&["Finance", "Deals"]));
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.actions[0].value, "Finance");
        assert_eq!(
            plan.donorless,
            vec![DonorlessGap {
                facet: "unit".to_string(),
                value: "Deals".to_string(),
            }]
        );
    }

    #[test]
    fn test_sole_carrier_is_never_displaced() {
        let items = vec![item("only", Some("Finance"))];
        let plan = plan_repair(&items, &unit_set(&["Finance", "Deals"]));
        assert!(plan.is_empty());
        assert_eq!(plan.donorless.len(), 1);
        assert_eq!(plan.donorless[0].value, "Deals");
        assert!(plan.shortfall_for("unit").is_some());
    }

    #[test]
    fn test_donor_keeps_coverage_of_every_facet_on_attribute() {
        // a is the only Finance item for "unit"; b and c share Deals.
        let items = vec![
            item("a", Some("Finance")),
            item("b", Some("Deals")),
            item("c", Some("Deals")),
        ];
        let set = FacetSet::new(
            CAT,
            vec![
                facet("unit", FacetKind::Unit, AttributePath::Unit, &["Finance", "Deals"]),
                facet("businessUnit", FacetKind::Unit, AttributePath::Unit, &["Operations"]),
            ],
        )
        .unwrap();
        let plan = plan_repair(&items, &set);
        assert_eq!(plan.len(), 1);
        let action = &plan.actions[0];
        assert_eq!(action.facet, "businessUnit");
        assert_eq!(action.item_id, "b");
        assert_eq!(action.previous.as_deref(), Some("Deals"));

        let projected = plan.project(&items);
        assert_eq!(analyze(&projected, &set.facets[0]).count_for("Finance"), 1);
    }

    #[test]
    fn test_type_facet_claims_donor_before_unit() {
        let items = vec![item("a", Some("Finance")), item("b", None)];
        let set = FacetSet::new(
            CAT,
            vec![
                facet("unit", FacetKind::Unit, AttributePath::Unit, &["Finance", "Deals"]),
                facet("type", FacetKind::Type, AttributePath::TypeLabel, &["Roadmap"]),
            ],
        )
        .unwrap();
        let plan = plan_repair(&items, &set);
        assert_eq!(plan.actions[0].facet, "type");
        assert_eq!(plan.actions[0].item_id, "a");
        // a is used, so the unit gap goes to b.
        assert_eq!(plan.actions[1].facet, "unit");
        assert_eq!(plan.actions[1].item_id, "b");
    }

    #[test]
    fn test_round_robin_reuses_donor_across_attributes() {
        let items = vec![item("a", None)];
        let set = FacetSet::new(
            CAT,
            vec![
                facet("unit", FacetKind::Unit, AttributePath::Unit, &["Finance"]),
                facet("location", FacetKind::Location, AttributePath::Location, &["Dubai"]),
            ],
        )
        .unwrap();
        let plan = plan_repair(&items, &set);
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.actions[1].tier, DonorTier::RoundRobin);
        assert!(plan.donorless.is_empty());
    }

    #[test]
    fn test_tag_appends_compose_on_one_item() {
        let mut a = item("a", None);
        a.tags = vec!["OKR".to_string()];
        let set = FacetSet::new(
            CAT,
            vec![facet(
                "framework",
                FacetKind::Framework,
                AttributePath::Tags,
                &["OKR", "BSC", "SWOT"],
            )],
        )
        .unwrap();
        let plan = plan_repair(&[a.clone()], &set);
        assert_eq!(plan.len(), 2);
        assert!(plan.actions.iter().all(|x| x.kind == MutationKind::AppendTag));
        assert_eq!(
            plan.actions[1].patch.tags,
            Some(vec!["OKR".to_string(), "BSC".to_string(), "SWOT".to_string()])
        );
        let projected = plan.project(&[a]);
        assert_eq!(projected[0].tags, vec!["OKR", "BSC", "SWOT"]);
    }

    #[test]
    fn test_empty_pool_is_shortfall_for_every_facet() {
        let set = FacetSet::new(
            CAT,
            vec![facet("framework", FacetKind::Framework, AttributePath::Tags, &["OKR"])],
        )
        .unwrap();
        let plan = plan_repair(&[], &set);
        assert!(plan.is_empty());
        assert_eq!(plan.shortfalls.len(), 1);
        assert_eq!(plan.donorless.len(), 1);
    }

    #[tokio::test]
    async fn test_apply_plan_continues_after_failure() {
        let store = InMemoryStore::new();
        store.insert_item(&item("a", None)).await.unwrap();
        let items = vec![item("ghost", None), item("a", None)];
        let plan = plan_repair(&items, &unit_set(&["Finance", "Deals"]));
        assert_eq!(plan.len(), 2);

        let outcome = apply_plan(&store, &plan).await;
        assert_eq!(outcome.applied, 1);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].item_id, "ghost");
        assert!(outcome.failed("unit", "Finance").is_some());

        let stored = store.list_approved(None).await.unwrap();
        assert_eq!(stored[0].unit.as_deref(), Some("Deals"));
    }
}
