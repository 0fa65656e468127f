//! The curation run: classify → analyze → repair → verify.
//!
//! A run reads the approved item set once, classifies every item and
//! persists changed categories, then for each facet set analyzes coverage,
//! plans a single repair pass, and applies it. After all sets are applied
//! the store is read once more and every facet is analyzed again for the
//! report. That second analysis never triggers another repair.
//!
//! Read failures abort the run with [`CurateError::StoreRead`]. Write
//! failures are recorded and the run continues.

use crate::classify::Classifier;
use crate::coverage::{analyze, CoverageReport};
use crate::error::{CurateError, Result, WriteFailure};
use crate::facet::FacetSet;
use crate::models::{CatalogItem, ItemPatch};
use crate::repair::{apply_plan, plan_repair, ApplyOutcome, RepairPlan};
use crate::report::{
    AmbiguousItem, ClassificationSummary, FacetOutcome, Reclassification, RunReport,
};
use crate::store::CatalogStore;

/// Options for [`Curator::run`] and [`Curator::classify_all`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CurationOptions {
    /// Plan and report without writing to the store.
    pub dry_run: bool,
}

/// Drives a run against one store with one classifier and facet config.
pub struct Curator<'a> {
    store: &'a dyn CatalogStore,
    classifier: &'a Classifier,
    facet_sets: &'a [FacetSet],
}

impl<'a> Curator<'a> {
    pub fn new(
        store: &'a dyn CatalogStore,
        classifier: &'a Classifier,
        facet_sets: &'a [FacetSet],
    ) -> Self {
        Self {
            store,
            classifier,
            facet_sets,
        }
    }

    async fn read_items(&self) -> Result<Vec<CatalogItem>> {
        self.store
            .list_approved(None)
            .await
            .map_err(CurateError::StoreRead)
    }

    /// Classify every approved item and persist categories that changed.
    ///
    /// Returns the items with their in-memory category set to the
    /// classifier's answer, whether or not the write succeeded.
    pub async fn classify_all(
        &self,
        options: CurationOptions,
    ) -> Result<(Vec<CatalogItem>, ClassificationSummary)> {
        let mut items = self.read_items().await?;
        let mut summary = ClassificationSummary {
            examined: items.len(),
            ..ClassificationSummary::default()
        };

        for item in &mut items {
            let c = self.classifier.classify(item);
            if c.is_ambiguous() {
                summary.ambiguous.push(AmbiguousItem {
                    item_id: item.id.clone(),
                    title: item.title.clone(),
                    chosen: c.category,
                    competing: c.competing.clone(),
                });
            }
            if item.canonical_category == Some(c.category) {
                continue;
            }

            summary.reclassified.push(Reclassification {
                item_id: item.id.clone(),
                title: item.title.clone(),
                from: item.canonical_category,
                to: c.category,
                rule: c.rule.clone(),
            });
            if !options.dry_run {
                if let Err(e) = self
                    .store
                    .update_item(&item.id, &ItemPatch::category(c.category))
                    .await
                {
                    let failure = WriteFailure {
                        item_id: item.id.clone(),
                        facet: "canonical_category".to_string(),
                        value: c.category.to_string(),
                        message: format!("{:#}", e),
                    };
                    log::warn!("{}", CurateError::from(&failure));
                    summary.write_failures.push(failure);
                }
            }
            item.canonical_category = Some(c.category);
        }

        log::info!(
            "classified {} item(s): {} reclassified, {} ambiguous",
            summary.examined,
            summary.reclassified.len(),
            summary.ambiguous.len()
        );
        Ok((items, summary))
    }

    /// Read-only coverage of every configured facet.
    ///
    /// Items are classified in memory only; nothing is written.
    pub async fn coverage(&self) -> Result<Vec<CoverageReport>> {
        let items = self.classified(self.read_items().await?);
        Ok(self
            .facet_sets
            .iter()
            .flat_map(|set| set.facets.iter())
            .map(|facet| analyze(&items, facet))
            .collect())
    }

    /// Full run. At most one repair pass per facet set.
    pub async fn run(&self, options: CurationOptions) -> Result<RunReport> {
        let (items, classification) = self.classify_all(options).await?;

        let mut passes: Vec<(&FacetSet, Vec<CoverageReport>, RepairPlan, ApplyOutcome)> =
            Vec::with_capacity(self.facet_sets.len());
        for set in self.facet_sets {
            let before: Vec<CoverageReport> =
                set.facets.iter().map(|f| analyze(&items, f)).collect();
            let gaps: usize = before.iter().map(|r| r.gaps().len()).sum();
            let plan = plan_repair(&items, set);
            log::info!(
                "{}: {} gap(s), {} mutation(s) planned, {} without donor",
                set.category,
                gaps,
                plan.len(),
                plan.donorless.len()
            );
            let outcome = if options.dry_run {
                ApplyOutcome::default()
            } else {
                apply_plan(self.store, &plan).await
            };
            passes.push((set, before, plan, outcome));
        }

        let verified = if options.dry_run {
            passes
                .iter()
                .fold(items, |acc, (_, _, plan, _)| plan.project(&acc))
        } else {
            self.classified(self.read_items().await?)
        };

        let mut facets = Vec::new();
        for (set, before, plan, outcome) in &passes {
            for (facet, before) in set.facets.iter().zip(before) {
                let after = analyze(&verified, facet);
                let mut fo = FacetOutcome::new(set.category, before.clone(), after, plan, outcome);
                if options.dry_run {
                    fo.applied = 0;
                }
                facets.push(fo);
            }
        }

        let report = RunReport {
            classifier_version: self.classifier.version(),
            dry_run: options.dry_run,
            classification,
            facets,
        };
        if report.passed() {
            log::info!("all facet values covered");
        } else {
            log::warn!("{} facet value(s) remain uncovered", report.gaps_after());
        }
        Ok(report)
    }

    fn classified(&self, mut items: Vec<CatalogItem>) -> Vec<CatalogItem> {
        for item in &mut items {
            item.canonical_category = Some(self.classifier.category_of(item));
        }
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ClassifierRules;
    use crate::facet::{AttributePath, Facet, FacetKind, MatchRule};
    use crate::models::CanonicalCategory;
    use crate::report::GapReason;
    use crate::store::memory::InMemoryStore;
    use anyhow::bail;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    fn classifier() -> Classifier {
        Classifier::new(&ClassifierRules::default()).unwrap()
    }

    fn facet(
        category: CanonicalCategory,
        name: &str,
        kind: FacetKind,
        attribute: AttributePath,
        values: &[&str],
    ) -> Facet {
        Facet {
            name: name.to_string(),
            category,
            kind,
            attribute,
            expected_values: values.iter().map(|v| v.to_string()).collect(),
            match_rule: MatchRule::Exact,
        }
    }

    fn guidelines_units(values: &[&str]) -> Vec<FacetSet> {
        vec![FacetSet::new(
            CanonicalCategory::Guidelines,
            vec![facet(
                CanonicalCategory::Guidelines,
                "unit",
                FacetKind::Unit,
                AttributePath::Unit,
                values,
            )],
        )
        .unwrap()]
    }

    /// Store whose reads or chosen updates fail.
    struct FlakyStore {
        inner: InMemoryStore,
        fail_reads: bool,
        fail_updates_for: Vec<String>,
    }

    #[async_trait]
    impl CatalogStore for FlakyStore {
        async fn list_approved(
            &self,
            category: Option<CanonicalCategory>,
        ) -> anyhow::Result<Vec<CatalogItem>> {
            if self.fail_reads {
                bail!("connection refused");
            }
            self.inner.list_approved(category).await
        }

        async fn update_item(&self, id: &str, patch: &ItemPatch) -> anyhow::Result<()> {
            if self.fail_updates_for.iter().any(|f| f == id) && patch.canonical_category.is_none() {
                bail!("disk full");
            }
            self.inner.update_item(id, patch).await
        }

        async fn insert_item(&self, item: &CatalogItem) -> anyhow::Result<String> {
            self.inner.insert_item(item).await
        }
    }

    #[tokio::test]
    async fn test_single_item_two_units_end_to_end() {
        let mut risk = CatalogItem::new("risk", "Risk Policy");
        risk.legacy_category = Some(String::new());
        let store = InMemoryStore::with_items(vec![risk]);
        let cls = classifier();
        let sets = guidelines_units(&["Finance", "Deals"]);

        let report = Curator::new(&store, &cls, &sets)
            .run(CurationOptions::default())
            .await
            .unwrap();

        let stored = store.snapshot();
        assert_eq!(stored[0].canonical_category, Some(CanonicalCategory::Guidelines));
        assert_eq!(stored[0].unit.as_deref(), Some("Finance"));
        assert_eq!(stored[0].title, "Risk Policy");

        assert!(!report.passed());
        let outcome = &report.facets[0];
        assert_eq!(outcome.after.count_for("Finance"), 1);
        assert_eq!(outcome.unresolved.len(), 1);
        assert_eq!(outcome.unresolved[0].value, "Deals");
        assert_eq!(outcome.unresolved[0].reason, GapReason::NoEligibleDonor);
        assert!(outcome.unresolved[0].pigeonhole);
    }

    #[tokio::test]
    async fn test_full_coverage_passes() {
        let items = vec![
            CatalogItem::new("a", "Travel Policy"),
            CatalogItem::new("b", "Expense Policy"),
        ];
        let store = InMemoryStore::with_items(items);
        let cls = classifier();
        let sets = guidelines_units(&["Finance", "Deals"]);

        let report = Curator::new(&store, &cls, &sets)
            .run(CurationOptions::default())
            .await
            .unwrap();
        assert!(report.passed());
        assert_eq!(report.gaps_before(), 2);
        assert_eq!(report.applied(), 2);
        assert_eq!(report.classification.reclassified.len(), 2);
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let store = InMemoryStore::with_items(vec![CatalogItem::new("a", "Travel Policy")]);
        let before = store.snapshot();
        let cls = classifier();
        let sets = guidelines_units(&["Finance"]);

        let report = Curator::new(&store, &cls, &sets)
            .run(CurationOptions { dry_run: true })
            .await
            .unwrap();
        assert_eq!(store.snapshot(), before);
        assert!(report.passed());
        assert_eq!(report.planned(), 1);
        assert_eq!(report.applied(), 0);
    }

    #[tokio::test]
    async fn test_read_failure_is_fatal() {
        let store = FlakyStore {
            inner: InMemoryStore::new(),
            fail_reads: true,
            fail_updates_for: Vec::new(),
        };
        let cls = classifier();
        let sets = guidelines_units(&["Finance"]);
        let err = Curator::new(&store, &cls, &sets)
            .run(CurationOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CurateError::StoreRead(_)));
    }

    #[tokio::test]
    async fn test_write_failure_is_reported_and_run_continues() {
        let store = FlakyStore {
            inner: InMemoryStore::with_items(vec![
                CatalogItem::new("a", "Travel Policy"),
                CatalogItem::new("b", "Expense Policy"),
            ]),
            fail_reads: false,
            fail_updates_for: vec!["a".to_string()],
        };
        let cls = classifier();
        let sets = guidelines_units(&["Finance", "Deals"]);

        let report = Curator::new(&store, &cls, &sets)
            .run(CurationOptions::default())
            .await
            .unwrap();
        let outcome = &report.facets[0];
        assert_eq!(outcome.applied, 1);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.after.count_for("Deals"), 1);
        assert_eq!(outcome.unresolved.len(), 1);
        assert_eq!(outcome.unresolved[0].value, "Finance");
        assert_eq!(outcome.unresolved[0].reason, GapReason::WriteFailed);
    }

    #[tokio::test]
    async fn test_second_run_after_pigeonhole_changes_nothing() {
        let items: Vec<CatalogItem> = ["a", "b", "c"]
            .iter()
            .map(|id| CatalogItem::new(*id, format!("Policy {}", id)))
            .collect();
        let store = InMemoryStore::with_items(items);
        let cls = classifier();
        let sets = guidelines_units(&["U1", "U2", "U3", "U4", "U5"]);
        let curator = Curator::new(&store, &cls, &sets);

        let first = curator.run(CurationOptions::default()).await.unwrap();
        assert_eq!(first.planned(), 3);
        assert_eq!(first.gaps_after(), 2);
        let after_first = store.snapshot();

        let second = curator.run(CurationOptions::default()).await.unwrap();
        assert_eq!(second.planned(), 0);
        assert_eq!(second.gaps_after(), 2);
        assert_eq!(store.snapshot(), after_first);
    }

    #[tokio::test]
    async fn test_single_item_does_not_oscillate() {
        let store = InMemoryStore::with_items(vec![CatalogItem::new("risk", "Risk Policy")]);
        let cls = classifier();
        let sets = guidelines_units(&["Finance", "Deals"]);
        let curator = Curator::new(&store, &cls, &sets);

        curator.run(CurationOptions::default()).await.unwrap();
        let after_first = store.snapshot();
        assert_eq!(after_first[0].unit.as_deref(), Some("Finance"));

        for _ in 0..2 {
            let report = curator.run(CurationOptions::default()).await.unwrap();
            assert_eq!(report.planned(), 0);
            let outcome = &report.facets[0];
            assert_eq!(outcome.unresolved.len(), 1);
            assert_eq!(outcome.unresolved[0].value, "Deals");
            assert_eq!(outcome.unresolved[0].reason, GapReason::NoEligibleDonor);
            assert!(outcome.unresolved[0].pigeonhole);
            assert_eq!(store.snapshot(), after_first);
        }
    }

    #[tokio::test]
    async fn test_coverage_is_read_only() {
        let store = InMemoryStore::with_items(vec![CatalogItem::new("a", "Travel Policy")]);
        let before = store.snapshot();
        let cls = classifier();
        let sets = guidelines_units(&["Finance"]);
        let reports = Curator::new(&store, &cls, &sets).coverage().await.unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].gaps(), vec!["Finance"]);
        assert_eq!(store.snapshot(), before);
    }
}
