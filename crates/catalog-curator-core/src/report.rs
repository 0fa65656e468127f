//! Run report and audit trail.
//!
//! Everything a run decided is recorded here: which items were
//! reclassified, which classifications were ambiguous, per-facet coverage
//! before and after repair, every planned mutation, every failed write, and
//! every value still uncovered with the reason why. Reports are computed on
//! every run and never persisted.

use serde::Serialize;

use crate::coverage::CoverageReport;
use crate::error::WriteFailure;
use crate::models::CanonicalCategory;
use crate::repair::{ApplyOutcome, PigeonholeShortfall, RepairAction, RepairPlan};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reclassification {
    pub item_id: String,
    pub title: String,
    pub from: Option<CanonicalCategory>,
    pub to: CanonicalCategory,
    pub rule: Option<String>,
}

/// An item where more than one keyword set matched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AmbiguousItem {
    pub item_id: String,
    pub title: String,
    pub chosen: CanonicalCategory,
    pub competing: Vec<CanonicalCategory>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClassificationSummary {
    pub examined: usize,
    pub reclassified: Vec<Reclassification>,
    pub ambiguous: Vec<AmbiguousItem>,
    pub write_failures: Vec<WriteFailure>,
}

/// Why a value is still at zero coverage after repair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GapReason {
    /// Nothing could be planned for it.
    NoEligibleDonor,
    /// A mutation was planned but the store rejected it.
    WriteFailed,
    /// The write succeeded but a later mutation in the same pass took the
    /// coverage away again.
    Displaced,
}

impl GapReason {
    pub fn describe(&self) -> &'static str {
        match self {
            GapReason::NoEligibleDonor => "no eligible donor",
            GapReason::WriteFailed => "write failed",
            GapReason::Displaced => "displaced by a later repair",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedGap {
    pub value: String,
    pub reason: GapReason,
    /// The facet has fewer eligible items than values.
    pub pigeonhole: bool,
    pub detail: Option<String>,
}

/// Before/after view of one facet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacetOutcome {
    pub category: CanonicalCategory,
    pub facet: String,
    pub before: CoverageReport,
    pub after: CoverageReport,
    pub planned: Vec<RepairAction>,
    pub applied: usize,
    pub failures: Vec<WriteFailure>,
    pub unresolved: Vec<UnresolvedGap>,
    pub shortfall: Option<PigeonholeShortfall>,
}

impl FacetOutcome {
    /// Assemble the outcome of one facet from its plan, the apply result,
    /// and the verification analysis.
    pub fn new(
        category: CanonicalCategory,
        before: CoverageReport,
        after: CoverageReport,
        plan: &RepairPlan,
        outcome: &ApplyOutcome,
    ) -> Self {
        let facet = before.facet.clone();
        let planned: Vec<RepairAction> = plan.actions_for(&facet).cloned().collect();
        let failures: Vec<WriteFailure> = outcome
            .failures
            .iter()
            .filter(|f| f.facet == facet)
            .cloned()
            .collect();
        let shortfall = plan.shortfall_for(&facet).cloned();

        let unresolved = after
            .gaps()
            .into_iter()
            .map(|value| {
                let (reason, detail) = match outcome.failed(&facet, value) {
                    Some(f) => (GapReason::WriteFailed, Some(f.message.clone())),
                    None if planned.iter().any(|a| a.value == value) => {
                        (GapReason::Displaced, None)
                    }
                    None => (GapReason::NoEligibleDonor, None),
                };
                UnresolvedGap {
                    value: value.to_string(),
                    reason,
                    pigeonhole: shortfall.is_some(),
                    detail,
                }
            })
            .collect();

        let applied = planned.len().saturating_sub(failures.len());
        Self {
            category,
            facet,
            before,
            after,
            planned,
            applied,
            failures,
            unresolved,
            shortfall,
        }
    }

    pub fn is_covered(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// Everything one invocation did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub classifier_version: u32,
    pub dry_run: bool,
    pub classification: ClassificationSummary,
    pub facets: Vec<FacetOutcome>,
}

impl RunReport {
    /// True when every facet value has at least one item after repair.
    pub fn passed(&self) -> bool {
        self.facets.iter().all(FacetOutcome::is_covered)
    }

    pub fn gaps_before(&self) -> usize {
        self.facets.iter().map(|f| f.before.gaps().len()).sum()
    }

    pub fn gaps_after(&self) -> usize {
        self.facets.iter().map(|f| f.unresolved.len()).sum()
    }

    pub fn planned(&self) -> usize {
        self.facets.iter().map(|f| f.planned.len()).sum()
    }

    pub fn applied(&self) -> usize {
        self.facets.iter().map(|f| f.applied).sum()
    }

    pub fn write_failures(&self) -> usize {
        self.classification.write_failures.len()
            + self.facets.iter().map(|f| f.failures.len()).sum::<usize>()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
