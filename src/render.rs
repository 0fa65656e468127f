//! Plain-text rendering of items, coverage, and run reports.
//!
//! Every function returns a `String` so the command layer decides where it
//! goes. Tables are fixed-width with a dashed rule under the header.

use std::fmt::Write;

use catalog_curator_core::coverage::CoverageReport;
use catalog_curator_core::facet::MutationKind;
use catalog_curator_core::models::CatalogItem;
use catalog_curator_core::repair::DonorTier;
use catalog_curator_core::report::{ClassificationSummary, FacetOutcome, RunReport};

const RULE_WIDTH: usize = 76;

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", head)
    }
}

fn or_dash(value: Option<&str>) -> &str {
    match value {
        Some(v) if !v.is_empty() => v,
        _ => "-",
    }
}

fn tier_label(tier: DonorTier) -> &'static str {
    match tier {
        DonorTier::UnusedRedundant => "unused, redundant",
        DonorTier::RoundRobin => "round-robin",
    }
}

/// One row per item: id, category, unit, location, tags, title.
pub fn render_items(items: &[CatalogItem]) -> String {
    let mut out = String::new();
    if items.is_empty() {
        let _ = writeln!(out, "No approved items.");
        return out;
    }
    let _ = writeln!(
        out,
        "  {:<12} {:<12} {:<12} {:<10} {:<18} {}",
        "ID", "CATEGORY", "UNIT", "LOCATION", "TAGS", "TITLE"
    );
    let _ = writeln!(out, "  {}", "-".repeat(RULE_WIDTH));
    for item in items {
        let category = item
            .canonical_category
            .map(|c| c.to_string())
            .unwrap_or_else(|| "-".to_string());
        let tags = if item.tags.is_empty() {
            "-".to_string()
        } else {
            item.tags.join(",")
        };
        let _ = writeln!(
            out,
            "  {:<12} {:<12} {:<12} {:<10} {:<18} {}",
            truncate(&item.id, 12),
            category,
            truncate(or_dash(item.unit.as_deref()), 12),
            truncate(or_dash(item.location.as_deref()), 10),
            truncate(&tags, 18),
            item.title
        );
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "  {} item(s)", items.len());
    out
}

/// Reclassifications and ambiguities from a classification pass.
pub fn render_classification(summary: &ClassificationSummary, dry_run: bool) -> String {
    let mut out = String::new();
    let verb = if dry_run { "would reclassify" } else { "reclassified" };
    let _ = writeln!(
        out,
        "Classification: {} examined, {} {}, {} ambiguous",
        summary.examined,
        verb,
        summary.reclassified.len(),
        summary.ambiguous.len()
    );
    for r in &summary.reclassified {
        let from = r
            .from
            .map(|c| c.to_string())
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "  {:<12} {:>12} -> {:<12} {}  [{}]",
            truncate(&r.item_id, 12),
            from,
            r.to,
            r.title,
            r.rule.as_deref().unwrap_or("default")
        );
    }
    for a in &summary.ambiguous {
        let competing: Vec<String> = a.competing.iter().map(|c| c.to_string()).collect();
        let _ = writeln!(
            out,
            "  ambiguous: {} '{}' chose {} over {}",
            truncate(&a.item_id, 12),
            a.title,
            a.chosen,
            competing.join(", ")
        );
    }
    for f in &summary.write_failures {
        let _ = writeln!(out, "  write failed: {} ({})", f.item_id, f.message);
    }
    out
}

/// Per-value counts for a coverage-only view.
pub fn render_coverage(reports: &[CoverageReport]) -> String {
    let mut out = String::new();
    for report in reports {
        let _ = writeln!(out, "{} / {}", report.category, report.facet);
        let _ = writeln!(out, "  {:<32} {:>6}   {}", "VALUE", "ITEMS", "EXAMPLES");
        let _ = writeln!(out, "  {}", "-".repeat(RULE_WIDTH));
        for v in &report.values {
            let examples = if v.item_ids.is_empty() {
                "GAP".to_string()
            } else {
                let shown: Vec<String> =
                    v.item_ids.iter().take(3).map(|id| truncate(id, 12)).collect();
                shown.join(", ")
            };
            let _ = writeln!(
                out,
                "  {:<32} {:>6}   {}",
                truncate(&v.value, 32),
                v.count,
                examples
            );
        }
        let _ = writeln!(out);
    }
    let gaps: usize = reports.iter().map(|r| r.gaps().len()).sum();
    let _ = writeln!(out, "{} uncovered value(s)", gaps);
    out
}

fn render_facet(out: &mut String, facet: &FacetOutcome, dry_run: bool) {
    let _ = writeln!(out, "{} / {}", facet.category, facet.facet);
    let _ = writeln!(
        out,
        "  {:<32} {:>6} {:>6}   {}",
        "VALUE", "BEFORE", "AFTER", "ITEMS"
    );
    let _ = writeln!(out, "  {}", "-".repeat(RULE_WIDTH));
    for after in &facet.after.values {
        let before = facet.before.count_for(&after.value);
        let items = if after.item_ids.is_empty() {
            "-".to_string()
        } else {
            let shown: Vec<String> = after
                .item_ids
                .iter()
                .take(3)
                .map(|id| truncate(id, 12))
                .collect();
            shown.join(", ")
        };
        let _ = writeln!(
            out,
            "  {:<32} {:>6} {:>6}   {}",
            truncate(&after.value, 32),
            before,
            after.count,
            items
        );
    }

    if !facet.planned.is_empty() {
        let heading = if dry_run { "planned" } else { "repairs" };
        let _ = writeln!(out, "  {}:", heading);
        for action in &facet.planned {
            let change = match action.kind {
                MutationKind::ReplaceScalar => format!(
                    "{}: {} -> {}",
                    action.attribute.as_str(),
                    or_dash(action.previous.as_deref()),
                    action.value
                ),
                MutationKind::AppendTag => format!("tags: + {}", action.value),
            };
            let _ = writeln!(
                out,
                "    {:<12} {:<40} ({})  {}",
                truncate(&action.item_id, 12),
                change,
                tier_label(action.tier),
                action.item_title
            );
        }
    }

    for gap in &facet.unresolved {
        let mut line = format!("  unresolved: {} ({})", gap.value, gap.reason.describe());
        if gap.pigeonhole {
            if let Some(s) = &facet.shortfall {
                let _ = write!(
                    line,
                    " [only {} eligible item(s) for {} value(s)]",
                    s.pool_size, s.expected
                );
            }
        }
        if let Some(detail) = &gap.detail {
            let _ = write!(line, ": {}", detail);
        }
        let _ = writeln!(out, "{}", line);
    }
    let _ = writeln!(out);
}

/// The full before/after report of a run, ending in a PASS/FAIL line.
pub fn render_run(report: &RunReport) -> String {
    let mut out = String::new();
    let title = if report.dry_run {
        "Catalog Curator: run (dry-run)"
    } else {
        "Catalog Curator: run"
    };
    let _ = writeln!(out, "{}", title);
    let _ = writeln!(out, "{}", "=".repeat(title.chars().count()));
    let _ = writeln!(out);
    let _ = writeln!(out, "  Classifier:  v{}", report.classifier_version);
    let _ = write!(
        out,
        "{}",
        render_classification(&report.classification, report.dry_run)
    );
    let _ = writeln!(out);

    for facet in &report.facets {
        render_facet(&mut out, facet, report.dry_run);
    }

    let applied = if report.dry_run {
        "0 (dry-run)".to_string()
    } else {
        report.applied().to_string()
    };
    let _ = writeln!(out, "  Gaps before:     {}", report.gaps_before());
    let _ = writeln!(out, "  Planned:         {}", report.planned());
    let _ = writeln!(out, "  Applied:         {}", applied);
    let _ = writeln!(out, "  Write failures:  {}", report.write_failures());
    let _ = writeln!(out, "  Gaps after:      {}", report.gaps_after());
    let _ = writeln!(out);
    if report.passed() {
        let _ = writeln!(out, "PASS: every facet value is covered");
    } else {
        let _ = writeln!(
            out,
            "FAIL: {} facet value(s) remain uncovered",
            report.gaps_after()
        );
    }
    out
}
