//! Configuration parsing and validation.
//!
//! Catalog Curator is configured via a TOML file (default
//! `./config/curate.toml`). Only `[db]` is required; the classifier keyword
//! tables and the facet sets fall back to built-in defaults.
//!
//! ```toml
//! [db]
//! path = "./data/catalog.sqlite"
//!
//! [repair]
//! dry_run = false
//!
//! [classifier]
//! version = 2
//! order = ["blueprint", "testimonial", "strategy"]
//!
//! [classifier.keywords]
//! blueprint = ["blueprint", "template"]
//! testimonial = ["testimonial", "case study"]
//! strategy = ["strategy", "roadmap"]
//!
//! [[facet_sets]]
//! category = "strategy"
//!
//! [[facet_sets.facets]]
//! name = "strategyFramework"
//! kind = "framework"
//! attribute = "tags"
//! match = "alias"
//! values = ["OKR", "BSC"]
//! aliases = { BSC = ["Balanced Scorecard"] }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use catalog_curator_core::classify::{CategoryRule, Classifier, ClassifierRules, DEFAULT_CATEGORY};
use catalog_curator_core::facet::{AttributePath, Facet, FacetKind, FacetSet, MatchRule};
use catalog_curator_core::models::CanonicalCategory;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub repair: RepairConfig,
    #[serde(default)]
    pub classifier: Option<ClassifierConfig>,
    #[serde(default)]
    pub facet_sets: Vec<FacetSetConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RepairConfig {
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClassifierConfig {
    #[serde(default = "default_rules_version")]
    pub version: u32,
    /// Check `legacy_category` for an exact canonical name before keywords.
    #[serde(default = "default_true")]
    pub exact_canonical: bool,
    /// Rank order of keyword sets, highest first.
    #[serde(default = "default_order")]
    pub order: Vec<CanonicalCategory>,
    pub keywords: HashMap<String, Vec<String>>,
}

fn default_rules_version() -> u32 {
    1
}
fn default_true() -> bool {
    true
}
fn default_order() -> Vec<CanonicalCategory> {
    vec![
        CanonicalCategory::Blueprint,
        CanonicalCategory::Testimonial,
        CanonicalCategory::Strategy,
    ]
}

#[derive(Debug, Deserialize, Clone)]
pub struct FacetSetConfig {
    pub category: CanonicalCategory,
    pub facets: Vec<FacetConfig>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    #[default]
    Exact,
    Substring,
    Alias,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FacetConfig {
    pub name: String,
    pub kind: FacetKind,
    pub attribute: AttributePath,
    #[serde(default, rename = "match")]
    pub match_kind: MatchKind,
    pub values: Vec<String>,
    #[serde(default)]
    pub aliases: BTreeMap<String, Vec<String>>,
}

impl FacetConfig {
    fn facet(&self, category: CanonicalCategory) -> Result<Facet> {
        let match_rule = match self.match_kind {
            MatchKind::Exact | MatchKind::Substring if !self.aliases.is_empty() => bail!(
                "facet '{}': aliases require match = \"alias\"",
                self.name
            ),
            MatchKind::Exact => MatchRule::Exact,
            MatchKind::Substring => MatchRule::Substring,
            MatchKind::Alias => MatchRule::Alias {
                aliases: self.aliases.clone(),
            },
        };
        Ok(Facet {
            name: self.name.clone(),
            category,
            kind: self.kind,
            attribute: self.attribute,
            expected_values: self.values.clone(),
            match_rule,
        })
    }
}

impl Config {
    /// Classifier rules from `[classifier]`, or the built-in tables.
    pub fn classifier_rules(&self) -> Result<ClassifierRules> {
        let Some(cfg) = &self.classifier else {
            return Ok(ClassifierRules::default());
        };
        let mut keywords: HashMap<CanonicalCategory, &Vec<String>> = HashMap::new();
        for (name, words) in &cfg.keywords {
            let category: CanonicalCategory = name
                .parse()
                .with_context(|| format!("classifier.keywords.{}", name))?;
            if !cfg.order.contains(&category) {
                bail!("classifier.keywords.{} is not listed in classifier.order", name);
            }
            keywords.insert(category, words);
        }

        let mut rules = Vec::new();
        if cfg.exact_canonical {
            rules.push(CategoryRule::ExactCanonical);
        }
        for category in &cfg.order {
            if let Some(words) = keywords.get(category) {
                rules.push(CategoryRule::Keywords {
                    category: *category,
                    keywords: (*words).clone(),
                });
            }
        }
        Ok(ClassifierRules {
            version: cfg.version,
            rules,
        })
    }

    /// Facet sets from `[[facet_sets]]`, or the built-in sets.
    pub fn facet_sets(&self) -> Result<Vec<FacetSet>> {
        let configs = if self.facet_sets.is_empty() {
            default_facet_sets()
        } else {
            self.facet_sets.clone()
        };
        configs
            .iter()
            .map(|set| {
                let facets = set
                    .facets
                    .iter()
                    .map(|f| f.facet(set.category))
                    .collect::<Result<Vec<_>>>()?;
                FacetSet::new(set.category, facets)
                    .with_context(|| format!("invalid facet set '{}'", set.category))
            })
            .collect()
    }

    /// A config pointing at `db_path` with every default.
    pub fn with_db(db_path: &Path) -> Self {
        Self {
            db: DbConfig {
                path: db_path.to_path_buf(),
            },
            repair: RepairConfig::default(),
            classifier: None,
            facet_sets: Vec::new(),
        }
    }
}

/// Load, parse, and validate a config file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if let Some(cfg) = &config.classifier {
        let mut seen = Vec::new();
        for category in &cfg.order {
            if seen.contains(category) {
                bail!("classifier.order lists '{}' twice", category);
            }
            seen.push(*category);
        }
    }

    let classifier = Classifier::new(&config.classifier_rules()?)
        .with_context(|| "invalid [classifier] section")?;
    let sets = config.facet_sets()?;

    let mut categories = Vec::new();
    for set in &sets {
        if categories.contains(&set.category) {
            bail!("more than one facet set for category '{}'", set.category);
        }
        categories.push(set.category);
        check_type_values(&classifier, set)?;
    }

    Ok(())
}

/// Writing a type value into a donor must not move the donor to another
/// category on the next run. For a keyword category the value must hit
/// that category's own keyword set first; for the default category it must
/// hit none.
fn check_type_values(classifier: &Classifier, set: &FacetSet) -> Result<()> {
    for facet in &set.facets {
        if facet.attribute != AttributePath::TypeLabel {
            continue;
        }
        for value in &facet.expected_values {
            let hit = classifier.keyword_category(value);
            let ok = if set.category == DEFAULT_CATEGORY {
                hit.is_none()
            } else {
                hit == Some(set.category)
            };
            if !ok {
                bail!(
                    "facet '{}' ({}): type value '{}' would reclassify items as {}",
                    facet.name,
                    set.category,
                    value,
                    hit.unwrap_or(DEFAULT_CATEGORY)
                );
            }
        }
    }
    Ok(())
}

fn facet(
    name: &str,
    kind: FacetKind,
    attribute: AttributePath,
    match_kind: MatchKind,
    values: &[&str],
    aliases: &[(&str, &str)],
) -> FacetConfig {
    FacetConfig {
        name: name.to_string(),
        kind,
        attribute,
        match_kind,
        values: values.iter().map(|v| v.to_string()).collect(),
        aliases: aliases
            .iter()
            .map(|(k, v)| (k.to_string(), vec![v.to_string()]))
            .collect(),
    }
}

const UNITS: &[&str] = &["Finance", "Deals", "Operations", "Technology", "People"];
const LOCATIONS: &[&str] = &["Dubai", "Abu Dhabi", "Riyadh", "London"];

/// Facet sets exposed by the search UI when the config declares none.
pub fn default_facet_sets() -> Vec<FacetSetConfig> {
    use AttributePath as A;
    use FacetKind as K;

    vec![
        FacetSetConfig {
            category: CanonicalCategory::Strategy,
            facets: vec![
                facet(
                    "strategyType",
                    K::Type,
                    A::TypeLabel,
                    MatchKind::Exact,
                    &[
                        "Corporate Strategy",
                        "Business Unit Strategy",
                        "Functional Strategy",
                        "Digital Strategy",
                    ],
                    &[],
                ),
                facet(
                    "strategyFramework",
                    K::Framework,
                    A::Tags,
                    MatchKind::Alias,
                    &["OKR", "BSC", "SWOT", "PESTLE", "Porter's Five Forces"],
                    &[
                        ("OKR", "Objectives and Key Results"),
                        ("BSC", "Balanced Scorecard"),
                        ("Porter's Five Forces", "Five Forces"),
                    ],
                ),
                facet("unit", K::Unit, A::Unit, MatchKind::Substring, UNITS, &[]),
                facet("location", K::Location, A::Location, MatchKind::Exact, LOCATIONS, &[]),
            ],
        },
        FacetSetConfig {
            category: CanonicalCategory::Guidelines,
            facets: vec![
                facet(
                    "guidelineCategory",
                    K::Framework,
                    A::Tags,
                    MatchKind::Substring,
                    &["Governance", "Security", "Data Management", "Procurement", "Brand"],
                    &[],
                ),
                facet("unit", K::Unit, A::Unit, MatchKind::Substring, UNITS, &[]),
            ],
        },
        FacetSetConfig {
            category: CanonicalCategory::Blueprint,
            facets: vec![
                facet(
                    "blueprintDomain",
                    K::Framework,
                    A::Tags,
                    MatchKind::Exact,
                    &["Cloud", "Data Platform", "Integration", "Identity"],
                    &[],
                ),
                facet("location", K::Location, A::Location, MatchKind::Exact, LOCATIONS, &[]),
            ],
        },
        FacetSetConfig {
            category: CanonicalCategory::Testimonial,
            facets: vec![
                facet("unit", K::Unit, A::Unit, MatchKind::Substring, UNITS, &[]),
                facet("location", K::Location, A::Location, MatchKind::Exact, LOCATIONS, &[]),
            ],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_config(body: &str) -> (TempDir, PathBuf) {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("curate.toml");
        fs::write(&path, body).unwrap();
        (tmp, path)
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let (_tmp, path) = write_config("[db]\npath = \"./data/catalog.sqlite\"\n");
        let cfg = load_config(&path).unwrap();
        assert!(!cfg.repair.dry_run);
        assert_eq!(cfg.classifier_rules().unwrap(), ClassifierRules::default());
        let sets = cfg.facet_sets().unwrap();
        assert_eq!(sets.len(), 4);
        assert_eq!(sets[0].category, CanonicalCategory::Strategy);
    }

    #[test]
    fn test_custom_classifier_and_facets() {
        let (_tmp, path) = write_config(
            r#"
[db]
path = "catalog.sqlite"

[classifier]
version = 7
order = ["strategy", "blueprint"]

[classifier.keywords]
strategy = ["strategy"]
blueprint = ["blueprint"]

[[facet_sets]]
category = "strategy"

[[facet_sets.facets]]
name = "framework"
kind = "framework"
attribute = "tags"
match = "alias"
values = ["BSC"]
aliases = { BSC = ["Balanced Scorecard"] }

[[facet_sets.facets]]
name = "type"
kind = "type"
attribute = "legacy_type_label"
values = ["Growth Strategy"]
"#,
        );
        let cfg = load_config(&path).unwrap();
        let rules = cfg.classifier_rules().unwrap();
        assert_eq!(rules.version, 7);
        assert_eq!(rules.rules.len(), 3);
        assert!(matches!(
            &rules.rules[1],
            CategoryRule::Keywords { category: CanonicalCategory::Strategy, .. }
        ));

        let sets = cfg.facet_sets().unwrap();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].facets[1].attribute, AttributePath::TypeLabel);
        assert!(matches!(sets[0].facets[0].match_rule, MatchRule::Alias { .. }));
    }

    #[test]
    fn test_rejects_type_value_that_reclassifies() {
        let (_tmp, path) = write_config(
            r#"
[db]
path = "catalog.sqlite"

[[facet_sets]]
category = "strategy"

[[facet_sets.facets]]
name = "type"
kind = "type"
attribute = "type_label"
values = ["Strategy Blueprint"]
"#,
        );
        let err = load_config(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("would reclassify"));
    }

    #[test]
    fn test_rejects_duplicate_facet_set() {
        let (_tmp, path) = write_config(
            r#"
[db]
path = "catalog.sqlite"

[[facet_sets]]
category = "testimonial"
facets = [{ name = "unit", kind = "unit", attribute = "unit", values = ["Finance"] }]

[[facet_sets]]
category = "testimonial"
facets = [{ name = "location", kind = "location", attribute = "location", values = ["Dubai"] }]
"#,
        );
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_rejects_aliases_without_alias_match() {
        let (_tmp, path) = write_config(
            r#"
[db]
path = "catalog.sqlite"

[[facet_sets]]
category = "blueprint"
facets = [{ name = "domain", kind = "framework", attribute = "tags", values = ["Cloud"], aliases = { Cloud = ["AWS"] } }]
"#,
        );
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_example_config_matches_builtin_defaults() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/curate.example.toml");
        let cfg = load_config(&path).unwrap();
        let defaults = Config::with_db(Path::new("unused.sqlite"));
        assert_eq!(
            cfg.classifier_rules().unwrap(),
            defaults.classifier_rules().unwrap()
        );
        assert_eq!(cfg.facet_sets().unwrap(), defaults.facet_sets().unwrap());
    }

    #[test]
    fn test_missing_file_errors() {
        let err = load_config(Path::new("/nonexistent/curate.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
