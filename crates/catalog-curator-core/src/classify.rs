//! Category classification.
//!
//! Maps an item's legacy fields to exactly one [`CanonicalCategory`] using a
//! ranked list of rules. The ranking is a plain value ([`ClassifierRules`])
//! injected into the [`Classifier`], so precedence can be inspected and
//! tested without touching any global state.
//!
//! # Precedence
//!
//! 1. [`CategoryRule::ExactCanonical`]: the normalized `legacy_category` is
//!    already a canonical name.
//! 2. [`CategoryRule::Keywords`] in rank order. Each rule checks
//!    `legacy_category`, then `legacy_type_label`, then `title` for a
//!    normalized substring match. The first rule that matches any field wins.
//! 3. Otherwise [`CanonicalCategory::Guidelines`].

use serde::{Deserialize, Serialize};

use crate::error::{CurateError, Result};
use crate::models::{CanonicalCategory, CatalogItem};
use crate::normalize::normalize;

/// Fallback when no rule fires.
pub const DEFAULT_CATEGORY: CanonicalCategory = CanonicalCategory::Guidelines;

/// Item fields inspected by the classifier, in inspection order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierField {
    LegacyCategory,
    LegacyTypeLabel,
    Title,
}

impl ClassifierField {
    pub const ORDER: [ClassifierField; 3] = [
        ClassifierField::LegacyCategory,
        ClassifierField::LegacyTypeLabel,
        ClassifierField::Title,
    ];

    fn read<'a>(&self, item: &'a CatalogItem) -> Option<&'a str> {
        match self {
            ClassifierField::LegacyCategory => item.legacy_category.as_deref(),
            ClassifierField::LegacyTypeLabel => item.legacy_type_label.as_deref(),
            ClassifierField::Title => Some(item.title.as_str()),
        }
    }
}

/// One ranked classification rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CategoryRule {
    /// `legacy_category` already names a canonical category.
    ExactCanonical,
    /// Any of `keywords` occurs in a classifier field.
    Keywords {
        category: CanonicalCategory,
        keywords: Vec<String>,
    },
}

impl CategoryRule {
    pub fn label(&self) -> String {
        match self {
            CategoryRule::ExactCanonical => "exact-canonical".to_string(),
            CategoryRule::Keywords { category, .. } => format!("{}-keywords", category),
        }
    }
}

/// Versioned, ranked classifier configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifierRules {
    pub version: u32,
    pub rules: Vec<CategoryRule>,
}

impl Default for ClassifierRules {
    fn default() -> Self {
        Self {
            version: 1,
            rules: vec![
                CategoryRule::ExactCanonical,
                CategoryRule::Keywords {
                    category: CanonicalCategory::Blueprint,
                    keywords: words(&[
                        "blueprint",
                        "template",
                        "playbook",
                        "reference architecture",
                        "toolkit",
                    ]),
                },
                CategoryRule::Keywords {
                    category: CanonicalCategory::Testimonial,
                    keywords: words(&[
                        "testimonial",
                        "case study",
                        "success story",
                        "customer story",
                        "lessons learned",
                    ]),
                },
                CategoryRule::Keywords {
                    category: CanonicalCategory::Strategy,
                    keywords: words(&["strategy", "strategic", "roadmap", "vision", "transformation"]),
                },
            ],
        }
    }
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

impl ClassifierRules {
    /// Check that the rule list is usable.
    ///
    /// - at least one rule, at most one `ExactCanonical`
    /// - keywords normalize to non-empty tokens
    /// - keyword sets are disjoint after normalization
    /// - no keyword set targets the default category
    /// - at most one keyword set per category
    pub fn validate(&self) -> Result<()> {
        if self.rules.is_empty() {
            return Err(CurateError::InvalidRules(
                "classifier needs at least one rule".to_string(),
            ));
        }
        let exact = self
            .rules
            .iter()
            .filter(|r| matches!(r, CategoryRule::ExactCanonical))
            .count();
        if exact > 1 {
            return Err(CurateError::InvalidRules(
                "exact-canonical rule listed more than once".to_string(),
            ));
        }

        let mut seen_categories = Vec::new();
        let mut seen_keywords: Vec<(String, CanonicalCategory)> = Vec::new();
        for rule in &self.rules {
            let CategoryRule::Keywords { category, keywords } = rule else {
                continue;
            };
            if *category == DEFAULT_CATEGORY {
                return Err(CurateError::InvalidRules(format!(
                    "'{}' is the default category and cannot have keywords",
                    category
                )));
            }
            if seen_categories.contains(category) {
                return Err(CurateError::InvalidRules(format!(
                    "more than one keyword set for '{}'",
                    category
                )));
            }
            seen_categories.push(*category);
            if keywords.is_empty() {
                return Err(CurateError::InvalidRules(format!(
                    "keyword set for '{}' is empty",
                    category
                )));
            }
            for kw in keywords {
                let token = normalize(kw);
                if token.is_empty() {
                    return Err(CurateError::InvalidRules(format!(
                        "keyword '{}' for '{}' has no letters or digits",
                        kw, category
                    )));
                }
                if let Some((_, other)) = seen_keywords.iter().find(|(t, _)| *t == token) {
                    return Err(CurateError::InvalidRules(format!(
                        "keyword '{}' appears in both '{}' and '{}'",
                        kw, other, category
                    )));
                }
                seen_keywords.push((token, *category));
            }
        }
        Ok(())
    }
}

/// Outcome of classifying one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub category: CanonicalCategory,
    /// Label of the rule that fired; `None` when the default applied.
    pub rule: Option<String>,
    /// Field that satisfied the rule.
    pub field: Option<ClassifierField>,
    /// Lower-ranked keyword categories that also matched.
    pub competing: Vec<CanonicalCategory>,
}

impl Classification {
    pub fn is_ambiguous(&self) -> bool {
        !self.competing.is_empty()
    }
}

struct CompiledRule {
    label: String,
    kind: CompiledKind,
}

enum CompiledKind {
    Exact,
    Keywords {
        category: CanonicalCategory,
        tokens: Vec<String>,
    },
}

/// Ranked-rule classifier built from [`ClassifierRules`].
pub struct Classifier {
    version: u32,
    rules: Vec<CompiledRule>,
}

impl Classifier {
    pub fn new(rules: &ClassifierRules) -> Result<Self> {
        rules.validate()?;
        let compiled = rules
            .rules
            .iter()
            .map(|rule| CompiledRule {
                label: rule.label(),
                kind: match rule {
                    CategoryRule::ExactCanonical => CompiledKind::Exact,
                    CategoryRule::Keywords { category, keywords } => CompiledKind::Keywords {
                        category: *category,
                        tokens: keywords.iter().map(|k| normalize(k)).collect(),
                    },
                },
            })
            .collect();
        Ok(Self {
            version: rules.version,
            rules: compiled,
        })
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// The bare total function: always exactly one category.
    pub fn category_of(&self, item: &CatalogItem) -> CanonicalCategory {
        self.classify(item).category
    }

    /// Classify `item`, recording which rule fired and any lower-ranked
    /// keyword sets that also matched.
    pub fn classify(&self, item: &CatalogItem) -> Classification {
        let fields: Vec<(ClassifierField, String)> = ClassifierField::ORDER
            .iter()
            .filter_map(|f| f.read(item).map(|text| (*f, normalize(text))))
            .filter(|(_, text)| !text.is_empty())
            .collect();

        let mut winner: Option<Classification> = None;
        for rule in &self.rules {
            let hit = match &rule.kind {
                CompiledKind::Exact => fields
                    .iter()
                    .find(|(f, _)| *f == ClassifierField::LegacyCategory)
                    .and_then(|(f, text)| {
                        CanonicalCategory::from_normalized(text).map(|c| (c, *f))
                    }),
                CompiledKind::Keywords { category, tokens } => fields
                    .iter()
                    .find(|(_, text)| tokens.iter().any(|t| text.contains(t.as_str())))
                    .map(|(f, _)| (*category, *f)),
            };
            let Some((category, field)) = hit else {
                continue;
            };
            match &mut winner {
                None => {
                    winner = Some(Classification {
                        category,
                        rule: Some(rule.label.clone()),
                        field: Some(field),
                        competing: Vec::new(),
                    });
                    // An exact canonical name is authoritative; keyword
                    // collisions below it are not ambiguities.
                    if matches!(rule.kind, CompiledKind::Exact) {
                        break;
                    }
                }
                Some(w) => {
                    if category != w.category && !w.competing.contains(&category) {
                        w.competing.push(category);
                    }
                }
            }
        }

        let classification = winner.unwrap_or(Classification {
            category: DEFAULT_CATEGORY,
            rule: None,
            field: None,
            competing: Vec::new(),
        });
        if classification.is_ambiguous() {
            log::debug!(
                "ambiguous classification for '{}': chose {} over {:?}",
                item.title,
                classification.category,
                classification.competing
            );
        }
        classification
    }

    /// Category of the highest-ranked keyword rule matching `text`, if any.
    /// Ignores the exact-canonical rule.
    pub fn keyword_category(&self, text: &str) -> Option<CanonicalCategory> {
        let token = normalize(text);
        self.rules.iter().find_map(|rule| match &rule.kind {
            CompiledKind::Keywords { category, tokens }
                if tokens.iter().any(|t| token.contains(t.as_str())) =>
            {
                Some(*category)
            }
            _ => None,
        })
    }
}
