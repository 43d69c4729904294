//! Content template library for the offline scorecard generator.
//!
//! Pools live in `content/templates.toml`. The file is compiled in as the
//! default and can be swapped at startup with `TRUSTCARD_TEMPLATES_PATH`.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrustcardError};
use crate::schemas::{Flag, LockedInsight, Metric, Rewrite, Scores};

/// Placeholder replaced with the resolved builder label
pub const BUILDER_TOKEN: &str = "{{builder}}";

const BUILTIN_TEMPLATES: &str = include_str!("../content/templates.toml");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparison {
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Keyword {
    Always,
}

/// Predicate over the derived scores
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Condition {
    Keyword(Keyword),
    Compare {
        metric: Metric,
        op: Comparison,
        value: f64,
    },
}

impl Condition {
    pub fn holds(&self, scores: &Scores) -> bool {
        match *self {
            Condition::Keyword(Keyword::Always) => true,
            Condition::Compare { metric, op, value } => {
                let v = f64::from(scores.get(metric));
                match op {
                    Comparison::Lt => v < value,
                    Comparison::Le => v <= value,
                    Comparison::Gt => v > value,
                    Comparison::Ge => v >= value,
                }
            }
        }
    }

    pub fn is_catch_all(&self) -> bool {
        matches!(self, Condition::Keyword(Keyword::Always))
    }
}

/// Something that can be keyed for de-duplication when rule pools overlap
pub trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for Flag {
    fn key(&self) -> &str {
        &self.title
    }
}

impl Keyed for Rewrite {
    fn key(&self) -> &str {
        &self.before
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleGroup<T> {
    pub name: String,
    pub when: Condition,
    pub templates: Vec<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateLibrary {
    pub flag_rules: Vec<RuleGroup<Flag>>,
    pub rewrite_rules: Vec<RuleGroup<Rewrite>>,
    pub locked_insights: Vec<LockedInsight>,
    pub experiments: Vec<String>,
    pub checklist: Vec<String>,
}

impl TemplateLibrary {
    /// Library compiled into the binary
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN_TEMPLATES)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let lib: TemplateLibrary = toml::from_str(content)?;
        lib.validate()?;
        Ok(lib)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| TrustcardError::Templates {
            message: format!("failed to read {}: {}", path.display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    /// Load from `path` when given, otherwise the builtin library
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => {
                tracing::info!("Loading template library from {}", p.display());
                Self::from_path(p)
            }
            None => Self::builtin(),
        }
    }

    /// Reject libraries the sampler cannot serve: empty pools or rule lists
    /// that can leave a score combination without candidates.
    pub fn validate(&self) -> Result<()> {
        check_rules("flag_rules", &self.flag_rules)?;
        check_rules("rewrite_rules", &self.rewrite_rules)?;
        for (name, empty) in [
            ("locked_insights", self.locked_insights.is_empty()),
            ("experiments", self.experiments.is_empty()),
            ("checklist", self.checklist.is_empty()),
        ] {
            if empty {
                return Err(TrustcardError::Templates {
                    message: format!("{name} pool is empty"),
                });
            }
        }
        Ok(())
    }

    pub fn flag_pool(&self, scores: &Scores) -> Vec<&Flag> {
        matching_pool(&self.flag_rules, scores)
    }

    pub fn rewrite_pool(&self, scores: &Scores) -> Vec<&Rewrite> {
        matching_pool(&self.rewrite_rules, scores)
    }
}

fn check_rules<T>(label: &str, rules: &[RuleGroup<T>]) -> Result<()> {
    if rules.is_empty() {
        return Err(TrustcardError::Templates {
            message: format!("{label} has no rule groups"),
        });
    }
    if let Some(group) = rules.iter().find(|g| g.templates.is_empty()) {
        return Err(TrustcardError::Templates {
            message: format!("{label} group '{}' has no templates", group.name),
        });
    }
    if !rules.iter().any(|g| g.when.is_catch_all()) {
        return Err(TrustcardError::Templates {
            message: format!("{label} needs an `always` group"),
        });
    }
    Ok(())
}

/// Union of the templates of every group whose predicate holds, in group
/// order, first occurrence wins. Falls back to every template when nothing
/// matches.
pub fn matching_pool<'a, T: Keyed>(rules: &'a [RuleGroup<T>], scores: &Scores) -> Vec<&'a T> {
    let pool = dedup(
        rules
            .iter()
            .filter(|g| g.when.holds(scores))
            .flat_map(|g| g.templates.iter()),
    );
    if pool.is_empty() {
        tracing::warn!("No rule group matched scores {:?}; using full template set", scores);
        return dedup(rules.iter().flat_map(|g| g.templates.iter()));
    }
    pool
}

fn dedup<'a, T: Keyed + 'a>(items: impl Iterator<Item = &'a T>) -> Vec<&'a T> {
    let mut seen = HashSet::new();
    items.filter(|t| seen.insert(t.key())).collect()
}

/// Replace every builder placeholder in `text`
pub fn instantiate(text: &str, builder_label: &str) -> String {
    text.replace(BUILDER_TOKEN, builder_label)
}
