//! Variant classification of raw result files.
//!
//! A file belongs to a variant when its name contains one of that variant's
//! tags. Rules are evaluated in order; a name matching rules of more than one
//! variant is rejected instead of being resolved by rule order.

use std::{fs, path::Path};

use anyhow::Context;
use log::debug;
use nicbench_common::Variant;
use serde::{Deserialize, Serialize};

use crate::error::{AggregateError, Result};

/// Maps a file name substring to a variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifierRule {
    pub pattern: String,
    pub variant: Variant,
}

/// Ordered classification rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classifier {
    pub rules: Vec<ClassifierRule>,
}

impl Default for Classifier {
    /// One rule per variant, keyed on its file tag.
    fn default() -> Self {
        Self {
            rules: Variant::ALL
                .into_iter()
                .map(|variant| ClassifierRule {
                    pattern: variant.tag().to_string(),
                    variant,
                })
                .collect(),
        }
    }
}

impl Classifier {
    /// Load classification rules from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read classifier file: {}", path.as_ref().display())
        })?;

        let classifier: Self = serde_json::from_str(&content).with_context(|| {
            format!("Failed to parse classifier file: {}", path.as_ref().display())
        })?;

        classifier.validate()?;

        Ok(classifier)
    }

    /// Save classification rules to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self).context("Failed to serialize rules")?;

        fs::write(path.as_ref(), content).with_context(|| {
            format!("Failed to write classifier file: {}", path.as_ref().display())
        })?;

        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.rules.is_empty() {
            anyhow::bail!("Classifier has no rules");
        }

        let mut seen = std::collections::HashSet::new();
        for rule in &self.rules {
            if rule.pattern.is_empty() {
                anyhow::bail!("Empty pattern for variant {}", rule.variant);
            }
            if !seen.insert(rule.pattern.as_str()) {
                anyhow::bail!("Duplicate pattern: {}", rule.pattern);
            }
        }

        Ok(())
    }

    /// Classifies a file name.
    ///
    /// Returns `Ok(None)` when no rule matches; such files are excluded from
    /// aggregation.
    ///
    /// # Errors
    ///
    /// [`AggregateError::AmbiguousVariant`] if rules of two or more variants match.
    pub fn classify(&self, file_name: &str) -> Result<Option<Variant>> {
        let mut matched: Vec<Variant> = Vec::new();
        for rule in &self.rules {
            if file_name.contains(rule.pattern.as_str()) && !matched.contains(&rule.variant) {
                matched.push(rule.variant);
            }
        }

        match matched.as_slice() {
            [] => {
                debug!("No variant rule matches '{file_name}'");
                Ok(None)
            }
            [variant] => Ok(Some(*variant)),
            _ => Err(AggregateError::AmbiguousVariant {
                file: file_name.to_string(),
                variants: matched
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }

    /// Classifies a path by its file name only; directories do not take part.
    pub fn classify_path(&self, path: &Path) -> Result<Option<Variant>> {
        match path.file_name() {
            Some(name) => self.classify(&name.to_string_lossy()),
            None => Ok(None),
        }
    }
}
