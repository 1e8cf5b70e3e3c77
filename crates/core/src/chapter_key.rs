//! Cross-source chapter identity
//!
//! Providers disagree on title punctuation, spacing and numbering style
//! (`第一百章`, `第100章`, `第 100 章：`). Candidates are grouped by a
//! [`ChapterKey`] computed once per candidate, not by the raw title string.

use std::fmt;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::normalizers::{CompatibilityFold, Lowercase, NumeralNormalizer, RemovePunctuation};
use crate::pipeline::TextPipeline;

static KEY_PIPELINE: LazyLock<TextPipeline> = LazyLock::new(|| {
    TextPipeline::new()
        .add_normalizer(Box::new(CompatibilityFold))
        .add_normalizer(Box::new(Lowercase))
        .add_normalizer(Box::new(NumeralNormalizer))
        .add_normalizer(Box::new(RemovePunctuation))
});

/// How raw titles are turned into grouping keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyPolicy {
    /// Fold width and case, unify numerals, drop whitespace and punctuation
    #[default]
    Normalized,
    /// Use the raw title as-is
    Exact,
}

/// A deterministic chapter identity shared across sources
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChapterKey(String);

impl ChapterKey {
    pub fn from_title(title: &str, policy: KeyPolicy) -> Self {
        match policy {
            KeyPolicy::Exact => Self(title.to_string()),
            KeyPolicy::Normalized => {
                let normalized = KEY_PIPELINE.apply(title);
                // Titles made only of punctuation still need a stable key
                if normalized.is_empty() {
                    Self(title.trim().to_string())
                } else {
                    Self(normalized)
                }
            }
        }
    }

    pub fn normalized(title: &str) -> Self {
        Self::from_title(title, KeyPolicy::Normalized)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChapterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChapterKey {
    fn from(value: &str) -> Self {
        Self::normalized(value)
    }
}
