//! Candidate and result types
//!
//! A [`Candidate`] is one source's copy of a chapter. The engine derives
//! [`ScoredCandidate`]s during a run and emits exactly one
//! [`ReconciledChapter`] per chapter key.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Provenance label used when augmentation was accepted.
pub const MERGED_SOURCE: &str = "merged";

/// One source's text for a chapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Identifier of the provider (usually a domain name)
    pub source_id: String,

    /// Chapter identity as reported by the provider (the raw title)
    pub chapter_key: String,

    /// Extracted plain text
    pub text: String,
}

impl Candidate {
    pub fn new(
        source_id: impl Into<String>,
        chapter_key: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            chapter_key: chapter_key.into(),
            text: text.into(),
        }
    }

    /// Length in characters (Unicode scalar values), not bytes
    pub fn length(&self) -> usize {
        char_len(&self.text)
    }
}

/// A candidate with the scores derived for it during one run
#[derive(Debug, Clone)]
pub struct ScoredCandidate<'a> {
    pub candidate: &'a Candidate,
    pub length: usize,
    pub length_score: f64,
    pub quality_score: f64,
    pub combined_score: f64,
}

/// Where the final content of a chapter came from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Provenance {
    /// Content of a single source, cleaned
    Source(String),
    /// Winner augmented with lines from other sources
    Merged,
}

impl Provenance {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Source(id) => id,
            Self::Merged => MERGED_SOURCE,
        }
    }

    pub fn is_merged(&self) -> bool {
        matches!(self, Self::Merged)
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Provenance {
    fn from(value: String) -> Self {
        if value == MERGED_SOURCE {
            Self::Merged
        } else {
            Self::Source(value)
        }
    }
}

impl From<Provenance> for String {
    fn from(value: Provenance) -> Self {
        match value {
            Provenance::Source(id) => id,
            Provenance::Merged => MERGED_SOURCE.to_string(),
        }
    }
}

/// The canonical version of one chapter produced by a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciledChapter {
    pub title: String,
    pub content: String,
    pub source_domain: Provenance,
    pub content_length: usize,
}

impl ReconciledChapter {
    pub(crate) fn new(title: impl Into<String>, content: String, source: Provenance) -> Self {
        let content_length = char_len(&content);
        Self {
            title: title.into(),
            content,
            source_domain: source,
            content_length,
        }
    }
}

/// Counters accumulated over one reconciliation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatistics {
    pub total: usize,
    pub merged: usize,
    pub skipped: usize,
}

impl RunStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_emitted(&mut self) {
        self.total += 1;
        self.merged += 1;
    }

    pub fn record_skipped(&mut self) {
        self.total += 1;
        self.skipped += 1;
    }

    /// Combine counters from independently processed chapter batches
    pub fn absorb(&mut self, other: RunStatistics) {
        self.total += other.total;
        self.merged += other.merged;
        self.skipped += other.skipped;
    }
}

pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}
