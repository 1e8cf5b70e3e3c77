//! Pairwise similarity between candidate texts
//!
//! The ratio is the Ratcliff/Obershelp "gestalt" measure: find the longest
//! common block, recurse on the pieces to its left and right, and report
//! `2 * matched / (len(a) + len(b))`. Texts are compared as sequences of
//! Unicode scalar values. Block search breaks ties toward the earliest
//! position in the first operand, which makes the raw measure order
//! dependent; [`similarity`] puts its operands in a canonical order first so
//! the result is symmetric.
//!
//! Once the second operand reaches [`POPULAR_MIN_LENGTH`] characters, any
//! character making up more than 1% of it cannot start a block. Such
//! characters only join a block by extending one found elsewhere.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::candidate::Candidate;

/// Boundary between the "medium" and "low" tiers
pub const MEDIUM_SIMILARITY: f64 = 0.5;

/// Second-operand length from which popular characters are pruned
pub const POPULAR_MIN_LENGTH: usize = 200;

/// Similarity ratio in `[0, 1]`; symmetric, and 1.0 for identical texts
pub fn similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    let (first, second) = if a <= b { (a, b) } else { (b, a) };
    let first: Vec<char> = first.chars().collect();
    let second: Vec<char> = second.chars().collect();

    let total = first.len() + second.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_characters(&first, &second) as f64 / total as f64
}

/// Total size of all matching blocks between `a` and `b`
fn matching_characters(a: &[char], b: &[char]) -> usize {
    let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
    for (j, &ch) in b.iter().enumerate() {
        b2j.entry(ch).or_default().push(j);
    }
    if b.len() >= POPULAR_MIN_LENGTH {
        let limit = b.len() / 100 + 1;
        b2j.retain(|_, positions| positions.len() <= limit);
    }

    let mut matched = 0;
    let mut queue = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = queue.pop() {
        let (i, j, k) = longest_match(a, b, &b2j, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        matched += k;
        if alo < i && blo < j {
            queue.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            queue.push((i + k, ahi, j + k, bhi));
        }
    }

    matched
}

/// Longest block `a[i..i+k] == b[j..j+k]` inside the given ranges
fn longest_match(
    a: &[char],
    b: &[char],
    b2j: &HashMap<char, Vec<usize>>,
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);
    // j -> length of the match ending at a[i - 1], b[j]
    let mut j2len: HashMap<usize, usize> = HashMap::new();

    for (i, ch) in a.iter().enumerate().take(ahi).skip(alo) {
        let mut next_j2len = HashMap::new();
        if let Some(positions) = b2j.get(ch) {
            for &j in positions {
                if j < blo {
                    continue;
                }
                if j >= bhi {
                    break;
                }
                let k = j
                    .checked_sub(1)
                    .and_then(|prev| j2len.get(&prev))
                    .copied()
                    .unwrap_or(0)
                    + 1;
                next_j2len.insert(j, k);
                if k > best_size {
                    best_i = i + 1 - k;
                    best_j = j + 1 - k;
                    best_size = k;
                }
            }
        }
        j2len = next_j2len;
    }

    // Grow the block over neighbours that pruning hid from the index
    while best_i > alo && best_j > blo && a[best_i - 1] == b[best_j - 1] {
        best_i -= 1;
        best_j -= 1;
        best_size += 1;
    }
    while best_i + best_size < ahi
        && best_j + best_size < bhi
        && a[best_i + best_size] == b[best_j + best_size]
    {
        best_size += 1;
    }

    (best_i, best_j, best_size)
}

/// Similarity of one pair of sources for a chapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityEdge {
    pub domains: [String; 2],
    pub similarity: f64,
}

impl SimilarityEdge {
    pub fn involves(&self, source_id: &str) -> bool {
        self.domains.iter().any(|d| d == source_id)
    }
}

/// Reporting bucket for a chapter's average similarity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityTier {
    High,
    Medium,
    Low,
}

impl SimilarityTier {
    /// `high_threshold` is the configured similarity threshold
    pub fn classify(average: f64, high_threshold: f64) -> Self {
        if average >= high_threshold {
            Self::High
        } else if average >= MEDIUM_SIMILARITY {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// All pairwise comparisons for one chapter key
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChapterComparison {
    #[serde(default)]
    pub comparisons: Vec<SimilarityEdge>,

    /// BLAKE3 digest of each source's text
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub content_hashes: BTreeMap<String, String>,
}

impl ChapterComparison {
    /// Compare every pair of candidates; empty when fewer than two exist
    pub fn compute(candidates: &[&Candidate]) -> Self {
        let mut comparison = Self::default();
        if candidates.len() < 2 {
            return comparison;
        }

        for candidate in candidates {
            comparison.content_hashes.insert(
                candidate.source_id.clone(),
                blake3::hash(candidate.text.as_bytes()).to_hex().to_string(),
            );
        }

        for (i, a) in candidates.iter().enumerate() {
            for b in &candidates[i + 1..] {
                comparison.comparisons.push(SimilarityEdge {
                    domains: [a.source_id.clone(), b.source_id.clone()],
                    similarity: similarity(&a.text, &b.text),
                });
            }
        }

        comparison
    }

    /// Mean similarity of every edge touching `source_id`
    pub fn average_for(&self, source_id: &str) -> Option<f64> {
        mean(
            self.comparisons
                .iter()
                .filter(|edge| edge.involves(source_id))
                .map(|edge| edge.similarity),
        )
    }

    /// Mean similarity over all edges
    pub fn average(&self) -> Option<f64> {
        mean(self.comparisons.iter().map(|edge| edge.similarity))
    }

    pub fn tier(&self, high_threshold: f64) -> Option<SimilarityTier> {
        self.average()
            .map(|avg| SimilarityTier::classify(avg, high_threshold))
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Precomputed similarity data keyed by chapter key:
/// `{chapter_key: {comparisons: [{domains: [a, b], similarity}]}}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SimilarityReport {
    chapters: BTreeMap<String, ChapterComparison>,
}

impl SimilarityReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, chapter_key: impl Into<String>, comparison: ChapterComparison) {
        self.chapters.insert(chapter_key.into(), comparison);
    }

    pub fn get(&self, chapter_key: &str) -> Option<&ChapterComparison> {
        self.chapters.get(chapter_key)
    }

    pub fn len(&self) -> usize {
        self.chapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ChapterComparison)> {
        self.chapters.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
