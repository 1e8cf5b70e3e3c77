//! Candidate scoring and winner selection

use crate::candidate::{Candidate, ScoredCandidate};
use crate::config::MergeConfig;
use crate::metrics::TextMetrics;
use crate::similarity::ChapterComparison;

/// Length at which the length score saturates
pub const LENGTH_SCORE_SATURATION: f64 = 2000.0;

/// Length at which the length part of the similarity preference saturates
pub const SIMILARITY_LENGTH_SATURATION: f64 = 3000.0;

/// Weight of average similarity in the similarity preference
pub const SIMILARITY_WEIGHT: f64 = 0.7;

/// Weight of normalized length in the similarity preference
pub const SIMILARITY_LENGTH_WEIGHT: f64 = 0.3;

/// Assumed similarity for a source that appears in no comparison
pub const NEUTRAL_SIMILARITY: f64 = 0.5;

const BASE_QUALITY: f64 = 0.5;
const LONG_TEXT_BONUS: f64 = 0.3;
const LONG_TEXT_LENGTH: usize = 1000;
const SECTION_MARKER_BONUS: f64 = 0.1;
const PARAGRAPH_BONUS: f64 = 0.1;
const PARAGRAPH_LINE_BREAKS: usize = 5;

pub fn length_score(length: usize) -> f64 {
    (length as f64 / LENGTH_SCORE_SATURATION).min(1.0)
}

/// Heuristic structure score in `[0, 1]`
pub fn quality_score(metrics: &TextMetrics) -> f64 {
    let mut score = BASE_QUALITY;
    if metrics.char_count > LONG_TEXT_LENGTH {
        score += LONG_TEXT_BONUS;
    }
    if metrics.has_section_marker {
        score += SECTION_MARKER_BONUS;
    }
    if metrics.line_break_count > PARAGRAPH_LINE_BREAKS {
        score += PARAGRAPH_BONUS;
    }
    score.min(1.0)
}

pub fn score<'a>(candidate: &'a Candidate, config: &MergeConfig) -> ScoredCandidate<'a> {
    let metrics = TextMetrics::compute(&candidate.text);
    let length_score = length_score(metrics.char_count);
    let quality_score = quality_score(&metrics);

    ScoredCandidate {
        candidate,
        length: metrics.char_count,
        length_score,
        quality_score,
        combined_score: length_score * config.length_priority_weight
            + quality_score * config.quality_weight,
    }
}

pub fn score_all<'a>(candidates: &[&'a Candidate], config: &MergeConfig) -> Vec<ScoredCandidate<'a>> {
    candidates.iter().map(|c| score(c, config)).collect()
}

/// Highest combined score; the first one seen wins ties
pub fn select_best<'s, 'a>(scored: &'s [ScoredCandidate<'a>]) -> Option<&'s ScoredCandidate<'a>> {
    first_max_by(scored.iter(), |s| s.combined_score)
}

/// Prefer the candidate that agrees most with the other sources.
///
/// Returns `None` when no candidate appears in any comparison, in which case
/// the quality winner stands.
pub fn select_by_similarity<'s, 'a>(
    scored: &'s [ScoredCandidate<'a>],
    comparison: &ChapterComparison,
) -> Option<&'s ScoredCandidate<'a>> {
    let averages: Vec<Option<f64>> = scored
        .iter()
        .map(|s| comparison.average_for(&s.candidate.source_id))
        .collect();
    if averages.iter().all(Option::is_none) {
        return None;
    }

    let preference: Vec<f64> = scored
        .iter()
        .zip(&averages)
        .map(|(s, avg)| similarity_preference(avg.unwrap_or(NEUTRAL_SIMILARITY), s.length))
        .collect();

    first_max_by(scored.iter().zip(&preference), |(_, p)| **p).map(|(s, _)| s)
}

pub fn similarity_preference(average_similarity: f64, length: usize) -> f64 {
    average_similarity * SIMILARITY_WEIGHT
        + (length as f64 / SIMILARITY_LENGTH_SATURATION).min(1.0) * SIMILARITY_LENGTH_WEIGHT
}

fn first_max_by<T, F>(items: impl Iterator<Item = T>, key: F) -> Option<T>
where
    F: Fn(&T) -> f64,
{
    let mut best: Option<(T, f64)> = None;
    for item in items {
        let value = key(&item);
        if best.as_ref().map_or(true, |(_, best_value)| value > *best_value) {
            best = Some((item, value));
        }
    }
    best.map(|(item, _)| item)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::SimilarityEdge;

    fn edge(a: &str, b: &str, similarity: f64) -> SimilarityEdge {
        SimilarityEdge {
            domains: [a.to_string(), b.to_string()],
            similarity,
        }
    }

    #[test]
    fn test_length_score_saturates() {
        assert_eq!(length_score(1000), 0.5);
        assert_eq!(length_score(2000), 1.0);
        assert_eq!(length_score(9000), 1.0);
    }

    #[test]
    fn test_quality_bonuses() {
        let plain = TextMetrics::compute("短文");
        assert_eq!(quality_score(&plain), 0.5);

        let text = format!("第一章\n{}\n\n\n\n\n", "字".repeat(1200));
        let rich = TextMetrics::compute(&text);
        assert!((quality_score(&rich) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_combined_score_uses_weights() {
        let candidate = Candidate::new("a", "1", "字".repeat(1000));
        let config = MergeConfig::default().with_weights(1.0, 0.0);
        assert_eq!(score(&candidate, &config).combined_score, 0.5);

        let config = MergeConfig::default().with_weights(0.0, 1.0);
        assert_eq!(score(&candidate, &config).combined_score, 0.5);
    }

    #[test]
    fn test_select_best_first_seen_wins_ties() {
        let a = Candidate::new("a", "1", "字".repeat(500));
        let b = Candidate::new("b", "1", "文".repeat(900));
        let c = Candidate::new("c", "1", "书".repeat(900));
        let scored = score_all(&[&a, &b, &c], &MergeConfig::default());
        assert_eq!(select_best(&scored).unwrap().candidate.source_id, "b");
        assert!(select_best(&[]).is_none());
    }

    #[test]
    fn test_similarity_preference_overrides_length() {
        let a = Candidate::new("a", "1", "字".repeat(3000));
        let b = Candidate::new("b", "1", "文".repeat(1500));
        let c = Candidate::new("c", "1", "书".repeat(1500));
        let scored = score_all(&[&a, &b, &c], &MergeConfig::default());
        assert_eq!(select_best(&scored).unwrap().candidate.source_id, "a");

        let comparison = ChapterComparison {
            comparisons: vec![edge("a", "b", 0.2), edge("a", "c", 0.2), edge("b", "c", 0.95)],
            ..Default::default()
        };
        // a: 0.2*0.7 + 1.0*0.3 = 0.44; b: 0.575*0.7 + 0.5*0.3 = 0.5525
        let preferred = select_by_similarity(&scored, &comparison).unwrap();
        assert_eq!(preferred.candidate.source_id, "b");
    }

    #[test]
    fn test_unknown_sources_use_neutral_similarity() {
        let a = Candidate::new("a", "1", "字".repeat(300));
        let b = Candidate::new("b", "1", "文".repeat(300));
        let scored = score_all(&[&a, &b], &MergeConfig::default());

        let comparison = ChapterComparison {
            comparisons: vec![edge("b", "z", 0.4)],
            ..Default::default()
        };
        assert_eq!(
            select_by_similarity(&scored, &comparison).unwrap().candidate.source_id,
            "a"
        );

        let unrelated = ChapterComparison {
            comparisons: vec![edge("x", "y", 1.0)],
            ..Default::default()
        };
        assert!(select_by_similarity(&scored, &unrelated).is_none());
    }
}
