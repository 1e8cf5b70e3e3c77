//! Candidate validity filter

use crate::candidate::Candidate;
use crate::config::MergeConfig;

/// Texts served by providers instead of the chapter body
pub const PLACEHOLDER_MARKERS: &[&str] = &["加载中", "页面不存在", "章节不存在", "正在加载"];

/// Placeholder markers matched case-insensitively
pub const PLACEHOLDER_MARKERS_LATIN: &[&str] = &["loading", "page not found", "chapter not found"];

/// True when the text looks like a placeholder or error page
pub fn is_placeholder(text: &str) -> bool {
    if PLACEHOLDER_MARKERS.iter().any(|m| text.contains(m)) {
        return true;
    }
    let lower = text.to_lowercase();
    PLACEHOLDER_MARKERS_LATIN.iter().any(|m| lower.contains(m))
}

pub fn is_valid(candidate: &Candidate, config: &MergeConfig) -> bool {
    candidate.length() > config.min_content_length && !is_placeholder(&candidate.text)
}

/// Candidates longer than `min_content_length` without placeholder markers,
/// in input order
pub fn filter_valid<'a>(candidates: &'a [Candidate], config: &MergeConfig) -> Vec<&'a Candidate> {
    candidates.iter().filter(|c| is_valid(c, config)).collect()
}

/// Longest candidate by character length; the first one wins ties
pub fn longest<'a, I>(candidates: I) -> Option<&'a Candidate>
where
    I: IntoIterator<Item = &'a Candidate>,
{
    let mut best: Option<(&Candidate, usize)> = None;
    for candidate in candidates {
        let length = candidate.length();
        if best.map_or(true, |(_, best_len)| length > best_len) {
            best = Some((candidate, length));
        }
    }
    best.map(|(candidate, _)| candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(min: usize) -> MergeConfig {
        MergeConfig::default().with_min_content_length(min)
    }

    #[test]
    fn test_length_is_strictly_greater() {
        let candidates = vec![
            Candidate::new("a", "1", "x".repeat(10)),
            Candidate::new("b", "1", "x".repeat(11)),
        ];
        let valid = filter_valid(&candidates, &config(10));
        assert_eq!(valid.len(), 1);
        assert_eq!(valid[0].source_id, "b");
    }

    #[test]
    fn test_length_counts_characters() {
        // 5 ideographs are 15 bytes
        let candidates = vec![Candidate::new("a", "1", "天地玄黄宇")];
        assert!(filter_valid(&candidates, &config(10)).is_empty());
        assert_eq!(filter_valid(&candidates, &config(4)).len(), 1);
    }

    #[test]
    fn test_placeholder_markers() {
        let long_tail = "。".repeat(50);
        let candidates = vec![
            Candidate::new("a", "1", format!("章节内容加载中{long_tail}")),
            Candidate::new("b", "1", format!("Page Not Found{long_tail}")),
            Candidate::new("c", "1", format!("正文{long_tail}")),
        ];
        let valid = filter_valid(&candidates, &config(10));
        assert_eq!(valid.len(), 1);
        assert_eq!(valid[0].source_id, "c");
    }

    #[test]
    fn test_preserves_input_order() {
        let candidates = vec![
            Candidate::new("z", "1", "y".repeat(30)),
            Candidate::new("a", "1", "y".repeat(20)),
        ];
        let ids: Vec<_> = filter_valid(&candidates, &config(5))
            .iter()
            .map(|c| c.source_id.as_str())
            .collect();
        assert_eq!(ids, vec!["z", "a"]);
    }

    #[test]
    fn test_longest_first_seen_wins_ties() {
        let candidates = vec![
            Candidate::new("a", "1", "abc"),
            Candidate::new("b", "1", "defg"),
            Candidate::new("c", "1", "hijk"),
        ];
        assert_eq!(longest(&candidates).map(|c| c.source_id.as_str()), Some("b"));
        assert!(longest(Vec::<Candidate>::new().iter()).is_none());
    }
}
