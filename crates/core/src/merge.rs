//! Line-level augmentation of the selected candidate
//!
//! The longest valid candidate is the base. Lines that only other sources
//! carry are appended after it when they look like prose. The result is kept
//! only if it grows enough relative to that base.

use serde::Serialize;
use tracing::debug;

use crate::boilerplate;
use crate::candidate::{char_len, Candidate};
use crate::config::MergeConfig;
use crate::filter;
use crate::metrics::contains_prose_punctuation;

/// Lines shorter than this (after trimming) are never appended
pub const MIN_LINE_LENGTH: usize = 10;

/// Lines containing any of these are treated as advertising
pub const BLOCKED_KEYWORDS: &[&str] = &["广告", "推广", "收藏", "点击"];

/// Why an augmentation was discarded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    /// No other source carried a line worth appending
    NothingAdded,
    /// Merged text did not exceed `base_length * merge_threshold`
    BelowThreshold,
    /// Cleaning shrank the merged text back to the base's length or below
    NotLongerAfterCleaning,
}

/// Numbers behind an augmentation decision
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AugmentationDetails {
    pub base_source: String,
    pub lines_added: usize,
    /// Length of the merged text before cleaning
    pub merged_length: usize,
    /// Merged length had to be strictly greater than this
    pub required_length: f64,
    pub rejection: Option<Rejection>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Augmentation {
    /// Disabled, or fewer than two valid candidates
    NotApplicable,
    Rejected(AugmentationDetails),
    /// `content` is already cleaned
    Accepted {
        content: String,
        details: AugmentationDetails,
    },
}

impl Augmentation {
    pub fn details(&self) -> Option<&AugmentationDetails> {
        match self {
            Self::NotApplicable => None,
            Self::Rejected(details) | Self::Accepted { details, .. } => Some(details),
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }
}

/// True when a line from another source may be appended
pub fn is_augmenting_line(line: &str, merged: &str) -> bool {
    if char_len(line) <= MIN_LINE_LENGTH || merged.contains(line) {
        return false;
    }
    let lower = line.to_lowercase();
    if BLOCKED_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return false;
    }
    contains_prose_punctuation(line)
}

/// Try to enrich the longest valid candidate with lines found only in the
/// others. A rejection leaves the caller's winner in place.
pub fn augment(valid: &[&Candidate], config: &MergeConfig) -> Augmentation {
    if !config.enable_diff_merge || valid.len() < 2 {
        return Augmentation::NotApplicable;
    }
    let Some(base) = filter::longest(valid.iter().copied()) else {
        return Augmentation::NotApplicable;
    };

    let mut merged = base.text.lines().collect::<Vec<_>>().join("\n");
    let mut has_lines = base.text.lines().next().is_some();
    let mut lines_added = 0;

    for other in valid.iter().filter(|c| !std::ptr::eq(**c, base)) {
        for line in other.text.lines().map(str::trim) {
            if !is_augmenting_line(line, &merged) {
                continue;
            }
            if has_lines {
                merged.push('\n');
            }
            merged.push_str(line);
            has_lines = true;
            lines_added += 1;
        }
    }

    let base_length = base.length();
    let merged_length = char_len(&merged);
    let mut details = AugmentationDetails {
        base_source: base.source_id.clone(),
        lines_added,
        merged_length,
        required_length: base_length as f64 * config.merge_threshold,
        rejection: None,
    };

    if lines_added == 0 {
        debug!(base = %base.source_id, "no lines to add");
        details.rejection = Some(Rejection::NothingAdded);
        return Augmentation::Rejected(details);
    }

    if merged_length as f64 <= details.required_length {
        debug!(
            merged_length,
            required = details.required_length,
            "augmentation below threshold"
        );
        details.rejection = Some(Rejection::BelowThreshold);
        return Augmentation::Rejected(details);
    }

    let content = boilerplate::clean(&merged);
    if char_len(&content) <= base_length {
        debug!(
            cleaned_length = char_len(&content),
            base_length, "augmentation not longer after cleaning"
        );
        details.rejection = Some(Rejection::NotLongerAfterCleaning);
        return Augmentation::Rejected(details);
    }

    debug!(lines_added, merged_length, base = %base.source_id, "augmentation accepted");
    Augmentation::Accepted { content, details }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prose(n: usize) -> String {
        (0..n)
            .map(|i| format!("这是正文的第{i}句话，内容保持完整。"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_line_criteria() {
        assert!(is_augmenting_line("他推开门，外面下着大雨。", ""));
        assert!(!is_augmenting_line("短句，太短。", ""));
        assert!(!is_augmenting_line("没有任何标点符号的一整行文字内容", ""));
        assert!(!is_augmenting_line("请点击这里阅读更多的精彩章节，谢谢。", ""));
        assert!(!is_augmenting_line(
            "他推开门，外面下着大雨。",
            "前文\n他推开门，外面下着大雨。"
        ));
    }

    #[test]
    fn test_not_applicable() {
        let a = Candidate::new("a", "1", prose(5));
        let b = Candidate::new("b", "1", prose(6));

        assert_eq!(augment(&[&a], &MergeConfig::default()), Augmentation::NotApplicable);

        let disabled = MergeConfig::default().with_diff_merge(false);
        assert_eq!(augment(&[&a, &b], &disabled), Augmentation::NotApplicable);
    }

    #[test]
    fn test_threshold_gate_rejects_small_growth() {
        // 1000 -> 1050 characters against a 1.2 threshold
        let base = "字".repeat(999) + "。";
        let extra = format!("{}。", "补".repeat(48));
        let a = Candidate::new("a", "1", base);
        let b = Candidate::new("b", "1", extra);
        let config = MergeConfig::default().with_merge_threshold(1.2);

        let result = augment(&[&a, &b], &config);
        let details = result.details().unwrap();
        assert_eq!(details.base_source, "a");
        assert_eq!(details.lines_added, 1);
        assert_eq!(details.merged_length, 1050);
        assert!((details.required_length - 1200.0).abs() < 1e-9);
        assert_eq!(details.rejection, Some(Rejection::BelowThreshold));
    }

    #[test]
    fn test_longer_source_alone_is_not_a_merge() {
        // b only repeats lines of the longer a
        let a = Candidate::new("a", "1", prose(30));
        let b = Candidate::new("b", "1", prose(20));
        let config = MergeConfig::default().with_merge_threshold(0.5);

        let result = augment(&[&b, &a], &config);
        let details = result.details().unwrap();
        assert_eq!(details.base_source, "a");
        assert_eq!(details.lines_added, 0);
        assert_eq!(details.rejection, Some(Rejection::NothingAdded));
    }

    #[test]
    fn test_exclusive_lines_are_appended() {
        let shared = prose(10);
        let a = Candidate::new("a", "1", shared.clone());
        let b = Candidate::new(
            "b",
            "1",
            format!("{shared}\n结尾处他终于明白了一切，转身离开了。"),
        );
        let c = Candidate::new("c", "1", format!("{shared}\n另一个来源独有的段落，也应当保留。"));

        let config = MergeConfig::default().with_merge_threshold(1.01);
        let result = augment(&[&a, &b, &c], &config);
        let Augmentation::Accepted { content, details } = &result else {
            panic!("expected accepted augmentation, got {result:?}");
        };
        assert_eq!(details.base_source, "b");
        assert_eq!(details.lines_added, 1);
        assert!(content.ends_with("另一个来源独有的段落，也应当保留。"));
        assert!(content.contains("结尾处他终于明白了一切"));
    }

    #[test]
    fn test_cleaning_can_reject() {
        // The only growth is an attribution line that cleaning removes
        let a = Candidate::new("a", "1", prose(6));
        let b = Candidate::new("b", "1", format!("{}\n更新最快的小说网站就在这里，欢迎。", prose(4)));
        let config = MergeConfig::default().with_merge_threshold(1.01);

        let result = augment(&[&a, &b], &config);
        let details = result.details().unwrap();
        assert_eq!(details.base_source, "a");
        assert_eq!(details.lines_added, 1);
        assert_eq!(details.rejection, Some(Rejection::NotLongerAfterCleaning));
        assert!(!result.is_accepted());
    }
}
