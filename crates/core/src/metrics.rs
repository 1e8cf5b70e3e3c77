//! Text metrics read by the scorer and the merger

/// CJK punctuation that marks a line as prose rather than navigation noise
pub const PROSE_PUNCTUATION: &[char] = &['，', '。', '！', '？', '；', '：'];

/// ASCII punctuation that counts anywhere in a line. A full stop only counts
/// before whitespace or at the end of the line, so `m.example.com` does not.
pub const PROSE_PUNCTUATION_ASCII: &[char] = &[',', '!', '?', ';'];

const SECTION_MARKERS: &[&str] = &["章", "节"];
const SECTION_MARKERS_LATIN: &[&str] = &["chapter", "section"];

/// Metrics computed for a single text
#[derive(Debug, Clone, PartialEq)]
pub struct TextMetrics {
    /// Unicode scalar values, the unit of every length in this crate
    pub char_count: usize,
    pub line_break_count: usize,
    pub has_section_marker: bool,
}

impl TextMetrics {
    pub fn compute(text: &str) -> Self {
        let (char_count, line_break_count) = text
            .chars()
            .fold((0, 0), |(chars, breaks), ch| (chars + 1, breaks + usize::from(ch == '\n')));

        Self {
            char_count,
            line_break_count,
            has_section_marker: contains_section_marker(text),
        }
    }
}

/// Chapter or section headings such as `第三章` or `Chapter 3`
pub fn contains_section_marker(text: &str) -> bool {
    if SECTION_MARKERS.iter().any(|m| text.contains(m)) {
        return true;
    }
    let lower = text.to_lowercase();
    SECTION_MARKERS_LATIN.iter().any(|m| lower.contains(m))
}

pub fn contains_prose_punctuation(line: &str) -> bool {
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        if PROSE_PUNCTUATION.contains(&c) || PROSE_PUNCTUATION_ASCII.contains(&c) {
            return true;
        }
        if c == '.' && chars.peek().map_or(true, |next| next.is_whitespace()) {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_metrics() {
        let metrics = TextMetrics::compute("第一章\n\n他来了。\n她走了，天黑了。");
        assert_eq!(metrics.char_count, 18);
        assert_eq!(metrics.line_break_count, 3);
        assert!(metrics.has_section_marker);
    }

    #[test]
    fn test_section_markers() {
        assert!(contains_section_marker("CHAPTER 3"));
        assert!(contains_section_marker("第二节"));
        assert!(!contains_section_marker("plain prose only"));
    }

    #[test]
    fn test_prose_punctuation() {
        assert!(contains_prose_punctuation("他笑了。"));
        assert!(contains_prose_punctuation("Fine, thanks"));
        assert!(contains_prose_punctuation("He left. She stayed"));
        assert!(contains_prose_punctuation("The end."));
        assert!(!contains_prose_punctuation("上一章 目录 下一章"));
    }

    #[test]
    fn test_site_addresses_are_not_prose() {
        assert!(!contains_prose_punctuation("m.xxx.com 上一页 下一页"));
        assert!(!contains_prose_punctuation("https://www.example.com/book/1"));
    }
}
