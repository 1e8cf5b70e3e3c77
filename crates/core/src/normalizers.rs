//! Text normalizers
//!
//! Provides the `Normalizer` trait and the implementations used by the
//! boilerplate cleaner and the chapter key builder. The cleaner only uses
//! normalizers that never grow their input (`RegexNormalizer` with a short
//! replacement, `WhitespaceNormalizer`); the key builder may also expand text
//! (NFKC, numeral rewriting).

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Trait for text normalizers
pub trait Normalizer: Send + Sync {
    /// Normalize the input text
    fn normalize(&self, input: &str) -> String;

    /// Get the name of this normalizer
    fn name(&self) -> &str;

    /// Get metadata about this normalizer (e.g., configuration)
    fn metadata(&self) -> Vec<(String, String)> {
        Vec::new()
    }

    /// Clone this normalizer into a Box
    fn clone_box(&self) -> Box<dyn Normalizer>;
}

impl Clone for Box<dyn Normalizer> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

// ============================================================================
// Built-in Normalizers
// ============================================================================

/// Converts all text to lowercase
#[derive(Clone)]
pub struct Lowercase;

impl Normalizer for Lowercase {
    fn normalize(&self, input: &str) -> String {
        input.to_lowercase()
    }

    fn name(&self) -> &str {
        "lowercase"
    }

    fn clone_box(&self) -> Box<dyn Normalizer> {
        Box::new(self.clone())
    }
}

/// Unicode compatibility folding (NFKC): full-width digits and letters
/// become ASCII, ideographic variants are unified.
#[derive(Clone)]
pub struct CompatibilityFold;

impl Normalizer for CompatibilityFold {
    fn normalize(&self, input: &str) -> String {
        input.nfkc().collect()
    }

    fn name(&self) -> &str {
        "nfkc"
    }

    fn clone_box(&self) -> Box<dyn Normalizer> {
        Box::new(self.clone())
    }
}

/// Removes everything that is not a letter or digit (whitespace included)
#[derive(Clone)]
pub struct RemovePunctuation;

impl Normalizer for RemovePunctuation {
    fn normalize(&self, input: &str) -> String {
        input.chars().filter(|c| c.is_alphanumeric()).collect()
    }

    fn name(&self) -> &str {
        "remove_punctuation"
    }

    fn clone_box(&self) -> Box<dyn Normalizer> {
        Box::new(self.clone())
    }
}

/// Removes every match of a regular expression, or replaces it with a
/// fixed replacement that must not be longer than any match.
#[derive(Clone)]
pub struct RegexNormalizer {
    name: String,
    pattern: Regex,
    replacement: String,
}

impl RegexNormalizer {
    pub fn new(name: impl Into<String>, pattern: Regex, replacement: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pattern,
            replacement: replacement.into(),
        }
    }

    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }
}

impl Normalizer for RegexNormalizer {
    fn normalize(&self, input: &str) -> String {
        self.pattern
            .replace_all(input, regex::NoExpand(&self.replacement))
            .into_owned()
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn metadata(&self) -> Vec<(String, String)> {
        vec![
            ("pattern".to_string(), self.pattern.as_str().to_string()),
            ("replacement".to_string(), self.replacement.clone()),
        ]
    }

    fn clone_box(&self) -> Box<dyn Normalizer> {
        Box::new(self.clone())
    }
}

/// Normalizes horizontal whitespace and blank lines.
///
/// Only spaces and tabs are treated as horizontal whitespace; other
/// characters such as the ideographic space used for paragraph indents are
/// left in place except at the very ends of the text when `trim` is set.
#[derive(Clone)]
pub struct WhitespaceNormalizer {
    /// Collapse runs of spaces/tabs into one space
    pub collapse: bool,
    /// Strip spaces/tabs at the start and end of every line
    pub trim_lines: bool,
    /// Maximum number of consecutive newlines kept (0 = unlimited)
    pub max_newlines: usize,
    /// Trim leading/trailing whitespace of the whole text
    pub trim: bool,
}

impl Default for WhitespaceNormalizer {
    fn default() -> Self {
        Self {
            collapse: true,
            trim_lines: true,
            max_newlines: 2,
            trim: true,
        }
    }
}

impl WhitespaceNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    fn normalize_line(&self, line: &str, out: &mut String) {
        let line = if self.trim_lines {
            line.trim_matches(is_horizontal_space)
        } else {
            line
        };

        if !self.collapse {
            out.push_str(line);
            return;
        }

        let mut in_space = false;
        for ch in line.chars() {
            if is_horizontal_space(ch) {
                if !in_space {
                    out.push(' ');
                    in_space = true;
                }
            } else {
                out.push(ch);
                in_space = false;
            }
        }
    }
}

fn is_horizontal_space(ch: char) -> bool {
    ch == ' ' || ch == '\t'
}

impl Normalizer for WhitespaceNormalizer {
    fn normalize(&self, input: &str) -> String {
        let mut normalized = String::with_capacity(input.len());
        let mut pending_newlines = 0usize;

        for (i, line) in input.split('\n').enumerate() {
            if i > 0 {
                pending_newlines += 1;
            }

            let mut scratch = String::new();
            self.normalize_line(line, &mut scratch);
            if scratch.is_empty() {
                continue;
            }

            let keep = if self.max_newlines == 0 {
                pending_newlines
            } else {
                pending_newlines.min(self.max_newlines)
            };
            normalized.extend(std::iter::repeat('\n').take(keep));
            normalized.push_str(&scratch);
            pending_newlines = 0;
        }

        // Trailing newlines survive unless trimmed
        if !self.trim && pending_newlines > 0 {
            let keep = if self.max_newlines == 0 {
                pending_newlines
            } else {
                pending_newlines.min(self.max_newlines)
            };
            normalized.extend(std::iter::repeat('\n').take(keep));
        }

        if self.trim {
            normalized.trim().to_string()
        } else {
            normalized
        }
    }

    fn name(&self) -> &str {
        "whitespace"
    }

    fn metadata(&self) -> Vec<(String, String)> {
        vec![
            ("collapse".to_string(), self.collapse.to_string()),
            ("trim_lines".to_string(), self.trim_lines.to_string()),
            ("max_newlines".to_string(), self.max_newlines.to_string()),
            ("trim".to_string(), self.trim.to_string()),
        ]
    }

    fn clone_box(&self) -> Box<dyn Normalizer> {
        Box::new(self.clone())
    }
}

/// Rewrites Chinese numerals as Arabic digits and strips leading zeros from
/// digit runs, so `第一百零五章`, `第105章` and `第0105章` agree.
#[derive(Clone)]
pub struct NumeralNormalizer;

impl Normalizer for NumeralNormalizer {
    fn normalize(&self, input: &str) -> String {
        let mut normalized = String::with_capacity(input.len());
        let chars: Vec<char> = input.chars().collect();
        let mut i = 0;

        while i < chars.len() {
            if chinese_numeral_value(chars[i]).is_some() {
                let start = i;
                while i < chars.len() && chinese_numeral_value(chars[i]).is_some() {
                    i += 1;
                }
                normalized.push_str(&chinese_run_to_arabic(&chars[start..i]));
            } else if chars[i].is_ascii_digit() {
                let start = i;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                let digits: String = chars[start..i].iter().collect();
                let trimmed = digits.trim_start_matches('0');
                normalized.push_str(if trimmed.is_empty() { "0" } else { trimmed });
            } else {
                normalized.push(chars[i]);
                i += 1;
            }
        }

        normalized
    }

    fn name(&self) -> &str {
        "numerals"
    }

    fn clone_box(&self) -> Box<dyn Normalizer> {
        Box::new(self.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Numeral {
    Digit(u64),
    Unit(u64),
    /// 万 / 亿: closes the current section
    Section(u64),
}

fn chinese_numeral_value(ch: char) -> Option<Numeral> {
    let numeral = match ch {
        '零' | '〇' => Numeral::Digit(0),
        '一' => Numeral::Digit(1),
        '二' | '两' => Numeral::Digit(2),
        '三' => Numeral::Digit(3),
        '四' => Numeral::Digit(4),
        '五' => Numeral::Digit(5),
        '六' => Numeral::Digit(6),
        '七' => Numeral::Digit(7),
        '八' => Numeral::Digit(8),
        '九' => Numeral::Digit(9),
        '十' => Numeral::Unit(10),
        '百' => Numeral::Unit(100),
        '千' => Numeral::Unit(1_000),
        '万' => Numeral::Section(10_000),
        '亿' => Numeral::Section(100_000_000),
        _ => return None,
    };
    Some(numeral)
}

fn chinese_run_to_arabic(run: &[char]) -> String {
    let numerals: Vec<Numeral> = run.iter().filter_map(|&c| chinese_numeral_value(c)).collect();

    // A run of bare digits (一二三) is read positionally
    if numerals.len() > 1 && numerals.iter().all(|n| matches!(n, Numeral::Digit(_))) {
        let digits: String = numerals
            .iter()
            .map(|n| match n {
                Numeral::Digit(d) => char::from_digit(*d as u32, 10).unwrap_or('0'),
                _ => '0',
            })
            .collect();
        let trimmed = digits.trim_start_matches('0');
        return if trimmed.is_empty() { "0".to_string() } else { trimmed.to_string() };
    }

    let mut total: u64 = 0;
    let mut section: u64 = 0;
    let mut number: u64 = 0;

    for numeral in numerals {
        match numeral {
            Numeral::Digit(d) => number = d,
            Numeral::Unit(unit) => {
                let multiplier = if number == 0 { 1 } else { number };
                section = section.saturating_add(multiplier.saturating_mul(unit));
                number = 0;
            }
            Numeral::Section(unit) => {
                let value = section.saturating_add(number);
                let value = if value == 0 { 1 } else { value };
                total = total.saturating_add(value.saturating_mul(unit));
                section = 0;
                number = 0;
            }
        }
    }

    total
        .saturating_add(section)
        .saturating_add(number)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercase() {
        assert_eq!(Lowercase.normalize("Chapter ONE"), "chapter one");
    }

    #[test]
    fn test_compatibility_fold_full_width() {
        assert_eq!(CompatibilityFold.normalize("第１２章"), "第12章");
    }

    #[test]
    fn test_remove_punctuation_keeps_ideographs() {
        assert_eq!(RemovePunctuation.normalize("第1章：开始 （上）"), "第1章开始上");
    }

    #[test]
    fn test_regex_normalizer_literal_replacement() {
        let rule = RegexNormalizer::new("dollar", Regex::new(r"x+").unwrap(), "$1");
        assert_eq!(rule.normalize("axxb"), "a$1b");
    }

    #[test]
    fn test_whitespace_collapse_and_trim_lines() {
        let normalizer = WhitespaceNormalizer::new();
        let result = normalizer.normalize("  Hello \t  World  \n\t second line\t\n");
        assert_eq!(result, "Hello World\nsecond line");
    }

    #[test]
    fn test_whitespace_caps_blank_lines() {
        let normalizer = WhitespaceNormalizer::new();
        assert_eq!(normalizer.normalize("a\n\n\n\n\nb"), "a\n\nb");
        assert_eq!(normalizer.normalize("a\n \t \n  \nb"), "a\n\nb");
        assert_eq!(normalizer.normalize("a\n\nb"), "a\n\nb");
    }

    #[test]
    fn test_whitespace_keeps_ideographic_indent() {
        let normalizer = WhitespaceNormalizer::new();
        assert_eq!(normalizer.normalize("a\n\u{3000}\u{3000}正文"), "a\n\u{3000}\u{3000}正文");
    }

    #[test]
    fn test_whitespace_is_stable() {
        let normalizer = WhitespaceNormalizer::new();
        let once = normalizer.normalize(" x \n\n\n y\t\tz \n");
        assert_eq!(normalizer.normalize(&once), once);
    }

    #[test]
    fn test_numerals() {
        let normalizer = NumeralNormalizer;
        assert_eq!(normalizer.normalize("第一百零五章"), "第105章");
        assert_eq!(normalizer.normalize("第十二章"), "第12章");
        assert_eq!(normalizer.normalize("第两千章"), "第2000章");
        assert_eq!(normalizer.normalize("第一万零一章"), "第10001章");
        assert_eq!(normalizer.normalize("第一二三章"), "第123章");
        assert_eq!(normalizer.normalize("第0105章"), "第105章");
        assert_eq!(normalizer.normalize("chapter 000"), "chapter 0");
    }
}
