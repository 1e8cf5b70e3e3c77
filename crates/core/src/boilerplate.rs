//! Boilerplate removal
//!
//! Promotional and navigational noise is described by [`DEFAULT_RULES`], an
//! ordered, versioned table of `(name, pattern, replacement)` entries. The
//! table is compiled into a [`TextPipeline`] of [`RegexNormalizer`]s followed
//! by whitespace normalization, and the pipeline is run until the text stops
//! changing. Every stage shrinks or canonicalizes its match, so the loop
//! terminates and `clean(clean(x)) == clean(x)`.
//!
//! Order matters: link removal leaves gaps that the whitespace stage closes,
//! so whitespace normalization always runs last.

use std::sync::LazyLock;

use regex::RegexBuilder;

use crate::error::{ChorusError, Result};
use crate::normalizers::{Normalizer, RegexNormalizer, WhitespaceNormalizer};
use crate::pipeline::{LayerSet, TextPipeline};

/// Bumped whenever a rule is added, removed, reordered or changed
pub const RULESET_VERSION: u32 = 1;

/// Upper bound on cleaning passes; reaching it is logged
const MAX_PASSES: usize = 32;

/// What kind of noise a rule targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleCategory {
    /// "Bookmark this site" style prompts
    SitePromotion,
    /// Mobile mirror announcements
    MobileSite,
    /// Source attribution and "fastest updates" banners
    Attribution,
    /// Error-report / bookmark buttons rendered as text
    Navigation,
    /// Bare URLs and mirror hostnames
    Link,
    /// Messaging-platform handles and giveaway promotions
    ContactHandle,
    /// Serial annotations ("to be continued", update time, word count)
    Annotation,
    /// Leftover HTML entities and escaped code points
    Encoding,
    /// Excess blank lines
    Layout,
}

/// One entry of the boilerplate table
#[derive(Debug, Clone, Copy)]
pub struct BoilerplateRule {
    pub name: &'static str,
    pub category: RuleCategory,
    /// Regular expression, matched case-insensitively
    pub pattern: &'static str,
    /// Literal replacement; never longer than a match
    pub replacement: &'static str,
}

const fn rule(
    name: &'static str,
    category: RuleCategory,
    pattern: &'static str,
) -> BoilerplateRule {
    BoilerplateRule {
        name,
        category,
        pattern,
        replacement: "",
    }
}

use RuleCategory::*;

/// The default rule table, applied top to bottom
pub const DEFAULT_RULES: &[BoilerplateRule] = &[
    // Site promotion
    rule("bookmark_site_prompt", SitePromotion, r"请收藏本站：[^\n]*"),
    rule("bookmark_site", SitePromotion, r"收藏本站：[^\n]*"),
    rule("site_address", SitePromotion, r"本站地址：[^\n]*"),
    rule("bookmark_url", SitePromotion, r"收藏网址：[^\n]*"),
    // Mobile mirrors
    rule("biquge_mobile", MobileSite, r"笔趣阁手机版：[^\n]*"),
    rule("mobile_edition", MobileSite, r"手机版：[^\n]*"),
    rule("mobile_site", MobileSite, r"手机站：[^\n]*"),
    rule("mobile_version", MobileSite, r"移动版：[^\n]*"),
    // Attribution
    rule("sourced_from_site", Attribution, r"来源于[^\n]*站[^\n]*"),
    rule("chapter_from", Attribution, r"本章来自[^\n]*"),
    rule("repost_notice", Attribution, r"转载请注明[^\n]*"),
    rule("fastest_updates", Attribution, r"更新最快[^\n]*"),
    rule("source_marker", Attribution, r"\(来源:.*?\)"),
    // Navigation buttons
    rule("report_error_button", Navigation, r"『点此报错』[^\n]*"),
    rule("add_bookmark_button", Navigation, r"『加入书签』[^\n]*"),
    rule("click_report_button", Navigation, r"『点击报错』[^\n]*"),
    rule("click_bookmark_button", Navigation, r"『点击收藏』[^\n]*"),
    rule("report_error_link", Navigation, r"\[点此报错\][^\n]*"),
    rule("add_bookmark_link", Navigation, r"\[加入书签\][^\n]*"),
    // Links
    rule("http_url", Link, r"https?://\S*"),
    rule("www_host", Link, r"www\.\S*"),
    rule("mobile_host", Link, r"m\.\S*\.(?:com|net|org|cn|cc)\S*"),
    // Contact handles and giveaways
    rule("wechat_platform_howto", ContactHandle, r"威信.*?平台.*?方法"),
    rule("weibo_scan", ContactHandle, r"腾讯威博.*?扫描"),
    rule("contacts_lookup", ContactHandle, r"通讯录.*?查找"),
    rule("search_verification", ContactHandle, r"搜寻.*?验证标记"),
    rule("author_handle", ContactHandle, r"wang--yu----"),
    rule("author_wechat", ContactHandle, r"忘语.*?威信"),
    rule("signed_book_giveaway", ContactHandle, r"实体签名书"),
    rule("mystery_prize", ContactHandle, r"神秘大奖"),
    rule("parenthesized_wechat", ContactHandle, r"\(.*?威信.*?\)"),
    rule("official_account", ContactHandle, r"平台下面.*?公众号"),
    rule("upload_notice", ContactHandle, r"等.*?正文开始上传"),
    rule("chained_parentheses", ContactHandle, r"\(.*?\)\s*\("),
    rule("dash_separator", ContactHandle, r"----"),
    // Serial annotations
    rule("to_be_continued_paren", Annotation, r"\(未完待续[^)]*\)"),
    rule("to_be_continued", Annotation, r"未完待续[^\n]*"),
    rule("latest_chapter", Annotation, r"最新章节[^\n]*"),
    rule("update_time", Annotation, r"更新时间[^\n]*"),
    rule("word_count", Annotation, r"字数统计[^\n]*"),
    rule("reading_tip", Annotation, r"阅读提示[^\n]*"),
    // Encoding artifacts
    rule("html_entity", Encoding, r"&[a-zA-Z]+;"),
    rule("escaped_code_point", Encoding, r"\\u[0-9a-fA-F]{4}"),
    // Layout
    BoilerplateRule {
        name: "excess_blank_lines",
        category: Layout,
        pattern: r"\n{3,}",
        replacement: "\n\n",
    },
];

static DEFAULT_CLEANER: LazyLock<BoilerplateCleaner> = LazyLock::new(|| {
    BoilerplateCleaner::from_rules(DEFAULT_RULES).expect("default boilerplate rules are valid")
});

/// Clean text with the default rule table.
///
/// Pure and total; the output is never longer than the input.
pub fn clean(text: &str) -> String {
    DEFAULT_CLEANER.clean(text)
}

/// The default cleaner, shared process-wide
pub fn default_cleaner() -> &'static BoilerplateCleaner {
    &DEFAULT_CLEANER
}

/// A compiled rule table
#[derive(Clone)]
pub struct BoilerplateCleaner {
    rules: Vec<(BoilerplateRule, RegexNormalizer)>,
    pipeline: TextPipeline,
}

impl BoilerplateCleaner {
    /// Compile a rule table; the whitespace stage is appended automatically
    pub fn from_rules(rules: &[BoilerplateRule]) -> Result<Self> {
        let mut compiled = Vec::with_capacity(rules.len());
        let mut pipeline = TextPipeline::new();

        for rule in rules {
            let regex = RegexBuilder::new(rule.pattern)
                .case_insensitive(true)
                .build()
                .map_err(|source| ChorusError::InvalidRule {
                    name: rule.name.to_string(),
                    source,
                })?;
            let normalizer = RegexNormalizer::new(rule.name, regex, rule.replacement);
            pipeline = pipeline.add_normalizer(normalizer.clone_box());
            compiled.push((*rule, normalizer));
        }

        let pipeline = pipeline.add_normalizer(Box::new(WhitespaceNormalizer::new()));

        Ok(Self {
            rules: compiled,
            pipeline,
        })
    }

    /// Remove boilerplate, collapse whitespace and trim
    pub fn clean(&self, text: &str) -> String {
        let mut current = self.pipeline.apply(text);

        for _ in 1..MAX_PASSES {
            let next = self.pipeline.apply(&current);
            if next == current {
                return current;
            }
            current = next;
        }

        tracing::warn!(
            passes = MAX_PASSES,
            "Boilerplate cleaning did not reach a fixed point"
        );
        current
    }

    /// Run a single pass and keep the intermediate text after each rule
    pub fn explain(&self, text: &str) -> LayerSet {
        self.pipeline.process(text)
    }

    /// Look up a compiled rule by name
    pub fn rule(&self, name: &str) -> Option<&RegexNormalizer> {
        self.rules
            .iter()
            .find(|(rule, _)| rule.name == name)
            .map(|(_, normalizer)| normalizer)
    }

    pub fn rules(&self) -> impl Iterator<Item = &BoilerplateRule> {
        self.rules.iter().map(|(rule, _)| rule)
    }
}
