//! Trusted reference sources
//!
//! When a valid candidate comes from one of these providers it is taken
//! as-is, ahead of any scoring.

use serde::{Deserialize, Serialize};

use crate::candidate::Candidate;
use crate::config::MergeConfig;

pub const DEFAULT_REFERENCE_SOURCES: &[&str] = &["bqgam", "biquge", "675m", "bqg67", "biqu10"];

/// Ordered list of source-id substrings; earlier entries win
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferenceSources(Vec<String>);

impl Default for ReferenceSources {
    fn default() -> Self {
        Self::new(DEFAULT_REFERENCE_SOURCES.iter().copied())
    }
}

impl ReferenceSources {
    pub fn new<I, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(sources.into_iter().map(Into::into).collect())
    }

    pub fn none() -> Self {
        Self(Vec::new())
    }

    /// Parse a comma separated list, ignoring blank entries
    pub fn parse_list(list: &str) -> Self {
        Self::new(
            list.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty()),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// First valid candidate from the highest-priority matching source
    pub fn find_match<'a>(
        &self,
        valid: &[&'a Candidate],
        config: &MergeConfig,
    ) -> Option<(&str, &'a Candidate)> {
        self.0.iter().find_map(|reference| {
            valid
                .iter()
                .find(|c| {
                    c.source_id.contains(reference.as_str())
                        && c.length() > config.min_content_length
                })
                .map(|c| (reference.as_str(), *c))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_follows_list_order() {
        let a = Candidate::new("www.biquge.com", "1", "a".repeat(300));
        let b = Candidate::new("m.bqgam.net", "1", "b".repeat(250));
        let valid = vec![&a, &b];

        let references = ReferenceSources::default();
        let (reference, hit) = references.find_match(&valid, &MergeConfig::default()).unwrap();
        assert_eq!(reference, "bqgam");
        assert_eq!(hit.source_id, "m.bqgam.net");
    }

    #[test]
    fn test_requires_length() {
        let a = Candidate::new("bqgam", "1", "a".repeat(150));
        let valid = vec![&a];
        let config = MergeConfig::default();
        assert!(ReferenceSources::default().find_match(&valid, &config).is_none());
    }

    #[test]
    fn test_empty_list_never_matches() {
        let a = Candidate::new("bqgam", "1", "a".repeat(300));
        assert!(ReferenceSources::none()
            .find_match(&[&a], &MergeConfig::default())
            .is_none());
    }

    #[test]
    fn test_parse_list() {
        let references = ReferenceSources::parse_list(" siteB, ,siteA ");
        assert_eq!(references.iter().collect::<Vec<_>>(), vec!["siteB", "siteA"]);
        assert!(ReferenceSources::parse_list("").is_empty());
    }

    #[test]
    fn test_serde_is_a_plain_list() {
        let references: ReferenceSources = serde_json::from_str(r#"["x", "y"]"#).unwrap();
        assert_eq!(references.len(), 2);
        assert_eq!(serde_json::to_string(&references).unwrap(), r#"["x","y"]"#);
    }
}
