//! Per-run configuration session
//!
//! A [`MergeSession`] collects option changes for one run and is consumed by
//! [`MergeSession::into_engine`]. Engines themselves never change after
//! construction.

use tracing::debug;

use crate::chapter_key::KeyPolicy;
use crate::config::{ConfigFile, MergeConfig, Strategy};
use crate::engine::ReconciliationEngine;
use crate::error::{ChorusError, Result};
use crate::reference::ReferenceSources;

#[derive(Debug, Clone, Default)]
pub struct MergeSession {
    config: MergeConfig,
    references: ReferenceSources,
    key_policy: KeyPolicy,
}

impl MergeSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a named strategy preset
    pub fn with_strategy(strategy: Strategy) -> Self {
        Self {
            config: MergeConfig::preset(strategy),
            ..Self::default()
        }
    }

    /// Start from a parsed configuration file
    pub fn from_config_file(file: &ConfigFile) -> Self {
        let mut session = Self {
            config: file.merge_config(),
            ..Self::default()
        };
        if let Some(references) = &file.reference_sources {
            session.references = ReferenceSources::new(references.iter().cloned());
        }
        session
    }

    /// Replace the merge options with a preset, keeping reference sources
    pub fn apply_strategy(&mut self, strategy: Strategy) -> &mut Self {
        self.config = MergeConfig::preset(strategy);
        self
    }

    /// Set one option from its textual form.
    ///
    /// Accepts every [`MergeConfig`] field, `reference_sources` (a comma
    /// separated list, empty to disable the override) and `key_policy`
    /// (`normalized` or `exact`).
    pub fn configure(&mut self, key: &str, value: &str) -> Result<&mut Self> {
        match key {
            "reference_sources" => self.references = ReferenceSources::parse_list(value),
            "key_policy" => self.key_policy = parse_key_policy(value)?,
            _ => {
                self.config.set_option(key, value)?;
            }
        }
        debug!(key, value, "session option set");
        Ok(self)
    }

    pub fn set_references(&mut self, references: ReferenceSources) -> &mut Self {
        self.references = references;
        self
    }

    pub fn set_key_policy(&mut self, key_policy: KeyPolicy) -> &mut Self {
        self.key_policy = key_policy;
        self
    }

    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    pub fn references(&self) -> &ReferenceSources {
        &self.references
    }

    pub fn key_policy(&self) -> KeyPolicy {
        self.key_policy
    }

    /// Freeze the session into an engine
    pub fn into_engine(self) -> ReconciliationEngine {
        ReconciliationEngine::new(self.config)
            .with_references(self.references)
            .with_key_policy(self.key_policy)
    }
}

fn parse_key_policy(value: &str) -> Result<KeyPolicy> {
    match value.trim().to_lowercase().as_str() {
        "normalized" => Ok(KeyPolicy::Normalized),
        "exact" => Ok(KeyPolicy::Exact),
        _ => Err(ChorusError::InvalidOptionValue {
            key: "key_policy".to_string(),
            value: value.to_string(),
            reason: "expected `normalized` or `exact`".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configure_known_keys() {
        let mut session = MergeSession::new();
        session
            .configure("merge_threshold", "1.2")
            .unwrap()
            .configure("enable_diff_merge", "false")
            .unwrap()
            .configure("reference_sources", "siteB,siteA")
            .unwrap();

        let engine = session.into_engine();
        assert_eq!(engine.config().merge_threshold, 1.2);
        assert!(!engine.config().enable_diff_merge);
        assert_eq!(engine.references().iter().collect::<Vec<_>>(), vec!["siteB", "siteA"]);
    }

    #[test]
    fn test_configure_rejects_bad_input() {
        let mut session = MergeSession::new();
        assert!(matches!(
            session.configure("merge_treshold", "1.2"),
            Err(ChorusError::UnknownOption(_))
        ));
        assert!(matches!(
            session.configure("min_content_length", "lots"),
            Err(ChorusError::InvalidOptionValue { .. })
        ));
        assert_eq!(session.config(), &MergeConfig::default());
    }

    #[test]
    fn test_key_policy_option_reaches_engine() {
        let mut session = MergeSession::new();
        session.configure("key_policy", "Exact").unwrap();
        assert_eq!(session.key_policy(), KeyPolicy::Exact);
        assert_eq!(session.into_engine().key_policy(), KeyPolicy::Exact);

        let mut session = MergeSession::new();
        session.set_key_policy(KeyPolicy::Normalized);
        assert!(matches!(
            session.configure("key_policy", "fuzzy"),
            Err(ChorusError::InvalidOptionValue { .. })
        ));
        assert_eq!(session.key_policy(), KeyPolicy::Normalized);
    }

    #[test]
    fn test_empty_reference_list_disables_override() {
        let mut session = MergeSession::new();
        session.configure("reference_sources", "").unwrap();
        assert!(session.references().is_empty());
    }

    #[test]
    fn test_strategy_keeps_references() {
        let mut session = MergeSession::new();
        session.set_references(ReferenceSources::new(["only"]));
        session.apply_strategy(Strategy::Aggressive);
        assert_eq!(session.config(), &MergeConfig::preset(Strategy::Aggressive));
        assert_eq!(session.references().len(), 1);
    }

    #[test]
    fn test_from_config_file() {
        let file = ConfigFile::from_yaml_str(
            "strategy: quality\nreference_sources: [siteX]\nmerge:\n  min_content_length: 50\n",
        )
        .unwrap();
        let engine = MergeSession::from_config_file(&file).into_engine();
        assert_eq!(engine.config().min_content_length, 50);
        assert_eq!(engine.config().quality_weight, 0.8);
        assert_eq!(engine.references().iter().collect::<Vec<_>>(), vec!["siteX"]);
    }
}
