//! Configuration for the reconciliation engine

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ChorusError, Result};

/// Tunables for candidate selection and augmentation.
///
/// The two weights are relative; they are not required to sum to 1.0.
/// Values are not range-checked: keeping `merge_threshold > 1.0` and the
/// similarity threshold inside `[0, 1]` is the caller's responsibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Append lines found only in other sources to the winner
    pub enable_diff_merge: bool,

    /// Weight of the normalized length score
    pub length_priority_weight: f64,

    /// Weight of the heuristic quality score
    pub quality_weight: f64,

    /// Candidates must be strictly longer than this (in characters)
    pub min_content_length: usize,

    /// Required growth factor for an augmentation to be accepted
    pub merge_threshold: f64,

    /// Boundary of the "high" similarity tier in comparison reports.
    /// Does not influence selection.
    pub similarity_threshold: f64,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl MergeConfig {
    pub fn new() -> Self {
        Self {
            enable_diff_merge: true,
            length_priority_weight: 0.6,
            quality_weight: 0.4,
            min_content_length: 200,
            merge_threshold: 1.1,
            similarity_threshold: 0.8,
        }
    }

    /// Build the configuration for a named strategy
    pub fn preset(strategy: Strategy) -> Self {
        let base = Self::new();
        match strategy {
            Strategy::Default => base,
            Strategy::Length => base
                .with_diff_merge(false)
                .with_weights(0.9, 0.1)
                .with_min_content_length(100),
            Strategy::Quality => base
                .with_diff_merge(true)
                .with_weights(0.2, 0.8)
                .with_min_content_length(300)
                .with_similarity_threshold(0.85),
            Strategy::Diff => base
                .with_diff_merge(true)
                .with_merge_threshold(1.02)
                .with_weights(0.5, 0.5)
                .with_similarity_threshold(0.8),
            Strategy::Conservative => base
                .with_diff_merge(false)
                .with_weights(0.5, 0.5)
                .with_min_content_length(500)
                .with_merge_threshold(1.2)
                .with_similarity_threshold(0.95),
            Strategy::Aggressive => base
                .with_diff_merge(true)
                .with_weights(0.8, 0.2)
                .with_min_content_length(50)
                .with_merge_threshold(1.01)
                .with_similarity_threshold(0.6),
        }
    }

    pub fn with_diff_merge(mut self, enable: bool) -> Self {
        self.enable_diff_merge = enable;
        self
    }

    /// Set both the length and quality weights
    pub fn with_weights(mut self, length_priority_weight: f64, quality_weight: f64) -> Self {
        self.length_priority_weight = length_priority_weight;
        self.quality_weight = quality_weight;
        self
    }

    pub fn with_min_content_length(mut self, length: usize) -> Self {
        self.min_content_length = length;
        self
    }

    pub fn with_merge_threshold(mut self, threshold: f64) -> Self {
        self.merge_threshold = threshold;
        self
    }

    pub fn with_similarity_threshold(mut self, threshold: f64) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    /// Apply every override that is set
    pub fn apply(&mut self, overrides: &MergeOverrides) {
        if let Some(v) = overrides.enable_diff_merge {
            self.enable_diff_merge = v;
        }
        if let Some(v) = overrides.length_priority_weight {
            self.length_priority_weight = v;
        }
        if let Some(v) = overrides.quality_weight {
            self.quality_weight = v;
        }
        if let Some(v) = overrides.min_content_length {
            self.min_content_length = v;
        }
        if let Some(v) = overrides.merge_threshold {
            self.merge_threshold = v;
        }
        if let Some(v) = overrides.similarity_threshold {
            self.similarity_threshold = v;
        }
    }

    /// Set a single option from its textual form.
    ///
    /// Recognized keys are the field names of [`MergeConfig`].
    pub fn set_option(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "enable_diff_merge" => self.enable_diff_merge = parse_value(key, value)?,
            "length_priority_weight" => self.length_priority_weight = parse_value(key, value)?,
            "quality_weight" => self.quality_weight = parse_value(key, value)?,
            "min_content_length" => self.min_content_length = parse_value(key, value)?,
            "merge_threshold" => self.merge_threshold = parse_value(key, value)?,
            "similarity_threshold" => self.similarity_threshold = parse_value(key, value)?,
            _ => return Err(ChorusError::UnknownOption(key.to_string())),
        }
        Ok(())
    }
}

fn parse_value<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ChorusError::InvalidOptionValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: e.to_string(),
        })
}

/// Partial configuration; unset fields keep the base value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MergeOverrides {
    pub enable_diff_merge: Option<bool>,
    pub length_priority_weight: Option<f64>,
    pub quality_weight: Option<f64>,
    pub min_content_length: Option<usize>,
    pub merge_threshold: Option<f64>,
    pub similarity_threshold: Option<f64>,
}

/// Named merge strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Balanced defaults
    #[default]
    Default,
    /// Favor the longest text, no augmentation
    Length,
    /// Favor quality heuristics with augmentation
    Quality,
    /// Augment eagerly with a low growth threshold
    Diff,
    /// Strict filtering, no augmentation
    Conservative,
    /// Loose filtering, augment on any growth
    Aggressive,
}

impl Strategy {
    pub const ALL: [Strategy; 6] = [
        Strategy::Default,
        Strategy::Length,
        Strategy::Quality,
        Strategy::Diff,
        Strategy::Conservative,
        Strategy::Aggressive,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Length => "length",
            Self::Quality => "quality",
            Self::Diff => "diff",
            Self::Conservative => "conservative",
            Self::Aggressive => "aggressive",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Strategy {
    type Err = ChorusError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ChorusError::UnknownStrategy(s.to_string()))
    }
}

/// On-disk configuration file (YAML)
///
/// ```yaml
/// strategy: quality
/// reference_sources: [biquge, bqgam]
/// merge:
///   min_content_length: 300
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub strategy: Strategy,
    pub reference_sources: Option<Vec<String>>,
    pub merge: MergeOverrides,
}

impl ConfigFile {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| ChorusError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "Loaded merge configuration file");
        Self::from_yaml_str(&contents)
    }

    /// Strategy preset with the file's overrides applied on top
    pub fn merge_config(&self) -> MergeConfig {
        let mut config = MergeConfig::preset(self.strategy);
        config.apply(&self.merge);
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MergeConfig::default();
        assert!(config.enable_diff_merge);
        assert_eq!(config.length_priority_weight, 0.6);
        assert_eq!(config.quality_weight, 0.4);
        assert_eq!(config.min_content_length, 200);
        assert_eq!(config.merge_threshold, 1.1);
        assert_eq!(config.similarity_threshold, 0.8);
    }

    #[test]
    fn test_builder_pattern() {
        let config = MergeConfig::new()
            .with_diff_merge(false)
            .with_weights(0.7, 0.3)
            .with_merge_threshold(1.25);

        assert!(!config.enable_diff_merge);
        assert_eq!(config.length_priority_weight, 0.7);
        assert_eq!(config.quality_weight, 0.3);
        assert_eq!(config.merge_threshold, 1.25);
        assert_eq!(config.min_content_length, 200);
    }

    #[test]
    fn test_presets_only_touch_their_keys() {
        let length = MergeConfig::preset(Strategy::Length);
        assert!(!length.enable_diff_merge);
        assert_eq!(length.min_content_length, 100);
        assert_eq!(length.merge_threshold, 1.1);

        let aggressive = MergeConfig::preset(Strategy::Aggressive);
        assert_eq!(aggressive.merge_threshold, 1.01);
        assert_eq!(aggressive.similarity_threshold, 0.6);

        assert_eq!(MergeConfig::preset(Strategy::Default), MergeConfig::default());
    }

    #[test]
    fn test_strategy_from_str() {
        assert_eq!("Quality".parse::<Strategy>().unwrap(), Strategy::Quality);
        assert!(matches!(
            "fastest".parse::<Strategy>(),
            Err(ChorusError::UnknownStrategy(_))
        ));
    }

    #[test]
    fn test_set_option() {
        let mut config = MergeConfig::new();
        config.set_option("merge_threshold", "1.3").unwrap();
        config.set_option("enable_diff_merge", "false").unwrap();
        assert_eq!(config.merge_threshold, 1.3);
        assert!(!config.enable_diff_merge);

        assert!(matches!(
            config.set_option("min_content_length", "-5"),
            Err(ChorusError::InvalidOptionValue { .. })
        ));
        assert!(matches!(
            config.set_option("max_workers", "3"),
            Err(ChorusError::UnknownOption(_))
        ));
    }

    #[test]
    fn test_config_file_applies_overrides_over_preset() {
        let yaml = "strategy: conservative\nreference_sources: [biquge]\nmerge:\n  min_content_length: 120\n";
        let file = ConfigFile::from_yaml_str(yaml).unwrap();
        let config = file.merge_config();

        assert_eq!(file.reference_sources, Some(vec!["biquge".to_string()]));
        assert_eq!(config.min_content_length, 120);
        assert_eq!(config.merge_threshold, 1.2);
        assert!(!config.enable_diff_merge);
    }

    #[test]
    fn test_config_file_rejects_unknown_merge_keys() {
        let yaml = "merge:\n  max_workers: 3\n";
        assert!(ConfigFile::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn test_empty_config_file_is_default() {
        let file = ConfigFile::from_yaml_str("").unwrap();
        assert_eq!(file.merge_config(), MergeConfig::default());
        assert!(file.reference_sources.is_none());
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chorus.yaml");
        std::fs::write(&path, "strategy: diff\n").unwrap();

        let config = ConfigFile::load(&path).unwrap().merge_config();
        assert_eq!(config.merge_threshold, 1.02);

        let missing = ConfigFile::load(&dir.path().join("missing.yaml"));
        assert!(matches!(missing, Err(ChorusError::Read { .. })));
    }
}
