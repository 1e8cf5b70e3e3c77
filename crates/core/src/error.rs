//! Error types

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised outside of per-chapter reconciliation.
///
/// Chapter-level problems (no candidates, all candidates invalid, rejected
/// augmentation) never surface here; the engine degrades them to a skip or a
/// fallback and records them on the outcome instead.
#[derive(Debug, Error)]
pub enum ChorusError {
    #[error("unknown merge option `{0}`")]
    UnknownOption(String),

    #[error("invalid value `{value}` for merge option `{key}`: {reason}")]
    InvalidOptionValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("unknown merge strategy `{0}` (expected one of: default, length, quality, diff, conservative, aggressive)")]
    UnknownStrategy(String),

    #[error("invalid boilerplate rule `{name}`: {source}")]
    InvalidRule {
        name: String,
        #[source]
        source: regex::Error,
    },

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, ChorusError>;
