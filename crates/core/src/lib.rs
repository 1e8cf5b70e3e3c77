//! # Chorus
//!
//! Reconciles several source copies of the same chapter into one canonical
//! text. Each copy may be truncated, padded with site boilerplate, or
//! missing paragraphs; the engine picks the best copy, optionally enriches
//! it with lines only other sources carry, and cleans the result.
//!
//! ## Core Concepts
//!
//! - **Candidates**: one source's text for a chapter, grouped by a
//!   normalized [`ChapterKey`]
//! - **Filter**: drops candidates that are too short or placeholder pages
//! - **Scoring**: length and structure heuristics, optionally overridden by
//!   cross-source similarity agreement
//! - **Reference sources**: trusted providers that bypass scoring
//! - **Augmentation**: appends prose lines missing from the winner
//! - **Boilerplate cleaner**: an ordered, versioned rule table run to a fixed
//!   point
//!
//! ## Example
//!
//! ```rust
//! use chorus_core::{Candidate, MergeConfig, ReconciliationEngine, ReferenceSources};
//!
//! let body = "他推开门，外面下着大雨。\n".repeat(30);
//! let candidates = vec![
//!     Candidate::new("site-a", "第一章", body.clone()),
//!     Candidate::new("site-b", "第1章", "加载中..."),
//! ];
//!
//! let engine = ReconciliationEngine::new(MergeConfig::default())
//!     .with_references(ReferenceSources::none());
//! let run = engine.run(&candidates, None);
//!
//! assert_eq!(run.chapters.len(), 1);
//! assert_eq!(run.chapters[0].source_domain.as_str(), "site-a");
//! ```

pub mod boilerplate;
pub mod candidate;
pub mod chapter_key;
pub mod config;
pub mod corpus;
pub mod engine;
pub mod error;
pub mod filter;
pub mod merge;
pub mod metrics;
pub mod normalizers;
pub mod pipeline;
pub mod reference;
pub mod report;
pub mod scoring;
pub mod session;
pub mod similarity;

// Re-export main types
pub use boilerplate::{clean, BoilerplateCleaner, BoilerplateRule};
pub use candidate::{Candidate, Provenance, ReconciledChapter, RunStatistics, ScoredCandidate};
pub use chapter_key::{ChapterKey, KeyPolicy};
pub use config::{ConfigFile, MergeConfig, Strategy};
pub use corpus::{ChapterEntry, ChapterGroup, Corpus};
pub use engine::{ChapterOutcome, ReconciliationEngine, ReconciliationRun, ReconciliationTrace, ResolutionPath};
pub use error::{ChorusError, Result};
pub use pipeline::{NormalizationLayer, TextPipeline};
pub use reference::ReferenceSources;
pub use session::MergeSession;
pub use similarity::{similarity, SimilarityEdge, SimilarityReport, SimilarityTier};

/// Reconcile candidates with the given configuration and the default
/// reference sources
///
/// # Example
///
/// ```rust
/// use chorus_core::{reconcile, Candidate, MergeConfig};
///
/// let run = reconcile(&[Candidate::new("site-a", "第一章", "短")], MergeConfig::default());
/// assert_eq!(run.statistics.total, 1);
/// ```
pub fn reconcile(candidates: &[Candidate], config: MergeConfig) -> ReconciliationRun {
    ReconciliationEngine::new(config).run(candidates, None)
}
