//! Reconciliation engine that orchestrates the per-chapter stages
//!
//! For each chapter key the engine runs:
//! 1. Filter candidates (fall back to the longest raw candidate if none pass)
//! 2. Take a reference source when one matches
//! 3. Otherwise score, optionally preferring similarity agreement
//! 4. Try to augment the longest valid text with lines only others carry;
//!    keep the winner when that adds too little
//! 5. Clean the chosen text and emit the chapter

use serde::Serialize;
use tracing::{debug, debug_span, info, warn};

use crate::boilerplate;
use crate::candidate::{Candidate, Provenance, ReconciledChapter, RunStatistics};
use crate::chapter_key::{ChapterKey, KeyPolicy};
use crate::config::MergeConfig;
use crate::corpus::{group_candidates, ChapterGroup};
use crate::filter;
use crate::merge::{self, Augmentation, AugmentationDetails};
use crate::reference::ReferenceSources;
use crate::scoring;
use crate::similarity::{ChapterComparison, SimilarityReport};

/// How the final text of a chapter was chosen
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "path", rename_all = "snake_case")]
pub enum ResolutionPath {
    /// Exactly one candidate passed the filter
    SingleCandidate,
    /// A reference source supplied the text
    ReferenceMatch { reference: String },
    /// Highest combined quality score
    Scored,
    /// Similarity agreement decided the winner
    SimilarityPreferred,
    /// Winner enriched with lines from other sources
    Augmented,
    /// No candidate passed the filter; the longest raw text was used
    Fallback,
}

/// Record of the decisions made for one chapter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciliationTrace {
    pub chapter_key: ChapterKey,
    pub title: String,
    #[serde(flatten)]
    pub path: ResolutionPath,
    pub candidates: usize,
    pub valid_candidates: usize,
    /// Source of the selected winner (before any augmentation)
    pub selected_source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub augmentation: Option<AugmentationDetails>,
}

/// A reconciled chapter together with its trace
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterOutcome {
    pub chapter: ReconciledChapter,
    pub trace: ReconciliationTrace,
}

/// Output of one pass over a set of chapters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconciliationRun {
    pub chapters: Vec<ReconciledChapter>,
    pub traces: Vec<ReconciliationTrace>,
    /// Keys that had no candidates at all
    pub skipped: Vec<ChapterKey>,
    pub statistics: RunStatistics,
}

impl ReconciliationRun {
    fn record(&mut self, key: &ChapterKey, outcome: Option<ChapterOutcome>) {
        match outcome {
            Some(outcome) => {
                self.statistics.record_emitted();
                self.chapters.push(outcome.chapter);
                self.traces.push(outcome.trace);
            }
            None => {
                self.statistics.record_skipped();
                self.skipped.push(key.clone());
            }
        }
    }

    pub fn merged_count(&self) -> usize {
        self.chapters
            .iter()
            .filter(|c| c.source_domain.is_merged())
            .count()
    }
}

/// The reconciliation engine.
///
/// Configuration is fixed for the engine's lifetime; build a new engine (or
/// use a [`MergeSession`](crate::session::MergeSession)) to change it.
#[derive(Debug, Clone, Default)]
pub struct ReconciliationEngine {
    config: MergeConfig,
    references: ReferenceSources,
    key_policy: KeyPolicy,
}

impl ReconciliationEngine {
    /// Create an engine with the default reference sources
    pub fn new(config: MergeConfig) -> Self {
        Self {
            config,
            references: ReferenceSources::default(),
            key_policy: KeyPolicy::default(),
        }
    }

    pub fn with_references(mut self, references: ReferenceSources) -> Self {
        self.references = references;
        self
    }

    pub fn with_key_policy(mut self, key_policy: KeyPolicy) -> Self {
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

    /// Reconcile loose candidates, grouping them by chapter key first
    pub fn run(&self, candidates: &[Candidate], report: Option<&SimilarityReport>) -> ReconciliationRun {
        let groups = group_candidates(candidates.iter().cloned(), self.key_policy);
        self.run_groups(&groups, report)
    }

    /// Reconcile pre-grouped chapters in order
    pub fn run_groups(&self, groups: &[ChapterGroup], report: Option<&SimilarityReport>) -> ReconciliationRun {
        let mut run = ReconciliationRun::default();
        for group in groups {
            let outcome = self.reconcile_group(group, report);
            run.record(&group.key, outcome);
        }
        log_summary(&run);
        run
    }

    /// Reconcile pre-grouped chapters on the rayon thread pool.
    ///
    /// Output order and statistics match [`run_groups`](Self::run_groups).
    #[cfg(feature = "parallel")]
    pub fn run_groups_parallel(
        &self,
        groups: &[ChapterGroup],
        report: Option<&SimilarityReport>,
    ) -> ReconciliationRun {
        use rayon::prelude::*;

        let outcomes: Vec<Option<ChapterOutcome>> = groups
            .par_iter()
            .map(|group| self.reconcile_group(group, report))
            .collect();

        let mut run = ReconciliationRun::default();
        for (group, outcome) in groups.iter().zip(outcomes) {
            run.record(&group.key, outcome);
        }
        log_summary(&run);
        run
    }

    fn reconcile_group(&self, group: &ChapterGroup, report: Option<&SimilarityReport>) -> Option<ChapterOutcome> {
        // Reports keyed by the raw title are accepted too
        let comparison =
            report.and_then(|r| r.get(group.key.as_str()).or_else(|| r.get(&group.title)));
        self.reconcile_keyed(group.key.clone(), &group.title, &group.candidates, comparison)
    }

    /// Reconcile the candidates of a single chapter.
    ///
    /// Returns `None` only when `candidates` is empty.
    pub fn reconcile_chapter(
        &self,
        title: &str,
        candidates: &[Candidate],
        comparison: Option<&ChapterComparison>,
    ) -> Option<ChapterOutcome> {
        let key = ChapterKey::from_title(title, self.key_policy);
        self.reconcile_keyed(key, title, candidates, comparison)
    }

    fn reconcile_keyed(
        &self,
        key: ChapterKey,
        title: &str,
        candidates: &[Candidate],
        comparison: Option<&ChapterComparison>,
    ) -> Option<ChapterOutcome> {
        let _span = debug_span!("reconcile_chapter", key = %key).entered();

        if candidates.is_empty() {
            debug!("no candidates, skipping chapter");
            return None;
        }

        let valid = filter::filter_valid(candidates, &self.config);
        debug!(candidates = candidates.len(), valid = valid.len(), "filtered candidates");

        let trace = |path, selected: &Candidate, augmentation| ReconciliationTrace {
            chapter_key: key.clone(),
            title: title.to_string(),
            path,
            candidates: candidates.len(),
            valid_candidates: valid.len(),
            selected_source: selected.source_id.clone(),
            augmentation,
        };

        if valid.is_empty() {
            let fallback = filter::longest(candidates)?;
            warn!(source = %fallback.source_id, "no valid candidates, using longest raw text");
            return Some(emit(title, fallback, trace(ResolutionPath::Fallback, fallback, None)));
        }

        if let [only] = valid[..] {
            return Some(emit(title, only, trace(ResolutionPath::SingleCandidate, only, None)));
        }

        if let Some((reference, hit)) = self.references.find_match(&valid, &self.config) {
            debug!(reference, source = %hit.source_id, "reference source matched");
            let path = ResolutionPath::ReferenceMatch {
                reference: reference.to_string(),
            };
            return Some(emit(title, hit, trace(path, hit, None)));
        }

        let scored = scoring::score_all(&valid, &self.config);
        let mut winner = scoring::select_best(&scored)?;
        let mut path = ResolutionPath::Scored;

        if let Some(preferred) = comparison.and_then(|c| scoring::select_by_similarity(&scored, c)) {
            if preferred.candidate.source_id != winner.candidate.source_id {
                debug!(
                    scored = %winner.candidate.source_id,
                    preferred = %preferred.candidate.source_id,
                    "similarity agreement overrides quality winner"
                );
            }
            winner = preferred;
            path = ResolutionPath::SimilarityPreferred;
        }
        let winner = winner.candidate;
        debug!(source = %winner.source_id, ?path, "selected winner");

        match merge::augment(&valid, &self.config) {
            Augmentation::Accepted { content, details } => {
                let chapter = ReconciledChapter::new(title, content, Provenance::Merged);
                Some(ChapterOutcome {
                    chapter,
                    trace: trace(ResolutionPath::Augmented, winner, Some(details)),
                })
            }
            Augmentation::Rejected(details) => {
                Some(emit(title, winner, trace(path, winner, Some(details))))
            }
            Augmentation::NotApplicable => Some(emit(title, winner, trace(path, winner, None))),
        }
    }
}

fn emit(title: &str, selected: &Candidate, trace: ReconciliationTrace) -> ChapterOutcome {
    let content = boilerplate::clean(&selected.text);
    let chapter = ReconciledChapter::new(
        title,
        content,
        Provenance::Source(selected.source_id.clone()),
    );
    ChapterOutcome { chapter, trace }
}

fn log_summary(run: &ReconciliationRun) {
    info!(
        total = run.statistics.total,
        emitted = run.statistics.merged,
        skipped = run.statistics.skipped,
        augmented = run.merged_count(),
        "reconciliation finished"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::SimilarityEdge;

    fn prose(tag: &str, n: usize) -> String {
        (0..n)
            .map(|i| format!("{tag}这是第{i}句正文，情节正在展开。"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn engine() -> ReconciliationEngine {
        ReconciliationEngine::new(MergeConfig::default().with_diff_merge(false))
            .with_references(ReferenceSources::none())
    }

    #[test]
    fn test_single_candidate_pass_through() {
        let text = prose("", 20);
        let candidates = vec![Candidate::new("siteA", "第一章", text.clone())];
        let outcome = engine().reconcile_chapter("第一章", &candidates, None).unwrap();

        assert_eq!(outcome.chapter.content, boilerplate::clean(&text));
        assert_eq!(outcome.chapter.source_domain, Provenance::Source("siteA".into()));
        assert_eq!(outcome.trace.path, ResolutionPath::SingleCandidate);
    }

    #[test]
    fn test_empty_candidates_are_skipped() {
        assert!(engine().reconcile_chapter("第一章", &[], None).is_none());
    }

    #[test]
    fn test_fallback_to_longest_raw() {
        let candidates = vec![
            Candidate::new("siteA", "1", "短"),
            Candidate::new("siteB", "1", "稍长一点"),
            Candidate::new("siteC", "1", "一样长的"),
        ];
        let outcome = engine().reconcile_chapter("1", &candidates, None).unwrap();
        assert_eq!(outcome.trace.path, ResolutionPath::Fallback);
        assert_eq!(outcome.chapter.source_domain.as_str(), "siteB");
        assert_eq!(outcome.trace.valid_candidates, 0);
    }

    #[test]
    fn test_reference_override_precedence() {
        let candidates = vec![
            Candidate::new("siteA", "1", prose("甲", 40)),
            Candidate::new("m.siteB.net", "1", prose("乙", 15)),
            Candidate::new("siteC", "1", prose("丙", 15)),
        ];
        let engine = engine().with_references(ReferenceSources::new(["siteC", "siteB"]));
        let outcome = engine.reconcile_chapter("1", &candidates, None).unwrap();

        assert_eq!(outcome.chapter.source_domain.as_str(), "siteC");
        assert_eq!(
            outcome.trace.path,
            ResolutionPath::ReferenceMatch {
                reference: "siteC".into()
            }
        );
    }

    #[test]
    fn test_scored_winner() {
        let candidates = vec![
            Candidate::new("siteA", "1", prose("甲", 15)),
            Candidate::new("siteB", "1", prose("乙", 40)),
        ];
        let outcome = engine().reconcile_chapter("1", &candidates, None).unwrap();
        assert_eq!(outcome.chapter.source_domain.as_str(), "siteB");
        assert_eq!(outcome.trace.path, ResolutionPath::Scored);
    }

    #[test]
    fn test_similarity_preference() {
        let candidates = vec![
            Candidate::new("siteA", "1", prose("甲", 40)),
            Candidate::new("siteB", "1", prose("乙", 30)),
            Candidate::new("siteC", "1", prose("丙", 30)),
        ];
        let comparison = ChapterComparison {
            comparisons: vec![
                SimilarityEdge {
                    domains: ["siteA".into(), "siteB".into()],
                    similarity: 0.1,
                },
                SimilarityEdge {
                    domains: ["siteB".into(), "siteC".into()],
                    similarity: 0.9,
                },
            ],
            ..Default::default()
        };
        let outcome = engine()
            .reconcile_chapter("1", &candidates, Some(&comparison))
            .unwrap();
        // siteA has the best quality score but agrees least with the others
        assert_eq!(outcome.chapter.source_domain.as_str(), "siteC");
        assert_eq!(outcome.trace.path, ResolutionPath::SimilarityPreferred);
    }

    fn edge(a: &str, b: &str, similarity: f64) -> SimilarityEdge {
        SimilarityEdge {
            domains: [a.into(), b.into()],
            similarity,
        }
    }

    fn comparison(edges: Vec<SimilarityEdge>) -> ChapterComparison {
        ChapterComparison {
            comparisons: edges,
            ..Default::default()
        }
    }

    #[test]
    fn test_similarity_winner_survives_longer_source() {
        // siteB and siteC are prefixes of siteA and agree with each other
        let candidates = vec![
            Candidate::new("siteA", "1", prose("", 150)),
            Candidate::new("siteB", "1", prose("", 100)),
            Candidate::new("siteC", "1", prose("", 100)),
        ];
        let comparison = comparison(vec![
            edge("siteA", "siteB", 0.1),
            edge("siteA", "siteC", 0.1),
            edge("siteB", "siteC", 1.0),
        ]);
        let engine = ReconciliationEngine::new(MergeConfig::default())
            .with_references(ReferenceSources::none());
        let outcome = engine
            .reconcile_chapter("1", &candidates, Some(&comparison))
            .unwrap();

        assert_eq!(outcome.trace.path, ResolutionPath::SimilarityPreferred);
        assert_eq!(outcome.chapter.source_domain.as_str(), "siteB");
        assert_eq!(outcome.chapter.content, boilerplate::clean(&candidates[1].text));
        let details = outcome.trace.augmentation.unwrap();
        assert_eq!(details.base_source, "siteA");
        assert_eq!(details.lines_added, 0);
        assert_eq!(details.rejection, Some(merge::Rejection::NothingAdded));
    }

    fn three_way_candidates() -> Vec<Candidate> {
        vec![
            Candidate::new("siteA", "第一章", prose("甲", 40)),
            Candidate::new("siteB", "第一章", prose("乙", 30)),
            Candidate::new("siteC", "第一章", prose("丙", 30)),
        ]
    }

    #[test]
    fn test_report_looked_up_by_chapter_key() {
        let candidates = three_way_candidates();
        let run = engine().run(&candidates, None);
        assert_eq!(run.chapters[0].source_domain.as_str(), "siteA");

        let mut report = SimilarityReport::new();
        report.insert(
            ChapterKey::normalized("第一章").to_string(),
            comparison(vec![edge("siteA", "siteB", 0.1), edge("siteB", "siteC", 0.9)]),
        );
        // A title-keyed entry loses to the normalized key
        report.insert(
            "第一章",
            comparison(vec![edge("siteA", "siteC", 0.1), edge("siteB", "siteC", 0.9)]),
        );
        let run = engine().run(&candidates, Some(&report));

        assert_eq!(run.chapters[0].source_domain.as_str(), "siteC");
        assert_eq!(run.traces[0].path, ResolutionPath::SimilarityPreferred);
    }

    #[test]
    fn test_report_looked_up_by_raw_title() {
        let candidates = three_way_candidates();
        assert_ne!(ChapterKey::normalized("第一章").as_str(), "第一章");

        let mut report = SimilarityReport::new();
        report.insert(
            "第一章",
            comparison(vec![edge("siteA", "siteC", 0.1), edge("siteB", "siteC", 0.9)]),
        );
        let run = engine().run_groups(&group_candidates(candidates, KeyPolicy::Normalized), Some(&report));

        assert_eq!(run.chapters[0].source_domain.as_str(), "siteB");
        assert_eq!(run.traces[0].path, ResolutionPath::SimilarityPreferred);
    }

    #[test]
    fn test_run_statistics_are_monotonic() {
        let groups = vec![
            ChapterGroup {
                key: ChapterKey::normalized("第一章"),
                title: "第一章".into(),
                candidates: vec![Candidate::new("siteA", "第一章", prose("", 20))],
            },
            ChapterGroup::new(ChapterKey::normalized("第二章"), "第二章"),
            ChapterGroup {
                key: ChapterKey::normalized("第三章"),
                title: "第三章".into(),
                candidates: vec![Candidate::new("siteA", "第三章", "短")],
            },
        ];
        let run = engine().run_groups(&groups, None);

        assert_eq!(run.statistics.total, 3);
        assert_eq!(run.statistics.merged + run.statistics.skipped, run.statistics.total);
        assert_eq!(run.statistics.skipped, 1);
        assert_eq!(run.skipped, vec![ChapterKey::normalized("第二章")]);
        assert_eq!(run.chapters.len(), 2);
    }

    #[test]
    fn test_run_groups_candidates_by_key() {
        let candidates = vec![
            Candidate::new("siteA", "第一章", prose("甲", 20)),
            Candidate::new("siteB", "第1章", prose("乙", 30)),
            Candidate::new("siteA", "第二章", prose("丙", 20)),
        ];
        let run = engine().run(&candidates, None);
        assert_eq!(run.chapters.len(), 2);
        assert_eq!(run.chapters[0].title, "第一章");
        assert_eq!(run.chapters[0].source_domain.as_str(), "siteB");
        assert_eq!(run.traces[1].path, ResolutionPath::SingleCandidate);
    }

    #[test]
    fn test_trace_serializes_path_inline() {
        let candidates = vec![Candidate::new("siteA", "1", prose("", 20))];
        let outcome = engine().reconcile_chapter("1", &candidates, None).unwrap();
        let json = serde_json::to_value(&outcome.trace).unwrap();
        assert_eq!(json["path"], "single_candidate");
        assert_eq!(json["selected_source"], "siteA");
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_matches_sequential() {
        let candidates: Vec<Candidate> = (0..20)
            .flat_map(|i| {
                let title = format!("第{i}章");
                vec![
                    Candidate::new("siteA", title.clone(), prose("甲", 10 + i)),
                    Candidate::new("siteB", title, prose("乙", 20)),
                ]
            })
            .collect();
        let groups = group_candidates(candidates, KeyPolicy::Normalized);
        let engine = ReconciliationEngine::new(MergeConfig::default());

        assert_eq!(engine.run_groups(&groups, None), engine.run_groups_parallel(&groups, None));
    }
}
