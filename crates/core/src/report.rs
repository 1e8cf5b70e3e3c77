//! Human-readable and JSON reports
//!
//! Nothing in the engine writes files; these helpers render its results and
//! persist them for the command-line tool.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::info;

use crate::candidate::{Provenance, ReconciledChapter, RunStatistics};
use crate::corpus::ChapterGroup;
use crate::engine::ReconciliationRun;
use crate::error::{ChorusError, Result};
use crate::similarity::{SimilarityEdge, SimilarityReport, SimilarityTier, MEDIUM_SIMILARITY};

pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const COMPARISON_REPORT_FILE: &str = "comparison_report.json";
pub const COMPARISON_SUMMARY_FILE: &str = "comparison_summary.txt";

/// Replace characters that are not allowed in file names
pub fn safe_file_stem(title: &str) -> String {
    title
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c => c,
        })
        .collect()
}

fn write_file(path: PathBuf, contents: &str) -> Result<PathBuf> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| ChorusError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(&path, contents).map_err(|source| ChorusError::Write {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// Per-chapter line of the comparison summary
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterSummary {
    pub title: String,
    pub source_count: usize,
    pub average: Option<f64>,
    pub tier: Option<SimilarityTier>,
    pub edges: Vec<SimilarityEdge>,
}

/// Overview of how much the sources agree, chapter by chapter
#[derive(Debug, Clone)]
pub struct ComparisonSummary {
    pub novel_title: String,
    pub sources: Vec<String>,
    pub generated_at: DateTime<Local>,
    pub high_threshold: f64,
    pub chapters: Vec<ChapterSummary>,
}

impl ComparisonSummary {
    /// Summarize `report` for the chapters in `groups` that it covers
    pub fn build(
        novel_title: impl Into<String>,
        sources: Vec<String>,
        groups: &[ChapterGroup],
        report: &SimilarityReport,
        high_threshold: f64,
    ) -> Self {
        let chapters = groups
            .iter()
            .filter_map(|group| {
                let comparison = report.get(group.key.as_str())?;
                let average = comparison.average();
                Some(ChapterSummary {
                    title: group.title.clone(),
                    source_count: group.candidates.len(),
                    average,
                    tier: average.map(|avg| SimilarityTier::classify(avg, high_threshold)),
                    edges: comparison.comparisons.clone(),
                })
            })
            .collect();

        Self {
            novel_title: novel_title.into(),
            sources,
            generated_at: Local::now(),
            high_threshold,
            chapters,
        }
    }

    pub fn count(&self, tier: SimilarityTier) -> usize {
        self.chapters.iter().filter(|c| c.tier == Some(tier)).count()
    }

    pub fn render(&self) -> String {
        self.to_string()
    }

    /// Write the JSON report and the text summary into `dir`
    pub fn write_to(&self, dir: &Path, report: &SimilarityReport) -> Result<(PathBuf, PathBuf)> {
        let json = write_file(dir.join(COMPARISON_REPORT_FILE), &report.to_json()?)?;
        let text = write_file(dir.join(COMPARISON_SUMMARY_FILE), &self.render())?;
        info!(report = %json.display(), summary = %text.display(), "comparison written");
        Ok((json, text))
    }
}

impl fmt::Display for ComparisonSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Chapter comparison summary")?;
        writeln!(f, "Novel: {}", self.novel_title)?;
        writeln!(f, "Compared at: {}", self.generated_at.format(TIME_FORMAT))?;
        writeln!(f, "Sources: {}", self.sources.join(", "))?;
        writeln!(f, "{}\n", "=".repeat(60))?;

        for chapter in &self.chapters {
            writeln!(f, "Chapter: {}", chapter.title)?;
            writeln!(f, "Sources: {}", chapter.source_count)?;
            if let (Some(avg), Some(tier)) = (chapter.average, chapter.tier) {
                writeln!(f, "Average similarity: {avg:.3} ({})", tier.label())?;
                for edge in &chapter.edges {
                    writeln!(
                        f,
                        "  {} vs {}: {:.3}",
                        edge.domains[0], edge.domains[1], edge.similarity
                    )?;
                }
            }
            writeln!(f)?;
        }

        writeln!(f, "{}", "=".repeat(60))?;
        writeln!(f, "Chapters compared: {}", self.chapters.len())?;
        writeln!(
            f,
            "High similarity (>={}): {}",
            self.high_threshold,
            self.count(SimilarityTier::High)
        )?;
        writeln!(
            f,
            "Low similarity (<{}): {}",
            MEDIUM_SIMILARITY,
            self.count(SimilarityTier::Low)
        )
    }
}

/// Per-chapter entry of the merged info document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedChapterInfo {
    pub index: usize,
    pub title: String,
    pub source_domain: Provenance,
    pub content_length: usize,
}

/// JSON companion of the merged text
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedInfo {
    pub novel_title: String,
    pub merge_time: String,
    pub statistics: RunStatistics,
    pub chapters: Vec<MergedChapterInfo>,
}

/// Paths written by [`MergedNovel::write_to`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedFiles {
    pub text: PathBuf,
    pub info: PathBuf,
}

/// The reconciled novel, ready to render
#[derive(Debug, Clone)]
pub struct MergedNovel {
    pub novel_title: String,
    pub merge_time: DateTime<Local>,
    pub statistics: RunStatistics,
    pub chapters: Vec<ReconciledChapter>,
}

impl MergedNovel {
    pub fn from_run(novel_title: impl Into<String>, run: ReconciliationRun) -> Self {
        Self {
            novel_title: novel_title.into(),
            merge_time: Local::now(),
            statistics: run.statistics,
            chapters: run.chapters,
        }
    }

    pub fn render_text(&self) -> String {
        self.to_string()
    }

    pub fn info(&self) -> MergedInfo {
        MergedInfo {
            novel_title: self.novel_title.clone(),
            merge_time: self.merge_time.format(TIME_FORMAT).to_string(),
            statistics: self.statistics,
            chapters: self
                .chapters
                .iter()
                .enumerate()
                .map(|(i, chapter)| MergedChapterInfo {
                    index: i + 1,
                    title: chapter.title.clone(),
                    source_domain: chapter.source_domain.clone(),
                    content_length: chapter.content_length,
                })
                .collect(),
        }
    }

    /// Write `<title>_merged.txt` and `<title>_merged_info.json` into `dir`
    pub fn write_to(&self, dir: &Path) -> Result<MergedFiles> {
        let stem = safe_file_stem(&self.novel_title);
        let info_json = serde_json::to_string_pretty(&self.info())?;

        let files = MergedFiles {
            text: write_file(dir.join(format!("{stem}_merged.txt")), &self.render_text())?,
            info: write_file(dir.join(format!("{stem}_merged_info.json")), &info_json)?,
        };
        info!(
            text = %files.text.display(),
            info = %files.info.display(),
            chapters = self.chapters.len(),
            "merged novel written"
        );
        Ok(files)
    }
}

impl fmt::Display for MergedNovel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Novel: {}", self.novel_title)?;
        writeln!(f, "Merged at: {}", self.merge_time.format(TIME_FORMAT))?;
        writeln!(f, "Chapters: {}", self.statistics.merged)?;
        writeln!(f, "{}\n", "=".repeat(50))?;

        for (i, chapter) in self.chapters.iter().enumerate() {
            writeln!(f, "[{}] {}", i + 1, chapter.title)?;
            writeln!(
                f,
                "(source: {}, length: {})",
                chapter.source_domain, chapter.content_length
            )?;
            writeln!(f, "{}", "-".repeat(30))?;
            write!(f, "{}\n\n", chapter.content)?;
        }
        Ok(())
    }
}
