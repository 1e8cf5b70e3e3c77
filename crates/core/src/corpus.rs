//! Per-source chapter lists and their grouping by chapter key
//!
//! The collector writes one JSON array of `{title, content, content_hash}`
//! entries per source. A [`Corpus`] holds those lists and turns them into
//! [`ChapterGroup`]s: one per chapter key, in first-seen order, each with at
//! most one candidate per source.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::candidate::Candidate;
use crate::chapter_key::{ChapterKey, KeyPolicy};
use crate::error::{ChorusError, Result};
use crate::similarity::{ChapterComparison, SimilarityReport};

/// Suffix of the per-source chapter files written by the collector
pub const CHAPTERS_FILE_SUFFIX: &str = "_chapters.json";

/// One chapter as stored by a source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterEntry {
    pub title: String,

    #[serde(default)]
    pub content: String,

    /// Digest recorded by the collector; informational only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
}

impl ChapterEntry {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            content_hash: None,
        }
    }

    /// Attach a BLAKE3 digest of the content
    pub fn with_hash(mut self) -> Self {
        self.content_hash = Some(blake3::hash(self.content.as_bytes()).to_hex().to_string());
        self
    }
}

/// All chapters delivered by one source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceChapters {
    pub source_id: String,
    pub chapters: Vec<ChapterEntry>,
}

/// Candidates for one chapter key
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterGroup {
    pub key: ChapterKey,
    /// Display title, as first seen
    pub title: String,
    pub candidates: Vec<Candidate>,
}

impl ChapterGroup {
    pub fn new(key: ChapterKey, title: impl Into<String>) -> Self {
        Self {
            key,
            title: title.into(),
            candidates: Vec::new(),
        }
    }

    /// Add a candidate unless its source already contributed one
    pub fn push(&mut self, candidate: Candidate) -> bool {
        if self
            .candidates
            .iter()
            .any(|c| c.source_id == candidate.source_id)
        {
            return false;
        }
        self.candidates.push(candidate);
        true
    }

    pub fn source_ids(&self) -> Vec<&str> {
        self.candidates.iter().map(|c| c.source_id.as_str()).collect()
    }
}

/// Group loose candidates by chapter key, preserving first-seen order
pub fn group_candidates<I>(candidates: I, policy: KeyPolicy) -> Vec<ChapterGroup>
where
    I: IntoIterator<Item = Candidate>,
{
    let mut builder = GroupBuilder::new(policy);
    for candidate in candidates {
        let title = candidate.chapter_key.clone();
        builder.add(&title, Some(candidate));
    }
    builder.finish()
}

struct GroupBuilder {
    policy: KeyPolicy,
    index: HashMap<ChapterKey, usize>,
    groups: Vec<ChapterGroup>,
}

impl GroupBuilder {
    fn new(policy: KeyPolicy) -> Self {
        Self {
            policy,
            index: HashMap::new(),
            groups: Vec::new(),
        }
    }

    /// Register `title`'s key; `candidate` is `None` for chapters without text
    fn add(&mut self, title: &str, candidate: Option<Candidate>) {
        let key = ChapterKey::from_title(title, self.policy);
        let slot = match self.index.get(&key) {
            Some(&slot) => slot,
            None => {
                self.index.insert(key.clone(), self.groups.len());
                self.groups.push(ChapterGroup::new(key, title));
                self.groups.len() - 1
            }
        };

        if let Some(candidate) = candidate {
            let group = &mut self.groups[slot];
            if !group.push(candidate) {
                debug!(key = %group.key, "duplicate chapter from the same source ignored");
            }
        }
    }

    fn finish(self) -> Vec<ChapterGroup> {
        self.groups
    }
}

/// Chapter lists from several sources for one novel
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    sources: Vec<SourceChapters>,
    key_policy: KeyPolicy,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key_policy(mut self, key_policy: KeyPolicy) -> Self {
        self.key_policy = key_policy;
        self
    }

    pub fn add_source(&mut self, source_id: impl Into<String>, chapters: Vec<ChapterEntry>) {
        self.sources.push(SourceChapters {
            source_id: source_id.into(),
            chapters,
        });
    }

    /// Load one source's chapter file
    pub fn load_source_file(&mut self, source_id: impl Into<String>, path: &Path) -> Result<()> {
        let json = fs::read_to_string(path).map_err(|source| ChorusError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let chapters: Vec<ChapterEntry> = serde_json::from_str(&json)?;
        let source_id = source_id.into();
        debug!(source = %source_id, chapters = chapters.len(), "loaded source");
        self.add_source(source_id, chapters);
        Ok(())
    }

    /// Load every `<dir>/<source>/*_chapters.json`, one source per
    /// subdirectory, in name order.
    ///
    /// With `novel_title` set only `<novel_title>_chapters.json` is read.
    pub fn load_dir(dir: &Path, novel_title: Option<&str>) -> Result<Self> {
        let mut corpus = Self::new();
        for (source_id, path) in chapter_files(dir, novel_title)? {
            corpus.load_source_file(source_id, &path)?;
        }
        Ok(corpus)
    }

    pub fn sources(&self) -> &[SourceChapters] {
        &self.sources
    }

    pub fn source_ids(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.source_id.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Chapter groups in first-seen order across sources.
    ///
    /// Entries with blank content still register their key, so a chapter no
    /// source delivered text for shows up as an empty group.
    pub fn groups(&self) -> Vec<ChapterGroup> {
        let mut builder = GroupBuilder::new(self.key_policy);
        for source in &self.sources {
            for entry in &source.chapters {
                let candidate = (!entry.content.trim().is_empty()).then(|| {
                    Candidate::new(&source.source_id, &entry.title, &entry.content)
                });
                builder.add(&entry.title, candidate);
            }
        }
        builder.finish()
    }

    /// Pairwise similarity for every chapter carried by two or more sources
    pub fn comparison_report(&self) -> SimilarityReport {
        comparison_report(&self.groups())
    }
}

/// Build a comparison report for already grouped chapters
pub fn comparison_report(groups: &[ChapterGroup]) -> SimilarityReport {
    let compare = |group: &ChapterGroup| {
        let candidates: Vec<&Candidate> = group.candidates.iter().collect();
        (group.key.to_string(), ChapterComparison::compute(&candidates))
    };
    let shared = groups.iter().filter(|g| g.candidates.len() >= 2);

    #[cfg(feature = "parallel")]
    let comparisons: Vec<(String, ChapterComparison)> = {
        use rayon::prelude::*;
        let shared: Vec<&ChapterGroup> = shared.collect();
        shared.into_par_iter().map(compare).collect()
    };
    #[cfg(not(feature = "parallel"))]
    let comparisons: Vec<(String, ChapterComparison)> = shared.map(compare).collect();

    let mut report = SimilarityReport::new();
    for (key, comparison) in comparisons {
        report.insert(key, comparison);
    }
    report
}

fn chapter_files(dir: &Path, novel_title: Option<&str>) -> Result<Vec<(String, PathBuf)>> {
    let read_err = |source| ChorusError::Read {
        path: dir.to_path_buf(),
        source,
    };

    let mut source_dirs: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(read_err)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_dir())
        .collect();
    source_dirs.sort();

    let mut files = Vec::new();
    for source_dir in source_dirs {
        let Some(source_id) = source_dir.file_name().and_then(|n| n.to_str()) else {
            warn!(path = %source_dir.display(), "skipping source directory with non UTF-8 name");
            continue;
        };

        let found = match novel_title {
            Some(title) => {
                let path = source_dir.join(format!("{title}{CHAPTERS_FILE_SUFFIX}"));
                path.is_file().then_some(path)
            }
            None => first_chapters_file(&source_dir)?,
        };

        match found {
            Some(path) => files.push((source_id.to_string(), path)),
            None => debug!(source = source_id, "no chapter file"),
        }
    }
    Ok(files)
}

fn first_chapters_file(source_dir: &Path) -> Result<Option<PathBuf>> {
    let mut candidates: Vec<PathBuf> = fs::read_dir(source_dir)
        .map_err(|source| ChorusError::Read {
            path: source_dir.to_path_buf(),
            source,
        })?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with(CHAPTERS_FILE_SUFFIX))
        })
        .collect();
    candidates.sort();
    Ok(candidates.into_iter().next())
}
