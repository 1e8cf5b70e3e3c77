//! chorus CLI
//!
//! Command-line interface for cross-source chapter reconciliation.
//!
//! Provides commands for:
//! - Comparing the chapters collected from several sources
//! - Merging them into one canonical novel
//! - Listing the built-in merge strategies

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chorus_core::report::{ComparisonSummary, MergedNovel, COMPARISON_REPORT_FILE};
use chorus_core::{ConfigFile, Corpus, MergeConfig, MergeSession, SimilarityReport, Strategy};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "chorus")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Reconcile chapters collected from several sources")]
#[command(long_about = "chorus - cross-source chapter reconciliation\n\n\
    Expects one subdirectory per source under the novel directory, each holding a\n\
    `<novel>_chapters.json` array of {title, content} entries.\n\n\
    Examples:\n\
      chorus compare -d ./novels/凡人修仙传\n\
      chorus merge -d ./novels/凡人修仙传 -s quality\n\
      chorus merge -d ./novels/凡人修仙传 --set merge_threshold=1.2 -r biquge,bqgam\n\
      chorus merge -d ./novels/凡人修仙传 --set key_policy=exact")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compare every chapter carried by two or more sources
    Compare {
        /// Novel directory with one subdirectory per source
        #[arg(short, long, value_name = "DIR")]
        dir: PathBuf,

        /// Novel title (defaults to the directory name)
        #[arg(short, long)]
        novel: Option<String>,

        /// Boundary of the "high" similarity tier
        #[arg(short, long, default_value_t = 0.8)]
        threshold: f64,

        /// Output directory (defaults to the novel directory)
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,
    },

    /// Merge the sources into one canonical novel
    Merge {
        /// Novel directory with one subdirectory per source
        #[arg(short, long, value_name = "DIR")]
        dir: PathBuf,

        /// Novel title (defaults to the directory name)
        #[arg(short, long)]
        novel: Option<String>,

        /// Merge strategy preset
        #[arg(short, long, default_value = "default")]
        strategy: Strategy,

        /// YAML configuration file; replaces --strategy
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Comma separated reference sources (empty string disables them)
        #[arg(short, long, value_name = "LIST")]
        reference_sources: Option<String>,

        /// Override a single option, e.g. `merge_threshold=1.2` or `key_policy=exact`
        #[arg(long = "set", value_name = "KEY=VALUE")]
        overrides: Vec<String>,

        /// Comparison report to consult (defaults to the one in the novel directory)
        #[arg(long, value_name = "FILE")]
        comparison: Option<PathBuf>,

        /// Output directory (defaults to `<dir>/merged_best`)
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Also write the per-chapter decision trace as JSON
        #[arg(long, value_name = "FILE")]
        trace: Option<PathBuf>,
    },

    /// List merge strategies and their settings
    Strategies,
}

fn novel_title(dir: &Path, novel: Option<String>) -> Result<String> {
    if let Some(novel) = novel {
        return Ok(novel);
    }
    dir.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .with_context(|| format!("cannot derive a novel title from {}", dir.display()))
}

fn load_corpus(dir: &Path, title: &str) -> Result<Corpus> {
    let mut corpus = Corpus::load_dir(dir, Some(title))
        .with_context(|| format!("failed to load sources from {}", dir.display()))?;
    if corpus.is_empty() {
        // Fall back to whatever chapter file each source has
        corpus = Corpus::load_dir(dir, None)?;
    }
    if corpus.is_empty() {
        bail!("no chapter files found under {}", dir.display());
    }
    info!(sources = ?corpus.source_ids(), "loaded corpus");
    Ok(corpus)
}

fn compare(dir: PathBuf, novel: Option<String>, threshold: f64, output: Option<PathBuf>) -> Result<()> {
    let title = novel_title(&dir, novel)?;
    let corpus = load_corpus(&dir, &title)?;
    if corpus.sources().len() < 2 {
        bail!("at least two sources are needed for a comparison");
    }

    let groups = corpus.groups();
    let report = chorus_core::corpus::comparison_report(&groups);
    let sources = corpus.source_ids().into_iter().map(str::to_string).collect();
    let summary = ComparisonSummary::build(&title, sources, &groups, &report, threshold);

    let output = output.unwrap_or(dir);
    let (json, text) = summary.write_to(&output, &report)?;
    println!("Comparison report: {}", json.display());
    println!("Summary:           {}", text.display());
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn merge(
    dir: PathBuf,
    novel: Option<String>,
    strategy: Strategy,
    config: Option<PathBuf>,
    reference_sources: Option<String>,
    overrides: Vec<String>,
    comparison: Option<PathBuf>,
    output: Option<PathBuf>,
    trace: Option<PathBuf>,
) -> Result<()> {
    let mut session = match config {
        Some(path) => MergeSession::from_config_file(&ConfigFile::load(&path)?),
        None => MergeSession::with_strategy(strategy),
    };
    if let Some(list) = reference_sources {
        session.configure("reference_sources", &list)?;
    }
    for entry in &overrides {
        let (key, value) = entry
            .split_once('=')
            .with_context(|| format!("expected KEY=VALUE, got `{entry}`"))?;
        session.configure(key.trim(), value)?;
    }

    let engine = session.into_engine();
    let title = novel_title(&dir, novel)?;
    let corpus = load_corpus(&dir, &title)?.with_key_policy(engine.key_policy());

    let comparison_path = comparison.unwrap_or_else(|| dir.join(COMPARISON_REPORT_FILE));
    let report = if comparison_path.is_file() {
        let json = fs::read_to_string(&comparison_path)
            .with_context(|| format!("failed to read {}", comparison_path.display()))?;
        Some(SimilarityReport::from_json(&json)?)
    } else {
        warn!(path = %comparison_path.display(), "no comparison report, selecting without similarity data");
        None
    };

    let groups = corpus.groups();

    #[cfg(feature = "parallel")]
    let run = engine.run_groups_parallel(&groups, report.as_ref());
    #[cfg(not(feature = "parallel"))]
    let run = engine.run_groups(&groups, report.as_ref());

    if let Some(path) = trace {
        let json = serde_json::to_string_pretty(&run.traces)?;
        fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;
    }

    let stats = run.statistics;
    let augmented = run.merged_count();
    let novel = MergedNovel::from_run(&title, run);
    let files = novel.write_to(&output.unwrap_or_else(|| dir.join("merged_best")))?;

    println!(
        "Chapters: {} total, {} emitted, {} skipped, {} augmented",
        stats.total, stats.merged, stats.skipped, augmented
    );
    println!("Text: {}", files.text.display());
    println!("Info: {}", files.info.display());
    Ok(())
}

fn strategies() {
    for strategy in Strategy::ALL {
        let MergeConfig {
            enable_diff_merge,
            length_priority_weight,
            quality_weight,
            min_content_length,
            merge_threshold,
            similarity_threshold,
        } = MergeConfig::preset(strategy);
        let name = strategy.name();
        println!(
            "{name:<13} diff_merge={enable_diff_merge:<5} weights={length_priority_weight}/{quality_weight} \
             min_length={min_content_length} merge_threshold={merge_threshold} similarity={similarity_threshold}"
        );
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Compare {
            dir,
            novel,
            threshold,
            output,
        } => compare(dir, novel, threshold, output),
        Commands::Merge {
            dir,
            novel,
            strategy,
            config,
            reference_sources,
            overrides,
            comparison,
            output,
            trace,
        } => merge(
            dir,
            novel,
            strategy,
            config,
            reference_sources,
            overrides,
            comparison,
            output,
            trace,
        ),
        Commands::Strategies => {
            strategies();
            Ok(())
        }
    }
}
