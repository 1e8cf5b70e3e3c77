//! Basic usage example of the chorus reconciliation engine

use chorus_core::{
    clean, Candidate, ChapterEntry, Corpus, MergeConfig, MergeSession,
    ReconciliationEngine, ReferenceSources, Strategy,
};

const LINE: &str = "----------------------------------------";

fn main() {
    println!("=== Chapter Reconciliation Examples ===\n");

    // Example 1: Reconcile one chapter from three sources
    example_single_chapter();

    // Example 2: Cleaning boilerplate
    example_cleaning();

    // Example 3: Strategy presets and session options
    example_session();

    // Example 4: Whole corpus with a comparison report
    example_corpus();
}

fn body(extra: &str) -> String {
    let mut text: String = (1..=40)
        .map(|i| format!("第{i}段，山风吹过，他停下脚步回头看。\n"))
        .collect();
    text.push_str(extra);
    text
}

fn example_single_chapter() {
    println!("Example 1: Single Chapter");
    println!("{}", LINE);

    let candidates = vec![
        Candidate::new("site-a.com", "第一章 出山", "章节内容正在加载..."),
        Candidate::new("site-b.com", "第一章 出山", body("")),
        Candidate::new(
            "site-c.com",
            "第1章：出山",
            body("远处传来钟声，他终于明白师父临别时的那句话，转身走进了夜色。"),
        ),
    ];

    let engine = ReconciliationEngine::new(MergeConfig::default().with_merge_threshold(1.02))
        .with_references(ReferenceSources::none());

    match engine.reconcile_chapter("第一章 出山", &candidates, None) {
        Some(outcome) => {
            println!("Source: {}", outcome.chapter.source_domain);
            println!("Length: {}", outcome.chapter.content_length);
            println!("Path:   {:?}", outcome.trace.path);
            if let Some(details) = &outcome.trace.augmentation {
                println!(
                    "Augmentation: +{} lines, {} chars (needed > {:.0})",
                    details.lines_added, details.merged_length, details.required_length
                );
            }
        }
        None => println!("No candidates"),
    }
    println!("\n");
}

fn example_cleaning() {
    println!("Example 2: Boilerplate Cleaning");
    println!("{}", LINE);

    let raw = "他笑了。\n请收藏本站：www.example.com\n\n\n\n(未完待续)她也笑了。";
    println!("Raw:\n{}\n", raw);
    println!("Cleaned:\n{}\n", clean(raw));

    let layers = chorus_core::boilerplate::default_cleaner().explain(raw);
    println!("Rules that changed the text: {:?}", layers.changed_by());
    println!("\n");
}

fn example_session() {
    println!("Example 3: Session Options");
    println!("{}", LINE);

    let mut session = MergeSession::with_strategy(Strategy::Conservative);
    if let Err(err) = session.configure("min_content_length", "300") {
        println!("Error: {}", err);
    }
    if let Err(err) = session.configure("merge_treshold", "1.3") {
        println!("Rejected option: {}", err);
    }

    let engine = session.into_engine();
    println!("Config: {:?}", engine.config());
    println!("\n");
}

fn example_corpus() {
    println!("Example 4: Corpus");
    println!("{}", LINE);

    let mut corpus = Corpus::new();
    corpus.add_source(
        "site-a.com",
        vec![
            ChapterEntry::new("第一章", body("")),
            ChapterEntry::new("第二章", body("第二章独有的结尾，写得很完整。")),
        ],
    );
    corpus.add_source(
        "site-b.com",
        vec![
            ChapterEntry::new("第1章", body("")),
            ChapterEntry::new("第2章", "加载中"),
        ],
    );

    let groups = corpus.groups();
    let report = chorus_core::corpus::comparison_report(&groups);
    for (key, comparison) in report.iter() {
        println!("{}: average similarity {:.3}", key, comparison.average().unwrap_or(0.0));
    }

    let run = ReconciliationEngine::default().run_groups(&groups, Some(&report));
    println!(
        "total={} emitted={} skipped={}",
        run.statistics.total, run.statistics.merged, run.statistics.skipped
    );
    for chapter in &run.chapters {
        println!("  {} <- {} ({} chars)", chapter.title, chapter.source_domain, chapter.content_length);
    }
}
