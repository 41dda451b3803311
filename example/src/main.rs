//! Fit an LDA topic model from the command line.
//!
//! Usage: gibbs-lda [CORPUS] --topics 20 --iterations 500 --output-dir runs/

extern crate log;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::*;
use gibbs_lda::{
    CheckpointHandle, CheckpointKind, CheckpointStore, Corpus, InitStrategy, Lda, LdaConfig,
    TrainingEvent,
};
use indicatif::{ProgressBar, ProgressStyle};

//
// Fallback corpus. Taken from my essay published on LinkedIn.
//
const DOCUMENTS: &[&str] = &[
    "In the realm of AI, particularly with the rise of large language models and modern machine learning, it's essential to reflect on the value of classic expert systems from the 1970s to the 1990s",
    "While contemporary AI often operates as a black box, classic expert systems operate on a white box principle, in which the reasoning process is transparent: IF these conditions are true, THEN this conclusion",
    "This clarity is crucial in fields like observability, where understanding the decision-making chain is paramount",
    "Expert systems are built on human knowledge, excelling in areas where data are limited or nonexistent, yet experts possess deep theoretical and experiential insights. In contrast, modern AI typically requires large amounts of data, which may not come easily in telemetry collection applications",
    "Predictability is another strength of expert systems. They consistently produce the same output for identical inputs, making them reliable",
    "This predictability is beneficial in observability, whereas modern AI can exhibit statistical variability, leading to different answers and unpredictable behavior with slight shifts in input data",
];

#[derive(Parser, Debug)]
#[command(author, version, about = "Fit an LDA topic model with collapsed Gibbs sampling")]
struct Args {
    /// Corpus file: first line is the document count, then one pre-cleaned
    /// document per line. Without it a small built-in corpus is used.
    corpus: Option<PathBuf>,

    /// Treat the corpus file as raw text, one document per line, no count line
    #[arg(long)]
    raw: bool,

    /// Number of topics
    #[arg(short = 'k', long, default_value = "3")]
    topics: usize,

    /// Gibbs sweeps to run
    #[arg(short = 'n', long, default_value = "800")]
    iterations: usize,

    /// Document-topic prior
    #[arg(long, default_value = "0.1")]
    alpha: f64,

    /// Topic-term prior
    #[arg(long, default_value = "0.01")]
    beta: f64,

    /// Save an intermediate checkpoint every N sweeps (0 disables)
    #[arg(long, default_value = "0")]
    save_every: usize,

    /// Initial assignment strategy: uniform or random
    #[arg(long, default_value = "random")]
    init: InitStrategy,

    /// Random seed; OS entropy when omitted
    #[arg(long)]
    seed: Option<u64>,

    /// Directory for intermediate and final checkpoints
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Resume from a checkpoint directory or blob
    #[arg(long)]
    resume: Option<PathBuf>,

    /// Words shown per topic
    #[arg(long, default_value = "8")]
    top_words: usize,

    /// Write visualization data (JSON) to this path
    #[arg(long)]
    vis: Option<PathBuf>,
}

fn load_corpus(args: &Args) -> Result<Corpus> {
    match &args.corpus {
        Some(path) if args.raw => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            Ok(Corpus::from_raw(&text.lines().collect::<Vec<_>>()))
        }
        Some(path) => Ok(Corpus::from_path(path)?),
        None => Ok(Corpus::from_raw(DOCUMENTS)),
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let corpus = load_corpus(&args)?;
    let mut config = LdaConfig::new(args.topics)
        .alpha(args.alpha)
        .beta(args.beta)
        .num_iterations(args.iterations)
        .save_every(args.save_every)
        .init_strategy(args.init);
    if let Some(seed) = args.seed {
        config = config.random_seed(seed);
    }
    if let Some(dir) = &args.output_dir {
        config = config.checkpoint_dir(dir);
    }

    let mut lda = match &args.resume {
        Some(path) => Lda::resume(config, &corpus, &CheckpointHandle::new(path))
            .with_context(|| format!("Failed to resume from {}", path.display()))?,
        None => Lda::new(config, &corpus)?,
    };
    println!("Parameters :\n{lda}\n");

    let bar = ProgressBar::new(args.iterations as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40.cyan/blue}] {pos}/{len} ({elapsed_precise})")?
            .progress_chars("=>-"),
    );
    bar.set_message("Gibbs sampling");
    lda.fit_with(|event| {
        match event {
            TrainingEvent::SweepFinished { .. } => bar.inc(1),
            TrainingEvent::Checkpoint(cp) => {
                log::debug!("Intermediate checkpoint {}", cp.name(CheckpointKind::Intermediate));
                bar.println(format!("Checkpoint at iteration {}", cp.iterations_done))
            }
        }
        Ok(())
    })?;
    bar.finish_and_clear();
    log::info!(
        "Fitted {} topics over {} documents in {} sweeps",
        lda.config().num_topics,
        lda.documents().len(),
        lda.iterations_done()
    );

    let mut topics_table = Table::new();
    topics_table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Topic ID").fg(Color::Red),
            Cell::new("Words").fg(Color::White),
        ]);
    for topic in lda.top_words(args.top_words) {
        let words = topic
            .words
            .iter()
            .map(|(w, p)| format!("{w}[{p:.3}]"))
            .collect::<Vec<_>>()
            .join(" ");
        topics_table.add_row(vec![Cell::new(topic.topic), Cell::new(words)]);
    }
    println!("{topics_table}");

    let mut docs_table = Table::new();
    docs_table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Document").fg(Color::Red),
            Cell::new("Most probable topic").fg(Color::White),
        ]);
    for (d, topic) in lda.most_probable_topic().into_iter().enumerate() {
        docs_table.add_row(vec![Cell::new(d + 1), Cell::new(topic)]);
    }
    println!("{docs_table}");

    if let Some(dir) = &args.output_dir {
        let store = CheckpointStore::new(dir);
        let handle = lda.save_checkpoint(&store, CheckpointKind::Final)?;
        log::info!("Final checkpoint written to {}", handle.path().display());
        println!("Model saved at {handle}");
    }

    if let Some(path) = &args.vis {
        lda.visualization_data().save_json(path)?;
        println!("Visualization data saved at {}", path.display());
    }

    Ok(())
}
