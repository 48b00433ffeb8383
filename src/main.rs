//! # Arkereso CLI
//!
//! Reads the search-term table, searches every configured store for every
//! term, checks each hit for relevance and writes one report for the run.
//!
//! ## Features
//!
//! - `--debug 1` runs store searches in visible mode with paced requests
//! - `--no-ai` skips the relevance check entirely
//! - Progress tracking per (store, term) job
//! - Telemetry integration for monitoring

mod telemetry;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use arkereso::aggregator::{Aggregator, CsvSink, RunOutcome};
use arkereso::classifier::{Classifier, ClassifierConfig};
use arkereso::driver::RunDriver;
use arkereso::input::{DEFAULT_TERM_COLUMN, load_search_terms};
use arkereso::producer::{ProducerConfig, Visibility};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info, instrument};

#[derive(Parser, Debug)]
#[command(author, version, about = "Price finder for Bauhaus, OBI and Praktiker with AI relevance checks", long_about = None)]
struct Cli {
    /// Browser visibility: 1 = visible with paced requests, 0 = headless
    #[arg(long, default_value = "0", value_parser = clap::value_parser!(u8).range(0..=1))]
    debug: u8,

    /// CSV file with the search terms
    #[arg(short, long, default_value = "input.csv")]
    input: PathBuf,

    /// Name of the term column
    #[arg(short, long, default_value = DEFAULT_TERM_COLUMN)]
    column: String,

    /// Directory that receives the report
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Skip the AI relevance check
    #[arg(long)]
    no_ai: bool,

    /// Relevance checks running at once across the whole run
    #[arg(long, default_value = "1")]
    concurrency: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _otel = telemetry::init_tracing_subscriber()?;

    match run(cli).await? {
        RunOutcome::Written { path, rows } => {
            println!("Saved {} rows to {}", rows, path.display());
        }
        RunOutcome::Empty => {
            println!("No results collected, no report written");
        }
        RunOutcome::Failed { reason } => {
            error!("Report could not be written: {}", reason);
            anyhow::bail!("report could not be written: {}", reason);
        }
    }

    Ok(())
}

#[instrument]
async fn run(cli: Cli) -> anyhow::Result<RunOutcome> {
    let terms = load_search_terms(&cli.input, &cli.column)?;

    let visibility = Visibility::from_debug_flag(cli.debug);
    info!(
        "Mode: {:?}, AI validation: {}",
        visibility,
        if cli.no_ai { "off" } else { "on" }
    );

    let mut classifier_config = ClassifierConfig::from_env();
    classifier_config.max_in_flight = cli.concurrency.max(1);
    let classifier = Classifier::ollama(classifier_config)
        .context("Failed to set up the relevance classifier")?;
    let aggregator = Aggregator::new(CsvSink::new(cli.output_dir));

    let producer_config = ProducerConfig::builder().visibility(visibility).build();
    let driver =
        RunDriver::with_http_stores(&producer_config, Arc::new(classifier), Arc::new(aggregator))
            .context("Failed to set up store producers")?;

    let progress_bar = ProgressBar::new((terms.len() * driver.producer_count()) as u64);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} ({eta}) {msg}")?
            .progress_chars("##-"),
    );
    progress_bar.set_message("Searching stores...");

    let outcome = driver
        .ai_enabled(!cli.no_ai)
        .with_progress(progress_bar)
        .run(&terms)
        .await?;

    Ok(outcome)
}
