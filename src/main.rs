//! claimflow command-line entry point
//!
//! Runs the backstory consistency pipeline over a data directory and writes
//! one CSV line per story.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use claimflow::llm;
use claimflow::verification::ConsistencyPipeline;
use claimflow::{PipelineConfig, Provider};

#[derive(Parser)]
#[command(name = "claimflow")]
#[command(about = "Check character backstories against their novels")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory containing novels/ and backstories/
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Output CSV path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Evidence chunks retrieved per claim
    #[arg(short = 'k', long)]
    top_k: Option<usize>,

    /// Language model backend
    #[arg(long, value_enum)]
    provider: Option<Provider>,

    /// Use the keyword verifier instead of the language model for claim analysis
    #[arg(long)]
    rules: bool,

    /// Run the similarity join on all cores
    #[arg(long)]
    parallel: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    let filter = EnvFilter::builder()
        .with_default_directive(default.into())
        .from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_config(cli: &Cli) -> Result<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    config.apply_env()?;

    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
        if cli.output.is_none() {
            // results/ sits next to the data directory unless told otherwise
            config.output_path = dir.join("..").join("results").join("output_results.csv");
        }
    }
    if let Some(output) = &cli.output {
        config.output_path = output.clone();
    }
    if let Some(k) = cli.top_k {
        config.top_k = k;
    }
    if let Some(provider) = cli.provider {
        config.llm.provider = provider;
    }
    config.parallel_join |= cli.parallel;

    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(&cli)?;
    info!(
        data_dir = %config.data_dir.display(),
        provider = %config.llm.provider,
        top_k = config.top_k,
        "starting consistency check"
    );

    let model = llm::connect(&config.llm).context("connecting to language model")?;
    let pipeline = ConsistencyPipeline::from_model(config, model, cli.rules);
    let report = pipeline.run().context("running pipeline")?;

    for failure in &report.evaluation.source_failures {
        warn!(error = %failure, "input skipped");
    }
    info!(
        rows = report.rows_written,
        output = %pipeline.config().output_path.display(),
        "results written"
    );
    Ok(())
}
