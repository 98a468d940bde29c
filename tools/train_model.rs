//! Train the revenue model from a labelled campaign CSV and write the
//! model and encoder artifacts.

use anyhow::Result;
use clap::Parser;
use revenue_predictor::config::{AppConfig, DEFAULT_CONFIG_PATH};
use revenue_predictor::logging::init_logging;
use revenue_predictor::models::loader::ArtifactStore;
use revenue_predictor::models::training::train_from_path;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "train-model")]
#[command(about = "Train the campaign revenue regressor")]
struct Args {
    /// Training CSV: prediction columns plus Revenue
    corpus: PathBuf,

    /// Artifact output directory (defaults to artifacts.dir from config)
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(short, long, env = "REVENUE_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Override the number of boosting rounds
    #[arg(long)]
    iterations: Option<usize>,

    /// Override the held-out fraction
    #[arg(long)]
    test_ratio: Option<f64>,

    /// Print the training report as JSON on stdout
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = AppConfig::load_or_default(&args.config)?;
    init_logging(&config.logging)?;

    let mut training = config.training.clone();
    if let Some(iterations) = args.iterations {
        training.iterations = iterations;
    }
    if let Some(ratio) = args.test_ratio {
        training.test_ratio = ratio;
    }

    let mut artifacts = config.artifacts.clone();
    if let Some(output) = &args.output {
        artifacts.dir = output.display().to_string();
    }
    let store = ArtifactStore::from_config(&artifacts);
    info!(
        corpus = %args.corpus.display(),
        output = %store.dir().display(),
        iterations = training.iterations,
        max_depth = training.max_depth,
        "Starting training run"
    );

    let report = train_from_path(&args.corpus, &store, &training)?;
    report.log_summary();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}
