//! Offline scoring: predict revenue for a campaign CSV or a single JSON record
//! using the trained artifacts.

use anyhow::{ensure, Context, Result};
use clap::{Parser, Subcommand};
use revenue_predictor::config::{AppConfig, DEFAULT_CONFIG_PATH};
use revenue_predictor::dataset::CsvTable;
use revenue_predictor::logging::init_logging;
use revenue_predictor::models::loader::ArtifactStore;
use revenue_predictor::service::PredictionService;
use revenue_predictor::types::{CampaignRecord, ManualInput, PredictionResult};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "predict")]
#[command(about = "Score campaign records with the trained revenue model")]
struct Args {
    #[arg(short, long, env = "REVENUE_CONFIG", default_value = DEFAULT_CONFIG_PATH, global = true)]
    config: String,

    /// Artifact directory (defaults to artifacts.dir from config)
    #[arg(long, global = true)]
    artifacts: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score every row of a campaign CSV and write the results
    Csv {
        input: PathBuf,

        #[arg(short, long, default_value = "predicted_revenue_with_kpis.csv")]
        output: PathBuf,
    },
    /// Score one record given as a JSON object (read from stdin when omitted)
    Manual {
        #[arg(long)]
        json: Option<String>,
    },
}

/// Columns appended after the input columns
const PREDICTION_COLUMNS: [&str; 7] = [
    "Predicted_Revenue",
    "ROI",
    "Profit_Margin",
    "CPM",
    "Revenue_per_Click",
    "Revenue_per_Conversion",
    "Unknown_Categories",
];

/// Write every input column followed by the prediction and its KPIs.
fn write_predictions<W: Write>(writer: W, table: &CsvTable, results: &[PredictionResult]) -> Result<()> {
    ensure!(
        table.row_count() == results.len(),
        "{} predictions for {} input rows",
        results.len(),
        table.row_count()
    );

    let mut csv_writer = csv::Writer::from_writer(writer);
    let header = table
        .headers()
        .iter()
        .map(String::as_str)
        .chain(PREDICTION_COLUMNS);
    csv_writer.write_record(header)?;

    for (row, result) in table.rows().iter().zip(results) {
        let kpis = &result.kpis;
        let mut record: Vec<String> = (0..table.column_count())
            .map(|idx| row.get(idx).cloned().flatten().unwrap_or_default())
            .collect();
        record.extend([
            result.predicted_revenue.to_string(),
            kpis.roi.to_string(),
            kpis.profit_margin.to_string(),
            kpis.cpm.to_string(),
            kpis.revenue_per_click.to_string(),
            kpis.revenue_per_conversion.to_string(),
            result.unknown_categories.join(";"),
        ]);
        csv_writer.write_record(&record)?;
    }

    csv_writer.flush()?;
    Ok(())
}

fn predict_csv(service: &PredictionService, input: &Path, output: &Path) -> Result<()> {
    let bytes = std::fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let table = CsvTable::from_bytes(&bytes)?;
    let results = service.predict_batch(&table.campaign_records()?)?;

    let file = File::create(output).with_context(|| format!("Failed to create {}", output.display()))?;
    write_predictions(file, &table, &results)?;

    let degraded = results.iter().filter(|r| r.is_degraded()).count();
    info!(
        rows = results.len(),
        degraded,
        output = %output.display(),
        "Predictions saved"
    );
    Ok(())
}

fn predict_manual(service: &PredictionService, json: Option<String>) -> Result<()> {
    let raw = match json {
        Some(raw) => raw,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read record from stdin")?;
            buf
        }
    };

    let value: serde_json::Value = serde_json::from_str(&raw).context("Record is not valid JSON")?;
    let input = ManualInput::from_json(value)?;
    let result = service.predict_one(&CampaignRecord::from(input))?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = AppConfig::load_or_default(&args.config)?;
    if let Some(dir) = args.artifacts {
        config.artifacts.dir = dir;
    }
    init_logging(&config.logging)?;

    let artifacts = ArtifactStore::from_config(&config.artifacts).load()?;
    let service = PredictionService::new(Arc::new(artifacts.model), Arc::new(artifacts.encoders));

    match args.command {
        Command::Csv { input, output } => predict_csv(&service, &input, &output),
        Command::Manual { json } => predict_manual(&service, json),
    }
}
