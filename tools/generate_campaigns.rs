//! Synthetic Campaign Generator
//!
//! Writes a campaign export CSV (with a Revenue column) for local training
//! and API testing.

use anyhow::{ensure, Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::io;
use std::path::PathBuf;
use tracing::info;

const AD_GROUPS: [&str; 6] = ["Brand", "Generic", "Competitor", "Retargeting", "Display", "Shopping"];
const MONTHS: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September", "October",
    "November", "December",
];

#[derive(Parser, Debug)]
#[command(name = "generate-campaigns")]
#[command(about = "Generate a synthetic campaign export CSV")]
struct Args {
    /// Number of rows to generate
    #[arg(short = 'n', long, default_value_t = 500)]
    rows: u64,

    /// Fraction of rows drawn from the underperforming profile
    #[arg(long, default_value_t = 0.15)]
    underperforming_rate: f64,

    /// RNG seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,

    /// Output path; stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,
}

/// One CSV row in export column order
#[derive(Debug, Clone, Serialize)]
struct CampaignRow {
    #[serde(rename = "Impressions")]
    impressions: u64,
    #[serde(rename = "Clicks")]
    clicks: u64,
    #[serde(rename = "CTR")]
    ctr: f64,
    #[serde(rename = "Conversions")]
    conversions: u64,
    #[serde(rename = "Conv Rate")]
    conv_rate: f64,
    #[serde(rename = "Cost")]
    cost: f64,
    #[serde(rename = "CPC")]
    cpc: f64,
    #[serde(rename = "Sale Amount")]
    sale_amount: f64,
    #[serde(rename = "P&L")]
    pnl: f64,
    #[serde(rename = "Ad Group")]
    ad_group: String,
    #[serde(rename = "Month")]
    month: String,
    #[serde(rename = "Revenue")]
    revenue: f64,
}

struct CampaignGenerator {
    rng: StdRng,
    generated: u64,
}

impl CampaignGenerator {
    fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng, generated: 0 }
    }

    /// Healthy campaign: decent CTR and conversion rate, positive margin
    fn generate_performing(&mut self) -> CampaignRow {
        let impressions = self.rng.gen_range(2_000..200_000);
        let ctr = self.rng.gen_range(0.02..0.08);
        let conv_rate = self.rng.gen_range(0.03..0.12);
        let cpc = self.rng.gen_range(0.3..2.5);
        let order_value = self.rng.gen_range(40.0..160.0);
        self.build(impressions, ctr, conv_rate, cpc, order_value)
    }

    /// Underperforming campaign: low engagement, expensive clicks
    fn generate_underperforming(&mut self) -> CampaignRow {
        let impressions = self.rng.gen_range(1_000..50_000);
        let ctr = self.rng.gen_range(0.001..0.015);
        let conv_rate = self.rng.gen_range(0.0..0.03);
        let cpc = self.rng.gen_range(2.0..6.0);
        let order_value = self.rng.gen_range(20.0..80.0);
        self.build(impressions, ctr, conv_rate, cpc, order_value)
    }

    fn build(&mut self, impressions: u64, ctr: f64, conv_rate: f64, cpc: f64, order_value: f64) -> CampaignRow {
        self.generated += 1;

        let clicks = (impressions as f64 * ctr).round() as u64;
        let conversions = (clicks as f64 * conv_rate).round() as u64;
        let cost = round2(clicks as f64 * cpc);
        let sale_amount = round2(conversions as f64 * order_value);
        // attributed revenue tracks sales with channel noise
        let revenue = round2((sale_amount * self.rng.gen_range(0.85..1.15)).max(0.0));

        CampaignRow {
            impressions,
            clicks,
            ctr: ratio(clicks as f64, impressions as f64),
            conversions,
            conv_rate: ratio(conversions as f64, clicks as f64),
            cost,
            cpc: ratio(cost, clicks as f64),
            sale_amount,
            pnl: round2(sale_amount - cost),
            ad_group: self.random_choice(&AD_GROUPS).to_string(),
            month: self.random_choice(&MONTHS).to_string(),
            revenue,
        }
    }

    fn random_choice<'a>(&mut self, choices: &[&'a str]) -> &'a str {
        choices[self.rng.gen_range(0..choices.len())]
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        (numerator / denominator * 10_000.0).round() / 10_000.0
    }
}

fn write_rows<W: io::Write>(writer: W, args: &Args) -> Result<(u64, u64)> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    let mut generator = CampaignGenerator::new(args.seed);
    let mut underperforming = 0;

    for i in 0..args.rows {
        let row = if generator.rng.gen_bool(args.underperforming_rate) {
            underperforming += 1;
            generator.generate_underperforming()
        } else {
            generator.generate_performing()
        };
        csv_writer.serialize(&row).context("Failed to write CSV row")?;

        if (i + 1) % 1000 == 0 {
            info!("Generated {}/{} rows", i + 1, args.rows);
        }
    }

    csv_writer.flush().context("Failed to flush CSV output")?;
    Ok((generator.generated, underperforming))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("generate_campaigns=info".parse()?),
        )
        .init();

    let args = Args::parse();
    ensure!(
        (0.0..=1.0).contains(&args.underperforming_rate),
        "underperforming rate must be within [0, 1]"
    );

    let (rows, underperforming) = match &args.output {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            write_rows(file, &args)?
        }
        None => write_rows(io::stdout().lock(), &args)?,
    };

    info!(
        rows,
        underperforming,
        output = args.output.as_ref().map(|p| p.display().to_string()).unwrap_or_else(|| "stdout".to_string()),
        "Completed campaign generation"
    );
    Ok(())
}
