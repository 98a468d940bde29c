//! Offline training run: derive features against actual revenue, fit the
//! encoders and the regressor, and report held-out accuracy.

use crate::config::TrainingConfig;
use crate::dataset::CsvTable;
use crate::encoding::Encoders;
use crate::feature_extractor::{DeriveMode, FeatureAssembler, FeatureDeriver, FeatureVector};
use crate::models::evaluation::RegressionMetrics;
use crate::models::inference::{GbdtModel, GbdtParams, ScoringModel};
use crate::models::loader::{ArtifactStore, ModelArtifacts};
use crate::types::TrainingRow;
use anyhow::{ensure, Context, Result};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;
use uuid::Uuid;

/// Summary of one training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub run_id: Uuid,
    pub trained_at: DateTime<Utc>,
    pub total_rows: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub ad_group_classes: usize,
    pub month_classes: usize,
    pub params: GbdtParams,
    pub metrics: RegressionMetrics,
}

impl TrainingReport {
    pub fn log_summary(&self) {
        info!(
            run_id = %self.run_id,
            rows = self.total_rows,
            train_rows = self.train_rows,
            test_rows = self.test_rows,
            "Training run complete"
        );
        info!(
            "R² Score: {}  RMSE: {}  MAE: {}",
            format_metric(self.metrics.r2, 4),
            format_metric(self.metrics.rmse, 2),
            format_metric(self.metrics.mae, 2)
        );
    }
}

fn format_metric(value: Option<f64>, precision: usize) -> String {
    value
        .map(|v| format!("{v:.precision$}"))
        .unwrap_or_else(|| "n/a".to_string())
}

/// Indices of the train and test partitions after a seeded shuffle.
fn split_indices(len: usize, test_ratio: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..len).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let ratio = test_ratio.clamp(0.0, 1.0);
    let mut test_len = (len as f64 * ratio).ceil() as usize;
    // keep at least one training row
    if test_len >= len {
        test_len = len.saturating_sub(1);
    }

    let train = indices.split_off(test_len);
    (train, indices)
}

/// Fit encoders and the regressor on an in-memory corpus.
pub fn train(corpus: &[TrainingRow], config: &TrainingConfig) -> Result<(ModelArtifacts, TrainingReport)> {
    ensure!(!corpus.is_empty(), "training corpus is empty");

    let encoders = Encoders::fit(corpus.iter().map(|row| &row.record));
    let deriver = FeatureDeriver::new();
    let assembler = FeatureAssembler::new();

    let features: Vec<FeatureVector> = corpus
        .iter()
        .map(|row| {
            let derived = deriver.derive(&row.record, DeriveMode::Training { revenue: row.revenue });
            assembler.assemble(&derived, &encoders.encode(&row.record))
        })
        .collect();
    let targets: Vec<f64> = corpus.iter().map(|row| row.revenue).collect();

    let (train_idx, test_idx) = split_indices(corpus.len(), config.test_ratio, config.seed);
    let pick = |idx: &[usize]| -> (Vec<FeatureVector>, Vec<f64>) {
        idx.iter().map(|&i| (features[i], targets[i])).unzip()
    };
    let (x_train, y_train) = pick(&train_idx);
    let (x_test, y_test) = pick(&test_idx);

    info!(
        total = corpus.len(),
        train = x_train.len(),
        test = x_test.len(),
        ad_groups = encoders.ad_group.len(),
        months = encoders.month.len(),
        "Prepared training matrix"
    );

    let params = config.gbdt_params();
    let model = GbdtModel::fit(&params, &x_train, &y_train)?;

    let metrics = if x_test.is_empty() {
        RegressionMetrics::default()
    } else {
        let predicted = model.predict(&x_test)?;
        RegressionMetrics::evaluate(&y_test, &predicted)
    };

    let report = TrainingReport {
        run_id: Uuid::new_v4(),
        trained_at: Utc::now(),
        total_rows: corpus.len(),
        train_rows: x_train.len(),
        test_rows: x_test.len(),
        ad_group_classes: encoders.ad_group.len(),
        month_classes: encoders.month.len(),
        params,
        metrics,
    };

    Ok((ModelArtifacts { model, encoders }, report))
}

/// Load a corpus CSV, train, and write the artifacts through `store`.
pub fn train_from_path<P: AsRef<Path>>(
    corpus_path: P,
    store: &ArtifactStore,
    config: &TrainingConfig,
) -> Result<TrainingReport> {
    let corpus_path = corpus_path.as_ref();
    info!(path = %corpus_path.display(), "Loading training corpus");

    let table = CsvTable::from_path(corpus_path)?;
    let corpus = table
        .training_rows()
        .with_context(|| format!("Invalid training corpus {}", corpus_path.display()))?;

    let (artifacts, report) = train(&corpus, config)?;
    store.save(&artifacts)?;

    Ok(report)
}
