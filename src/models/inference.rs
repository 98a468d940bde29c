//! Scoring model abstraction and the gradient-boosted tree implementation

use crate::feature_extractor::{FeatureVector, FEATURE_COUNT};
use anyhow::{anyhow, ensure, Result};
use gbdt::config::Config;
use gbdt::decision_tree::{Data, DataVec, PredVec};
use gbdt::gradient_boost::GBDT;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Opaque regressor mapping feature vectors to revenue.
///
/// Implementations must be deterministic for fixed weights: the same rows
/// always produce the same predictions.
pub trait ScoringModel: Send + Sync {
    /// Human-readable model identifier for logs
    fn name(&self) -> &str;

    /// Predict revenue for each row, in input order
    fn predict(&self, rows: &[FeatureVector]) -> Result<Vec<f64>>;
}

/// Hyperparameters for the gradient-boosted regressor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GbdtParams {
    /// Number of boosting rounds
    pub iterations: usize,
    pub max_depth: u32,
    /// Learning rate
    pub shrinkage: f32,
    pub min_leaf_size: usize,
}

impl Default for GbdtParams {
    fn default() -> Self {
        Self {
            iterations: 100,
            max_depth: 4,
            shrinkage: 0.1,
            min_leaf_size: 1,
        }
    }
}

impl GbdtParams {
    fn to_config(&self) -> Config {
        let mut cfg = Config::new();
        cfg.set_feature_size(FEATURE_COUNT);
        cfg.set_max_depth(self.max_depth);
        cfg.set_iterations(self.iterations);
        cfg.set_shrinkage(self.shrinkage);
        cfg.set_min_leaf_size(self.min_leaf_size);
        cfg.set_loss("SquaredError");
        cfg.set_data_sample_ratio(1.0);
        cfg.set_feature_sample_ratio(1.0);
        cfg.set_training_optimization_level(2);
        cfg.set_debug(false);
        cfg
    }
}

/// Gradient-boosted regression trees backed by the `gbdt` crate
pub struct GbdtModel {
    inner: GBDT,
}

impl GbdtModel {
    /// Fit a new model on assembled rows against their revenue targets.
    pub fn fit(params: &GbdtParams, rows: &[FeatureVector], targets: &[f64]) -> Result<Self> {
        ensure!(!rows.is_empty(), "cannot fit a model on an empty training set");
        ensure!(
            rows.len() == targets.len(),
            "row count {} does not match target count {}",
            rows.len(),
            targets.len()
        );

        let mut data: DataVec = rows
            .iter()
            .zip(targets)
            .map(|(row, &target)| Data::new_training_data(row.to_vec(), 1.0, target as f32, None))
            .collect();

        info!(
            rows = rows.len(),
            iterations = params.iterations,
            max_depth = params.max_depth,
            shrinkage = params.shrinkage,
            "Fitting gradient-boosted regressor"
        );

        let mut inner = GBDT::new(&params.to_config());
        inner.fit(&mut data);

        Ok(Self { inner })
    }

    /// Load a model previously written with [`GbdtModel::save`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path
            .to_str()
            .ok_or_else(|| anyhow!("model path {} is not valid UTF-8", path.display()))?;

        let inner = GBDT::load_model(path_str)
            .map_err(|e| anyhow!("failed to load model from {}: {}", path.display(), e))?;

        Ok(Self { inner })
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let path_str = path
            .to_str()
            .ok_or_else(|| anyhow!("model path {} is not valid UTF-8", path.display()))?;

        self.inner
            .save_model(path_str)
            .map_err(|e| anyhow!("failed to save model to {}: {}", path.display(), e))
    }
}

impl ScoringModel for GbdtModel {
    fn name(&self) -> &str {
        "gbdt"
    }

    fn predict(&self, rows: &[FeatureVector]) -> Result<Vec<f64>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let data: DataVec = rows
            .iter()
            .map(|row| Data::new_test_data(row.to_vec(), None))
            .collect();

        let predicted: PredVec = self.inner.predict(&data);
        ensure!(
            predicted.len() == rows.len(),
            "model returned {} predictions for {} rows",
            predicted.len(),
            rows.len()
        );

        debug!(model = self.name(), rows = rows.len(), "Scored feature rows");

        Ok(predicted.into_iter().map(f64::from).collect())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::encoding::EncodedCategories;
    use crate::feature_extractor::{DeriveMode, FeatureAssembler, FeatureDeriver};
    use crate::types::CampaignRecord;

    /// Linear stand-in for the trained regressor: revenue = 2.5 * Cost + 10.
    pub(crate) struct LinearStub;

    impl ScoringModel for LinearStub {
        fn name(&self) -> &str {
            "linear-stub"
        }

        fn predict(&self, rows: &[FeatureVector]) -> Result<Vec<f64>> {
            Ok(rows
                .iter()
                .map(|row| 2.5 * f64::from(row.get("Cost").unwrap_or(0.0)) + 10.0)
                .collect())
        }
    }

    fn training_set() -> (Vec<FeatureVector>, Vec<f64>) {
        let deriver = FeatureDeriver::new();
        let assembler = FeatureAssembler::new();
        let codes = EncodedCategories {
            ad_group: 0,
            month: 0,
            unknown: Vec::new(),
        };

        let mut rows = Vec::new();
        let mut targets = Vec::new();
        for i in 1..=40u64 {
            let cost = (i * 10) as f64;
            let revenue = cost * 3.0;
            let record = CampaignRecord::new("Brand", "January", 1000 * i, 10 * i, i, cost);
            let derived = deriver.derive(&record, DeriveMode::Training { revenue });
            rows.push(assembler.assemble(&derived, &codes));
            targets.push(revenue);
        }
        (rows, targets)
    }

    #[test]
    fn test_fit_rejects_empty_input() {
        assert!(GbdtModel::fit(&GbdtParams::default(), &[], &[]).is_err());
    }

    #[test]
    fn test_fit_rejects_mismatched_targets() {
        let (rows, _) = training_set();
        assert!(GbdtModel::fit(&GbdtParams::default(), &rows, &[1.0]).is_err());
    }

    #[test]
    fn test_gbdt_predictions_are_deterministic() {
        let (rows, targets) = training_set();
        let params = GbdtParams {
            iterations: 20,
            ..GbdtParams::default()
        };
        let model = GbdtModel::fit(&params, &rows, &targets).unwrap();

        let first = model.predict(&rows[..5]).unwrap();
        let second = model.predict(&rows[..5]).unwrap();

        assert_eq!(first.len(), 5);
        assert_eq!(first, second);
        assert!(first.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_gbdt_save_and_load() {
        let (rows, targets) = training_set();
        let params = GbdtParams {
            iterations: 10,
            ..GbdtParams::default()
        };
        let model = GbdtModel::fit(&params, &rows, &targets).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        model.save(&path).unwrap();
        let restored = GbdtModel::load(&path).unwrap();

        assert_eq!(
            model.predict(&rows).unwrap(),
            restored.predict(&rows).unwrap()
        );
    }

    #[test]
    fn test_empty_batch_predicts_nothing() {
        let (rows, targets) = training_set();
        let params = GbdtParams {
            iterations: 5,
            ..GbdtParams::default()
        };
        let model = GbdtModel::fit(&params, &rows, &targets).unwrap();
        assert!(model.predict(&[]).unwrap().is_empty());
    }
}
