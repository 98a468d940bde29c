//! Regression accuracy metrics reported after a training run

use serde::{Deserialize, Serialize};

/// R², RMSE and MAE on a held-out set. Observational only.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RegressionMetrics {
    /// Coefficient of determination; undefined when the targets are constant
    pub r2: Option<f64>,
    pub rmse: Option<f64>,
    pub mae: Option<f64>,
}

impl RegressionMetrics {
    pub fn evaluate(actual: &[f64], predicted: &[f64]) -> Self {
        let n = actual.len().min(predicted.len());
        if n == 0 {
            return Self::default();
        }
        let actual = &actual[..n];
        let predicted = &predicted[..n];

        let mut squared = 0.0;
        let mut absolute = 0.0;
        for (a, p) in actual.iter().zip(predicted) {
            let residual = a - p;
            squared += residual * residual;
            absolute += residual.abs();
        }

        let mean = actual.iter().sum::<f64>() / n as f64;
        let total: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();
        let r2 = if total > 0.0 {
            Some(1.0 - squared / total)
        } else {
            None
        };

        Self {
            r2,
            rmse: Some((squared / n as f64).sqrt()),
            mae: Some(absolute / n as f64),
        }
    }
}
