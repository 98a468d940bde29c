//! Prediction result data structures

use serde::{Deserialize, Serialize};

/// Round to two decimals for response payloads.
pub fn round2(value: f64) -> f64 {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded.is_finite() {
        rounded
    } else {
        0.0
    }
}

/// Revenue-dependent KPIs, computed against actual or predicted revenue
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DerivedKpis {
    #[serde(rename = "ROI")]
    pub roi: f64,
    #[serde(rename = "Profit_Margin")]
    pub profit_margin: f64,
    #[serde(rename = "CPM")]
    pub cpm: f64,
    #[serde(rename = "Revenue_per_Click")]
    pub revenue_per_click: f64,
    #[serde(rename = "Revenue_per_Conversion")]
    pub revenue_per_conversion: f64,
}

impl DerivedKpis {
    pub fn rounded(&self) -> Self {
        Self {
            roi: round2(self.roi),
            profit_margin: round2(self.profit_margin),
            cpm: round2(self.cpm),
            revenue_per_click: round2(self.revenue_per_click),
            revenue_per_conversion: round2(self.revenue_per_conversion),
        }
    }
}

/// Scored campaign row returned by every prediction entry point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    #[serde(rename = "Ad_Group")]
    pub ad_group: String,
    #[serde(rename = "Month")]
    pub month: String,
    /// Predicted revenue, rounded to two decimals
    #[serde(rename = "Predicted_Revenue")]
    pub predicted_revenue: f64,
    /// KPIs recomputed against the predicted revenue
    #[serde(rename = "Computed_KPIs")]
    pub kpis: DerivedKpis,
    /// Categorical fields that were not seen during training and were
    /// encoded with the unknown sentinel
    #[serde(rename = "Unknown_Categories", default)]
    pub unknown_categories: Vec<String>,
}

impl PredictionResult {
    pub fn new(
        ad_group: String,
        month: String,
        predicted_revenue: f64,
        kpis: DerivedKpis,
        unknown_categories: Vec<String>,
    ) -> Self {
        Self {
            ad_group,
            month,
            predicted_revenue: round2(predicted_revenue),
            kpis: kpis.rounded(),
            unknown_categories,
        }
    }

    /// Whether the prediction used a sentinel code for any categorical input
    pub fn is_degraded(&self) -> bool {
        !self.unknown_categories.is_empty()
    }
}
