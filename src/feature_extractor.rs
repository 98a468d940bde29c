//! Feature derivation and assembly for revenue model training and inference.
//!
//! The same code path builds feature vectors for the trainer, the HTTP
//! endpoints and the CLI, so the column order below is the only place the
//! model input layout is defined.

use crate::encoding::EncodedCategories;
use crate::types::{CampaignRecord, DerivedKpis};

/// Number of model input features.
pub const FEATURE_COUNT: usize = 16;

/// Model input columns, in the order the model was fit with.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "Impressions",
    "Clicks",
    "CTR",
    "Conversions",
    "ConvRate",
    "Cost",
    "CPC",
    "SaleAmount",
    "PnL",
    "ROI",
    "ProfitMargin",
    "CPM",
    "RevenuePerClick",
    "RevenuePerConversion",
    "AdGroupEncoded",
    "MonthEncoded",
];

/// Additive guard for the ratios the training corpus was engineered with.
const EPSILON: f64 = 1e-6;

/// `numerator / (denominator + EPSILON)`, collapsing non-finite results to 0.
fn eps_ratio(numerator: f64, denominator: f64) -> f64 {
    finite_or_zero(numerator / (denominator + EPSILON))
}

/// `numerator / denominator`, or 0 when the denominator is 0.
fn checked_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        finite_or_zero(numerator / denominator)
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

impl DerivedKpis {
    /// Compute the KPI set for `record` against a revenue figure.
    pub fn against(record: &CampaignRecord, revenue: f64) -> Self {
        let cost = record.cost;
        Self {
            roi: checked_ratio(revenue - cost, cost),
            profit_margin: checked_ratio(revenue - cost, revenue),
            cpm: cost_per_mille(record),
            revenue_per_click: checked_ratio(revenue, record.clicks as f64),
            revenue_per_conversion: checked_ratio(revenue, record.conversions as f64),
        }
    }
}

fn cost_per_mille(record: &CampaignRecord) -> f64 {
    checked_ratio(record.cost, record.impressions as f64) * 1000.0
}

/// Which revenue figure, if any, the revenue KPIs are derived from
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeriveMode {
    /// Actual revenue is known (training corpus)
    Training { revenue: f64 },
    /// Revenue is what we are about to predict
    Inference,
}

/// A record augmented with its engineered features
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedFeatures<'a> {
    pub record: &'a CampaignRecord,
    pub ctr: f64,
    pub conv_rate: f64,
    pub cpc: f64,
    pub cpm: f64,
    /// Only present when revenue was known at derivation time
    pub revenue_kpis: Option<DerivedKpis>,
}

/// Computes engineered ratios from raw campaign counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureDeriver;

impl FeatureDeriver {
    pub fn new() -> Self {
        Self
    }

    /// Derive the engineered features of one record.
    ///
    /// Conversion rate, CPC and CPM are always recomputed from the counters.
    /// CTR is taken from the record when reported.
    pub fn derive<'a>(&self, record: &'a CampaignRecord, mode: DeriveMode) -> DerivedFeatures<'a> {
        let clicks = record.clicks as f64;

        let ctr = record
            .ctr
            .filter(|v| v.is_finite())
            .unwrap_or_else(|| checked_ratio(clicks, record.impressions as f64));

        let revenue_kpis = match mode {
            DeriveMode::Training { revenue } => Some(DerivedKpis::against(record, revenue)),
            DeriveMode::Inference => None,
        };

        DerivedFeatures {
            record,
            ctr,
            conv_rate: eps_ratio(record.conversions as f64, clicks),
            cpc: eps_ratio(record.cost, clicks),
            cpm: cost_per_mille(record),
            revenue_kpis,
        }
    }
}

/// Fixed-order model input row
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector([f32; FEATURE_COUNT]);

impl FeatureVector {
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<f32> {
        self.0.to_vec()
    }

    /// Look up a feature by its column name.
    pub fn get(&self, name: &str) -> Option<f32> {
        FEATURE_NAMES
            .iter()
            .position(|n| *n == name)
            .map(|idx| self.0[idx])
    }
}

/// Lays derived features and categorical codes out in [`FEATURE_NAMES`] order.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureAssembler;

impl FeatureAssembler {
    pub fn new() -> Self {
        Self
    }

    pub fn assemble(&self, derived: &DerivedFeatures<'_>, codes: &EncodedCategories) -> FeatureVector {
        let record = derived.record;
        let kpis = derived.revenue_kpis.unwrap_or_default();

        let values: [f64; FEATURE_COUNT] = [
            record.impressions as f64,
            record.clicks as f64,
            derived.ctr,
            record.conversions as f64,
            derived.conv_rate,
            record.cost,
            derived.cpc,
            record.sale_amount.unwrap_or(0.0),
            record.pnl.unwrap_or(0.0),
            kpis.roi,
            kpis.profit_margin,
            derived.cpm,
            kpis.revenue_per_click,
            kpis.revenue_per_conversion,
            codes.ad_group as f64,
            codes.month as f64,
        ];

        FeatureVector(values.map(|v| finite_or_zero(v) as f32))
    }

    pub fn feature_count(&self) -> usize {
        FEATURE_COUNT
    }

    pub fn feature_names(&self) -> &'static [&'static str] {
        &FEATURE_NAMES
    }
}
