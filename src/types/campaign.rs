//! Campaign record data structures

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};

/// CSV columns every prediction upload must carry, spelled exactly as exported.
pub const REQUIRED_COLUMNS: [&str; 11] = [
    "Impressions",
    "Clicks",
    "CTR",
    "Conversions",
    "Conv Rate",
    "Cost",
    "CPC",
    "Sale Amount",
    "P&L",
    "Ad Group",
    "Month",
];

/// Target column of the training corpus.
pub const REVENUE_COLUMN: &str = "Revenue";

/// Field names of the single-record JSON payload.
pub const MANUAL_INPUT_FIELDS: [&str; 11] = [
    "Impressions",
    "Clicks",
    "CTR",
    "Conversions",
    "Conv_Rate",
    "Cost",
    "CPC",
    "Sale_Amount",
    "PnL",
    "Ad_Group",
    "Month",
];

/// Raw metrics for one campaign row (one ad group in one month)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignRecord {
    pub impressions: u64,
    pub clicks: u64,
    /// Click-through rate as reported by the ad platform
    pub ctr: Option<f64>,
    pub conversions: u64,
    /// Reported conversion rate; recomputed from counters before scoring
    pub conv_rate: Option<f64>,
    pub cost: f64,
    /// Reported cost per click; recomputed from counters before scoring
    pub cpc: Option<f64>,
    pub sale_amount: Option<f64>,
    /// Profit and loss, may be negative
    pub pnl: Option<f64>,
    pub ad_group: String,
    pub month: String,
}

impl CampaignRecord {
    /// Create a record with the required counters; optional metrics start empty.
    pub fn new(
        ad_group: impl Into<String>,
        month: impl Into<String>,
        impressions: u64,
        clicks: u64,
        conversions: u64,
        cost: f64,
    ) -> Self {
        Self {
            impressions,
            clicks,
            ctr: None,
            conversions,
            conv_rate: None,
            cost,
            cpc: None,
            sale_amount: None,
            pnl: None,
            ad_group: ad_group.into(),
            month: month.into(),
        }
    }

    pub fn with_sale_amount(mut self, sale_amount: f64) -> Self {
        self.sale_amount = Some(sale_amount);
        self
    }

    pub fn with_pnl(mut self, pnl: f64) -> Self {
        self.pnl = Some(pnl);
        self
    }

    pub fn with_ctr(mut self, ctr: f64) -> Self {
        self.ctr = Some(ctr);
        self
    }
}

/// Single-record payload accepted by the manual prediction endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ManualInput {
    #[serde(rename = "Impressions")]
    pub impressions: u64,
    #[serde(rename = "Clicks")]
    pub clicks: u64,
    #[serde(rename = "CTR")]
    pub ctr: f64,
    #[serde(rename = "Conversions")]
    pub conversions: u64,
    #[serde(rename = "Conv_Rate")]
    pub conv_rate: f64,
    #[serde(rename = "Cost")]
    pub cost: f64,
    #[serde(rename = "CPC")]
    pub cpc: f64,
    #[serde(rename = "Sale_Amount")]
    pub sale_amount: f64,
    #[serde(rename = "PnL")]
    pub pnl: f64,
    #[serde(rename = "Ad_Group")]
    pub ad_group: String,
    #[serde(rename = "Month")]
    pub month: String,
}

impl ManualInput {
    /// Parse a JSON body, reporting absent fields before type errors.
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| Error::validation("body", "expected a JSON object"))?;

        let missing: Vec<&str> = MANUAL_INPUT_FIELDS
            .iter()
            .copied()
            .filter(|field| object.get(*field).map_or(true, |v| v.is_null()))
            .collect();
        if !missing.is_empty() {
            return Err(Error::schema(missing));
        }

        let input: ManualInput = serde_json::from_value(value)
            .map_err(|e| Error::validation("body", e.to_string()))?;
        input.validate()?;
        Ok(input)
    }

    /// Enforce the numeric lower bounds (Impressions > 0, other metrics >= 0).
    pub fn validate(&self) -> Result<()> {
        if self.impressions == 0 {
            return Err(Error::validation("Impressions", "must be greater than 0"));
        }

        let non_negative = [
            ("CTR", self.ctr),
            ("Conv_Rate", self.conv_rate),
            ("Cost", self.cost),
            ("CPC", self.cpc),
            ("Sale_Amount", self.sale_amount),
        ];
        for (field, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::validation(
                    field,
                    "must be a finite number greater than or equal to 0",
                ));
            }
        }
        if !self.pnl.is_finite() {
            return Err(Error::validation("PnL", "must be a finite number"));
        }

        Ok(())
    }
}

impl From<ManualInput> for CampaignRecord {
    fn from(input: ManualInput) -> Self {
        Self {
            impressions: input.impressions,
            clicks: input.clicks,
            ctr: Some(input.ctr),
            conversions: input.conversions,
            conv_rate: Some(input.conv_rate),
            cost: input.cost,
            cpc: Some(input.cpc),
            sale_amount: Some(input.sale_amount),
            pnl: Some(input.pnl),
            ad_group: input.ad_group,
            month: input.month,
        }
    }
}

/// A campaign row with its observed revenue, used for training
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingRow {
    pub record: CampaignRecord,
    pub revenue: f64,
}
