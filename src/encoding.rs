//! Categorical label encoding shared by training and inference.
//!
//! Classes are stored sorted, so codes follow lexicographic order of the
//! values observed in the training corpus. Tables are never refit at
//! inference time.

use crate::types::CampaignRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Code substituted for a category that was not present at fit time.
pub const UNKNOWN_CATEGORY: i32 = -1;

/// Name of the ad group field in unknown-category reports.
pub const AD_GROUP_FIELD: &str = "Ad Group";
/// Name of the month field in unknown-category reports.
pub const MONTH_FIELD: &str = "Month";

/// Immutable string to integer lookup for one categorical field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodingTable {
    field: String,
    classes: Vec<String>,
}

impl EncodingTable {
    /// Fit a table from every value observed for `field`.
    pub fn fit<I, S>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let classes: BTreeSet<String> = values
            .into_iter()
            .map(|v| v.as_ref().to_string())
            .collect();

        Self {
            field: field.into(),
            classes: classes.into_iter().collect(),
        }
    }

    /// Encode a value, returning [`UNKNOWN_CATEGORY`] when it was never seen.
    pub fn encode(&self, value: &str) -> i32 {
        self.classes
            .binary_search_by(|class| class.as_str().cmp(value))
            .map(|idx| idx as i32)
            .unwrap_or(UNKNOWN_CATEGORY)
    }

    pub fn decode(&self, code: i32) -> Option<&str> {
        usize::try_from(code)
            .ok()
            .and_then(|idx| self.classes.get(idx))
            .map(String::as_str)
    }

    pub fn contains(&self, value: &str) -> bool {
        self.encode(value) != UNKNOWN_CATEGORY
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// Categorical codes for one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedCategories {
    pub ad_group: i32,
    pub month: i32,
    /// Fields that fell back to the sentinel
    pub unknown: Vec<String>,
}

/// The pair of tables the model was trained with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Encoders {
    pub ad_group: EncodingTable,
    pub month: EncodingTable,
}

impl Encoders {
    pub fn new(ad_group: EncodingTable, month: EncodingTable) -> Self {
        Self { ad_group, month }
    }

    /// Fit both tables over a corpus of records.
    pub fn fit<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a CampaignRecord> + Clone,
    {
        let ad_group = EncodingTable::fit(
            AD_GROUP_FIELD,
            records.clone().into_iter().map(|r| r.ad_group.as_str()),
        );
        let month = EncodingTable::fit(MONTH_FIELD, records.into_iter().map(|r| r.month.as_str()));
        Self { ad_group, month }
    }

    pub fn encode(&self, record: &CampaignRecord) -> EncodedCategories {
        let ad_group = self.ad_group.encode(&record.ad_group);
        let month = self.month.encode(&record.month);

        let mut unknown = Vec::new();
        if ad_group == UNKNOWN_CATEGORY {
            unknown.push(AD_GROUP_FIELD.to_string());
        }
        if month == UNKNOWN_CATEGORY {
            unknown.push(MONTH_FIELD.to_string());
        }

        EncodedCategories {
            ad_group,
            month,
            unknown,
        }
    }
}
