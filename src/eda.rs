//! Exploratory summary of an uploaded campaign export.
//!
//! Read-only: never touches the model or the encoders. Statistics that are
//! undefined for the data at hand (empty columns, a single value, zero
//! variance) are reported as `null` instead of failing.

use crate::dataset::CsvTable;
use crate::encoding::{AD_GROUP_FIELD, MONTH_FIELD};
use crate::types::campaign::REVENUE_COLUMN;
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};

/// Default number of categories listed per categorical column
pub const DEFAULT_TOP_N: usize = 5;
/// Ad groups listed in the impressions ranking
pub const TOP_BY_IMPRESSIONS: usize = 15;
/// Ad groups listed in the revenue ranking
pub const TOP_BY_REVENUE: usize = 10;

const IMPRESSIONS_COLUMN: &str = "Impressions";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    Categorical,
}

/// Describe-style statistics for one numeric column
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct NumericSummary {
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    #[serde(rename = "25%")]
    pub q1: Option<f64>,
    #[serde(rename = "50%")]
    pub median: Option<f64>,
    #[serde(rename = "75%")]
    pub q3: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCount {
    pub value: String,
    pub count: usize,
}

/// Most frequent values of a column, highest count first.
///
/// Serialized as a `{value: count}` object that keeps rank order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TopValues(Vec<CategoryCount>);

impl TopValues {
    pub fn iter(&self) -> impl Iterator<Item = &CategoryCount> {
        self.0.iter()
    }

    pub fn first(&self) -> Option<&CategoryCount> {
        self.0.first()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn count(&self, value: &str) -> Option<usize> {
        self.0.iter().find(|c| c.value == value).map(|c| c.count)
    }
}

impl Serialize for TopValues {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|c| (&c.value, c.count)))
    }
}

/// Per-group sums of a numeric column, largest total first.
///
/// Serialized as a `{group: total}` object that keeps rank order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GroupTotals(Vec<(String, f64)>);

impl GroupTotals {
    pub fn iter(&self) -> impl Iterator<Item = &(String, f64)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn total(&self, group: &str) -> Option<f64> {
        self.0.iter().find(|(g, _)| g == group).map(|(_, total)| *total)
    }
}

impl Serialize for GroupTotals {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(group, total)| (group, total)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdaReport {
    /// `[rows, columns]`
    #[serde(rename = "Shape")]
    pub shape: [usize; 2],
    #[serde(rename = "Dtypes")]
    pub dtypes: BTreeMap<String, ColumnKind>,
    #[serde(rename = "Missing_Values")]
    pub missing_values: BTreeMap<String, usize>,
    #[serde(rename = "Numeric_Summary")]
    pub numeric_summary: BTreeMap<String, NumericSummary>,
    #[serde(rename = "Top_Categories")]
    pub top_categories: BTreeMap<String, TopValues>,
    #[serde(rename = "Top_Ad_Groups")]
    pub top_ad_groups: TopValues,
    #[serde(rename = "Top_Months")]
    pub top_months: TopValues,
    /// Summed impressions of the top ad groups
    #[serde(rename = "Top_Ad_Groups_By_Impressions")]
    pub top_ad_groups_by_impressions: GroupTotals,
    /// Total revenue of the top ad groups; empty without a numeric Revenue column
    #[serde(rename = "Top_Ad_Groups_By_Revenue")]
    pub top_ad_groups_by_revenue: GroupTotals,
    #[serde(rename = "Correlation")]
    pub correlation: BTreeMap<String, BTreeMap<String, Option<f64>>>,
}

/// Summarize with the default top-N.
pub fn summarize(table: &CsvTable) -> EdaReport {
    EdaReporter::default().summarize(table)
}

#[derive(Debug, Clone, Copy)]
pub struct EdaReporter {
    top_n: usize,
}

impl Default for EdaReporter {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
        }
    }
}

impl EdaReporter {
    pub fn new(top_n: usize) -> Self {
        Self { top_n }
    }

    pub fn summarize(&self, table: &CsvTable) -> EdaReport {
        let mut dtypes = BTreeMap::new();
        let mut missing_values = BTreeMap::new();
        let mut numeric_summary = BTreeMap::new();
        let mut top_categories = BTreeMap::new();
        // column name -> per-row values, kept in header order for correlation
        let mut numeric_columns: Vec<(&str, Vec<Option<f64>>)> = Vec::new();

        for (idx, name) in table.headers().iter().enumerate() {
            let cells: Vec<Option<&str>> = table.column_values(idx).collect();
            missing_values.insert(name.clone(), cells.iter().filter(|c| c.is_none()).count());

            match numeric_values(&cells) {
                Some(values) => {
                    dtypes.insert(name.clone(), ColumnKind::Numeric);
                    numeric_summary.insert(name.clone(), describe(&values));
                    numeric_columns.push((name.as_str(), values));
                }
                None => {
                    dtypes.insert(name.clone(), ColumnKind::Categorical);
                    top_categories.insert(name.clone(), top_values(&cells, self.top_n));
                }
            }
        }

        // grouping fields are categories even when coded as numbers
        let ad_group_cells = raw_column(table, AD_GROUP_FIELD);
        let month_cells = raw_column(table, MONTH_FIELD);

        let top_ad_groups = top_values(&ad_group_cells, self.top_n);
        let top_months = top_values(&month_cells, self.top_n);
        for (field, top) in [(AD_GROUP_FIELD, &top_ad_groups), (MONTH_FIELD, &top_months)] {
            if table.column_index(field).is_some() {
                top_categories
                    .entry(field.to_string())
                    .or_insert_with(|| top.clone());
            }
        }

        let numeric_column = |name: &str| {
            numeric_columns
                .iter()
                .find(|(column, _)| *column == name)
                .map(|(_, values)| values.as_slice())
        };
        let top_ad_groups_by_impressions = numeric_column(IMPRESSIONS_COLUMN)
            .map(|values| group_totals(&ad_group_cells, values, TOP_BY_IMPRESSIONS))
            .unwrap_or_default();
        let top_ad_groups_by_revenue = numeric_column(REVENUE_COLUMN)
            .map(|values| group_totals(&ad_group_cells, values, TOP_BY_REVENUE))
            .unwrap_or_default();

        EdaReport {
            shape: [table.row_count(), table.column_count()],
            dtypes,
            missing_values,
            numeric_summary,
            top_categories,
            top_ad_groups,
            top_months,
            top_ad_groups_by_impressions,
            top_ad_groups_by_revenue,
            correlation: correlation_matrix(&numeric_columns),
        }
    }
}

/// Cells of a column as text; empty when the column is absent.
fn raw_column<'a>(table: &'a CsvTable, name: &str) -> Vec<Option<&'a str>> {
    match table.column_index(name) {
        Some(idx) => table.column_values(idx).collect(),
        None => Vec::new(),
    }
}

/// Parse a column as numeric; `None` if any present cell is not a finite number.
fn numeric_values(cells: &[Option<&str>]) -> Option<Vec<Option<f64>>> {
    cells
        .iter()
        .map(|cell| match cell {
            None => Some(None),
            Some(raw) => raw.parse::<f64>().ok().filter(|v| v.is_finite()).map(Some),
        })
        .collect()
}

/// Linear-interpolated quantile of sorted values
fn quantile(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = p * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}

fn describe(values: &[Option<f64>]) -> NumericSummary {
    let mut present: Vec<f64> = values.iter().flatten().copied().collect();
    let count = present.len();
    if count == 0 {
        return NumericSummary::default();
    }
    present.sort_by(|a, b| a.total_cmp(b));

    let mean = present.iter().sum::<f64>() / count as f64;
    let std = (count > 1).then(|| {
        let variance = present.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64;
        variance.sqrt()
    });

    NumericSummary {
        count,
        mean: Some(mean),
        std,
        min: present.first().copied(),
        q1: quantile(&present, 0.25),
        median: quantile(&present, 0.5),
        q3: quantile(&present, 0.75),
        max: present.last().copied(),
    }
}

/// Most frequent values, ties kept in first-seen order.
fn top_values(cells: &[Option<&str>], n: usize) -> TopValues {
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for &value in cells.iter().flatten() {
        let count = counts.entry(value).or_insert_with(|| {
            order.push(value);
            0
        });
        *count += 1;
    }

    let mut ranked: Vec<CategoryCount> = order
        .into_iter()
        .map(|value| CategoryCount {
            value: value.to_string(),
            count: counts[value],
        })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked.truncate(n);
    TopValues(ranked)
}

/// Sum `values` per group, skipping rows without a group; missing values add nothing.
fn group_totals(groups: &[Option<&str>], values: &[Option<f64>], n: usize) -> GroupTotals {
    let mut order: Vec<&str> = Vec::new();
    let mut totals: HashMap<&str, f64> = HashMap::new();
    for (group, value) in groups.iter().zip(values) {
        let Some(group) = *group else { continue };
        let total = totals.entry(group).or_insert_with(|| {
            order.push(group);
            0.0
        });
        *total += value.unwrap_or(0.0);
    }

    let mut ranked: Vec<(String, f64)> = order
        .into_iter()
        .map(|group| (group.to_string(), totals[group]))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked.truncate(n);
    GroupTotals(ranked)
}

/// Pearson correlation over rows where both columns are present.
fn pearson(a: &[Option<f64>], b: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .zip(b)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    if pairs.len() < 2 {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some((cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0))
}

fn correlation_matrix(
    columns: &[(&str, Vec<Option<f64>>)],
) -> BTreeMap<String, BTreeMap<String, Option<f64>>> {
    columns
        .iter()
        .map(|(name, values)| {
            let row = columns
                .iter()
                .map(|(other, other_values)| (other.to_string(), pearson(values, other_values)))
                .collect();
            (name.to_string(), row)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(csv: &str) -> CsvTable {
        CsvTable::from_bytes(csv.as_bytes()).unwrap()
    }

    #[test]
    fn test_summary_of_campaign_export() {
        let report = summarize(&table(
            "Impressions,Cost,Ad Group,Month\n\
             100,10,Brand,January\n\
             200,20,Brand,January\n\
             300,,Generic,February\n\
             400,40,Brand,March",
        ));

        assert_eq!(report.shape, [4, 4]);
        assert_eq!(report.dtypes["Impressions"], ColumnKind::Numeric);
        assert_eq!(report.dtypes["Ad Group"], ColumnKind::Categorical);
        assert_eq!(report.missing_values["Cost"], 1);
        assert_eq!(report.missing_values["Impressions"], 0);

        let impressions = &report.numeric_summary["Impressions"];
        assert_eq!(impressions.count, 4);
        assert_eq!(impressions.mean, Some(250.0));
        assert_eq!(impressions.min, Some(100.0));
        assert_eq!(impressions.q1, Some(175.0));
        assert_eq!(impressions.median, Some(250.0));
        assert_eq!(impressions.q3, Some(325.0));
        assert_eq!(impressions.max, Some(400.0));

        assert_eq!(
            report.top_ad_groups.first(),
            Some(&CategoryCount {
                value: "Brand".to_string(),
                count: 3
            })
        );
        assert_eq!(report.top_ad_groups.count("Generic"), Some(1));
        assert_eq!(report.top_months.len(), 3);
        assert_eq!(report.top_months.first().map(|c| c.value.as_str()), Some("January"));
        assert!(report.top_categories.contains_key("Month"));
        assert!(!report.top_categories.contains_key("Cost"));
    }

    #[test]
    fn test_correlation_uses_pairwise_complete_rows() {
        let report = summarize(&table(
            "Impressions,Cost\n\
             100,10\n\
             200,20\n\
             300,\n\
             400,40",
        ));

        let corr = report.correlation["Impressions"]["Cost"].unwrap();
        assert!((corr - 1.0).abs() < 1e-12);
        assert!((report.correlation["Cost"]["Cost"].unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_rows_do_not_fault() {
        let report = summarize(&table("Impressions,Ad Group,Month\n"));

        assert_eq!(report.shape, [0, 3]);
        assert_eq!(report.numeric_summary["Impressions"], NumericSummary::default());
        assert_eq!(report.correlation["Impressions"]["Impressions"], None);
        assert!(report.top_ad_groups.is_empty());
    }

    #[test]
    fn test_entirely_missing_column() {
        let report = summarize(&table("Cost,Notes\n10,\n20,\n30,"));

        assert_eq!(report.missing_values["Notes"], 3);
        assert_eq!(report.numeric_summary["Notes"].count, 0);
        assert_eq!(report.numeric_summary["Notes"].mean, None);
        assert_eq!(report.correlation["Cost"]["Notes"], None);
    }

    #[test]
    fn test_single_value_has_no_std() {
        let summary = describe(&[Some(5.0)]);
        assert_eq!(summary.std, None);
        assert_eq!(summary.median, Some(5.0));
    }

    #[test]
    fn test_top_n_is_truncated() {
        let cells: Vec<Option<&str>> = ["a", "b", "c", "d", "e", "f", "a"].iter().map(|s| Some(*s)).collect();
        let top = top_values(&cells, 5);
        let ranked: Vec<&str> = top.iter().map(|c| c.value.as_str()).collect();
        assert_eq!(ranked, vec!["a", "b", "c", "d", "e"]);
        assert_eq!(top.count("a"), Some(2));
    }

    #[test]
    fn test_report_serializes_with_null_statistics() {
        let report = summarize(&table("Cost\n10"));
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["Shape"][0], 1);
        assert!(json["Numeric_Summary"]["Cost"]["std"].is_null());
        assert_eq!(json["Numeric_Summary"]["Cost"]["50%"], 10.0);
        assert!(json["Correlation"]["Cost"]["Cost"].is_null());
    }

    #[test]
    fn test_top_values_serialize_as_ranked_map() {
        let report = summarize(&table("Ad Group\nGeneric\nBrand\nBrand"));
        let json = serde_json::to_string(&report.top_ad_groups).unwrap();
        assert_eq!(json, r#"{"Brand":2,"Generic":1}"#);

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["Top_Categories"]["Ad Group"]["Brand"], 2);
    }
    #[test]
    fn test_numeric_coded_categories_are_counted() {
        let report = summarize(&table("Impressions,Ad Group,Month\n100,101,1\n200,101,1\n300,102,2"));

        assert_eq!(report.dtypes["Ad Group"], ColumnKind::Numeric);
        assert_eq!(report.top_ad_groups.count("101"), Some(2));
        assert_eq!(report.top_ad_groups.count("102"), Some(1));
        assert_eq!(report.top_months.first().map(|c| c.value.as_str()), Some("1"));
        assert_eq!(report.top_categories["Ad Group"], report.top_ad_groups);
        assert_eq!(report.top_categories["Month"], report.top_months);
        assert_eq!(report.top_ad_groups_by_impressions.total("101"), Some(300.0));
    }

    #[test]
    fn test_ad_groups_ranked_by_impressions_and_revenue() {
        let report = summarize(&table(
            "Ad Group,Impressions,Revenue\n\
             Brand,100,50.5\n\
             Generic,500,10\n\
             Brand,200,\n\
             ,900,99\n\
             Shopping,50,70",
        ));

        let by_impressions: Vec<&str> = report
            .top_ad_groups_by_impressions
            .iter()
            .map(|(group, _)| group.as_str())
            .collect();
        assert_eq!(by_impressions, vec!["Generic", "Brand", "Shopping"]);
        assert_eq!(report.top_ad_groups_by_impressions.total("Brand"), Some(300.0));

        let json = serde_json::to_string(&report.top_ad_groups_by_revenue).unwrap();
        assert_eq!(json, r#"{"Shopping":70.0,"Brand":50.5,"Generic":10.0}"#);
    }

    #[test]
    fn test_revenue_ranking_needs_numeric_revenue() {
        let without = summarize(&table("Ad Group,Impressions\nBrand,100"));
        assert!(without.top_ad_groups_by_revenue.is_empty());
        assert_eq!(without.top_ad_groups_by_impressions.len(), 1);

        let text = summarize(&table("Ad Group,Impressions,Revenue\nBrand,100,lots"));
        assert!(text.top_ad_groups_by_revenue.is_empty());

        let json = serde_json::to_value(&text).unwrap();
        assert_eq!(json["Top_Ad_Groups_By_Revenue"], serde_json::json!({}));
    }

    #[test]
    fn test_impressions_ranking_keeps_top_fifteen() {
        let mut csv = String::from("Ad Group,Impressions\n");
        for i in 0..20 {
            csv.push_str(&format!("group{i},{}\n", 100 + i));
        }

        let report = summarize(&table(&csv));

        assert_eq!(report.top_ad_groups_by_impressions.len(), TOP_BY_IMPRESSIONS);
        assert_eq!(
            report.top_ad_groups_by_impressions.iter().next().map(|(g, _)| g.as_str()),
            Some("group19")
        );
    }
}
