//! CSV ingestion for campaign exports.
//!
//! Uploads are first read into a loosely typed [`CsvTable`] so that the EDA
//! reporter can look at arbitrary columns. Structural validation and
//! conversion to typed [`CampaignRecord`]s happen here as well, before any
//! row reaches the model.

use crate::errors::{Error, ProcessingContext, Result};
use crate::types::campaign::{REQUIRED_COLUMNS, REVENUE_COLUMN};
use crate::types::{CampaignRecord, TrainingRow};
use anyhow::{anyhow, Context};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Cell spellings treated as missing values
const MISSING_MARKERS: [&str; 10] = ["", "NA", "N/A", "n/a", "NaN", "nan", "null", "NULL", "None", "<NA>"];

pub fn is_missing(cell: &str) -> bool {
    MISSING_MARKERS.contains(&cell)
}

/// Header plus rows of optional cells
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CsvTable {
    headers: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl CsvTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        Self { headers, rows }
    }

    /// Parse CSV text with a header row. Data cells are trimmed, header names are
    /// kept exact; missing markers become `None`.
    pub fn from_reader<R: Read>(reader: R) -> anyhow::Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::Fields)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader
            .headers()
            .context("Failed to read CSV header")?
            .iter()
            .map(str::to_string)
            .collect();

        let mut rows = Vec::new();
        for (idx, record) in csv_reader.records().enumerate() {
            let record = record.with_context(|| format!("Malformed CSV at data row {}", idx + 1))?;
            let row = record
                .iter()
                .map(|cell| (!is_missing(cell)).then(|| cell.to_string()))
                .collect();
            rows.push(row);
        }

        Ok(Self { headers, rows })
    }

    /// Parse an uploaded file body.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes).processing("file")?;
        Self::from_reader(text.as_bytes()).processing("file")
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        Self::from_reader(file).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Values of one column by index; short rows read as missing.
    pub fn column_values(&self, idx: usize) -> impl Iterator<Item = Option<&str>> + '_ {
        self.rows
            .iter()
            .map(move |row| row.get(idx).and_then(|cell| cell.as_deref()))
    }

    /// Required columns absent from the header, in the order given.
    pub fn missing_columns(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|name| self.column_index(name).is_none())
            .map(|name| name.to_string())
            .collect()
    }

    pub fn require_columns(&self, required: &[&str]) -> Result<()> {
        let missing = self.missing_columns(required);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::Schema { missing })
        }
    }

    /// Validate the prediction schema and convert every row.
    pub fn campaign_records(&self) -> Result<Vec<CampaignRecord>> {
        self.require_columns(&REQUIRED_COLUMNS)?;
        let columns = CampaignColumns::resolve(self)?;

        self.rows
            .iter()
            .enumerate()
            .map(|(idx, row)| columns.record(row, idx + 1))
            .collect()
    }

    /// Validate the training schema (prediction columns plus `Revenue`) and convert every row.
    pub fn training_rows(&self) -> Result<Vec<TrainingRow>> {
        let mut required: Vec<&str> = REQUIRED_COLUMNS.to_vec();
        required.push(REVENUE_COLUMN);
        self.require_columns(&required)?;

        let columns = CampaignColumns::resolve(self)?;
        let revenue_idx = self
            .column_index(REVENUE_COLUMN)
            .ok_or_else(|| Error::schema([REVENUE_COLUMN]))?;

        self.rows
            .iter()
            .enumerate()
            .map(|(idx, row)| {
                let row_number = idx + 1;
                let record = columns.record(row, row_number)?;
                let revenue = required_float(row, revenue_idx, REVENUE_COLUMN, row_number)?;
                Ok(TrainingRow { record, revenue })
            })
            .collect()
    }
}

/// Header positions of the campaign columns
struct CampaignColumns {
    impressions: usize,
    clicks: usize,
    ctr: usize,
    conversions: usize,
    conv_rate: usize,
    cost: usize,
    cpc: usize,
    sale_amount: usize,
    pnl: usize,
    ad_group: usize,
    month: usize,
}

impl CampaignColumns {
    fn resolve(table: &CsvTable) -> Result<Self> {
        let idx = |name: &str| table.column_index(name).ok_or_else(|| Error::schema([name]));
        Ok(Self {
            impressions: idx("Impressions")?,
            clicks: idx("Clicks")?,
            ctr: idx("CTR")?,
            conversions: idx("Conversions")?,
            conv_rate: idx("Conv Rate")?,
            cost: idx("Cost")?,
            cpc: idx("CPC")?,
            sale_amount: idx("Sale Amount")?,
            pnl: idx("P&L")?,
            ad_group: idx("Ad Group")?,
            month: idx("Month")?,
        })
    }

    fn record(&self, row: &[Option<String>], row_number: usize) -> Result<CampaignRecord> {
        Ok(CampaignRecord {
            impressions: required_count(row, self.impressions, "Impressions", row_number)?,
            clicks: required_count(row, self.clicks, "Clicks", row_number)?,
            ctr: optional_float(row, self.ctr, "CTR", row_number)?,
            conversions: required_count(row, self.conversions, "Conversions", row_number)?,
            conv_rate: optional_float(row, self.conv_rate, "Conv Rate", row_number)?,
            cost: required_float(row, self.cost, "Cost", row_number)?,
            cpc: optional_float(row, self.cpc, "CPC", row_number)?,
            sale_amount: optional_float(row, self.sale_amount, "Sale Amount", row_number)?,
            pnl: optional_float(row, self.pnl, "P&L", row_number)?,
            ad_group: text(row, self.ad_group),
            month: text(row, self.month),
        })
    }
}

fn cell(row: &[Option<String>], idx: usize) -> Option<&str> {
    row.get(idx).and_then(|c| c.as_deref())
}

fn text(row: &[Option<String>], idx: usize) -> String {
    cell(row, idx).unwrap_or_default().to_string()
}

fn parse_float(value: &str, column: &str, row_number: usize) -> Result<f64> {
    let parsed: f64 = value
        .parse()
        .map_err(|_| anyhow!("non-numeric value {value:?} in column {column:?}"))
        .processing(&format!("row {row_number}"))?;
    if !parsed.is_finite() {
        return Err(Error::processing(
            format!("row {row_number}"),
            anyhow!("non-finite value {value:?} in column {column:?}"),
        ));
    }
    Ok(parsed)
}

fn optional_float(
    row: &[Option<String>],
    idx: usize,
    column: &str,
    row_number: usize,
) -> Result<Option<f64>> {
    cell(row, idx)
        .map(|value| parse_float(value, column, row_number))
        .transpose()
}

fn required_float(row: &[Option<String>], idx: usize, column: &str, row_number: usize) -> Result<f64> {
    let value = cell(row, idx).ok_or_else(|| Error::schema([format!("{column} (row {row_number})")]))?;
    let parsed = parse_float(value, column, row_number)?;
    Ok(parsed)
}

/// Counters must be non-negative whole numbers; `"12.0"` is accepted.
fn required_count(row: &[Option<String>], idx: usize, column: &str, row_number: usize) -> Result<u64> {
    let value = cell(row, idx).ok_or_else(|| Error::schema([format!("{column} (row {row_number})")]))?;
    if let Ok(count) = value.parse::<u64>() {
        return Ok(count);
    }

    let parsed = parse_float(value, column, row_number)?;
    if parsed < 0.0 || parsed.fract() != 0.0 || parsed > u64::MAX as f64 {
        return Err(Error::processing(
            format!("row {row_number}"),
            anyhow!("expected a non-negative whole number in column {column:?}, got {value:?}"),
        ));
    }
    Ok(parsed as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Impressions,Clicks,CTR,Conversions,Conv Rate,Cost,CPC,Sale Amount,P&L,Ad Group,Month";

    fn table(body: &str) -> CsvTable {
        CsvTable::from_bytes(format!("{HEADER}\n{body}").as_bytes()).unwrap()
    }

    #[test]
    fn test_parse_campaign_rows() {
        let table = table(
            "1000,50,5.0,5,0.1,100.0,2.0,250.0,150.0,Brand,January\n\
             2000,0,,0,,40.5,,,,Generic,February",
        );
        let records = table.campaign_records().unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].impressions, 1000);
        assert_eq!(records[0].sale_amount, Some(250.0));
        assert_eq!(records[0].ad_group, "Brand");
        assert_eq!(records[1].clicks, 0);
        assert_eq!(records[1].ctr, None);
        assert_eq!(records[1].pnl, None);
        assert_eq!(records[1].cost, 40.5);
    }

    #[test]
    fn test_missing_month_column_is_schema_error() {
        let csv = "Impressions,Clicks,CTR,Conversions,Conv Rate,Cost,CPC,Sale Amount,P&L,Ad Group\n\
                   1000,50,5.0,5,0.1,100.0,2.0,250.0,150.0,Brand";
        let table = CsvTable::from_bytes(csv.as_bytes()).unwrap();

        match table.campaign_records() {
            Err(Error::Schema { missing }) => assert_eq!(missing, vec!["Month"]),
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn test_header_names_match_exactly() {
        let csv = "Impressions,Clicks,CTR,Conversions,Conv Rate,Cost,CPC,Sale Amount,P&L, Ad Group,Month \n\
                   1000,50,5.0,5,0.1,100.0,2.0,250.0,150.0,Brand,January";
        let table = CsvTable::from_bytes(csv.as_bytes()).unwrap();

        match table.campaign_records() {
            Err(Error::Schema { missing }) => assert_eq!(missing, vec!["Ad Group", "Month"]),
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn test_data_cells_are_trimmed() {
        let table = table(" 1000 ,50,5.0,5,0.1,100.0,2.0,250.0,150.0, Brand ,January");
        let records = table.campaign_records().unwrap();

        assert_eq!(records[0].impressions, 1000);
        assert_eq!(records[0].ad_group, "Brand");
    }

    #[test]
    fn test_non_numeric_cell_is_processing_error() {
        let table = table("lots,50,5.0,5,0.1,100.0,2.0,250.0,150.0,Brand,January");

        let err = table.campaign_records().unwrap_err();
        assert!(matches!(err, Error::Processing { .. }));
        assert!(err.to_string().contains("Impressions"));
    }

    #[test]
    fn test_empty_required_cell_is_schema_error() {
        let table = table("1000,50,5.0,5,0.1,,2.0,250.0,150.0,Brand,January");

        match table.campaign_records() {
            Err(Error::Schema { missing }) => assert_eq!(missing, vec!["Cost (row 1)"]),
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn test_whole_number_floats_accepted_for_counts() {
        let table = table("1000.0,50,5.0,5.0,0.1,100.0,2.0,250.0,150.0,Brand,January");
        assert_eq!(table.campaign_records().unwrap()[0].impressions, 1000);

        let fractional = self::table("1000.5,50,5.0,5,0.1,100.0,2.0,250.0,150.0,Brand,January");
        assert!(fractional.campaign_records().is_err());
    }

    #[test]
    fn test_training_rows_require_revenue() {
        let table = table("1000,50,5.0,5,0.1,100.0,2.0,250.0,150.0,Brand,January");
        match table.training_rows() {
            Err(Error::Schema { missing }) => assert_eq!(missing, vec!["Revenue"]),
            other => panic!("expected schema error, got {other:?}"),
        }

        let with_revenue = CsvTable::from_bytes(
            format!("{HEADER},Revenue\n1000,50,5.0,5,0.1,100.0,2.0,250.0,150.0,Brand,January,300").as_bytes(),
        )
        .unwrap();
        let rows = with_revenue.training_rows().unwrap();
        assert_eq!(rows[0].revenue, 300.0);
    }

    #[test]
    fn test_malformed_csv_is_processing_error() {
        let csv = format!("{HEADER}\n1000,50");
        assert!(matches!(
            CsvTable::from_bytes(csv.as_bytes()),
            Err(Error::Processing { .. })
        ));
    }

    #[test]
    fn test_missing_markers() {
        let table = CsvTable::from_bytes(b"a,b\nNA,1\n,2").unwrap();
        let values: Vec<Option<&str>> = table.column_values(0).collect();
        assert_eq!(values, vec![None, None]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column_count(), 2);
    }
}
