use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use log::{debug, info};
use regex::Regex;
use serde::Deserialize;

use super::{parse_date, BillSource, SourceError};
use crate::accounting::bill::{PayrollBill, SourceKind};
use crate::accounting::line::{PayrollLine, RawLine};
use crate::config::Config;

/// Whitespace the payroll provider pads between a closing quote and the
/// delimiter, e.g. `"Office"   ,"10"`.
static QUOTE_PADDING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#""\s+,"#).expect("valid regex"));

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PayrollRecord {
    #[serde(rename = "Paygroup")]
    pub paygroup: String,
    #[serde(rename = "Report Year")]
    pub report_year: String,
    #[serde(rename = "Week #")]
    pub week: String,
    #[serde(rename = "Payroll #")]
    pub payroll_number: String,
    #[serde(rename = "Period End Date")]
    pub period_end_date: String,
    #[serde(rename = "Check Date")]
    pub check_date: String,
    #[serde(rename = "Worked Department #")]
    pub department: String,
    #[serde(rename = "Dept Descr")]
    pub description: String,
    #[serde(rename = "Gross Earnings")]
    pub earnings: String,
    #[serde(rename = "Total Fee")]
    pub fees: String,
    #[serde(rename = "Deduct Adjust")]
    pub deductions: String,
    #[serde(rename = "Employer Contrib (401k)")]
    pub retirement: String,
    #[serde(rename = "Total Payroll Bill")]
    pub total: String,
}

impl PayrollRecord {
    /// `{paygroup}-20{year}-W{week}-{payroll}`, e.g. `1QR-2022-W20-1`.
    pub fn reference(&self) -> String {
        format!(
            "{}-20{}-W{}-{}",
            self.paygroup, self.report_year, self.week, self.payroll_number
        )
    }
}

impl From<PayrollRecord> for RawLine {
    fn from(record: PayrollRecord) -> Self {
        RawLine {
            description: record.description,
            department: record.department.into(),
            total: record.total.into(),
            earnings: record.earnings.into(),
            fees: record.fees.into(),
            deductions: record.deductions.into(),
            retirement: record.retirement.into(),
        }
    }
}

/// Strips the padding after quoted values so the csv reader sees clean
/// fields.
pub fn clean_export(text: &str) -> String {
    text.lines()
        .map(|line| QUOTE_PADDING.replace_all(line, "\","))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn read_records(text: &str) -> Result<Vec<PayrollRecord>, SourceError> {
    let cleaned = clean_export(text);
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(cleaned.as_bytes());

    let mut records = Vec::new();
    for record in csv_reader.deserialize::<PayrollRecord>() {
        let record = record?;
        debug!("read payroll row for department {:?}", record.department);
        records.push(record);
    }

    Ok(records)
}

/// Builds a bill from the text of a delimited payroll export. The header
/// fields come from the first row.
pub fn parse_export(text: &str, config: &Config) -> Result<PayrollBill, SourceError> {
    let records = read_records(text)?;
    let first = records.first().ok_or(SourceError::Empty)?;

    let mut bill = PayrollBill::new(
        SourceKind::Delimited,
        parse_date(&first.period_end_date)?,
        parse_date(&first.check_date)?,
        first.reference(),
        None,
    );

    for record in records {
        bill.push_line(PayrollLine::from_raw(record.into()).with_config_description(config));
    }

    info!(
        "loaded {} payroll lines for {} totalling {}",
        bill.lines().len(),
        bill.reference(),
        bill.invoice_total()
    );

    Ok(bill)
}

#[derive(Debug, Clone)]
pub struct DelimitedSource {
    path: PathBuf,
}

impl DelimitedSource {
    pub fn new(path: impl AsRef<Path>) -> DelimitedSource {
        DelimitedSource {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl BillSource for DelimitedSource {
    fn read_bill(&self, config: &Config) -> Result<PayrollBill, SourceError> {
        let text = std::fs::read_to_string(&self.path)?;
        parse_export(&text, config)
    }
}
