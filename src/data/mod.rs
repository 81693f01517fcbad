use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime};
use enum_dispatch::enum_dispatch;
use log::debug;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::accounting::bill::PayrollBill;
use crate::accounting::posting::{JournalEntry, Side};
use crate::config::Config;

pub mod delimited;
pub mod spreadsheet;

pub use delimited::DelimitedSource;
pub use spreadsheet::SpreadsheetSource;

/// OLE2 compound document signature, the container of legacy `.xls` files.
const OLE2_SIGNATURE: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{0} is neither an Excel file nor a CSV, is not a payroll bill, or can not be read")]
    UnsupportedFormat(PathBuf),
    #[error("the payroll export has no data rows")]
    Empty,
    #[error("invalid date {0:?}")]
    InvalidDate(String),
    #[error("no department block between \"DEPARTMENT NUMBER\" and \"Company Total\" in the spreadsheet")]
    MissingDataBlock,
    #[error("the spreadsheet has no worksheets")]
    NoWorksheet,
    #[error("spreadsheet input requires xl-cell-locations in the config file")]
    MissingCellLocations,
    #[error("{0}")]
    Csv(#[from] csv::Error),
    #[error("{0}")]
    Spreadsheet(#[from] calamine::XlsError),
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

#[enum_dispatch]
pub trait BillSource {
    fn read_bill(&self, config: &Config) -> Result<PayrollBill, SourceError>;
}

#[enum_dispatch(BillSource)]
#[derive(Debug)]
pub enum PayrollSource {
    DelimitedSource,
    SpreadsheetSource,
}

impl PayrollSource {
    /// Picks the reader for a payroll export from its content and extension.
    pub fn open(path: impl AsRef<Path>) -> Result<PayrollSource, SourceError> {
        let path = path.as_ref();
        let mut content = Vec::new();
        File::open(path)?.read_to_end(&mut content)?;

        if content.starts_with(&OLE2_SIGNATURE) {
            debug!("{} is a spreadsheet", path.display());
            return Ok(SpreadsheetSource::new(path).into());
        }

        let is_csv = path
            .extension()
            .and_then(|extension| extension.to_str())
            .is_some_and(|extension| extension.eq_ignore_ascii_case("csv"));
        let is_text = !content.contains(&0) && std::str::from_utf8(&content).is_ok();
        if is_csv && is_text {
            debug!("{} is a delimited text export", path.display());
            return Ok(DelimitedSource::new(path).into());
        }

        Err(SourceError::UnsupportedFormat(path.to_path_buf()))
    }
}

const DATE_FORMATS: &[&str] = &[
    "%m/%d/%y", "%m/%d/%Y", "%Y-%m-%d", "%Y/%m/%d", "%m-%d-%Y", "%d %b %Y", "%b %d %Y", "%B %d %Y",
];

const DATETIME_FORMATS: &[&str] = &["%m/%d/%Y %H:%M:%S", "%m/%d/%Y %H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Accepts the date layouts payroll exports have been seen to use.
pub fn parse_date(text: &str) -> Result<NaiveDate, SourceError> {
    let cleaned = text.trim().replace(',', "");

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(&cleaned, format) {
            return Ok(date);
        }
    }
    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(&cleaned, format) {
            return Ok(datetime.date());
        }
    }

    Err(SourceError::InvalidDate(text.to_string()))
}

#[derive(Debug, Serialize)]
pub struct EntryRecord {
    pub account: String,
    pub label: String,
    pub debit: Option<Decimal>,
    pub credit: Option<Decimal>,
}

impl From<&JournalEntry> for EntryRecord {
    fn from(entry: &JournalEntry) -> Self {
        let (debit, credit) = match entry.side {
            Side::Debit => (Some(entry.amount), None),
            Side::Credit => (None, Some(entry.amount)),
        };
        EntryRecord {
            account: entry.account_code.clone(),
            label: entry.label.clone().unwrap_or_default(),
            debit,
            credit,
        }
    }
}

pub fn export_entries<W: Write>(entries: &[JournalEntry], writer: W) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new().from_writer(writer);
    for entry in entries {
        let record: EntryRecord = entry.into();
        csv_writer.serialize(record)?;
    }

    csv_writer.flush()?;

    Ok(())
}

/// Renames a processed export to `{reference}{date}` plus its extension,
/// next to the original.
pub fn rename_processed(path: &Path, bill: &PayrollBill) -> std::io::Result<PathBuf> {
    let mut file_name = format!("{}{}", bill.reference(), bill.date().format("%Y-%m-%d"));
    if let Some(extension) = path.extension().and_then(|extension| extension.to_str()) {
        file_name.push('.');
        file_name.push_str(extension);
    }

    let target = path.with_file_name(file_name);
    std::fs::rename(path, &target)?;
    debug!("renamed {} to {}", path.display(), target.display());

    Ok(target)
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::accounting::bill::SourceKind;

    fn write_file(dir: &tempfile::TempDir, name: &str, content: &[u8]) -> Result<PathBuf> {
        let path = dir.path().join(name);
        std::fs::write(&path, content)?;
        Ok(path)
    }

    #[test]
    fn test_parse_date() -> Result<()> {
        let may_13 = NaiveDate::from_ymd_opt(2022, 5, 13).unwrap();

        assert_eq!(parse_date("05/13/2022")?, may_13);
        assert_eq!(parse_date(" 2022-05-13 ")?, may_13);
        assert_eq!(parse_date("5/13/22")?, may_13);
        assert_eq!(parse_date("May 13, 2022")?, may_13);
        assert_eq!(parse_date("05/13/2022 00:00:00")?, may_13);
        assert!(matches!(parse_date("someday"), Err(SourceError::InvalidDate(_))));
        assert!(matches!(parse_date(""), Err(SourceError::InvalidDate(_))));

        Ok(())
    }

    #[test]
    fn test_open_detects_format() -> Result<()> {
        let dir = tempfile::tempdir()?;

        let csv = write_file(&dir, "bill.CSV", b"\"Paygroup\"\n\"1QR\"\n")?;
        assert!(matches!(PayrollSource::open(&csv)?, PayrollSource::DelimitedSource(_)));

        let mut xls_bytes = OLE2_SIGNATURE.to_vec();
        xls_bytes.extend_from_slice(&[0; 32]);
        let xls = write_file(&dir, "report.bin", &xls_bytes)?;
        assert!(matches!(PayrollSource::open(&xls)?, PayrollSource::SpreadsheetSource(_)));

        let text = write_file(&dir, "notes.txt", b"hello")?;
        assert!(matches!(PayrollSource::open(&text), Err(SourceError::UnsupportedFormat(_))));

        let binary = write_file(&dir, "broken.csv", b"a,b\0c")?;
        assert!(matches!(PayrollSource::open(&binary), Err(SourceError::UnsupportedFormat(_))));

        assert!(matches!(PayrollSource::open(dir.path().join("missing.csv")), Err(SourceError::Io(_))));

        Ok(())
    }

    #[test]
    fn test_export_entries() -> Result<()> {
        let entries = vec![
            JournalEntry::debit("70200", "10 Office Earnings".to_string(), dec!(2386.93)),
            JournalEntry::credit("20100", dec!(2386.93)),
        ];

        let mut out = Vec::new();
        export_entries(&entries, &mut out)?;

        assert_eq!(
            String::from_utf8(out)?,
            "account,label,debit,credit\n70200,10 Office Earnings,2386.93,\n20100,,,2386.93\n"
        );

        Ok(())
    }

    #[test]
    fn test_rename_processed() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = write_file(&dir, "Payroll Register 0324.xls", b"data")?;
        let bill = PayrollBill::new(
            SourceKind::Spreadsheet,
            NaiveDate::from_ymd_opt(2023, 3, 24).unwrap(),
            NaiveDate::from_ymd_opt(2023, 3, 30).unwrap(),
            "6RZ20231301",
            Some(dec!(0)),
        );

        let target = rename_processed(&path, &bill)?;

        assert_eq!(target, dir.path().join("6RZ202313012023-03-24.xls"));
        assert!(target.exists());
        assert!(!path.exists());

        Ok(())
    }
}
