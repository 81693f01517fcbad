use std::collections::HashMap;
use std::path::{Path, PathBuf};

use calamine::{open_workbook, Data, Range, Reader, Xls};
use chrono::{Days, NaiveDate};
use log::{debug, info};
use rust_decimal::Decimal;

use super::{parse_date, BillSource, SourceError};
use crate::accounting::bill::{PayrollBill, SourceKind};
use crate::accounting::line::{coerce_amount, PayrollLine, RawLine, RawValue};
use crate::config::{CellLocation, CellLocations, Config, DateSystem};

const BLOCK_START: &str = "DEPARTMENT NUMBER";
const BLOCK_END: &str = "Company Total";

const DEPARTMENT_COLUMN: &str = "DEPARTMENT NUMBER";
const TOTAL_COLUMN: &str = "TOTAL";
const EARNINGS_COLUMN: &str = "GROSS";
const RETIREMENT_COLUMN: &str = "ADJ ER401K-401K MATCH";
const FEE_COLUMNS: [&str; 3] = ["TOTAL SVC FEE AMT", "ADJ NYMT-NY METRO", "TLM SUBTOTAL"];
const DEDUCTION_COLUMNS: [&str; 5] = [
    "ADJ 75-AFLAC POST-TAX",
    "ADJ 74-AFLAC PRETAX",
    "ADJ 31-MEDICAL",
    "ADJ 33-TS DENTAL",
    "ADJ 34-VISION",
];

/// One row of the department block, keyed by the block's header row.
pub type PayRecord = HashMap<String, Data>;

#[derive(Debug, Clone, PartialEq)]
pub struct SheetHeader {
    pub paygroup: String,
    pub reference: String,
    pub total: Decimal,
    pub due_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Converts a spreadsheet date serial to a calendar date.
///
/// The date system comes from the `date-system` config key, not from the
/// workbook's own 1904 flag. A 1904 workbook whose date cells carry no date
/// format is misdated by four years unless the config says `1904`.
pub fn serial_to_date(serial: f64, system: DateSystem) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }

    let epoch = match system {
        // Serials below 61 predate the phantom 1900-02-29.
        DateSystem::V1900 if serial < 61.0 => NaiveDate::from_ymd_opt(1899, 12, 31)?,
        DateSystem::V1900 => NaiveDate::from_ymd_opt(1899, 12, 30)?,
        DateSystem::V1904 => NaiveDate::from_ymd_opt(1904, 1, 1)?,
    };

    epoch.checked_add_days(Days::new(serial.trunc() as u64))
}

fn cell(range: &Range<Data>, location: CellLocation) -> &Data {
    range.get_value(location).unwrap_or(&Data::Empty)
}

fn cell_text(range: &Range<Data>, location: CellLocation) -> String {
    match cell(range, location) {
        Data::Empty => String::new(),
        value => value.to_string().trim().to_string(),
    }
}

fn cell_date(range: &Range<Data>, location: CellLocation, system: DateSystem) -> Result<NaiveDate, SourceError> {
    let value = cell(range, location);
    let date = match value {
        Data::Float(serial) => serial_to_date(*serial, system),
        Data::Int(serial) => serial_to_date(*serial as f64, system),
        Data::DateTime(datetime) => datetime.as_datetime().map(|datetime| datetime.date()),
        Data::String(text) | Data::DateTimeIso(text) => return parse_date(text),
        _ => None,
    };

    date.ok_or_else(|| SourceError::InvalidDate(value.to_string()))
}

pub fn raw_value(value: &Data) -> RawValue {
    match value {
        Data::Empty => RawValue::Empty,
        Data::Float(number) => RawValue::Number(*number),
        Data::Int(number) => RawValue::Number(*number as f64),
        Data::String(text) => RawValue::Text(text.clone()),
        other => RawValue::Text(other.to_string()),
    }
}

pub fn read_header(range: &Range<Data>, cells: &CellLocations) -> Result<SheetHeader, SourceError> {
    let locations = &cells.header;
    let reference = cell_text(range, locations.reference);
    let reference = reference
        .strip_prefix(cells.reference_prefix.as_str())
        .unwrap_or(&reference)
        .to_string();

    Ok(SheetHeader {
        paygroup: cell_text(range, locations.paygroup),
        reference,
        total: coerce_amount(&raw_value(cell(range, locations.total))),
        due_date: cell_date(range, locations.due_date, cells.date_system)?,
        end_date: cell_date(range, locations.end_date, cells.date_system)?,
    })
}

/// The used area of the sheet as rows addressed from cell A1.
pub fn sheet_rows(range: &Range<Data>) -> Vec<Vec<Data>> {
    let Some((last_row, last_column)) = range.end() else {
        return Vec::new();
    };

    (0..=last_row)
        .map(|row| {
            (0..=last_column)
                .map(|column| cell(range, (row, column)).clone())
                .collect()
        })
        .collect()
}

fn is_marker(row: &[Data], marker: &str) -> bool {
    matches!(row.first(), Some(Data::String(text)) if text == marker)
}

/// Department rows between the last `DEPARTMENT NUMBER` row and the
/// `Company Total` row that follows it. Earlier `Company Total` rows belong
/// to other sections of the report.
pub fn read_pay_data(rows: &[Vec<Data>]) -> Result<Vec<PayRecord>, SourceError> {
    let mut start = None;
    let mut end = None;

    for (index, row) in rows.iter().enumerate() {
        if is_marker(row, BLOCK_START) {
            start = Some(index);
        } else if is_marker(row, BLOCK_END) && start.is_some() {
            end = Some(index);
            break;
        }
    }

    let (Some(start), Some(end)) = (start, end) else {
        return Err(SourceError::MissingDataBlock);
    };
    debug!("department block spans rows {} to {}", start, end);

    let labels: Vec<String> = rows[start].iter().map(|label| label.to_string()).collect();
    let records = rows[start + 1..end]
        .iter()
        .map(|row| labels.iter().cloned().zip(row.iter().cloned()).collect())
        .collect();

    Ok(records)
}

fn field(record: &PayRecord, column: &str) -> RawValue {
    record.get(column).map_or(RawValue::Empty, raw_value)
}

/// Adds up several numeric columns; blank and text cells count as zero.
fn sum_fields(record: &PayRecord, columns: &[&str]) -> RawValue {
    let sum = columns
        .iter()
        .map(|column| match record.get(*column) {
            Some(Data::Float(number)) => *number,
            Some(Data::Int(number)) => *number as f64,
            _ => 0.0,
        })
        .sum::<f64>();

    RawValue::Number(sum)
}

impl From<&PayRecord> for RawLine {
    fn from(record: &PayRecord) -> Self {
        RawLine {
            description: String::new(),
            department: field(record, DEPARTMENT_COLUMN),
            total: field(record, TOTAL_COLUMN),
            earnings: field(record, EARNINGS_COLUMN),
            fees: sum_fields(record, &FEE_COLUMNS),
            deductions: sum_fields(record, &DEDUCTION_COLUMNS),
            retirement: field(record, RETIREMENT_COLUMN),
        }
    }
}

/// Builds a bill from the first worksheet of a payroll register.
pub fn parse_sheet(range: &Range<Data>, config: &Config) -> Result<PayrollBill, SourceError> {
    let cells = config
        .xl_cell_locations
        .as_ref()
        .ok_or(SourceError::MissingCellLocations)?;

    let header = read_header(range, cells)?;
    debug!("spreadsheet header {:?}", header);
    let records = read_pay_data(&sheet_rows(range))?;

    let mut bill = PayrollBill::new(
        SourceKind::Spreadsheet,
        header.end_date,
        header.due_date,
        header.reference,
        Some(header.total),
    );
    for record in &records {
        bill.push_line(PayrollLine::from_raw(record.into()).with_config_description(config));
    }

    info!(
        "loaded {} payroll lines for paygroup {} ({}) totalling {} (file total {})",
        bill.lines().len(),
        header.paygroup,
        bill.reference(),
        bill.invoice_total(),
        header.total
    );

    Ok(bill)
}

#[derive(Debug, Clone)]
pub struct SpreadsheetSource {
    path: PathBuf,
}

impl SpreadsheetSource {
    pub fn new(path: impl AsRef<Path>) -> SpreadsheetSource {
        SpreadsheetSource {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl BillSource for SpreadsheetSource {
    fn read_bill(&self, config: &Config) -> Result<PayrollBill, SourceError> {
        let mut workbook: Xls<_> = open_workbook(&self.path)?;
        let range = workbook.worksheet_range_at(0).ok_or(SourceError::NoWorksheet)??;
        parse_sheet(&range, config)
    }
}
