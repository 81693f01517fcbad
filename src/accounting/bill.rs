use chrono::NaiveDate;
use getset::{CopyGetters, Getters};
use rust_decimal::Decimal;

use super::line::{PayrollLine, PRECISION};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Delimited,
    Spreadsheet,
}

#[derive(Debug, Clone, Getters, CopyGetters)]
pub struct PayrollBill {
    /// Assigned by the bookkeeping backend once the bill is created.
    #[getset(get_copy = "pub")]
    id: Option<i32>,
    #[getset(get_copy = "pub")]
    date: NaiveDate,
    #[getset(get_copy = "pub")]
    due_date: NaiveDate,
    #[getset(get = "pub")]
    reference: String,
    #[getset(get = "pub")]
    lines: Vec<PayrollLine>,
    #[getset(get_copy = "pub")]
    source_kind: SourceKind,
    /// Only spreadsheet exports carry a grand total.
    #[getset(get_copy = "pub")]
    declared_total: Option<Decimal>,
}

impl PayrollBill {
    pub fn new(
        source_kind: SourceKind,
        date: NaiveDate,
        due_date: NaiveDate,
        reference: impl Into<String>,
        declared_total: Option<Decimal>,
    ) -> PayrollBill {
        PayrollBill {
            id: None,
            date,
            due_date,
            reference: reference.into(),
            lines: Vec::new(),
            source_kind,
            declared_total,
        }
    }

    pub fn push_line(&mut self, line: PayrollLine) {
        self.lines.push(line);
    }

    pub fn invoice_total(&self) -> Decimal {
        self.lines.iter().map(PayrollLine::total).sum::<Decimal>().round_dp(PRECISION)
    }

    pub fn is_balanced(&self) -> bool {
        self.declared_total.map_or(true, |declared| declared == self.invoice_total())
    }

    pub(crate) fn assign_id(&mut self, id: i32) {
        self.id = Some(id);
    }
}
