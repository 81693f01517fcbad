use rust_decimal::Decimal;
use thiserror::Error;

use crate::rpc::RpcError;

pub mod bill;
pub mod classifier;
pub mod line;
pub mod posting;


use line::PayrollLine;

#[derive(Debug, Error)]
pub enum PayrollError {
    #[error("the department {0} does not exist in the config file")]
    UnknownDepartment(u32),
    #[error("payroll lines do not match total (file total {declared}, lines add up to {computed})")]
    Unbalanced { declared: Decimal, computed: Decimal },
    #[error("account code {0} does not exist in the ledger")]
    UnknownAccountCode(String),
    #[error(transparent)]
    Backend(#[from] RpcError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Earnings,
    Fees,
    Deductions,
    Retirement,
}

impl Category {
    pub const ALL: [Category; 4] = [Category::Earnings, Category::Fees, Category::Deductions, Category::Retirement];

    pub fn amount(&self, line: &PayrollLine) -> Decimal {
        match self {
            Category::Earnings => line.earnings(),
            Category::Fees => line.fees(),
            Category::Deductions => line.deductions(),
            Category::Retirement => line.retirement(),
        }
    }

    /// Trailing words of a journal item label.
    pub fn label_suffix(&self) -> &'static str {
        match self {
            Category::Earnings => "Earnings",
            Category::Fees => "Payroll Fees",
            Category::Deductions => "Health Deductions",
            Category::Retirement => "401k Retirement",
        }
    }
}
