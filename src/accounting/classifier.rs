use std::collections::HashSet;
use std::fmt;

use super::line::{title_case, PayrollLine};
use super::posting::JournalEntry;
use super::{Category, PayrollError};
use crate::config::{AccountsConfig, Config};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedAccount<'a> {
    Code(&'a str),
    /// Earnings on a fee-only line.
    NotApplicable,
}

impl<'a> ResolvedAccount<'a> {
    pub fn code(&self) -> Option<&'a str> {
        match self {
            ResolvedAccount::Code(code) => Some(code),
            ResolvedAccount::NotApplicable => None,
        }
    }
}

impl fmt::Display for ResolvedAccount<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedAccount::Code(code) => f.write_str(code),
            ResolvedAccount::NotApplicable => f.write_str("not applicable"),
        }
    }
}

/// Department based chart of accounts for payroll lines.
#[derive(Debug, Clone, Copy)]
pub struct AccountPlan<'a> {
    accounts: &'a AccountsConfig,
    direct_labor_departments: &'a HashSet<u32>,
}

impl<'a> AccountPlan<'a> {
    pub fn new(config: &'a Config) -> AccountPlan<'a> {
        AccountPlan {
            accounts: &config.accounts,
            direct_labor_departments: &config.direct_labor_departments,
        }
    }

    pub fn payable_account(&self) -> &'a str {
        &self.accounts.payable
    }

    pub fn resolve_account(&self, line: &PayrollLine, category: Category) -> Result<ResolvedAccount<'a>, PayrollError> {
        let code = match category {
            Category::Earnings => {
                if line.fee_only() {
                    return Ok(ResolvedAccount::NotApplicable);
                }
                self.accounts
                    .departments
                    .get(&line.department())
                    .ok_or(PayrollError::UnknownDepartment(line.department()))?
            },
            Category::Fees => {
                if self.direct_labor_departments.contains(&line.department()) {
                    &self.accounts.expenses.direct_labor
                } else {
                    &self.accounts.expenses.payroll
                }
            },
            Category::Deductions => &self.accounts.expenses.health,
            Category::Retirement => &self.accounts.expenses.pension,
        };

        Ok(ResolvedAccount::Code(code))
    }

    /// Journal entries for one payroll line, in earnings, fees, deductions,
    /// retirement order. Fees are always booked; the other categories only on
    /// full lines with a non-zero amount. Every full line needs a mapped
    /// department, even when its earnings are zero.
    pub fn expand_line(&self, line: &PayrollLine) -> Result<Vec<JournalEntry>, PayrollError> {
        let description = title_case(line.description());
        let mut entries = Vec::with_capacity(Category::ALL.len());

        for category in Category::ALL {
            let Some(code) = self.resolve_account(line, category)?.code() else {
                continue;
            };

            let amount = category.amount(line);
            let booked = match category {
                Category::Fees => true,
                _ => !line.fee_only() && !amount.is_zero(),
            };
            if !booked {
                continue;
            }

            let label = if description.is_empty() {
                format!("{} {}", line.department(), category.label_suffix())
            } else {
                format!("{} {} {}", line.department(), description, category.label_suffix())
            };
            entries.push(JournalEntry::debit(code, label, amount));
        }

        Ok(entries)
    }
}
