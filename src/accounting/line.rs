use std::str::FromStr;

use getset::{CopyGetters, Getters};
use log::warn;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

use crate::config::Config;

/// Decimal places kept on every amount.
pub(crate) const PRECISION: u32 = 2;

/// A cell as it comes out of an export, before any coercion.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RawValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
}

impl RawValue {
    pub fn is_blank(&self) -> bool {
        match self {
            RawValue::Empty => true,
            RawValue::Text(text) => text.trim().is_empty(),
            RawValue::Number(_) => false,
        }
    }
}

impl From<String> for RawValue {
    fn from(text: String) -> Self {
        RawValue::Text(text)
    }
}

impl From<&str> for RawValue {
    fn from(text: &str) -> Self {
        RawValue::Text(text.to_string())
    }
}

/// Rounds to cents. Anything that does not read as a number is zero.
pub fn coerce_amount(value: &RawValue) -> Decimal {
    let amount = match value {
        RawValue::Empty => None,
        RawValue::Text(text) => {
            let text = text.trim();
            Decimal::from_str(text)
                .or_else(|_| Decimal::from_scientific(text))
                .ok()
        },
        RawValue::Number(number) if number.is_finite() => Decimal::from_f64(*number),
        RawValue::Number(_) => None,
    };

    amount.map_or(Decimal::ZERO, |amount| amount.round_dp(PRECISION))
}

pub fn coerce_department(value: &RawValue) -> u32 {
    match value {
        RawValue::Text(text) => text.trim().parse().unwrap_or(0),
        RawValue::Number(number) if number.is_finite() && *number >= 0.0 && *number <= u32::MAX as f64 => {
            number.trunc() as u32
        },
        _ => 0,
    }
}

/// One row of a payroll export, field by field.
#[derive(Debug, Clone, Default)]
pub struct RawLine {
    pub description: String,
    pub department: RawValue,
    pub total: RawValue,
    pub earnings: RawValue,
    pub fees: RawValue,
    pub deductions: RawValue,
    pub retirement: RawValue,
}

#[derive(Debug, Clone, PartialEq, Getters, CopyGetters)]
pub struct PayrollLine {
    #[getset(get_copy = "pub")]
    department: u32,
    #[getset(get = "pub")]
    description: String,
    #[getset(get_copy = "pub")]
    earnings: Decimal,
    #[getset(get_copy = "pub")]
    fees: Decimal,
    #[getset(get_copy = "pub")]
    deductions: Decimal,
    #[getset(get_copy = "pub")]
    retirement: Decimal,
    #[getset(get_copy = "pub")]
    total: Decimal,
    #[getset(get_copy = "pub")]
    fee_only: bool,
}

impl PayrollLine {
    pub fn from_raw(raw: RawLine) -> PayrollLine {
        let total = coerce_amount(&raw.total);
        let mut fees = coerce_amount(&raw.fees);

        // Client level charges such as sales tax only show up in the total.
        // Book them as fees so they are not dropped.
        let fee_only = fees.is_zero() && !raw.total.is_blank();
        if fee_only {
            fees = total;
        }

        let line = PayrollLine {
            department: coerce_department(&raw.department),
            description: raw.description.trim().to_string(),
            earnings: coerce_amount(&raw.earnings),
            fees,
            deductions: coerce_amount(&raw.deductions),
            retirement: coerce_amount(&raw.retirement),
            total,
            fee_only,
        };

        if line.category_sum() != line.total {
            warn!(
                "department {} line total {} does not match its categories ({})",
                line.department,
                line.total,
                line.category_sum()
            );
        }

        line
    }

    /// Fills a blank description from the configured department names.
    pub fn with_config_description(mut self, config: &Config) -> PayrollLine {
        if self.description.is_empty() && self.department != 0 {
            match config.department_description(self.department) {
                Some(description) => self.description = description.to_string(),
                None => warn!("department {} has no description in the config file", self.department),
            }
        }

        self
    }

    pub fn category_sum(&self) -> Decimal {
        (self.earnings + self.fees + self.deductions + self.retirement).round_dp(PRECISION)
    }
}

/// Word-initial letters upper case, the rest lower case. A word starts after
/// any character that is not a letter, so `401k` becomes `401K`.
pub fn title_case(text: &str) -> String {
    let mut titled = String::with_capacity(text.len());
    let mut previous_is_letter = false;

    for c in text.chars() {
        if previous_is_letter {
            titled.extend(c.to_lowercase());
        } else {
            titled.extend(c.to_uppercase());
        }
        previous_is_letter = c.is_alphabetic();
    }

    titled
}
