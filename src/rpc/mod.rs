use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

pub mod odoo;

pub use odoo::OdooClient;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("authentication failed for user {0}")]
    AuthenticationFailed(String),
    #[error("remote call failed: {0}")]
    Transport(#[from] xmlrpc::Error),
    #[error("unexpected response to {method}: {detail}")]
    UnexpectedResponse { method: String, detail: String },
}

/// Vendor bill header record.
#[derive(Debug, Clone, PartialEq)]
pub struct BillHeader {
    pub partner_id: i32,
    pub journal_id: i32,
    pub date: NaiveDate,
    pub due_date: NaiveDate,
    pub reference: String,
}

/// Journal item record attached to a created bill.
#[derive(Debug, Clone, PartialEq)]
pub enum JournalItem {
    /// Shown on the invoice tab.
    Line {
        move_id: i32,
        account_id: i32,
        name: String,
        price_unit: Decimal,
    },
    /// Payable counterpart, hidden from the invoice tab.
    Balance { move_id: i32, account_id: i32, credit: Decimal },
}

/// The bookkeeping backend as seen by the bill poster.
pub trait Backend {
    /// Ledger account ids keyed by account code, active accounts only.
    fn account_ids(&self) -> Result<HashMap<String, i32>, RpcError>;

    fn create_bill(&self, header: &BillHeader) -> Result<i32, RpcError>;

    fn create_journal_items(&self, items: &[JournalItem]) -> Result<Vec<i32>, RpcError>;
}
