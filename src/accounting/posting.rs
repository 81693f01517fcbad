use std::collections::HashMap;

use log::{debug, info};
use rust_decimal::Decimal;

use super::bill::PayrollBill;
use super::classifier::AccountPlan;
use super::PayrollError;
use crate::config::ServerConfig;
use crate::rpc::{Backend, BillHeader, JournalItem};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Debit,
    Credit,
}

/// A journal item before it is tied to a created bill.
#[derive(Debug, Clone, PartialEq)]
pub struct JournalEntry {
    pub account_code: String,
    pub label: Option<String>,
    pub amount: Decimal,
    pub side: Side,
}

impl JournalEntry {
    pub fn debit(account_code: &str, label: String, amount: Decimal) -> JournalEntry {
        JournalEntry {
            account_code: account_code.to_string(),
            label: Some(label),
            amount,
            side: Side::Debit,
        }
    }

    pub fn credit(account_code: &str, amount: Decimal) -> JournalEntry {
        JournalEntry {
            account_code: account_code.to_string(),
            label: None,
            amount,
            side: Side::Credit,
        }
    }

    fn into_item(self, move_id: i32, account_id: i32) -> JournalItem {
        match self.side {
            Side::Debit => JournalItem::Line {
                move_id,
                account_id,
                name: self.label.unwrap_or_default(),
                price_unit: self.amount,
            },
            Side::Credit => JournalItem::Balance {
                move_id,
                account_id,
                credit: self.amount,
            },
        }
    }
}

pub fn ensure_balanced(bill: &PayrollBill) -> Result<(), PayrollError> {
    match bill.declared_total() {
        Some(declared) if !bill.is_balanced() => Err(PayrollError::Unbalanced {
            declared,
            computed: bill.invoice_total(),
        }),
        _ => Ok(()),
    }
}

/// Every line expanded into entries, closed by the payable credit for the
/// invoice total.
pub fn journal_entries(bill: &PayrollBill, plan: &AccountPlan) -> Result<Vec<JournalEntry>, PayrollError> {
    let mut entries = Vec::new();
    for line in bill.lines() {
        entries.extend(plan.expand_line(line)?);
    }
    entries.push(JournalEntry::credit(plan.payable_account(), bill.invoice_total()));

    Ok(entries)
}

pub struct BillPoster<'a, B: Backend> {
    backend: &'a B,
    plan: AccountPlan<'a>,
    partner_id: i32,
    journal_id: i32,
}

impl<'a, B: Backend> BillPoster<'a, B> {
    pub fn new(backend: &'a B, plan: AccountPlan<'a>, server: &ServerConfig) -> BillPoster<'a, B> {
        BillPoster {
            backend,
            plan,
            partner_id: server.partner_id,
            journal_id: server.journal_id,
        }
    }

    /// Creates the vendor bill and its journal items, returning the bill id.
    /// Nothing is sent unless the bill balances and every account resolves.
    pub fn post(&self, bill: &mut PayrollBill) -> Result<i32, PayrollError> {
        ensure_balanced(bill)?;
        let entries = journal_entries(bill, &self.plan)?;

        let account_ids = self.backend.account_ids()?;
        let resolved = entries
            .into_iter()
            .map(|entry| {
                let account_id = lookup_account(&account_ids, &entry.account_code)?;
                Ok((entry, account_id))
            })
            .collect::<Result<Vec<_>, PayrollError>>()?;

        let header = BillHeader {
            partner_id: self.partner_id,
            journal_id: self.journal_id,
            date: bill.date(),
            due_date: bill.due_date(),
            reference: bill.reference().clone(),
        };
        let bill_id = self.backend.create_bill(&header)?;
        bill.assign_id(bill_id);
        info!("created vendor bill {} for {}", bill_id, bill.reference());

        let items: Vec<JournalItem> = resolved
            .into_iter()
            .map(|(entry, account_id)| entry.into_item(bill_id, account_id))
            .collect();
        let item_ids = self.backend.create_journal_items(&items)?;
        debug!("created {} journal items on bill {}", item_ids.len(), bill_id);

        Ok(bill_id)
    }
}

fn lookup_account(account_ids: &HashMap<String, i32>, code: &str) -> Result<i32, PayrollError> {
    account_ids
        .get(code)
        .copied()
        .ok_or_else(|| PayrollError::UnknownAccountCode(code.to_string()))
}
