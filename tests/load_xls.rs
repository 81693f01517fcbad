use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;

use payroll_upload::accounting::bill::SourceKind;
use payroll_upload::accounting::classifier::AccountPlan;
use payroll_upload::accounting::posting::journal_entries;
use payroll_upload::config::Config;
use payroll_upload::data::{BillSource, PayrollSource, SourceError};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

#[test]
fn test_load_register() -> Result<()> {
    let config = Config::from_yaml_file(fixture("config.yaml"))?;
    let source = PayrollSource::open(fixture("register.xls"))?;
    assert!(matches!(source, PayrollSource::SpreadsheetSource(_)));

    let bill = source.read_bill(&config)?;

    assert_eq!(bill.source_kind(), SourceKind::Spreadsheet);
    assert_eq!(bill.reference(), "6RZ20231301");
    assert_eq!(bill.date(), NaiveDate::from_ymd_opt(2023, 3, 24).unwrap());
    assert_eq!(bill.due_date(), NaiveDate::from_ymd_opt(2023, 3, 30).unwrap());
    assert_eq!(bill.declared_total(), Some(dec!(9173.11)));
    assert_eq!(bill.lines().len(), 4);
    assert_eq!(bill.invoice_total(), dec!(9173.11));
    assert!(bill.is_balanced());

    let office = &bill.lines()[0];
    assert_eq!(office.department(), 10);
    assert_eq!(office.description(), "Office");
    assert_eq!(office.fees(), dec!(210.50));
    assert_eq!(office.deductions(), dec!(-105.25));

    let client_fee = &bill.lines()[3];
    assert_eq!(client_fee.department(), 0);
    assert!(client_fee.fee_only());

    let entries = journal_entries(&bill, &AccountPlan::new(&config))?;
    let labels: Vec<_> = entries.iter().filter_map(|entry| entry.label.as_deref()).collect();
    assert_eq!(labels[0], "10 Office Earnings");
    assert_eq!(labels.last(), Some(&"0 Payroll Fees"));

    Ok(())
}

#[test]
fn test_load_truncated_register() -> Result<()> {
    let config = Config::from_yaml_file(fixture("config.yaml"))?;
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("broken.xls");
    let mut bytes = std::fs::read(fixture("register.xls"))?;
    bytes.truncate(600);
    std::fs::write(&path, bytes)?;

    let result = PayrollSource::open(&path)?.read_bill(&config);

    assert!(matches!(result, Err(SourceError::Spreadsheet(_))));

    Ok(())
}
