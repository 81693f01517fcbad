use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use payroll_upload::accounting::bill::SourceKind;
use payroll_upload::accounting::classifier::AccountPlan;
use payroll_upload::accounting::posting::{ensure_balanced, journal_entries, BillPoster};
use payroll_upload::config::{Config, DEFAULT_CONFIG_PATH, DEFAULT_SERVER};
use payroll_upload::data::{self, BillSource, PayrollSource};
use payroll_upload::rpc::OdooClient;

/// Import payroll bill exports into Odoo as vendor bills
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// Payroll bill export, CSV or legacy Excel
    input: PathBuf,

    /// Config file to use
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Server block of the config file to post to
    #[arg(short, long, default_value = DEFAULT_SERVER)]
    server: String,

    /// Print the journal entries as CSV instead of posting them
    #[arg(long)]
    dry_run: bool,

    /// Rename an uploaded Excel file after its reference and date
    #[arg(long)]
    rename: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = Config::from_yaml_file(&args.config)
        .with_context(|| format!("failed to load config {}", args.config.display()))?;

    let source = PayrollSource::open(&args.input)?;
    let mut bill = source.read_bill(&config)?;
    ensure_balanced(&bill)?;

    let plan = AccountPlan::new(&config);
    if args.dry_run {
        let entries = journal_entries(&bill, &plan)?;
        data::export_entries(&entries, std::io::stdout())?;
        return Ok(());
    }

    let server = config.server(&args.server)?;
    let client = OdooClient::connect(server)?;
    let bill_id = BillPoster::new(&client, plan, server).post(&mut bill)?;
    println!("\n{}\n", server.bill_url(bill_id));

    if args.rename && bill.source_kind() == SourceKind::Spreadsheet {
        let renamed = data::rename_processed(&args.input, &bill)?;
        info!("renamed {} to {}", args.input.display(), renamed.display());
    }

    Ok(())
}
