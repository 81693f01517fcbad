use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "/usr/local/etc/payroll-upload.yaml";
pub const DEFAULT_SERVER: &str = "odoo";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("server {0:?} is not defined in the config file")]
    UnknownEnvironment(String),
}

/// Connection parameters for one named environment.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ServerConfig {
    pub url: String,
    pub database: String,
    pub username: String,
    pub password: String,
    pub partner_id: i32,
    pub journal_id: i32,
    #[serde(default = "default_menu_id")]
    pub menu_id: i32,
    #[serde(default = "default_action")]
    pub action: i32,
}

fn default_menu_id() -> i32 {
    240
}

fn default_action() -> i32 {
    1237
}

impl ServerConfig {
    /// Web client link to a created vendor bill.
    pub fn bill_url(&self, bill_id: i32) -> String {
        format!(
            "{}/web#id={}&cids=1&menu_id={}&action={}&model=account.move&view_type=form",
            self.url.trim_end_matches('/'),
            bill_id,
            self.menu_id,
            self.action
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ExpenseAccounts {
    pub direct_labor: String,
    pub payroll: String,
    pub health: String,
    pub pension: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountsConfig {
    /// Earnings account per department.
    pub departments: HashMap<u32, String>,
    pub expenses: ExpenseAccounts,
    /// Accounts payable, receives the balancing credit.
    #[serde(default = "default_payable")]
    pub payable: String,
}

fn default_payable() -> String {
    "20100".to_string()
}

/// Spreadsheet date system. Files saved on old Macs count from 1904.
///
/// Applies to header dates stored as plain serial numbers. Cells with a date
/// format are converted by the workbook reader, which honors the workbook's
/// own flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "u16")]
pub enum DateSystem {
    #[default]
    V1900,
    V1904,
}

impl TryFrom<u16> for DateSystem {
    type Error = String;

    fn try_from(year: u16) -> Result<Self, Self::Error> {
        match year {
            1900 => Ok(DateSystem::V1900),
            1904 => Ok(DateSystem::V1904),
            other => Err(format!("unsupported date system {other}, expected 1900 or 1904")),
        }
    }
}

/// Zero-based `(row, column)` coordinates.
pub type CellLocation = (u32, u32);

#[derive(Debug, Clone, Deserialize)]
pub struct HeaderCells {
    pub paygroup: CellLocation,
    pub reference: CellLocation,
    pub total: CellLocation,
    pub due_date: CellLocation,
    pub end_date: CellLocation,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CellLocations {
    pub header: HeaderCells,
    #[serde(default = "default_reference_prefix")]
    pub reference_prefix: String,
    #[serde(default)]
    pub date_system: DateSystem,
}

fn default_reference_prefix() -> String {
    "NCTS-".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub accounts: AccountsConfig,
    #[serde(default)]
    pub direct_labor_departments: HashSet<u32>,
    #[serde(default)]
    pub department_descriptions: HashMap<u32, String>,
    #[serde(default)]
    pub xl_cell_locations: Option<CellLocations>,

    /// Every other top-level key is a named server environment.
    #[serde(flatten)]
    pub servers: HashMap<String, ServerConfig>,
}

impl Config {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn server(&self, name: &str) -> Result<&ServerConfig, ConfigError> {
        self.servers
            .get(name)
            .ok_or_else(|| ConfigError::UnknownEnvironment(name.to_string()))
    }

    pub fn department_description(&self, department: u32) -> Option<&str> {
        self.department_descriptions.get(&department).map(String::as_str)
    }
}
