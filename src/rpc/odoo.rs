use std::collections::{BTreeMap, HashMap};

use log::debug;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use xmlrpc::{Request, Value};

use super::{Backend, BillHeader, JournalItem, RpcError};
use crate::config::ServerConfig;

const ACCOUNT_MODEL: &str = "account.account";
const MOVE_MODEL: &str = "account.move";
const MOVE_LINE_MODEL: &str = "account.move.line";

/// Authenticated XML-RPC session against an Odoo server.
pub struct OdooClient {
    object_url: String,
    database: String,
    uid: i32,
    password: String,
}

impl OdooClient {
    pub fn connect(server: &ServerConfig) -> Result<OdooClient, RpcError> {
        let base_url = server.url.trim_end_matches('/');
        let common_url = format!("{}/xmlrpc/2/common", base_url);

        debug!("authenticating {} against {}", server.username, common_url);
        let response = Request::new("authenticate")
            .arg(server.database.as_str())
            .arg(server.username.as_str())
            .arg(server.password.as_str())
            .arg(Value::Struct(BTreeMap::new()))
            .call_url(common_url.as_str())?;

        let uid = match response {
            Value::Int(uid) => uid,
            Value::Bool(false) => return Err(RpcError::AuthenticationFailed(server.username.clone())),
            other => return Err(unexpected("authenticate", &other)),
        };

        Ok(OdooClient {
            object_url: format!("{}/xmlrpc/2/object", base_url),
            database: server.database.clone(),
            uid,
            password: server.password.clone(),
        })
    }

    fn execute_kw(
        &self,
        model: &str,
        method: &str,
        args: Vec<Value>,
        kwargs: BTreeMap<String, Value>,
    ) -> Result<Value, RpcError> {
        debug!("execute_kw {}.{}", model, method);
        let response = Request::new("execute_kw")
            .arg(self.database.as_str())
            .arg(self.uid)
            .arg(self.password.as_str())
            .arg(model)
            .arg(method)
            .arg(Value::Array(args))
            .arg(Value::Struct(kwargs))
            .call_url(self.object_url.as_str())?;

        Ok(response)
    }
}

impl Backend for OdooClient {
    fn account_ids(&self) -> Result<HashMap<String, i32>, RpcError> {
        let domain = Value::Array(vec![Value::Array(vec![
            Value::from("deprecated"),
            Value::from("="),
            Value::Bool(false),
        ])]);
        let mut kwargs = BTreeMap::new();
        kwargs.insert(
            "fields".to_string(),
            Value::Array(vec![Value::from("code"), Value::from("id")]),
        );

        let response = self.execute_kw(ACCOUNT_MODEL, "search_read", vec![domain], kwargs)?;
        parse_account_ids(&response)
    }

    fn create_bill(&self, header: &BillHeader) -> Result<i32, RpcError> {
        let response = self.execute_kw(MOVE_MODEL, "create", vec![header_value(header)], BTreeMap::new())?;
        match response {
            Value::Int(id) => Ok(id),
            other => Err(unexpected("account.move create", &other)),
        }
    }

    fn create_journal_items(&self, items: &[JournalItem]) -> Result<Vec<i32>, RpcError> {
        let values = items.iter().map(item_value).collect();
        let response = self.execute_kw(MOVE_LINE_MODEL, "create", vec![Value::Array(values)], BTreeMap::new())?;
        match response {
            Value::Array(ids) => ids
                .iter()
                .map(|id| id.as_i32().ok_or_else(|| unexpected("account.move.line create", id)))
                .collect(),
            Value::Int(id) => Ok(vec![id]),
            other => Err(unexpected("account.move.line create", &other)),
        }
    }
}

fn unexpected(method: &str, value: &Value) -> RpcError {
    RpcError::UnexpectedResponse {
        method: method.to_string(),
        detail: format!("{:?}", value),
    }
}

fn money(amount: Decimal) -> Value {
    Value::Double(amount.to_f64().unwrap_or_default())
}

pub(crate) fn header_value(header: &BillHeader) -> Value {
    let date = header.date.format("%Y-%m-%d").to_string();
    let mut vals = BTreeMap::new();
    vals.insert("move_type".to_string(), Value::from("in_invoice"));
    vals.insert("partner_id".to_string(), Value::Int(header.partner_id));
    vals.insert("date".to_string(), Value::String(date.clone()));
    vals.insert("invoice_date".to_string(), Value::String(date));
    vals.insert(
        "invoice_date_due".to_string(),
        Value::String(header.due_date.format("%Y-%m-%d").to_string()),
    );
    vals.insert("ref".to_string(), Value::String(header.reference.clone()));
    vals.insert("journal_id".to_string(), Value::Int(header.journal_id));
    Value::Struct(vals)
}

pub(crate) fn item_value(item: &JournalItem) -> Value {
    let mut vals = BTreeMap::new();
    match item {
        JournalItem::Line {
            move_id,
            account_id,
            name,
            price_unit,
        } => {
            vals.insert("move_id".to_string(), Value::Int(*move_id));
            vals.insert("account_id".to_string(), Value::Int(*account_id));
            vals.insert("name".to_string(), Value::String(name.clone()));
            vals.insert("quantity".to_string(), Value::Int(1));
            vals.insert("price_unit".to_string(), money(*price_unit));
            vals.insert("exclude_from_invoice_tab".to_string(), Value::Bool(false));
        },
        JournalItem::Balance {
            move_id,
            account_id,
            credit,
        } => {
            vals.insert("move_id".to_string(), Value::Int(*move_id));
            vals.insert("account_id".to_string(), Value::Int(*account_id));
            vals.insert("credit".to_string(), money(*credit));
            vals.insert("exclude_from_invoice_tab".to_string(), Value::Bool(true));
        },
    }
    Value::Struct(vals)
}

pub(crate) fn parse_account_ids(response: &Value) -> Result<HashMap<String, i32>, RpcError> {
    let records = response
        .as_array()
        .ok_or_else(|| unexpected("account.account search_read", response))?;

    let mut ids = HashMap::with_capacity(records.len());
    for record in records {
        let fields = record
            .as_struct()
            .ok_or_else(|| unexpected("account.account search_read", record))?;
        let code = fields.get("code").and_then(Value::as_str);
        let id = fields.get("id").and_then(Value::as_i32);
        match (code, id) {
            (Some(code), Some(id)) => {
                ids.insert(code.to_string(), id);
            },
            _ => return Err(unexpected("account.account search_read", record)),
        }
    }

    Ok(ids)
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    fn field<'a>(value: &'a Value, name: &str) -> &'a Value {
        value.as_struct().and_then(|fields| fields.get(name)).unwrap()
    }

    #[test]
    fn test_header_value() -> Result<()> {
        let header = BillHeader {
            partner_id: 42,
            journal_id: 2,
            date: NaiveDate::from_ymd_opt(2022, 5, 13).unwrap(),
            due_date: NaiveDate::from_ymd_opt(2022, 5, 18).unwrap(),
            reference: "1QR-2022-W20-1".to_string(),
        };

        let value = header_value(&header);
        assert_eq!(field(&value, "move_type"), &Value::from("in_invoice"));
        assert_eq!(field(&value, "partner_id"), &Value::Int(42));
        assert_eq!(field(&value, "journal_id"), &Value::Int(2));
        assert_eq!(field(&value, "date"), &Value::from("2022-05-13"));
        assert_eq!(field(&value, "invoice_date"), &Value::from("2022-05-13"));
        assert_eq!(field(&value, "invoice_date_due"), &Value::from("2022-05-18"));
        assert_eq!(field(&value, "ref"), &Value::from("1QR-2022-W20-1"));

        Ok(())
    }

    #[test]
    fn test_item_values() -> Result<()> {
        let line = item_value(&JournalItem::Line {
            move_id: 7,
            account_id: 31,
            name: "10 Office Earnings".to_string(),
            price_unit: dec!(2386.93),
        });
        assert_eq!(field(&line, "move_id"), &Value::Int(7));
        assert_eq!(field(&line, "account_id"), &Value::Int(31));
        assert_eq!(field(&line, "quantity"), &Value::Int(1));
        assert_eq!(field(&line, "price_unit"), &Value::Double(2386.93));
        assert_eq!(field(&line, "exclude_from_invoice_tab"), &Value::Bool(false));

        let balance = item_value(&JournalItem::Balance {
            move_id: 7,
            account_id: 5,
            credit: dec!(28356.58),
        });
        assert_eq!(field(&balance, "credit"), &Value::Double(28356.58));
        assert_eq!(field(&balance, "exclude_from_invoice_tab"), &Value::Bool(true));
        assert!(balance.as_struct().unwrap().get("name").is_none());

        Ok(())
    }

    #[test]
    fn test_parse_account_ids() -> Result<()> {
        let record = |code: &str, id: i32| {
            let mut fields = BTreeMap::new();
            fields.insert("code".to_string(), Value::from(code));
            fields.insert("id".to_string(), Value::Int(id));
            Value::Struct(fields)
        };
        let response = Value::Array(vec![record("70200", 31), record("20100", 5)]);

        let ids = parse_account_ids(&response)?;
        assert_eq!(ids.len(), 2);
        assert_eq!(ids.get("20100"), Some(&5));

        assert!(parse_account_ids(&Value::Int(3)).is_err());

        Ok(())
    }
}
