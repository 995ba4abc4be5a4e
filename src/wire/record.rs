//! Load-side wire shapes.
//!
//! JSON shape (one element per parameter value, camelCase):
//! {
//!   "id": "b1",
//!   "parameterId": "p7",
//!   "parameterCode": "SALARIO_BASE",
//!   "dataTypeDescription": "Numérico",
//!   "listDefinition": null,
//!   "employeeId": "e1",
//!   "clientId": "c1",
//!   "textValue": null,
//!   "numericValue": 1000000,
//!   ...
//! }
//!
//! Ids may arrive as strings or numbers; both are kept as strings.

use crate::catalog;
use crate::value::LegacySlots;

use serde::de::{Deserializer, Error as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueRecord {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,

    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub parameter_id: Option<String>,

    #[serde(default)]
    pub parameter_code: String,

    #[serde(default)]
    pub parameter_description: Option<String>,

    #[serde(default)]
    pub data_type_id: Option<i64>,

    #[serde(default)]
    pub data_type_description: Option<String>,

    #[serde(default)]
    pub list_definition: Option<String>,

    #[serde(default)]
    pub inconsistency_level_id: Option<i64>,

    #[serde(default)]
    pub modify_permission: Option<String>,

    #[serde(default)]
    pub consult_permission: Option<String>,

    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub employee_id: Option<String>,

    #[serde(default)]
    pub employee_name: Option<String>,

    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub client_id: Option<String>,

    #[serde(default)]
    pub client_name: Option<String>,

    #[serde(default)]
    pub text_value: Option<String>,

    #[serde(default)]
    pub numeric_value: Option<f64>,

    #[serde(default)]
    pub date_value: Option<String>,

    #[serde(default)]
    pub email_value: Option<String>,

    #[serde(default)]
    pub hour_value: Option<String>,

    #[serde(default)]
    pub created_by: Option<String>,

    #[serde(default)]
    pub creation_date: Option<String>,

    #[serde(default)]
    pub risk_level_id: Option<i64>,

    #[serde(default)]
    pub risk_level_description: Option<String>,
}

impl ValueRecord {
    pub fn slots(&self) -> LegacySlots<'_> {
        LegacySlots {
            text: self.text_value.as_deref(),
            number: self.numeric_value,
            date: self.date_value.as_deref(),
            email: self.email_value.as_deref(),
            hour: self.hour_value.as_deref(),
        }
    }
}

/// Optional load filters. None of them is mandatory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueQuery {
    /// Case-insensitive substring of the parameter code.
    pub code: Option<String>,
    pub employee_id: Option<String>,
    pub client_id: Option<String>,
}

impl ValueQuery {
    pub fn is_empty(&self) -> bool {
        self.code().is_none() && self.employee().is_none() && self.client().is_none()
    }

    fn code(&self) -> Option<String> {
        self.code
            .as_deref()
            .map(|c| c.trim().to_lowercase())
            .filter(|c| !c.is_empty())
    }

    fn employee(&self) -> Option<&str> {
        self.employee_id.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    fn client(&self) -> Option<&str> {
        self.client_id.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// Query-string pairs for servers that honor the filters.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut out = Vec::new();
        if let Some(code) = self.code.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            out.push(("code", code.to_string()));
        }
        if let Some(e) = self.employee() {
            out.push(("employeeId", e.to_string()));
        }
        if let Some(c) = self.client() {
            out.push(("clientId", c.to_string()));
        }
        out
    }

    pub fn matches(&self, record: &ValueRecord) -> bool {
        if let Some(code) = self.code() {
            if !record.parameter_code.to_lowercase().contains(&code) {
                return false;
            }
        }
        if let Some(e) = self.employee() {
            if record.employee_id.as_deref() != Some(e) {
                return false;
            }
        }
        if let Some(c) = self.client() {
            if record.client_id.as_deref() != Some(c) {
                return false;
            }
        }
        true
    }

    /// Re-apply the filters locally; servers may ignore them.
    pub fn apply(&self, records: Vec<ValueRecord>) -> Vec<ValueRecord> {
        if self.is_empty() {
            return records;
        }
        records.into_iter().filter(|r| self.matches(r)).collect()
    }
}

/// Decode a load response: an array of records, or a single record.
///
/// Records are decoded one by one; a malformed record is logged and skipped.
/// Only a body that is neither an array nor an object is an error.
pub fn decode_records(body: Value) -> serde_json::Result<Vec<ValueRecord>> {
    let items = match body {
        Value::Null => return Ok(Vec::new()),
        Value::Array(items) => items,
        Value::Object(_) => vec![body],
        other => {
            return Err(serde_json::Error::custom(format!(
                "expected an array of value records, got {other}"
            )));
        }
    };

    let records = items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let id = item.get("id").cloned();
            match serde_json::from_value::<ValueRecord>(item) {
                Ok(record) => Some(record),
                Err(error) => {
                    warn!(index, id = ?id, %error, "skipping malformed value record");
                    None
                }
            }
        })
        .collect();
    Ok(records)
}

// Same normalization as catalog ids, so `7`, `7.0` and `"7"` all read "7".
fn id_text(v: Value) -> Option<String> {
    match v {
        Value::String(_) | Value::Number(_) => catalog::scalar_text(&v).filter(|s| !s.is_empty()),
        _ => None,
    }
}

fn deserialize_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    // Values are keyed by id through the whole session; an empty id is unusable.
    id_text(Value::deserialize(deserializer)?)
        .ok_or_else(|| serde::de::Error::custom("value id must be a non-empty string or number"))
}

fn deserialize_opt_id<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(id_text(Value::deserialize(deserializer)?))
}
