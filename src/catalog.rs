//! List option catalog decoding.
//!
//! A list parameter carries its options as a JSON string:
//!
//! [
//!   { "Id": "1", "Valor": "Clase I" },
//!   { "id": 2,   "valor": "Clase II" }
//! ]
//!
//! Key names are matched case-insensitively and `Id` may be a string or a
//! number. Broken catalogs decode to no options: the rest of the engine keeps
//! working and the parameter simply offers nothing to select.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListOption {
    pub id: String,
    pub label: String,
}

impl ListOption {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }

    /// The id as a number, when it is one ("7" -> 7.0, "A7" -> None).
    pub fn numeric_id(&self) -> Option<f64> {
        self.id.trim().parse::<f64>().ok().filter(|n| n.is_finite())
    }
}

const ID_KEYS: &[&str] = &["id"];
const LABEL_KEYS: &[&str] = &["valor", "label", "value"];

/// Decode a catalog string into its options, preserving order.
pub fn decode_options(list_definition: Option<&str>) -> Vec<ListOption> {
    let Some(raw) = list_definition.map(str::trim).filter(|s| !s.is_empty()) else {
        return Vec::new();
    };

    let items = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(items)) => items,
        Ok(other) => {
            warn!(kind = json_kind(&other), "list definition is not a JSON array; no options");
            return Vec::new();
        }
        Err(e) => {
            warn!(error = %e, "malformed list definition; no options");
            return Vec::new();
        }
    };

    items
        .iter()
        .filter_map(|item| match item {
            Value::Object(obj) => decode_option(obj),
            _ => None,
        })
        .collect()
}

fn decode_option(obj: &Map<String, Value>) -> Option<ListOption> {
    let id = field(obj, ID_KEYS).and_then(scalar_text)?;
    if id.is_empty() {
        return None;
    }
    let label = field(obj, LABEL_KEYS)
        .and_then(scalar_text)
        .unwrap_or_else(|| id.clone());
    Some(ListOption { id, label })
}

fn field<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|want| {
        obj.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(want))
            .map(|(_, v)| v)
    })
}

pub(crate) fn scalar_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(match n.as_i64() {
            Some(i) => i.to_string(),
            None => match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
                _ => n.to_string(),
            },
        }),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

pub fn find_by_id<'a>(options: &'a [ListOption], id: &str) -> Option<&'a ListOption> {
    let id = id.trim();
    options.iter().find(|o| o.id == id)
}

pub fn find_by_label<'a>(options: &'a [ListOption], label: &str) -> Option<&'a ListOption> {
    let label = label.trim();
    options
        .iter()
        .find(|o| o.label.trim().to_lowercase() == label.to_lowercase())
}
