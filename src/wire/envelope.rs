//! Save-side wire shape.
//!
//! The receiving store accepts one fixed record per value, whatever its kind.
//! All four value slots are always present:
//!
//! {
//!   "id": "b1", "parameterId": "p7", "employeeId": "e1", "clientId": null,
//!   "textValue": "", "numericValue": 1000000.0,
//!   "dateValue": "2025-03-01T12:00:00.000Z", "hourValue": ""
//! }

use crate::store::Entry;
use crate::value::RawValue;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRecord {
    pub id: String,
    pub parameter_id: String,
    pub employee_id: Option<String>,
    pub client_id: Option<String>,
    pub text_value: String,
    pub numeric_value: f64,
    pub date_value: String,
    pub hour_value: String,
}

/// Map one entry into the envelope. `now` fills the date slot when the value
/// has no date of its own.
pub fn to_envelope(entry: &Entry, now: DateTime<Utc>) -> SaveRecord {
    let mut record = SaveRecord {
        id: entry.id.clone(),
        parameter_id: entry.parameter.id.clone(),
        employee_id: entry.scope.employee_id.clone(),
        client_id: entry.scope.client_id.clone(),
        text_value: String::new(),
        numeric_value: 0.0,
        date_value: iso(now),
        hour_value: String::new(),
    };

    match &entry.value {
        RawValue::Text(s) | RawValue::Email(s) => record.text_value = s.clone(),
        RawValue::Number(n) => record.numeric_value = n.unwrap_or(0.0),
        RawValue::Date(d) => {
            if let Some(d) = d {
                record.date_value = iso(*d);
            }
        }
        RawValue::Time(t) => {
            if let Some(t) = t {
                record.hour_value = t.format("%H:%M").to_string();
            }
        }
        RawValue::List(_) => {
            if let Some(option) = entry.selected_option() {
                record.text_value = option.label.clone();
                if let Some(n) = option.numeric_id() {
                    record.numeric_value = n;
                }
            }
        }
    }
    record
}

/// The whole payload, one record per value id, in id order.
pub fn to_payload<'a>(
    entries: impl IntoIterator<Item = &'a Entry>,
    now: DateTime<Utc>,
) -> Vec<SaveRecord> {
    entries.into_iter().map(|e| to_envelope(e, now)).collect()
}

fn iso(d: DateTime<Utc>) -> String {
    d.to_rfc3339_opts(SecondsFormat::Millis, true)
}
