//! Initial-value extraction for loaded records.
//!
//! Stored records predate the kind model and may populate several legacy
//! slots at once (an email kept in the text slot, an hour kept as text, a
//! list label where the id should be). The owning parameter's kind alone
//! decides which slot is read; the others are fallbacks, never a signal.

use crate::catalog::{self, ListOption};
use crate::value::validate;
use crate::value::{RawValue, ValueKind};

/// The value slots of a stored record, as loaded.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacySlots<'a> {
    pub text: Option<&'a str>,
    pub number: Option<f64>,
    pub date: Option<&'a str>,
    pub email: Option<&'a str>,
    pub hour: Option<&'a str>,
}

/// A recoverable problem found while extracting a value.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractIssue {
    /// The stored list id is not in the current catalog.
    /// `recovered` is the id matched by label, if any.
    StaleSelection {
        stored: String,
        recovered: Option<String>,
    },
    /// A date or hour slot held text that does not parse; the value is unset.
    Unparseable { slot: &'static str, raw: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    pub value: RawValue,
    pub issue: Option<ExtractIssue>,
}

impl Extracted {
    fn clean(value: RawValue) -> Self {
        Self { value, issue: None }
    }
}

/// Pick the initial value of a record for `kind`.
pub fn extract_initial(
    kind: ValueKind,
    slots: &LegacySlots<'_>,
    options: &[ListOption],
) -> Extracted {
    match kind {
        ValueKind::Text => {
            let text = slots.text.or(slots.email).unwrap_or_default();
            Extracted::clean(RawValue::Text(text.to_string()))
        }
        ValueKind::Email => {
            let email = non_blank(slots.email)
                .or_else(|| non_blank(slots.text))
                .unwrap_or_default();
            Extracted::clean(RawValue::Email(email.trim().to_string()))
        }
        ValueKind::Number => {
            Extracted::clean(RawValue::Number(slots.number.filter(|n| n.is_finite())))
        }
        ValueKind::Date => match non_blank(slots.date) {
            None => Extracted::clean(RawValue::Date(None)),
            Some(raw) => match validate::parse_date(raw) {
                Ok(d) => Extracted::clean(RawValue::Date(d)),
                Err(_) => Extracted {
                    value: RawValue::Date(None),
                    issue: Some(ExtractIssue::Unparseable {
                        slot: "dateValue",
                        raw: raw.to_string(),
                    }),
                },
            },
        },
        ValueKind::Time => {
            let (slot, raw) = match non_blank(slots.hour) {
                Some(h) => ("hourValue", Some(h)),
                None => ("textValue", non_blank(slots.text)),
            };
            match raw {
                None => Extracted::clean(RawValue::Time(None)),
                Some(raw) => match validate::parse_time(raw) {
                    Ok(t) => Extracted::clean(RawValue::Time(t)),
                    Err(_) => Extracted {
                        value: RawValue::Time(None),
                        issue: Some(ExtractIssue::Unparseable {
                            slot,
                            raw: raw.to_string(),
                        }),
                    },
                },
            }
        }
        ValueKind::List => extract_list(slots.text, options),
    }
}

fn extract_list(text: Option<&str>, options: &[ListOption]) -> Extracted {
    let Some(stored) = non_blank(text).map(trim_quotes).filter(|s| !s.is_empty()) else {
        return Extracted::clean(RawValue::List(None));
    };

    if let Some(opt) = catalog::find_by_id(options, stored) {
        return Extracted::clean(RawValue::List(Some(opt.id.clone())));
    }

    // Saves mirror the label into the text slot, so a reloaded value often
    // carries the label instead of the id.
    let recovered = catalog::find_by_label(options, stored).map(|o| o.id.clone());
    Extracted {
        value: RawValue::List(recovered.clone()),
        issue: Some(ExtractIssue::StaleSelection {
            stored: stored.to_string(),
            recovered,
        }),
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.trim().is_empty())
}

fn trim_quotes(s: &str) -> &str {
    s.trim().trim_matches(|c| c == '"' || c == '\'').trim()
}
