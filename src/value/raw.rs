use crate::catalog::{self, ListOption};
use crate::value::ValueKind;
use crate::value::validate::{self, FieldError};

use chrono::{DateTime, NaiveTime, Utc};
use serde::Serialize;

/// The in-memory value of one field, shaped by its kind.
///
/// `None` / empty string means "no value". A list value holds the chosen
/// option id; the label is looked up in the catalog when needed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum RawValue {
    Text(String),
    Number(Option<f64>),
    Date(Option<DateTime<Utc>>),
    Time(Option<NaiveTime>),
    Email(String),
    List(Option<String>),
}

impl RawValue {
    pub fn empty(kind: ValueKind) -> Self {
        match kind {
            ValueKind::Text => RawValue::Text(String::new()),
            ValueKind::Number => RawValue::Number(None),
            ValueKind::Date => RawValue::Date(None),
            ValueKind::Time => RawValue::Time(None),
            ValueKind::Email => RawValue::Email(String::new()),
            ValueKind::List => RawValue::List(None),
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            RawValue::Text(_) => ValueKind::Text,
            RawValue::Number(_) => ValueKind::Number,
            RawValue::Date(_) => ValueKind::Date,
            RawValue::Time(_) => ValueKind::Time,
            RawValue::Email(_) => ValueKind::Email,
            RawValue::List(_) => ValueKind::List,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            RawValue::Text(s) | RawValue::Email(s) => s.trim().is_empty(),
            RawValue::Number(n) => n.is_none(),
            RawValue::Date(d) => d.is_none(),
            RawValue::Time(t) => t.is_none(),
            RawValue::List(id) => id.is_none(),
        }
    }

    /// Validate user input against `kind` and convert it.
    pub fn parse_input(
        kind: ValueKind,
        input: &str,
        options: &[ListOption],
    ) -> Result<Self, FieldError> {
        validate::validate(kind, input, options)?;
        Ok(match kind {
            ValueKind::Text => RawValue::Text(input.to_string()),
            ValueKind::Email => RawValue::Email(input.trim().to_string()),
            ValueKind::Number => RawValue::Number(validate::parse_number(input)?),
            ValueKind::Date => RawValue::Date(validate::parse_date(input)?),
            ValueKind::Time => RawValue::Time(validate::parse_time(input)?),
            ValueKind::List => {
                let id = input.trim();
                RawValue::List((!id.is_empty()).then(|| id.to_string()))
            }
        })
    }

    /// Check a typed value before it is stored.
    pub fn check(&self, kind: ValueKind, options: &[ListOption]) -> Result<(), FieldError> {
        if self.kind() != kind {
            return Err(FieldError::KindMismatch {
                expected: kind,
                got: self.kind(),
            });
        }
        match self {
            RawValue::Email(s) if !validate::is_valid_email(s) => Err(FieldError::Email(s.clone())),
            RawValue::Number(Some(n)) if !n.is_finite() => Err(FieldError::Number(n.to_string())),
            RawValue::List(Some(id)) if catalog::find_by_id(options, id).is_none() => {
                Err(FieldError::UnknownOption(id.clone()))
            }
            _ => Ok(()),
        }
    }

    /// Numeric reading of the value: numbers directly, text through the
    /// number grammar.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            RawValue::Number(n) => *n,
            RawValue::Text(s) => validate::parse_number(s).ok().flatten(),
            _ => None,
        }
    }

    /// Human-readable rendering; list values show their label.
    pub fn display(&self, options: &[ListOption]) -> String {
        match self {
            RawValue::Text(s) | RawValue::Email(s) => s.clone(),
            RawValue::Number(Some(n)) => format_number(*n),
            RawValue::Date(Some(d)) => d.format("%Y-%m-%d").to_string(),
            RawValue::Time(Some(t)) => t.format("%H:%M").to_string(),
            RawValue::List(Some(id)) => catalog::find_by_id(options, id)
                .map(|o| o.label.clone())
                .unwrap_or_else(|| id.clone()),
            RawValue::Number(None)
            | RawValue::Date(None)
            | RawValue::Time(None)
            | RawValue::List(None) => {
                String::new()
            }
        }
    }
}

/// Integral values render without a fraction ("4348", not "4348.0").
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}
