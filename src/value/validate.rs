//! Per-kind input grammars.
//!
//! Every grammar accepts the empty string: an empty field means "no value",
//! never a validation failure.

use crate::catalog::{self, ListOption};
use crate::value::ValueKind;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

/// Why a single field's input was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("invalid email address: {0:?}")]
    Email(String),

    #[error("invalid number: {0:?}")]
    Number(String),

    #[error("invalid date: {0:?}")]
    Date(String),

    #[error("invalid time of day (expected HH:MM[:SS]): {0:?}")]
    Time(String),

    #[error("no list option with id {0:?}")]
    UnknownOption(String),

    #[error("expected a {expected} value, got {got}")]
    KindMismatch {
        expected: ValueKind,
        got: ValueKind,
    },
}

// Local part: RFC 5322 atext atoms separated by dots.
// Domain: dot-separated labels, alphanumeric at both ends, at most 63 chars.
const EMAIL_RE: &str = r#"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*$"#;
const EMAIL_MAX_LEN: usize = 254;
const EMAIL_LOCAL_MAX_LEN: usize = 64;

// Optional sign, `.` or `,` as decimal separator, at least one digit.
const NUMBER_RE: &str = r#"^[-+]?(?:\d+(?:[.,]\d+)?|[.,]\d+)$"#;

// HH:MM with optional :SS and fractional seconds (seconds are discarded).
const TIME_RE: &str = r#"^(\d{1,2}):(\d{2})(?::\d{2}(?:\.\d+)?)?$"#;

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(EMAIL_RE).expect("email grammar compiles"))
}

fn number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(NUMBER_RE).expect("number grammar compiles"))
}

fn time_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(TIME_RE).expect("time grammar compiles"))
}

pub fn is_valid_email(input: &str) -> bool {
    let s = input.trim();
    if s.is_empty() {
        return true;
    }
    if s.len() > EMAIL_MAX_LEN {
        return false;
    }
    match s.split_once('@') {
        Some((local, _)) if local.len() <= EMAIL_LOCAL_MAX_LEN => email_re().is_match(s),
        _ => false,
    }
}

/// Parse a number accepting `,` as decimal separator. Empty -> None.
pub fn parse_number(input: &str) -> Result<Option<f64>, FieldError> {
    let s = input.trim();
    if s.is_empty() {
        return Ok(None);
    }
    if !number_re().is_match(s) {
        return Err(FieldError::Number(input.to_string()));
    }
    s.replace(',', ".")
        .parse::<f64>()
        .map(Some)
        .map_err(|_| FieldError::Number(input.to_string()))
}

/// Parse "HH:MM[:SS]" into a time of day, dropping seconds. Empty -> None.
pub fn parse_time(input: &str) -> Result<Option<NaiveTime>, FieldError> {
    let s = input.trim();
    if s.is_empty() {
        return Ok(None);
    }
    let err = || FieldError::Time(input.to_string());
    let caps = time_re().captures(s).ok_or_else(err)?;
    let hour: u32 = caps[1].parse().map_err(|_| err())?;
    let minute: u32 = caps[2].parse().map_err(|_| err())?;
    NaiveTime::from_hms_opt(hour, minute, 0)
        .map(Some)
        .ok_or_else(err)
}

/// Parse an RFC 3339 timestamp, a naive date-time (taken as UTC) or a plain
/// `YYYY-MM-DD` date (midnight UTC). Empty -> None.
pub fn parse_date(input: &str) -> Result<Option<DateTime<Utc>>, FieldError> {
    let s = input.trim();
    if s.is_empty() {
        return Ok(None);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(Some(naive.and_utc()));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(Some(naive.and_utc()));
        }
    }
    Err(FieldError::Date(input.to_string()))
}

/// Check user input against the grammar of `kind`.
pub fn validate(kind: ValueKind, input: &str, options: &[ListOption]) -> Result<(), FieldError> {
    match kind {
        ValueKind::Text => Ok(()),
        ValueKind::Email => {
            if is_valid_email(input) {
                Ok(())
            } else {
                Err(FieldError::Email(input.to_string()))
            }
        }
        ValueKind::Number => parse_number(input).map(|_| ()),
        ValueKind::Date => parse_date(input).map(|_| ()),
        ValueKind::Time => parse_time(input).map(|_| ()),
        ValueKind::List => {
            let id = input.trim();
            if id.is_empty() || catalog::find_by_id(options, id).is_some() {
                Ok(())
            } else {
                Err(FieldError::UnknownOption(id.to_string()))
            }
        }
    }
}
