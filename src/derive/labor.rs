//! Labor-rate derivation from a monthly base salary.
//!
//! The ordinary hourly rate divides the salary by a fixed monthly hour count;
//! every other rate is a surcharge multiple of it. The transport allowance is
//! proportional to the salary and drops to zero above two minimum wages.

use crate::config::{FiscalConfig, LaborRateCodes};
use crate::derive::rule::{DerivationRule, DerivedValues, TriggerValue};

/// Monthly ordinary hours used to turn a salary into an hourly rate.
/// Treated as a fixed legal convention, not a configurable value.
pub const ORDINARY_HOURS_PER_MONTH: f64 = 230.0;

pub const ORDINARY_NIGHT_FACTOR: f64 = 1.35;
pub const EXTRA_DAY_FACTOR: f64 = 1.25;
pub const EXTRA_NIGHT_FACTOR: f64 = 1.75;
pub const HOLIDAY_ORDINARY_DAY_FACTOR: f64 = 1.75;
pub const HOLIDAY_ORDINARY_NIGHT_FACTOR: f64 = 2.10;
pub const HOLIDAY_EXTRA_DAY_FACTOR: f64 = 2.00;
pub const HOLIDAY_EXTRA_NIGHT_FACTOR: f64 = 2.50;

/// Transport allowance is paid up to this many minimum wages.
pub const TRANSPORT_ALLOWANCE_WAGE_CAP: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaborRates {
    pub ordinary_day: f64,
    pub ordinary_night: f64,
    pub extra_day: f64,
    pub extra_night: f64,
    pub holiday_ordinary_day: f64,
    pub holiday_ordinary_night: f64,
    pub holiday_extra_day: f64,
    pub holiday_extra_night: f64,
    pub transport_allowance: f64,
}

impl LaborRates {
    /// Rates for a salary; `None` unless the salary is a positive number.
    pub fn compute(salary: f64, fiscal: &FiscalConfig) -> Option<Self> {
        if !salary.is_finite() || salary <= 0.0 {
            return None;
        }
        let hour = (salary / ORDINARY_HOURS_PER_MONTH).round();
        let times = |factor: f64| (hour * factor).round();
        Some(Self {
            ordinary_day: hour,
            ordinary_night: times(ORDINARY_NIGHT_FACTOR),
            extra_day: times(EXTRA_DAY_FACTOR),
            extra_night: times(EXTRA_NIGHT_FACTOR),
            holiday_ordinary_day: times(HOLIDAY_ORDINARY_DAY_FACTOR),
            holiday_ordinary_night: times(HOLIDAY_ORDINARY_NIGHT_FACTOR),
            holiday_extra_day: times(HOLIDAY_EXTRA_DAY_FACTOR),
            holiday_extra_night: times(HOLIDAY_EXTRA_NIGHT_FACTOR),
            transport_allowance: transport_allowance(salary, fiscal),
        })
    }

    fn into_values(self, codes: &LaborRateCodes) -> DerivedValues {
        [
            (&codes.ordinary_day, self.ordinary_day),
            (&codes.ordinary_night, self.ordinary_night),
            (&codes.extra_day, self.extra_day),
            (&codes.extra_night, self.extra_night),
            (&codes.holiday_ordinary_day, self.holiday_ordinary_day),
            (&codes.holiday_ordinary_night, self.holiday_ordinary_night),
            (&codes.holiday_extra_day, self.holiday_extra_day),
            (&codes.holiday_extra_night, self.holiday_extra_night),
            (&codes.transport_allowance, self.transport_allowance),
        ]
        .into_iter()
        .map(|(code, v)| (code.clone(), v))
        .collect()
    }
}

/// `base_allowance * salary / minimum_wage`, rounded to the nearest hundred,
/// while the salary is at most two minimum wages; zero above.
pub fn transport_allowance(salary: f64, fiscal: &FiscalConfig) -> f64 {
    if fiscal.minimum_wage <= 0.0 || salary > TRANSPORT_ALLOWANCE_WAGE_CAP * fiscal.minimum_wage {
        return 0.0;
    }
    let proportional = fiscal.base_allowance * salary / fiscal.minimum_wage;
    (proportional / 100.0).round() * 100.0
}

pub fn rule(codes: &LaborRateCodes, fiscal: FiscalConfig) -> DerivationRule {
    let targets = vec![
        codes.ordinary_day.clone(),
        codes.ordinary_night.clone(),
        codes.extra_day.clone(),
        codes.extra_night.clone(),
        codes.holiday_ordinary_day.clone(),
        codes.holiday_ordinary_night.clone(),
        codes.holiday_extra_day.clone(),
        codes.holiday_extra_night.clone(),
        codes.transport_allowance.clone(),
    ];
    let owned = codes.clone();
    DerivationRule::new(
        "labor-rates",
        codes.trigger.clone(),
        targets,
        Box::new(move |v: &TriggerValue<'_>| {
            let salary = v.number()?;
            LaborRates::compute(salary, &fiscal).map(|rates| rates.into_values(&owned))
        }),
    )
}
