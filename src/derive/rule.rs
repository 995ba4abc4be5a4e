use crate::value::{RawValue, format_number};

use std::collections::BTreeMap;
use std::fmt;

/// Computed values keyed by target code.
pub type DerivedValues = BTreeMap<String, f64>;

/// Pure function from a trigger value to its targets. `None` means the
/// trigger value is not usable and nothing is written.
pub type Formula = Box<dyn Fn(&TriggerValue<'_>) -> Option<DerivedValues> + Send + Sync>;

/// The trigger's new value as a formula sees it.
#[derive(Debug, Clone, Copy)]
pub struct TriggerValue<'a> {
    pub value: &'a RawValue,
    /// Label of the selected option when the trigger is a list.
    pub label: Option<&'a str>,
}

impl<'a> TriggerValue<'a> {
    pub fn new(value: &'a RawValue, label: Option<&'a str>) -> Self {
        Self { value, label }
    }

    pub fn number(&self) -> Option<f64> {
        self.value.as_number()
    }

    /// Textual readings, most descriptive first: the list label, then the
    /// stored text, id or number.
    pub fn texts(&self) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(label) = self.label {
            out.push(label.to_string());
        }
        match self.value {
            RawValue::Text(s) | RawValue::Email(s) => out.push(s.clone()),
            RawValue::List(Some(id)) => out.push(id.clone()),
            RawValue::Number(Some(n)) => out.push(format_number(*n)),
            _ => {}
        }
        out
    }
}

/// `{trigger, targets, formula}`: a change to `trigger` overwrites `targets`.
pub struct DerivationRule {
    pub name: String,
    pub trigger: String,
    pub targets: Vec<String>,
    formula: Formula,
}

impl DerivationRule {
    pub fn new(
        name: impl Into<String>,
        trigger: impl Into<String>,
        targets: Vec<String>,
        formula: Formula,
    ) -> Self {
        Self {
            name: name.into(),
            trigger: trigger.into(),
            targets,
            formula,
        }
    }

    pub fn evaluate(&self, value: &TriggerValue<'_>) -> Option<DerivedValues> {
        (self.formula)(value)
    }
}

impl fmt::Debug for DerivationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivationRule")
            .field("name", &self.name)
            .field("trigger", &self.trigger)
            .field("targets", &self.targets)
            .finish_non_exhaustive()
    }
}
