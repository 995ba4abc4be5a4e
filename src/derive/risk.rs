//! Occupational-risk insurance class lookup.

use crate::config::RiskCodes;
use crate::derive::rule::{DerivationRule, DerivedValues, TriggerValue};
use crate::value::kind::fold;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskClass {
    I,
    II,
    III,
    IV,
    V,
}

// Most specific first, so a token is never claimed by a shorter numeral.
const TOKENS: &[(&str, RiskClass)] = &[
    ("iii", RiskClass::III),
    ("iv", RiskClass::IV),
    ("ii", RiskClass::II),
    ("v", RiskClass::V),
    ("i", RiskClass::I),
    ("3", RiskClass::III),
    ("4", RiskClass::IV),
    ("2", RiskClass::II),
    ("5", RiskClass::V),
    ("1", RiskClass::I),
];

impl RiskClass {
    /// Parse "III", "3", "Clase iv", "Riesgo 2", ... Anything else (including
    /// out-of-range numerals like "VII" or "6") is `None`.
    pub fn parse(input: &str) -> Option<Self> {
        let folded = fold(input);
        let tokens: Vec<&str> = folded
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();
        TOKENS
            .iter()
            .find(|(pat, _)| tokens.iter().any(|t| t == pat))
            .map(|(_, class)| *class)
    }

    /// Insurance surcharge percentage for the class.
    pub fn rate(self) -> f64 {
        match self {
            RiskClass::I => 0.522,
            RiskClass::II => 1.044,
            RiskClass::III => 2.436,
            RiskClass::IV => 4.350,
            RiskClass::V => 6.960,
        }
    }
}

pub fn rule(codes: &RiskCodes) -> DerivationRule {
    let target = codes.target.clone();
    DerivationRule::new(
        "risk-class",
        codes.trigger.clone(),
        vec![codes.target.clone()],
        Box::new(move |v: &TriggerValue<'_>| {
            let class = v.texts().iter().find_map(|t| RiskClass::parse(t))?;
            let mut out = DerivedValues::new();
            out.insert(target.clone(), class.rate());
            Some(out)
        }),
    )
}
