//! Derived Value Propagation Engine.
//!
//! Rules are data (`DerivationRule`): a trigger code, its target codes, and a
//! pure formula. The registry validates the rule graph once; the engine is a
//! store listener that looks up the changed code and overwrites the targets
//! in the same scope before the triggering `set` returns.

pub mod engine;
pub mod labor;
pub mod registry;
pub mod risk;
pub mod rule;

pub use engine::PropagationEngine;
pub use labor::{LaborRates, ORDINARY_HOURS_PER_MONTH};
pub use registry::{RuleError, RuleRegistry};
pub use risk::RiskClass;
pub use rule::{DerivationRule, DerivedValues, Formula, TriggerValue};
