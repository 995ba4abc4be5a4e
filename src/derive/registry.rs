//! Rule registration and validation.
//!
//! The rule graph is one level deep: triggers point at targets, and no target
//! may be a trigger. That makes cycles impossible and guarantees an engine
//! write can never start another propagation. Violations are rejected when a
//! rule is registered, never discovered at runtime.

use crate::derive::rule::DerivationRule;
use crate::store::code_key;

use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("rule {rule} has no targets")]
    NoTargets { rule: String },

    #[error("trigger {code} is already registered by rule {existing}")]
    DuplicateTrigger { code: String, existing: String },

    #[error("{code} cannot be both a trigger and a target (rules {trigger_rule} and {target_rule})")]
    TargetIsTrigger {
        code: String,
        trigger_rule: String,
        target_rule: String,
    },

    #[error("target {code} is already computed by rule {existing}")]
    TargetOwnedTwice { code: String, existing: String },
}

#[derive(Debug, Default)]
pub struct RuleRegistry {
    rules: Vec<DerivationRule>,
    by_trigger: HashMap<String, usize>,
    owner: HashMap<String, usize>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule after checking it against every registered rule:
    /// - at least one target
    /// - trigger not already registered
    /// - no target is a trigger (including its own), and the trigger is not
    ///   an existing target
    /// - every target has exactly one owning rule
    pub fn register(&mut self, rule: DerivationRule) -> Result<(), RuleError> {
        let trigger = code_key(&rule.trigger);

        // 1) Shape.
        if rule.targets.is_empty() {
            return Err(RuleError::NoTargets { rule: rule.name });
        }

        // 2) Trigger uniqueness.
        if let Some(&i) = self.by_trigger.get(&trigger) {
            return Err(RuleError::DuplicateTrigger {
                code: trigger,
                existing: self.rules[i].name.clone(),
            });
        }
        if let Some(&i) = self.owner.get(&trigger) {
            return Err(RuleError::TargetIsTrigger {
                code: trigger,
                trigger_rule: rule.name,
                target_rule: self.rules[i].name.clone(),
            });
        }

        // 3) Targets.
        let mut seen = BTreeSet::new();
        for target in &rule.targets {
            let key = code_key(target);
            if key == trigger {
                return Err(RuleError::TargetIsTrigger {
                    code: key,
                    trigger_rule: rule.name.clone(),
                    target_rule: rule.name.clone(),
                });
            }
            if let Some(&i) = self.by_trigger.get(&key) {
                return Err(RuleError::TargetIsTrigger {
                    code: key,
                    trigger_rule: self.rules[i].name.clone(),
                    target_rule: rule.name.clone(),
                });
            }
            if let Some(&i) = self.owner.get(&key) {
                return Err(RuleError::TargetOwnedTwice {
                    code: key,
                    existing: self.rules[i].name.clone(),
                });
            }
            if !seen.insert(key.clone()) {
                return Err(RuleError::TargetOwnedTwice {
                    code: key,
                    existing: rule.name.clone(),
                });
            }
        }

        // 4) Index.
        let idx = self.rules.len();
        self.by_trigger.insert(trigger, idx);
        for key in seen {
            self.owner.insert(key, idx);
        }
        self.rules.push(rule);
        Ok(())
    }

    pub fn rule_for_trigger(&self, code: &str) -> Option<&DerivationRule> {
        self.by_trigger.get(&code_key(code)).map(|&i| &self.rules[i])
    }

    pub fn is_trigger(&self, code: &str) -> bool {
        self.by_trigger.contains_key(&code_key(code))
    }

    pub fn is_target(&self, code: &str) -> bool {
        self.owner.contains_key(&code_key(code))
    }

    pub fn rules(&self) -> &[DerivationRule] {
        &self.rules
    }

    /// Every target code, normalized.
    pub fn target_codes(&self) -> impl Iterator<Item = &str> {
        self.owner.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derive::rule::DerivedValues;

    fn rule(name: &str, trigger: &str, targets: &[&str]) -> DerivationRule {
        DerivationRule::new(
            name,
            trigger,
            targets.iter().map(|t| t.to_string()).collect(),
            Box::new(|_| Some(DerivedValues::new())),
        )
    }

    #[test]
    fn accepts_independent_rules() {
        let mut reg = RuleRegistry::new();
        reg.register(rule("a", "S", &["H1", "H2"])).unwrap();
        reg.register(rule("b", "R", &["P"])).unwrap();
        assert!(reg.is_trigger("s"));
        assert!(reg.is_target(" h2 "));
        assert!(!reg.is_target("S"));
        assert_eq!(reg.rule_for_trigger("R").map(|r| r.name.as_str()), Some("b"));
    }

    #[test]
    fn target_that_is_a_trigger_is_fatal() {
        let mut reg = RuleRegistry::new();
        reg.register(rule("a", "S", &["H"])).unwrap();
        let err = reg.register(rule("b", "R", &["s"])).unwrap_err();
        assert!(matches!(err, RuleError::TargetIsTrigger { ref code, .. } if code == "S"));

        // And the other way around: a new trigger that is an existing target.
        let err = reg.register(rule("c", "H", &["X"])).unwrap_err();
        assert!(matches!(err, RuleError::TargetIsTrigger { ref code, .. } if code == "H"));
    }

    #[test]
    fn self_target_is_fatal() {
        let mut reg = RuleRegistry::new();
        let err = reg.register(rule("a", "S", &["S"])).unwrap_err();
        assert!(matches!(err, RuleError::TargetIsTrigger { .. }));
    }

    #[test]
    fn duplicate_trigger_and_shared_target_are_rejected() {
        let mut reg = RuleRegistry::new();
        reg.register(rule("a", "S", &["H"])).unwrap();
        assert!(matches!(
            reg.register(rule("b", "S", &["Z"])),
            Err(RuleError::DuplicateTrigger { .. })
        ));
        assert!(matches!(
            reg.register(rule("c", "R", &["H"])),
            Err(RuleError::TargetOwnedTwice { .. })
        ));
        assert!(matches!(
            reg.register(rule("d", "Q", &[])),
            Err(RuleError::NoTargets { .. })
        ));
        assert_eq!(reg.rules().len(), 1);
    }
}
