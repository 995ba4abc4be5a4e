use crate::config::EngineConfig;
use crate::derive::registry::{RuleError, RuleRegistry};
use crate::derive::rule::{DerivationRule, TriggerValue};
use crate::derive::{labor, risk};
use crate::store::{DerivedWriter, Scope, ValueChange, ValueListener, ValueStore};
use crate::value::RawValue;

use tracing::{debug, warn};

/// Dispatches user changes to the rule whose trigger changed.
#[derive(Debug, Default)]
pub struct PropagationEngine {
    registry: RuleRegistry,
}

impl PropagationEngine {
    pub fn new(registry: RuleRegistry) -> Self {
        Self { registry }
    }

    /// The labor-rate and risk-class rule sets, wired from config.
    pub fn from_config(config: &EngineConfig) -> Result<Self, RuleError> {
        let mut registry = RuleRegistry::new();
        registry.register(labor::rule(&config.labor_rates, config.fiscal))?;
        registry.register(risk::rule(&config.risk))?;
        Ok(Self::new(registry))
    }

    /// Lock every loaded target value so it can only be engine-written.
    pub fn lock_targets(&self, store: &mut ValueStore) -> usize {
        self.registry
            .target_codes()
            .map(|code| store.lock_code(code))
            .sum()
    }

    /// Re-fire every trigger value in the store.
    pub fn refresh(&self, store: &mut ValueStore) -> usize {
        let triggers: Vec<(String, Scope, RawValue, Option<String>)> = store
            .entries()
            .filter(|e| self.registry.is_trigger(e.code()))
            .map(|e| {
                (
                    e.code().to_string(),
                    e.scope.clone(),
                    e.value.clone(),
                    e.selected_option().map(|o| o.label.clone()),
                )
            })
            .collect();

        let mut writer = DerivedWriter::new(store);
        let mut written = 0;
        for (code, scope, value, label) in &triggers {
            if let Some(rule) = self.registry.rule_for_trigger(code) {
                let trigger = TriggerValue::new(value, label.as_deref());
                written += fire(rule, &trigger, scope, &mut writer);
            }
        }
        written
    }
}

impl ValueListener for PropagationEngine {
    fn on_change(&self, change: &ValueChange, writer: &mut DerivedWriter<'_>) {
        let Some(rule) = self.registry.rule_for_trigger(&change.code) else {
            return;
        };
        let trigger = TriggerValue::new(&change.value, change.label.as_deref());
        fire(rule, &trigger, &change.scope, writer);
    }
}

fn fire(
    rule: &DerivationRule,
    trigger: &TriggerValue<'_>,
    scope: &Scope,
    writer: &mut DerivedWriter<'_>,
) -> usize {
    let Some(values) = rule.evaluate(trigger) else {
        debug!(
            rule = %rule.name,
            %scope,
            value = ?trigger.value,
            "trigger value not usable; targets untouched"
        );
        return 0;
    };

    let mut written = 0;
    for (code, n) in &values {
        if !rule.targets.iter().any(|t| t == code) {
            warn!(rule = %rule.name, %code, "formula produced an undeclared target; ignored");
            continue;
        }
        written += writer.write(code, scope, *n);
    }
    debug!(rule = %rule.name, %scope, written, "derived values recomputed");
    written
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Entry, Parameter};
    use std::sync::Arc;

    fn store_with(entries: &[(&str, &str, &str, &str)]) -> ValueStore {
        let mut store = ValueStore::new();
        for (id, code, ty, employee) in entries {
            store
                .insert(Entry::new(
                    *id,
                    Parameter::new(format!("p-{code}"), *code, *ty, None),
                    Scope::employee(*employee),
                    RawValue::empty(crate::value::resolve_kind(ty)),
                ))
                .unwrap();
        }
        store
    }

    #[test]
    fn targets_follow_the_trigger_scope_only() {
        let config = EngineConfig::default();
        let engine = Arc::new(PropagationEngine::from_config(&config).unwrap());
        let codes = &config.labor_rates;
        let mut store = store_with(&[
            ("s1", codes.trigger.as_str(), "Numérico", "e1"),
            ("h1", codes.ordinary_day.as_str(), "Numérico", "e1"),
            ("h2", codes.ordinary_day.as_str(), "Numérico", "e2"),
        ]);
        engine.lock_targets(&mut store);
        store.subscribe(engine.clone());

        store.set_input("s1", "1000000").unwrap();

        assert_eq!(store.value("h1"), Some(&RawValue::Number(Some(4348.0))));
        assert_eq!(store.value("h2"), Some(&RawValue::Number(None)));
        assert!(!store.get("h1").unwrap().editable);
        assert!(store.get("h1").unwrap().derived);
    }

    #[test]
    fn text_target_gets_decimal_rendering() {
        let config = EngineConfig::default();
        let engine = Arc::new(PropagationEngine::from_config(&config).unwrap());
        let mut store = store_with(&[
            ("r", config.risk.trigger.as_str(), "Texto", "e1"),
            ("p", config.risk.target.as_str(), "Texto", "e1"),
        ]);
        store.subscribe(engine);

        store.set_input("r", "III").unwrap();
        assert_eq!(store.value("p"), Some(&RawValue::Text("2.436".to_string())));
    }

    #[test]
    fn refresh_settles_loaded_triggers() {
        let config = EngineConfig::default();
        let engine = PropagationEngine::from_config(&config).unwrap();
        let mut store = store_with(&[
            ("r", config.risk.trigger.as_str(), "Texto", "e1"),
            ("p", config.risk.target.as_str(), "Numérico", "e1"),
        ]);
        store.entry_mut("r").unwrap().value = RawValue::Text("5".to_string());

        assert_eq!(engine.refresh(&mut store), 1);
        assert_eq!(store.value("p"), Some(&RawValue::Number(Some(6.960))));
    }

    #[test]
    fn non_trigger_changes_do_nothing() {
        let config = EngineConfig::default();
        let engine = Arc::new(PropagationEngine::from_config(&config).unwrap());
        let mut store = store_with(&[
            ("x", "OTRO", "Numérico", "e1"),
            ("p", config.risk.target.as_str(), "Numérico", "e1"),
        ]);
        store.subscribe(engine);
        store.set_input("x", "3").unwrap();
        assert_eq!(store.value("p"), Some(&RawValue::Number(None)));
    }
}
