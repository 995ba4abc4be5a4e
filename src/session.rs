//! One loaded snapshot and its edits.
//!
//! The session owns the store and the propagation engine. Loads and saves go
//! through a `ValueBackend`; a failed boundary call never changes the
//! session.

use crate::backend::{BackendError, ValueBackend};
use crate::config::EngineConfig;
use crate::derive::{PropagationEngine, RuleError};
use crate::store::{
    Audit, Entry, FieldIssue, Parameter, Permissions, Scope, StoreError, ValueStore,
};
use crate::value::{ExtractIssue, RawValue, extract_initial};
use crate::wire::{SaveRecord, ValueQuery, ValueRecord, to_payload};

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("invalid rule set: {0}")]
    Rules(#[from] RuleError),

    #[error("inconsistent snapshot: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("{} field(s) hold invalid input; nothing was saved", .0.len())]
    Invalid(Vec<FieldIssue>),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// A recoverable data problem found while loading a record.
#[derive(Debug, Clone, PartialEq)]
pub enum Inconsistency {
    /// The stored list id is not in the parameter's catalog.
    StaleSelection {
        value_id: String,
        code: String,
        stored: String,
        recovered: Option<String>,
    },
    /// A date or hour slot did not parse; the value loaded unset.
    Unparseable {
        value_id: String,
        code: String,
        slot: &'static str,
        raw: String,
    },
}

impl Inconsistency {
    fn new(value_id: &str, code: &str, issue: ExtractIssue) -> Self {
        let (value_id, code) = (value_id.to_string(), code.to_string());
        match issue {
            ExtractIssue::StaleSelection { stored, recovered } => Inconsistency::StaleSelection {
                value_id,
                code,
                stored,
                recovered,
            },
            ExtractIssue::Unparseable { slot, raw } => Inconsistency::Unparseable {
                value_id,
                code,
                slot,
                raw,
            },
        }
    }
}

impl fmt::Display for Inconsistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Inconsistency::StaleSelection {
                value_id,
                code,
                stored,
                recovered: Some(id),
            } => write!(
                f,
                "{value_id} ({code}): option {stored:?} not in catalog, matched by label to {id:?}"
            ),
            Inconsistency::StaleSelection {
                value_id,
                code,
                stored,
                ..
            } => write!(
                f,
                "{value_id} ({code}): option {stored:?} not in catalog, left unset"
            ),
            Inconsistency::Unparseable {
                value_id,
                code,
                slot,
                raw,
            } => write!(f, "{value_id} ({code}): {slot} {raw:?} does not parse, left unset"),
        }
    }
}

#[derive(Debug)]
pub struct EditingSession {
    config: EngineConfig,
    query: ValueQuery,
    engine: Arc<PropagationEngine>,
    store: ValueStore,
    inconsistencies: Vec<Inconsistency>,
}

impl EditingSession {
    pub fn load(
        backend: &impl ValueBackend,
        query: ValueQuery,
        config: EngineConfig,
    ) -> Result<Self, LoadError> {
        let engine = Arc::new(PropagationEngine::from_config(&config)?);
        let records = query.apply(backend.load(&query)?);
        let (store, inconsistencies) = build_snapshot(records, &engine, &config)?;
        info!(
            values = store.len(),
            inconsistencies = inconsistencies.len(),
            "session loaded"
        );
        Ok(Self {
            config,
            query,
            engine,
            store,
            inconsistencies,
        })
    }

    /// Replace the snapshot with a fresh load. On error the current snapshot,
    /// edits included, is kept.
    pub fn reload(&mut self, backend: &impl ValueBackend) -> Result<(), LoadError> {
        let records = self.query.apply(backend.load(&self.query)?);
        let (store, inconsistencies) = build_snapshot(records, &self.engine, &self.config)?;
        info!(
            values = store.len(),
            inconsistencies = inconsistencies.len(),
            "session reloaded"
        );
        self.store = store;
        self.inconsistencies = inconsistencies;
        Ok(())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &ValueStore {
        &self.store
    }

    pub fn get(&self, id: &str) -> Option<&Entry> {
        self.store.get(id)
    }

    pub fn inconsistencies(&self) -> &[Inconsistency] {
        &self.inconsistencies
    }

    pub fn set_input(&mut self, id: &str, input: &str) -> Result<(), StoreError> {
        self.store.set_input(id, input)
    }

    pub fn set(&mut self, id: &str, value: RawValue) -> Result<(), StoreError> {
        self.store.set(id, value)
    }

    /// Apply the same input to every value of `code` in the snapshot, in id
    /// order. Stops at the first failure.
    pub fn set_code_input(&mut self, code: &str, input: &str) -> Result<usize, StoreError> {
        let ids: Vec<String> = self
            .store
            .find_code(code)
            .iter()
            .map(|e| e.id.clone())
            .collect();
        if ids.is_empty() {
            return Err(StoreError::UnknownValue(code.to_string()));
        }
        for id in &ids {
            self.store.set_input(id, input)?;
        }
        Ok(ids.len())
    }

    /// Clear every user-editable value.
    pub fn reset(&mut self) {
        self.store.reset();
    }

    /// The save payload, or every field that blocks it.
    pub fn payload(&self, now: DateTime<Utc>) -> Result<Vec<SaveRecord>, SaveError> {
        let issues = self.store.field_issues();
        if !issues.is_empty() {
            return Err(SaveError::Invalid(issues));
        }
        Ok(to_payload(self.store.entries(), now))
    }

    /// Send the whole snapshot. Nothing is sent while any field is invalid.
    pub fn save(
        &self,
        backend: &impl ValueBackend,
        now: DateTime<Utc>,
    ) -> Result<usize, SaveError> {
        let payload = self.payload(now)?;
        backend.save(&payload)?;
        info!(records = payload.len(), "session saved");
        Ok(payload.len())
    }
}

fn build_snapshot(
    records: Vec<ValueRecord>,
    engine: &Arc<PropagationEngine>,
    config: &EngineConfig,
) -> Result<(ValueStore, Vec<Inconsistency>), StoreError> {
    let mut store = ValueStore::new();
    let mut inconsistencies = Vec::new();

    for record in records {
        let parameter = parameter_of(&record);
        let extracted = extract_initial(parameter.kind, &record.slots(), &parameter.options);
        if let Some(issue) = extracted.issue {
            let found = Inconsistency::new(&record.id, &parameter.code, issue);
            warn!(%found, "inconsistent stored value");
            inconsistencies.push(found);
        }

        let mut entry = Entry::new(
            record.id,
            parameter,
            Scope::new(record.employee_id, record.client_id),
            extracted.value,
        );
        entry.audit = Audit {
            created_by: record.created_by,
            creation_date: record.creation_date,
        };
        entry.employee_name = record.employee_name;
        entry.client_name = record.client_name;
        store.insert(entry)?;
    }

    engine.lock_targets(&mut store);
    store.subscribe(engine.clone());
    if config.recompute_on_load {
        let written = engine.refresh(&mut store);
        info!(written, "recomputed derived values on load");
    }
    Ok((store, inconsistencies))
}

fn parameter_of(record: &ValueRecord) -> Parameter {
    Parameter::new(
        record.parameter_id.clone().unwrap_or_default(),
        record.parameter_code.clone(),
        record.data_type_description.clone().unwrap_or_default(),
        record.list_definition.clone(),
    )
    .with_description(record.parameter_description.clone())
    .with_inconsistency_level(record.inconsistency_level_id)
    .with_permissions(Permissions {
        modify: record.modify_permission.clone(),
        consult: record.consult_permission.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, code: &str, ty: &str) -> ValueRecord {
        ValueRecord {
            id: id.to_string(),
            parameter_id: Some(format!("p-{code}")),
            parameter_code: code.to_string(),
            data_type_description: Some(ty.to_string()),
            employee_id: Some("e1".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn snapshot_carries_record_metadata() {
        let mut r = record("v1", "CORREO", "Correo electrónico");
        r.text_value = Some("x@y.com".to_string());
        r.email_value = Some(String::new());
        r.employee_name = Some("Ana".to_string());
        r.created_by = Some("admin".to_string());
        r.inconsistency_level_id = Some(2);

        let engine = Arc::new(PropagationEngine::default());
        let (store, issues) = build_snapshot(vec![r], &engine, &EngineConfig::default()).unwrap();

        let entry = store.get("v1").unwrap();
        assert_eq!(entry.value, RawValue::Email("x@y.com".to_string()));
        assert_eq!(entry.employee_name.as_deref(), Some("Ana"));
        assert_eq!(entry.audit.created_by.as_deref(), Some("admin"));
        assert_eq!(entry.parameter.inconsistency_level, Some(2));
        assert!(issues.is_empty());
    }

    #[test]
    fn stale_selection_is_reported() {
        let mut r = record("v1", "TALLA", "Lista");
        r.list_definition = Some(r#"[{"Id":"1","Valor":"S"},{"Id":"2","Valor":"M"}]"#.to_string());
        r.text_value = Some("M".to_string());

        let engine = Arc::new(PropagationEngine::default());
        let (store, issues) = build_snapshot(vec![r], &engine, &EngineConfig::default()).unwrap();

        assert_eq!(store.value("v1"), Some(&RawValue::List(Some("2".to_string()))));
        assert_eq!(
            issues,
            vec![Inconsistency::StaleSelection {
                value_id: "v1".to_string(),
                code: "TALLA".to_string(),
                stored: "M".to_string(),
                recovered: Some("2".to_string()),
            }]
        );
        assert!(issues[0].to_string().contains("TALLA"));
    }

    #[test]
    fn duplicate_record_ids_fail_the_snapshot() {
        let engine = Arc::new(PropagationEngine::default());
        let got = build_snapshot(
            vec![record("v1", "A", "Texto"), record("v1", "B", "Texto")],
            &engine,
            &EngineConfig::default(),
        );
        assert!(matches!(got, Err(StoreError::DuplicateValue(_))));
    }
}
