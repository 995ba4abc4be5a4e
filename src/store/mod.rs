//! Value Store: the current value of every (parameter, scope) in a session.
//!
//! Entries are keyed by value id. A secondary index maps (code, scope) to ids
//! so derived writes can find their targets. User writes go through `set` /
//! `set_input`, which validate, apply, then notify listeners before returning.

pub mod entry;
pub mod listener;

pub use entry::{Audit, Entry, Parameter, Permissions, Rejected, Scope, code_key};
pub use listener::{DerivedWriter, ValueChange, ValueListener};

use crate::value::{FieldError, RawValue};

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("unknown parameter value id: {0}")]
    UnknownValue(String),

    #[error("duplicate parameter value id: {0}")]
    DuplicateValue(String),

    #[error("value {id} ({code}) is computed and cannot be edited")]
    ReadOnly { id: String, code: String },

    #[error("value {id} ({code}): {source}")]
    Invalid {
        id: String,
        code: String,
        #[source]
        source: FieldError,
    },
}

/// A field whose last input was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub value_id: String,
    pub code: String,
    pub input: String,
    pub error: FieldError,
}

#[derive(Default)]
pub struct ValueStore {
    entries: BTreeMap<String, Entry>,
    by_code: HashMap<(String, Scope), Vec<String>>,
    listeners: Vec<Arc<dyn ValueListener>>,
}

impl ValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entry: Entry) -> Result<(), StoreError> {
        if self.entries.contains_key(&entry.id) {
            return Err(StoreError::DuplicateValue(entry.id));
        }
        self.by_code
            .entry((code_key(entry.code()), entry.scope.clone()))
            .or_default()
            .push(entry.id.clone());
        self.entries.insert(entry.id.clone(), entry);
        Ok(())
    }

    pub fn subscribe(&mut self, listener: Arc<dyn ValueListener>) {
        self.listeners.push(listener);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Entry> {
        self.entries.get(id)
    }

    pub fn value(&self, id: &str) -> Option<&RawValue> {
        self.entries.get(id).map(|e| &e.value)
    }

    /// Entries in id order.
    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    /// Entries for a parameter code in one scope.
    pub fn find(&self, code: &str, scope: &Scope) -> Vec<&Entry> {
        self.ids_for(code, scope)
            .iter()
            .filter_map(|id| self.entries.get(id))
            .collect()
    }

    /// Entries for a parameter code across all scopes, in id order.
    pub fn find_code(&self, code: &str) -> Vec<&Entry> {
        let key = code_key(code);
        self.entries
            .values()
            .filter(|e| code_key(e.code()) == key)
            .collect()
    }

    /// Entries ordered for display: inconsistency level (unset last), then
    /// code, then id.
    pub fn display_order(&self) -> Vec<&Entry> {
        let mut out: Vec<&Entry> = self.entries.values().collect();
        out.sort_by(|a, b| {
            let level = |e: &Entry| e.parameter.inconsistency_level.unwrap_or(i64::MAX);
            level(a)
                .cmp(&level(b))
                .then_with(|| a.code().cmp(b.code()))
                .then_with(|| a.id.cmp(&b.id))
        });
        out
    }

    /// Fields whose latest input failed validation.
    pub fn field_issues(&self) -> Vec<FieldIssue> {
        self.entries
            .values()
            .filter_map(|e| {
                e.rejected.as_ref().map(|r| FieldIssue {
                    value_id: e.id.clone(),
                    code: e.code().to_string(),
                    input: r.input.clone(),
                    error: r.error.clone(),
                })
            })
            .collect()
    }

    /// Mark every value of `code` as engine-owned.
    pub fn lock_code(&mut self, code: &str) -> usize {
        let key = code_key(code);
        let mut locked = 0;
        for entry in self.entries.values_mut() {
            if code_key(entry.code()) == key {
                entry.editable = false;
                locked += 1;
            }
        }
        locked
    }

    /// Apply user text input to a value.
    ///
    /// Invalid input is remembered on the entry (blocking save) and the
    /// previous value is kept.
    pub fn set_input(&mut self, id: &str, input: &str) -> Result<(), StoreError> {
        let entry = self.editable_entry(id)?;
        match RawValue::parse_input(entry.kind(), input, entry.options()) {
            Ok(value) => self.apply(id, value),
            Err(error) => Err(self.reject(id, input.to_string(), error)),
        }
    }

    /// Apply a typed user value.
    pub fn set(&mut self, id: &str, value: RawValue) -> Result<(), StoreError> {
        let entry = self.editable_entry(id)?;
        match value.check(entry.kind(), entry.options()) {
            Ok(()) => self.apply(id, value),
            Err(error) => {
                let input = value.display(entry.options());
                Err(self.reject(id, input, error))
            }
        }
    }

    /// Clear every editable value. Computed values are kept and nothing is
    /// propagated.
    pub fn reset(&mut self) {
        for entry in self.entries.values_mut().filter(|e| e.editable) {
            entry.value = RawValue::empty(entry.kind());
            entry.rejected = None;
        }
    }

    pub(crate) fn ids_for(&self, code: &str, scope: &Scope) -> Vec<String> {
        self.by_code
            .get(&(code_key(code), scope.clone()))
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn entry_mut(&mut self, id: &str) -> Option<&mut Entry> {
        self.entries.get_mut(id)
    }

    fn editable_entry(&self, id: &str) -> Result<&Entry, StoreError> {
        let entry = self
            .entries
            .get(id)
            .ok_or_else(|| StoreError::UnknownValue(id.to_string()))?;
        if !entry.editable {
            return Err(StoreError::ReadOnly {
                id: id.to_string(),
                code: entry.code().to_string(),
            });
        }
        Ok(entry)
    }

    fn reject(&mut self, id: &str, input: String, error: FieldError) -> StoreError {
        let code = match self.entries.get_mut(id) {
            Some(entry) => {
                entry.rejected = Some(Rejected {
                    input,
                    error: error.clone(),
                });
                entry.code().to_string()
            }
            None => String::new(),
        };
        StoreError::Invalid {
            id: id.to_string(),
            code,
            source: error,
        }
    }

    fn apply(&mut self, id: &str, value: RawValue) -> Result<(), StoreError> {
        let entry = self
            .entries
            .get_mut(id)
            .ok_or_else(|| StoreError::UnknownValue(id.to_string()))?;
        entry.value = value;
        entry.rejected = None;

        let change = ValueChange {
            value_id: entry.id.clone(),
            code: entry.code().to_string(),
            scope: entry.scope.clone(),
            value: entry.value.clone(),
            label: entry.selected_option().map(|o| o.label.clone()),
        };
        debug!(id = %change.value_id, code = %change.code, scope = %change.scope, "value changed");
        self.notify(&change);
        Ok(())
    }

    fn notify(&mut self, change: &ValueChange) {
        let listeners = std::mem::take(&mut self.listeners);
        {
            let mut writer = DerivedWriter::new(self);
            for listener in &listeners {
                listener.on_change(change, &mut writer);
            }
        }
        self.listeners = listeners;
    }
}

impl std::fmt::Debug for ValueStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueStore")
            .field("entries", &self.entries)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
