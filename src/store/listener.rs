//! Change notification.
//!
//! Listeners see user changes only. Whatever they write goes through a
//! `DerivedWriter`, which has no way to notify, so a listener's writes can
//! never fire listeners again.

use crate::store::entry::{Entry, Scope, code_key};
use crate::store::ValueStore;
use crate::value::{RawValue, ValueKind, format_number};

use tracing::{debug, warn};

/// A user change that has been validated and applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueChange {
    pub value_id: String,
    pub code: String,
    pub scope: Scope,
    pub value: RawValue,
    /// Label of the selected option for list values.
    pub label: Option<String>,
}

pub trait ValueListener {
    fn on_change(&self, change: &ValueChange, writer: &mut DerivedWriter<'_>);
}

/// Write access for engine-computed values.
pub struct DerivedWriter<'a> {
    store: &'a mut ValueStore,
}

impl<'a> DerivedWriter<'a> {
    pub(crate) fn new(store: &'a mut ValueStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &ValueStore {
        self.store
    }

    /// Overwrite every `code` value in `scope` with `n` and lock it.
    /// Returns how many entries were written.
    pub fn write(&mut self, code: &str, scope: &Scope, n: f64) -> usize {
        let ids = self.store.ids_for(code, scope);
        let mut written = 0;
        for id in ids {
            let Some(entry) = self.store.entry_mut(&id) else {
                continue;
            };
            let Some(value) = derived_value(entry, n) else {
                warn!(
                    code = %entry.parameter.code,
                    kind = %entry.kind(),
                    "derived value skipped: target kind cannot hold a number"
                );
                continue;
            };
            entry.value = value;
            entry.editable = false;
            entry.derived = true;
            entry.rejected = None;
            written += 1;
        }
        if written == 0 {
            debug!(code = %code_key(code), %scope, "no target value loaded for scope");
        }
        written
    }
}

fn derived_value(entry: &Entry, n: f64) -> Option<RawValue> {
    match entry.kind() {
        ValueKind::Number => Some(RawValue::Number(Some(n))),
        ValueKind::Text => Some(RawValue::Text(format_number(n))),
        ValueKind::Date | ValueKind::Time | ValueKind::Email | ValueKind::List => None,
    }
}
