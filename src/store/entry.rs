use crate::catalog::{self, ListOption};
use crate::value::{FieldError, RawValue, ValueKind, resolve_kind};

use serde::Serialize;
use std::fmt;

/// Which entity a value applies to. Both empty means global.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Scope {
    pub employee_id: Option<String>,
    pub client_id: Option<String>,
}

impl Scope {
    pub fn global() -> Self {
        Self::default()
    }

    pub fn employee(employee_id: impl Into<String>) -> Self {
        Self {
            employee_id: Some(employee_id.into()),
            client_id: None,
        }
    }

    pub fn new(employee_id: Option<String>, client_id: Option<String>) -> Self {
        let clean = |s: Option<String>| s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        Self {
            employee_id: clean(employee_id),
            client_id: clean(client_id),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.employee_id, &self.client_id) {
            (None, None) => f.write_str("global"),
            (Some(e), None) => write!(f, "employee={e}"),
            (None, Some(c)) => write!(f, "client={c}"),
            (Some(e), Some(c)) => write!(f, "employee={e} client={c}"),
        }
    }
}

/// Opaque to the engine; carried through for display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Permissions {
    pub modify: Option<String>,
    pub consult: Option<String>,
}

/// A parameter definition. Immutable for the session.
#[derive(Debug, Clone, Serialize)]
pub struct Parameter {
    pub id: String,
    pub code: String,
    pub description: Option<String>,
    pub declared_type: String,
    pub kind: ValueKind,
    pub list_definition: Option<String>,
    /// Decoded catalog; always empty for non-list kinds.
    pub options: Vec<ListOption>,
    /// Display ordering hint; lower sorts first.
    pub inconsistency_level: Option<i64>,
    pub permissions: Permissions,
}

impl Parameter {
    pub fn new(
        id: impl Into<String>,
        code: impl Into<String>,
        declared_type: impl Into<String>,
        list_definition: Option<String>,
    ) -> Self {
        let declared_type = declared_type.into();
        let kind = resolve_kind(&declared_type);
        let options = match kind {
            ValueKind::List => catalog::decode_options(list_definition.as_deref()),
            _ => Vec::new(),
        };
        Self {
            id: id.into(),
            code: code.into().trim().to_string(),
            description: None,
            declared_type,
            kind,
            list_definition,
            options,
            inconsistency_level: None,
            permissions: Permissions::default(),
        }
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn with_inconsistency_level(mut self, level: Option<i64>) -> Self {
        self.inconsistency_level = level;
        self
    }

    pub fn with_permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = permissions;
        self
    }
}

/// Normalized code used for rule and store lookups.
pub fn code_key(code: &str) -> String {
    code.trim().to_uppercase()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Audit {
    pub created_by: Option<String>,
    pub creation_date: Option<String>,
}

/// Input that failed its grammar. The entry keeps its previous value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejected {
    pub input: String,
    #[serde(serialize_with = "serialize_error")]
    pub error: FieldError,
}

fn serialize_error<S: serde::Serializer>(e: &FieldError, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(e)
}

/// One parameter value bound to a scope.
#[derive(Debug, Clone, Serialize)]
pub struct Entry {
    pub id: String,
    pub parameter: Parameter,
    pub scope: Scope,
    pub value: RawValue,
    pub editable: bool,
    /// True once the propagation engine has written this entry.
    pub derived: bool,
    pub rejected: Option<Rejected>,
    pub audit: Audit,
    pub employee_name: Option<String>,
    pub client_name: Option<String>,
}

impl Entry {
    pub fn new(id: impl Into<String>, parameter: Parameter, scope: Scope, value: RawValue) -> Self {
        Self {
            id: id.into(),
            parameter,
            scope,
            value,
            editable: true,
            derived: false,
            rejected: None,
            audit: Audit::default(),
            employee_name: None,
            client_name: None,
        }
    }

    pub fn kind(&self) -> ValueKind {
        self.parameter.kind
    }

    pub fn code(&self) -> &str {
        &self.parameter.code
    }

    pub fn options(&self) -> &[ListOption] {
        &self.parameter.options
    }

    /// The selected list option, if this is a list value with a selection.
    pub fn selected_option(&self) -> Option<&ListOption> {
        match &self.value {
            RawValue::List(Some(id)) => catalog::find_by_id(&self.parameter.options, id),
            _ => None,
        }
    }

    pub fn display(&self) -> String {
        self.value.display(&self.parameter.options)
    }
}
