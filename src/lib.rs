//! Typed parameter values with derived-value propagation.
//!
//! Layers, bottom-up:
//! - value: kind resolution, validation and initial-value extraction
//! - catalog: list option decoding
//! - store: per-scope values with editable state and change listeners
//! - derive: trigger -> target rules (labor rates, insurance class)
//! - wire: load records, query filtering, four-slot save envelope
//! - backend / session: the load and save boundary calls

pub mod backend;
pub mod catalog;
pub mod config;
pub mod derive;
pub mod session;
pub mod store;
pub mod value;
pub mod wire;

pub type Result<T> = anyhow::Result<T>;

pub use backend::{BackendError, FileBackend, HttpBackend, ValueBackend};
pub use catalog::ListOption;
pub use config::EngineConfig;
pub use derive::{DerivationRule, PropagationEngine, RuleError, RuleRegistry};
pub use session::{EditingSession, Inconsistency, LoadError, SaveError};
pub use store::{Entry, FieldIssue, Parameter, Scope, StoreError, ValueStore};
pub use value::{FieldError, RawValue, ValueKind, resolve_kind};
