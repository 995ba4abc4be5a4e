//! Value Type Resolver: kinds, grammars, and load-time extraction.

pub mod extract;
pub mod kind;
pub mod raw;
pub mod validate;

pub use extract::{ExtractIssue, Extracted, LegacySlots, extract_initial};
pub use kind::{ValueKind, resolve_kind};
pub use raw::{RawValue, format_number};
pub use validate::FieldError;
