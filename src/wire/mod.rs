//! Wire layer: the load and save JSON shapes of the external value store.
//!
//! Kept apart from the store and engine; this is the only place that knows
//! field names on the wire.

pub mod envelope;
pub mod record;

pub use envelope::{SaveRecord, to_envelope, to_payload};
pub use record::{ValueQuery, ValueRecord, decode_records};
