//! Boundary calls to the external value store.
//!
//! Both calls are blocking. A backend never touches session state; callers
//! decide what to keep when a call fails.

pub mod file;
pub mod http;

pub use file::FileBackend;
pub use http::HttpBackend;

use crate::wire::{SaveRecord, ValueQuery, ValueRecord};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed value payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("value store returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("value store unreachable at {url}: {message}")]
    Transport { url: String, message: String },

    #[error("invalid backend configuration: {0}")]
    Config(String),
}

pub trait ValueBackend {
    /// Fetch the records for a query. Servers may ignore the filters.
    fn load(&self, query: &ValueQuery) -> Result<Vec<ValueRecord>, BackendError>;

    /// Send the full payload. Success or failure only.
    fn save(&self, records: &[SaveRecord]) -> Result<(), BackendError>;
}

impl<B: ValueBackend + ?Sized> ValueBackend for &B {
    fn load(&self, query: &ValueQuery) -> Result<Vec<ValueRecord>, BackendError> {
        (**self).load(query)
    }

    fn save(&self, records: &[SaveRecord]) -> Result<(), BackendError> {
        (**self).save(records)
    }
}

impl<B: ValueBackend + ?Sized> ValueBackend for Box<B> {
    fn load(&self, query: &ValueQuery) -> Result<Vec<ValueRecord>, BackendError> {
        (**self).load(query)
    }

    fn save(&self, records: &[SaveRecord]) -> Result<(), BackendError> {
        (**self).save(records)
    }
}
