use crate::backend::{BackendError, ValueBackend};
use crate::wire::{SaveRecord, ValueQuery, ValueRecord, decode_records};

use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Loads a JSON export of value records and writes save payloads to disk.
///
/// The save payload is a different shape from the export, so it is never
/// written over the input file.
#[derive(Debug, Clone)]
pub struct FileBackend {
    input: PathBuf,
    output: Option<PathBuf>,
}

impl FileBackend {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: None,
        }
    }

    /// Where `save` writes. Without one, `save` fails.
    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    fn output(&self) -> Result<&Path, BackendError> {
        match self.output.as_deref() {
            None => Err(BackendError::Config(format!(
                "no output path for {}",
                self.input.display()
            ))),
            Some(path) if path == self.input.as_path() => Err(BackendError::Config(format!(
                "output {} would overwrite the input export",
                path.display()
            ))),
            Some(path) => Ok(path),
        }
    }
}

impl ValueBackend for FileBackend {
    fn load(&self, _query: &ValueQuery) -> Result<Vec<ValueRecord>, BackendError> {
        let text = fs::read_to_string(&self.input).map_err(|source| BackendError::Read {
            path: self.input.clone(),
            source,
        })?;
        let records = decode_records(serde_json::from_str(&text)?)?;
        info!(
            path = %self.input.display(),
            records = records.len(),
            "loaded value records"
        );
        Ok(records)
    }

    fn save(&self, records: &[SaveRecord]) -> Result<(), BackendError> {
        let path = self.output()?;
        let text = serde_json::to_string_pretty(records)?;
        fs::write(path, text).map_err(|source| BackendError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), records = records.len(), "wrote save payload");
        Ok(())
    }
}
