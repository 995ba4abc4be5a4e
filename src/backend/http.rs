use crate::backend::{BackendError, ValueBackend};
use crate::config::BackendConfig;
use crate::wire::{SaveRecord, ValueQuery, ValueRecord, decode_records};

use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

const RESOURCE: &str = "ParameterValues";
const USER_AGENT: &str = concat!("param-values/", env!("CARGO_PKG_VERSION"));

/// Talks to the value store's `ParameterValues` resource.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    url: String,
    agent: ureq::Agent,
}

impl HttpBackend {
    pub fn new(base: &str, config: &BackendConfig) -> Result<Self, BackendError> {
        let base = base.trim().trim_end_matches('/');
        if base.is_empty() {
            return Err(BackendError::Config("base url is empty".to_string()));
        }
        Ok(Self {
            url: format!("{base}/{RESOURCE}"),
            agent: build_agent(config.timeout_ms)?,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn error(&self, err: ureq::Error) -> BackendError {
        match err {
            ureq::Error::Status(status, _) => BackendError::Status {
                status,
                url: self.url.clone(),
            },
            ureq::Error::Transport(transport) => BackendError::Transport {
                url: self.url.clone(),
                message: transport.to_string(),
            },
        }
    }
}

impl ValueBackend for HttpBackend {
    fn load(&self, query: &ValueQuery) -> Result<Vec<ValueRecord>, BackendError> {
        let mut req = self.agent.get(&self.url).set("Accept", "application/json");
        for (key, value) in query.params() {
            req = req.query(key, &value);
        }
        debug!(url = %self.url, ?query, "loading values");

        let response = req.call().map_err(|e| self.error(e))?;
        let body: Value = serde_json::from_reader(response.into_reader())?;
        let records = decode_records(body)?;
        info!(url = %self.url, records = records.len(), "loaded value records");
        Ok(records)
    }

    fn save(&self, records: &[SaveRecord]) -> Result<(), BackendError> {
        self.agent
            .post(&self.url)
            .set("Content-Type", "application/json")
            .send_json(records)
            .map_err(|e| self.error(e))?;
        info!(url = %self.url, records = records.len(), "saved values");
        Ok(())
    }
}

fn build_agent(timeout_ms: u64) -> Result<ureq::Agent, BackendError> {
    if timeout_ms == 0 {
        return Err(BackendError::Config("timeout must be > 0".to_string()));
    }
    let timeout = Duration::from_millis(timeout_ms);
    Ok(ureq::AgentBuilder::new()
        .timeout_connect(timeout)
        .timeout_read(timeout)
        .timeout_write(timeout)
        .user_agent(USER_AGENT)
        .build())
}
