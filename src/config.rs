//! Engine configuration (JSON).
//!
//! Every field has a default, so an empty object `{}` is a valid config:
//! {
//!   "fiscal": { "minimum_wage": 1423500, "base_allowance": 200000 },
//!   "labor_rates": { "trigger": "SALARIO_BASE", ... },
//!   "risk": { "trigger": "NIVEL_RIESGO_ARL", "target": "PORCENTAJE_ARL" },
//!   "backend": { "timeout_ms": 10000 },
//!   "recompute_on_load": false
//! }

use crate::Result;

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    pub fiscal: FiscalConfig,
    pub labor_rates: LaborRateCodes,
    pub risk: RiskCodes,
    pub backend: BackendConfig,
    /// Re-fire every trigger right after a load, overwriting stored targets.
    pub recompute_on_load: bool,
}

/// Constants of the applicable fiscal year.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FiscalConfig {
    pub minimum_wage: f64,
    pub base_allowance: f64,
}

impl Default for FiscalConfig {
    fn default() -> Self {
        Self {
            minimum_wage: 1_423_500.0,
            base_allowance: 200_000.0,
        }
    }
}

/// Parameter codes of the labor-rate rule: the salary trigger and its nine
/// computed targets.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LaborRateCodes {
    pub trigger: String,
    pub ordinary_day: String,
    pub ordinary_night: String,
    pub extra_day: String,
    pub extra_night: String,
    pub holiday_ordinary_day: String,
    pub holiday_ordinary_night: String,
    pub holiday_extra_day: String,
    pub holiday_extra_night: String,
    pub transport_allowance: String,
}

impl Default for LaborRateCodes {
    fn default() -> Self {
        Self {
            trigger: "SALARIO_BASE".to_string(),
            ordinary_day: "VALOR_HORA_ORDINARIA_DIURNA".to_string(),
            ordinary_night: "VALOR_HORA_ORDINARIA_NOCTURNA".to_string(),
            extra_day: "VALOR_HORA_EXTRA_DIURNA".to_string(),
            extra_night: "VALOR_HORA_EXTRA_NOCTURNA".to_string(),
            holiday_ordinary_day: "VALOR_HORA_ORDINARIA_DIURNA_DOMINICAL".to_string(),
            holiday_ordinary_night: "VALOR_HORA_ORDINARIA_NOCTURNA_DOMINICAL".to_string(),
            holiday_extra_day: "VALOR_HORA_EXTRA_DIURNA_DOMINICAL".to_string(),
            holiday_extra_night: "VALOR_HORA_EXTRA_NOCTURNA_DOMINICAL".to_string(),
            transport_allowance: "AUXILIO_TRANSPORTE".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RiskCodes {
    pub trigger: String,
    pub target: String,
}

impl Default for RiskCodes {
    fn default() -> Self {
        Self {
            trigger: "NIVEL_RIESGO_ARL".to_string(),
            target: "PORCENTAJE_ARL".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    pub timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self { timeout_ms: 10_000 }
    }
}

impl EngineConfig {
    /// Read a config file; `None` gives the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            None => Self::default(),
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("read config file {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("parse config file {}", path.display()))?
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.fiscal.minimum_wage > 0.0) {
            bail!("fiscal.minimum_wage must be positive, got {}", self.fiscal.minimum_wage);
        }
        if !(self.fiscal.base_allowance >= 0.0) {
            bail!(
                "fiscal.base_allowance must not be negative, got {}",
                self.fiscal.base_allowance
            );
        }
        if self.backend.timeout_ms == 0 {
            bail!("backend.timeout_ms must be > 0");
        }
        Ok(())
    }
}
