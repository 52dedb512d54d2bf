//! Diagnosis configuration parameters.
//!
//! Tunables for a diagnosis request and for the anomaly monitor that
//! triggers requests.  Loaded from JSON or built from [`Default`].

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// How minimal diagnoses are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Enumerate every satisfying assignment, then filter supersets.
    /// Exponential in the number of unobserved structural facts.
    Exhaustive,
    /// Shrink each solution to a minimal signature and block its
    /// supersets.  Same result as `Exhaustive`, one solve per step.
    #[default]
    MinimalFirst,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosisConfig {
    pub strategy: Strategy,
    /// Cap on assignments reported by exhaustive enumeration
    /// (`None` = unbounded).
    pub max_solutions: Option<usize>,
    /// Cap on minimal diagnoses returned by `MinimalFirst`
    /// (`None` = unbounded).
    pub max_diagnoses: Option<usize>,

    // --- Anomaly monitor ---
    /// Consecutive ticks an actuator may be commanded without effect
    /// before a diagnosis is requested.
    pub anomaly_sustain_ticks: u32,
}

impl Default for DiagnosisConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::MinimalFirst,
            max_solutions: Some(1 << 16),
            max_diagnoses: None,
            anomaly_sustain_ticks: 30,
        }
    }
}

impl DiagnosisConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| Error::Json(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_solutions == Some(0) {
            return Err(Error::Config("max_solutions must be positive"));
        }
        if self.max_diagnoses == Some(0) {
            return Err(Error::Config("max_diagnoses must be positive"));
        }
        if self.anomaly_sustain_ticks == 0 {
            return Err(Error::Config("anomaly_sustain_ticks must be positive"));
        }
        Ok(())
    }
}
