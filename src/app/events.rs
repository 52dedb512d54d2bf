//! Outbound diagnosis events.
//!
//! The [`AnomalyMonitor`](super::monitor::AnomalyMonitor) emits these
//! through the [`EventSink`](super::ports::EventSink) port.  Adapters on
//! the other side decide what to do with them.

use crate::diagnosis::{DiagnosisSet, Verdict};
use crate::error::Error;
use crate::relation::NodeId;

/// Structured events emitted by the monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosisEvent {
    /// An actuator stayed commanded without effect past the sustain window.
    AnomalyDetected { actuator: NodeId, ticks: u32 },

    /// A diagnosis request for the anomaly completed.
    Diagnosed {
        actuator: NodeId,
        verdict: Verdict,
        diagnoses: DiagnosisSet,
    },

    /// The diagnosis request itself failed.
    DiagnosisFailed { actuator: NodeId, error: Error },

    /// A latched actuator produced its effect again.
    AnomalyCleared { actuator: NodeId },
}

impl DiagnosisEvent {
    /// The actuator the event concerns.
    pub fn actuator(&self) -> &NodeId {
        match self {
            Self::AnomalyDetected { actuator, .. }
            | Self::Diagnosed { actuator, .. }
            | Self::DiagnosisFailed { actuator, .. }
            | Self::AnomalyCleared { actuator } => actuator,
        }
    }
}
