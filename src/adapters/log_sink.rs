//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing diagnosis events through the `log`
//! facade.  A dashboard or alerting adapter would implement the same trait.

use log::{error, info, warn};

use crate::app::events::DiagnosisEvent;
use crate::app::ports::EventSink;
use crate::diagnosis::Verdict;

/// Adapter that logs every [`DiagnosisEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &DiagnosisEvent) {
        match event {
            DiagnosisEvent::AnomalyDetected { actuator, ticks } => {
                warn!("ANOMALY | {actuator} | no effect for {ticks} ticks");
            }
            DiagnosisEvent::Diagnosed {
                actuator,
                verdict,
                diagnoses,
            } => match verdict {
                Verdict::Healthy => {
                    info!("DIAG | {actuator} | healthy (command or sensors not confirmed)");
                }
                Verdict::Faulty => {
                    let suspects: Vec<String> =
                        diagnoses.suspects().iter().map(ToString::to_string).collect();
                    info!(
                        "DIAG | {actuator} | {} candidate(s): {diagnoses} | suspects: {}",
                        diagnoses.len(),
                        suspects.join(", ")
                    );
                }
                Verdict::UnsatisfiableObservation => {
                    warn!("DIAG | {actuator} | observations contradict the model");
                }
            },
            DiagnosisEvent::DiagnosisFailed { actuator, error: e } => {
                error!("DIAG | {actuator} | request failed: {e}");
            }
            DiagnosisEvent::AnomalyCleared { actuator } => {
                info!("ANOMALY | {actuator} | cleared");
            }
        }
    }
}
