//! Port traits at the boundary between the diagnosis core and whatever
//! consumes its results.
//!
//! ```text
//!   AnomalyMonitor ──▶ EventSink ──▶ Adapter (log, dashboard, alerting)
//! ```

use super::events::DiagnosisEvent;

// ───────────────────────────────────────────────────────────────
// Event sink (driven adapter: domain → outside world)
// ───────────────────────────────────────────────────────────────

/// Outbound port for structured diagnosis events.
pub trait EventSink {
    fn emit(&mut self, event: &DiagnosisEvent);
}

/// Collects events in memory.  Handy for tests and for batching reports.
impl EventSink for Vec<DiagnosisEvent> {
    fn emit(&mut self, event: &DiagnosisEvent) {
        self.push(event.clone());
    }
}
