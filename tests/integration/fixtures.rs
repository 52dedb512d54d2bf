//! Shared topologies, observation builders and a recording sink.

use std::collections::BTreeSet;

use greenhouse_diagnosis::app::events::DiagnosisEvent;
use greenhouse_diagnosis::app::ports::EventSink;
use greenhouse_diagnosis::{CausalModel, Diagnosis, Observations, RelationKey, Topology};

/// Outlet → Power-Board → Pump, one moisture sensor reporting through the
/// Arduino to the Raspberry Pi.
pub const LINEAR_CHAIN_JSON: &str = r#"{
    "components": [
        {"id": "Outlet",      "kind": "power-source"},
        {"id": "Power-Board", "kind": "board"},
        {"id": "Pump",        "kind": "actuator"},
        {"id": "Moisture0",   "kind": "sensor"},
        {"id": "Arduino",     "kind": "controller"},
        {"id": "Rasp-Pi",     "kind": "controller"}
    ],
    "power_edges": [
        {"from": "Outlet",      "to": "Power-Board"},
        {"from": "Power-Board", "to": "Pump"}
    ],
    "signal_edges": [
        {"from": "Moisture0", "to": "Arduino"},
        {"from": "Arduino",   "to": "Rasp-Pi"},
        {"from": "Rasp-Pi",   "to": "Arduino"},
        {"from": "Arduino",   "to": "Power-Board"}
    ],
    "central": "Rasp-Pi",
    "associations": [
        {"actuator": "Pump", "sensors": ["Moisture0"]}
    ]
}"#;

/// The pump failed although it, its link and its command path are fine.
pub const PUMP_FAILURE_JSON: &str = r#"{
    "expected-result(Pump)": false,
    "working(Pump)": true,
    "working(Outlet)": true,
    "connected(Power-Board,Pump)": true,
    "signal(Pump,Power-Board)": true,
    "signal(Moisture0,Rasp-Pi)": true
}"#;

pub fn linear_chain() -> Topology {
    Topology::from_json(LINEAR_CHAIN_JSON).unwrap()
}

pub fn key(s: &str) -> RelationKey {
    s.parse().unwrap()
}

pub fn diag(keys: &[&str]) -> Diagnosis {
    keys.iter().map(|k| key(k)).collect()
}

/// `observed` plus every structural key outside `unknown` forced true.
pub fn pin_structure(
    model: &CausalModel,
    unknown: &[&str],
    observed: &[(&str, bool)],
) -> Observations {
    let unknown: BTreeSet<RelationKey> = unknown.iter().map(|k| key(k)).collect();
    let mut obs: Observations = observed.iter().map(|(k, v)| (key(k), *v)).collect();
    for k in model.namespace().structural_keys() {
        if !unknown.contains(k) && !obs.literals().iter().any(|l| &l.key == k) {
            obs.observe(k.clone(), true);
        }
    }
    obs
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<DiagnosisEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<&DiagnosisEvent> {
        self.events.last()
    }

    pub fn count<F: Fn(&DiagnosisEvent) -> bool>(&self, pred: F) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &DiagnosisEvent) {
        self.events.push(event.clone());
    }
}
