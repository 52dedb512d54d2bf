//! Anomaly monitor.
//!
//! Runs once per control tick with the latest actuator readings and
//! decides when a diagnosis is worth requesting.
//!
//! ## Anomaly lifecycle
//!
//! 1. An actuator is commanded but its effect is not observed.
//! 2. The monitor counts consecutive ticks in that condition.
//! 3. Once the count exceeds `anomaly_sustain_ticks` the actuator is
//!    latched and one diagnosis request runs.  The request observes
//!    `expected-result(a)=false`, `signal(a,central)=true` (the command was
//!    issued) and every fact confirmed with [`AnomalyMonitor::confirm`].
//! 4. A latched actuator stays latched, without further requests, until
//!    its effect is observed again.

use std::collections::BTreeMap;

use log::{error, info, warn};

use super::events::DiagnosisEvent;
use super::ports::EventSink;
use crate::config::DiagnosisConfig;
use crate::diagnosis::{DiagnosisSet, Observations, diagnose_model};
use crate::error::{Error, Result};
use crate::model::CausalModel;
use crate::relation::{NodeId, RelationKey};
use crate::topology::{ComponentKind, Topology};

/// One actuator's state for the current tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActuatorReading {
    pub actuator: NodeId,
    /// The routine asked for the actuator this tick.
    pub commanded: bool,
    /// Its expected result was seen by the associated sensors.
    pub effect_observed: bool,
}

impl ActuatorReading {
    pub fn new(actuator: impl Into<NodeId>, commanded: bool, effect_observed: bool) -> Self {
        Self {
            actuator: actuator.into(),
            commanded,
            effect_observed,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Track {
    ticks_without_effect: u32,
    latched: bool,
}

/// Anomaly monitor.
pub struct AnomalyMonitor {
    model: CausalModel,
    central: NodeId,
    config: DiagnosisConfig,
    /// Facts an operator or a self-test has confirmed.
    confirmed: BTreeMap<RelationKey, bool>,
    tracks: BTreeMap<NodeId, Track>,
}

impl AnomalyMonitor {
    pub fn new(topology: &Topology, config: DiagnosisConfig) -> Result<Self> {
        config.validate()?;
        let model = CausalModel::build(topology)?;
        let tracks = topology
            .actuators()
            .map(|a| (a.clone(), Track::default()))
            .collect();
        Ok(Self {
            model,
            central: topology.central.clone(),
            config,
            confirmed: BTreeMap::new(),
            tracks,
        })
    }

    /// Record a confirmed fact for every later request.
    pub fn confirm(&mut self, key: RelationKey, value: bool) -> Result<()> {
        if !self.model.namespace().contains(&key) {
            return Err(Error::UndeclaredKey(key));
        }
        self.confirmed.insert(key, value);
        Ok(())
    }

    /// Drop every confirmed fact (e.g. after a repair).
    pub fn clear_confirmed(&mut self) {
        self.confirmed.clear();
    }

    /// Evaluate one tick of readings.
    pub fn evaluate(&mut self, readings: &[ActuatorReading], sink: &mut impl EventSink) {
        for reading in readings {
            let Some(track) = self.tracks.get_mut(&reading.actuator) else {
                warn!(
                    "monitor: ignoring reading for {}, not a declared {:?}",
                    reading.actuator,
                    ComponentKind::Actuator
                );
                continue;
            };

            if reading.effect_observed {
                if track.latched {
                    info!("ANOMALY CLEARED: {}", reading.actuator);
                    sink.emit(&DiagnosisEvent::AnomalyCleared {
                        actuator: reading.actuator.clone(),
                    });
                }
                *track = Track::default();
                continue;
            }

            if !reading.commanded {
                track.ticks_without_effect = 0;
                continue;
            }

            track.ticks_without_effect = track.ticks_without_effect.saturating_add(1);
            if track.latched || track.ticks_without_effect <= self.config.anomaly_sustain_ticks {
                continue;
            }

            track.latched = true;
            let ticks = track.ticks_without_effect;
            error!("ANOMALY: {} commanded for {ticks} ticks without effect", reading.actuator);
            sink.emit(&DiagnosisEvent::AnomalyDetected {
                actuator: reading.actuator.clone(),
                ticks,
            });

            let event = match self.run_diagnosis(&reading.actuator) {
                Ok(diagnoses) => DiagnosisEvent::Diagnosed {
                    actuator: reading.actuator.clone(),
                    verdict: diagnoses.verdict(),
                    diagnoses,
                },
                Err(error) => {
                    error!("diagnosis for {} failed: {error}", reading.actuator);
                    DiagnosisEvent::DiagnosisFailed {
                        actuator: reading.actuator.clone(),
                        error,
                    }
                }
            };
            sink.emit(&event);
        }
    }

    /// Observations describing an anomaly on `actuator`.
    pub fn observations_for(&self, actuator: &NodeId) -> Observations {
        let mut facts = self.confirmed.clone();
        facts.insert(RelationKey::ExpectedResult(actuator.clone()), false);
        facts.insert(RelationKey::signal(actuator.clone(), self.central.clone()), true);
        facts.into_iter().collect()
    }

    fn run_diagnosis(&self, actuator: &NodeId) -> Result<DiagnosisSet> {
        let observations = self.observations_for(actuator);
        diagnose_model(&self.model, &observations, &self.config)
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn is_latched(&self, actuator: &NodeId) -> bool {
        self.tracks.get(actuator).is_some_and(|t| t.latched)
    }

    /// Latched actuators in name order.
    pub fn latched(&self) -> impl Iterator<Item = &NodeId> {
        self.tracks
            .iter()
            .filter(|(_, t)| t.latched)
            .map(|(id, _)| id)
    }

    pub fn ticks_without_effect(&self, actuator: &NodeId) -> u32 {
        self.tracks
            .get(actuator)
            .map_or(0, |t| t.ticks_without_effect)
    }

    pub fn model(&self) -> &CausalModel {
        &self.model
    }
}
