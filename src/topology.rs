//! Hardware topology: nodes, power/signal wiring and sensor associations.
//!
//! A [`Topology`] is static configuration: it never changes while the
//! device runs, and every diagnosis request builds its causal model from
//! it.  The built-in [`Topology::greenhouse`] describes the reference
//! greenhouse rig; other rigs are loaded with [`Topology::from_json`].
//!
//! ```text
//!   Outlet ──▶ Rasp-Pi              (power)
//!   Outlet ──▶ Power-Board ──▶ Fans / LEDs / Pump
//!
//!   H-T0, Light0, Moisture0 ──▶ Sensor-Board0 ─┐
//!   H-T1, Light1, Moisture1 ──▶ Sensor-Board1 ─┼─▶ Arduino ◀──▶ Rasp-Pi
//!   Wlevel ────────────────────────────────────┘      │
//!                                                     └──▶ Power-Board
//! ```
//!
//! Each signal origin is modelled along a single route, the shortest path
//! in declaration order.  A redundant second path is not credited: a break
//! on the chosen route is blamed even if another path could still carry
//! the signal.  Power must flow as a tree rooted at a power source.

use core::fmt;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::relation::{NodeId, RelationKey};

// ───────────────────────────────────────────────────────────────
// Components and edges
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComponentKind {
    PowerSource,
    Board,
    Controller,
    Sensor,
    Actuator,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    pub id: NodeId,
    pub kind: ComponentKind,
}

impl Component {
    pub fn new(id: impl Into<NodeId>, kind: ComponentKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }
}

/// A directed physical link.  A bidirectional link is two edges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
}

impl Edge {
    pub fn new(from: impl Into<NodeId>, to: impl Into<NodeId>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn connected_key(&self) -> RelationKey {
        RelationKey::Connected(self.from.clone(), self.to.clone())
    }
}

/// Sensors whose readings drive an actuator's control decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Association {
    pub actuator: NodeId,
    pub sensors: Vec<NodeId>,
}

// ───────────────────────────────────────────────────────────────
// Topology
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    pub components: Vec<Component>,
    pub power_edges: Vec<Edge>,
    pub signal_edges: Vec<Edge>,
    /// The decision point: sensor signals are routed to it and actuator
    /// commands originate from it.
    pub central: NodeId,
    pub associations: Vec<Association>,
}

/// A signal path, origin first.  `nodes[0]` is where the signal starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub origin: NodeId,
    pub nodes: Vec<NodeId>,
}

impl Route {
    /// Consecutive `(from, to)` hops along the route.
    pub fn hops(&self) -> impl Iterator<Item = (&NodeId, &NodeId)> {
        self.nodes.windows(2).map(|w| (&w[0], &w[1]))
    }
}

impl Topology {
    /// The reference greenhouse rig.
    pub fn greenhouse() -> Self {
        use ComponentKind::{Actuator, Board, Controller, PowerSource, Sensor};

        let components = [
            ("Outlet", PowerSource),
            ("Rasp-Pi", Controller),
            ("Power-Board", Board),
            ("Arduino", Controller),
            ("Sensor-Board0", Board),
            ("Sensor-Board1", Board),
            ("Fans", Actuator),
            ("LEDs", Actuator),
            ("Pump", Actuator),
            ("H-T0", Sensor),
            ("Light0", Sensor),
            ("Moisture0", Sensor),
            ("H-T1", Sensor),
            ("Light1", Sensor),
            ("Moisture1", Sensor),
            ("Wlevel", Sensor),
        ]
        .into_iter()
        .map(|(id, kind)| Component::new(id, kind))
        .collect();

        let power_edges = [
            ("Outlet", "Rasp-Pi"),
            ("Outlet", "Power-Board"),
            ("Power-Board", "Fans"),
            ("Power-Board", "LEDs"),
            ("Power-Board", "Pump"),
        ]
        .into_iter()
        .map(|(a, b)| Edge::new(a, b))
        .collect();

        let signal_edges = [
            ("H-T0", "Sensor-Board0"),
            ("Light0", "Sensor-Board0"),
            ("Moisture0", "Sensor-Board0"),
            ("H-T1", "Sensor-Board1"),
            ("Light1", "Sensor-Board1"),
            ("Moisture1", "Sensor-Board1"),
            ("Wlevel", "Arduino"),
            ("Sensor-Board0", "Arduino"),
            ("Sensor-Board1", "Arduino"),
            ("Arduino", "Rasp-Pi"),
            ("Rasp-Pi", "Arduino"),
            ("Arduino", "Power-Board"),
        ]
        .into_iter()
        .map(|(a, b)| Edge::new(a, b))
        .collect();

        let associations = [
            ("Fans", &["H-T0", "H-T1"][..]),
            ("LEDs", &["Light0", "Light1"][..]),
            ("Pump", &["Moisture0", "Moisture1", "Wlevel"][..]),
        ]
        .into_iter()
        .map(|(actuator, sensors)| Association {
            actuator: actuator.into(),
            sensors: sensors.iter().map(|s| NodeId::from(*s)).collect(),
        })
        .collect();

        Self {
            components,
            power_edges,
            signal_edges,
            central: "Rasp-Pi".into(),
            associations,
        }
    }

    /// Parse and validate a topology from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let topology: Self = serde_json::from_str(json).map_err(|e| Error::Json(e.to_string()))?;
        topology.validate()?;
        Ok(topology)
    }

    pub fn component(&self, id: &NodeId) -> Option<&Component> {
        self.components.iter().find(|c| &c.id == id)
    }

    pub fn ids_of(&self, kind: ComponentKind) -> impl Iterator<Item = &NodeId> {
        self.components
            .iter()
            .filter(move |c| c.kind == kind)
            .map(|c| &c.id)
    }

    pub fn sensors(&self) -> impl Iterator<Item = &NodeId> {
        self.ids_of(ComponentKind::Sensor)
    }

    pub fn actuators(&self) -> impl Iterator<Item = &NodeId> {
        self.ids_of(ComponentKind::Actuator)
    }

    pub fn power_sources(&self) -> impl Iterator<Item = &NodeId> {
        self.ids_of(ComponentKind::PowerSource)
    }

    /// The node feeding power to `node`, if any.
    pub fn power_feed(&self, node: &NodeId) -> Option<&NodeId> {
        self.power_edges
            .iter()
            .find(|e| &e.to == node)
            .map(|e| &e.from)
    }

    /// Sensors associated with `actuator` (empty when unknown).
    pub fn associated_sensors(&self, actuator: &NodeId) -> &[NodeId] {
        self.associations
            .iter()
            .find(|a| &a.actuator == actuator)
            .map_or(&[], |a| a.sensors.as_slice())
    }

    /// Shortest directed signal path `from → to`, neighbours explored in
    /// declaration order.
    pub fn signal_path(&self, from: &NodeId, to: &NodeId) -> Option<Vec<NodeId>> {
        let mut parent: BTreeMap<&NodeId, &NodeId> = BTreeMap::new();
        let mut seen: BTreeSet<&NodeId> = BTreeSet::from([from]);
        let mut queue = VecDeque::from([from]);

        while let Some(node) = queue.pop_front() {
            if node == to {
                let mut path = vec![node.clone()];
                let mut cur = node;
                while let Some(prev) = parent.get(cur) {
                    path.push((*prev).clone());
                    cur = *prev;
                }
                path.reverse();
                return Some(path);
            }
            for edge in self.signal_edges.iter().filter(|e| &e.from == node) {
                if seen.insert(&edge.to) {
                    parent.insert(&edge.to, node);
                    queue.push_back(&edge.to);
                }
            }
        }
        None
    }

    /// Route of each sensor's reading to the central unit.
    pub fn sensor_routes(&self) -> Result<Vec<Route>> {
        self.sensors()
            .map(|s| {
                self.signal_path(s, &self.central)
                    .map(|nodes| Route {
                        origin: s.clone(),
                        nodes,
                    })
                    .ok_or_else(|| TopologyError::SensorUnreachable(s.clone()).into())
            })
            .collect()
    }

    /// Route of each actuator's command from the central unit to the
    /// board that drives (powers) the actuator.
    pub fn command_routes(&self) -> Result<Vec<Route>> {
        self.actuators()
            .map(|a| {
                let driver = self
                    .power_feed(a)
                    .ok_or_else(|| TopologyError::Unpowered(a.clone()))?;
                let nodes = self
                    .signal_path(&self.central, driver)
                    .ok_or_else(|| TopologyError::DriverUnreachable {
                        actuator: a.clone(),
                        driver: driver.clone(),
                    })?;
                Ok(Route {
                    origin: a.clone(),
                    nodes,
                })
            })
            .collect()
    }

    /// The complete, deterministic ground set of relation keys.
    pub fn relation_keys(&self) -> Result<BTreeSet<RelationKey>> {
        let mut keys = BTreeSet::new();

        for c in &self.components {
            keys.insert(RelationKey::Working(c.id.clone()));
        }
        for edge in self.power_edges.iter().chain(&self.signal_edges) {
            keys.insert(edge.connected_key());
        }
        for src in self.power_sources() {
            keys.insert(RelationKey::Powered(src.clone()));
        }
        for edge in &self.power_edges {
            keys.insert(RelationKey::Powered(edge.to.clone()));
        }
        for route in self.sensor_routes()? {
            for at in &route.nodes {
                keys.insert(RelationKey::signal(route.origin.clone(), at.clone()));
            }
        }
        for route in self.command_routes()? {
            for at in &route.nodes {
                keys.insert(RelationKey::signal(route.origin.clone(), at.clone()));
            }
        }
        for a in self.actuators() {
            keys.insert(RelationKey::ExpectedResult(a.clone()));
        }
        Ok(keys)
    }

    /// Structural consistency checks.  Every model build runs this first.
    pub fn validate(&self) -> Result<()> {
        let mut ids = BTreeSet::new();
        for c in &self.components {
            NodeId::parse(c.id.as_str())
                .map_err(|_| TopologyError::BadIdentifier(c.id.clone()))?;
            if !ids.insert(&c.id) {
                return Err(TopologyError::DuplicateNode(c.id.clone()).into());
            }
        }

        let known = |id: &NodeId| -> Result<()> {
            if ids.contains(id) {
                Ok(())
            } else {
                Err(TopologyError::UnknownNode(id.clone()).into())
            }
        };

        known(&self.central)?;
        for edge in self.power_edges.iter().chain(&self.signal_edges) {
            known(&edge.from)?;
            known(&edge.to)?;
        }
        if self.power_sources().next().is_none() {
            return Err(TopologyError::NoPowerSource.into());
        }

        let mut fed = BTreeSet::new();
        for edge in &self.power_edges {
            if !fed.insert(&edge.to) {
                return Err(TopologyError::MultiplePowerFeeds(edge.to.clone()).into());
            }
        }

        for edge in &self.power_edges {
            if self.power_sources().any(|s| s == &edge.to) {
                return Err(TopologyError::PowerIntoSource(edge.to.clone()).into());
            }
        }
        for edge in &self.power_edges {
            self.trace_power_source(&edge.to)?;
        }

        for assoc in &self.associations {
            match self.component(&assoc.actuator) {
                Some(c) if c.kind == ComponentKind::Actuator => {}
                _ => return Err(TopologyError::NotAnActuator(assoc.actuator.clone()).into()),
            }
            for s in &assoc.sensors {
                match self.component(s) {
                    Some(c) if c.kind == ComponentKind::Sensor => {}
                    _ => return Err(TopologyError::NotASensor(s.clone()).into()),
                }
            }
        }
        for a in self.actuators() {
            if self.associated_sensors(a).is_empty() {
                return Err(TopologyError::NoAssociatedSensors(a.clone()).into());
            }
        }

        self.sensor_routes()?;
        self.command_routes()?;
        Ok(())
    }

    /// Follow power feeds upstream from `node`; they must end at a power
    /// source without revisiting a node.
    fn trace_power_source(&self, node: &NodeId) -> Result<()> {
        let mut seen = BTreeSet::from([node]);
        let mut cur = node;
        while let Some(feed) = self.power_feed(cur) {
            if !seen.insert(feed) {
                return Err(TopologyError::NoPathToSource(node.clone()).into());
            }
            cur = feed;
        }
        match self.component(cur) {
            Some(c) if c.kind == ComponentKind::PowerSource => Ok(()),
            _ => Err(TopologyError::NoPathToSource(node.clone()).into()),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Topology errors
// ───────────────────────────────────────────────────────────────

/// Modelling defects in a hardware description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopologyError {
    DuplicateNode(NodeId),
    UnknownNode(NodeId),
    BadIdentifier(NodeId),
    NoPowerSource,
    MultiplePowerFeeds(NodeId),
    /// A power edge leads into a power source.
    PowerIntoSource(NodeId),
    /// Following the node's power feeds loops or dead-ends before a source.
    NoPathToSource(NodeId),
    /// Actuator has no power edge leading into it.
    Unpowered(NodeId),
    SensorUnreachable(NodeId),
    DriverUnreachable { actuator: NodeId, driver: NodeId },
    NotAnActuator(NodeId),
    NotASensor(NodeId),
    NoAssociatedSensors(NodeId),
}

impl std::error::Error for TopologyError {}

impl fmt::Display for TopologyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateNode(n) => write!(f, "node '{n}' declared twice"),
            Self::UnknownNode(n) => write!(f, "edge or central unit references unknown node '{n}'"),
            Self::BadIdentifier(n) => write!(f, "node id '{n}' is not a valid identifier"),
            Self::NoPowerSource => write!(f, "no power source declared"),
            Self::MultiplePowerFeeds(n) => write!(f, "node '{n}' has more than one power feed"),
            Self::PowerIntoSource(n) => write!(f, "power source '{n}' is fed by a power edge"),
            Self::NoPathToSource(n) => {
                write!(f, "power feeding '{n}' does not trace back to a power source")
            }
            Self::Unpowered(n) => write!(f, "actuator '{n}' has no power feed"),
            Self::SensorUnreachable(n) => {
                write!(f, "sensor '{n}' has no signal route to the central unit")
            }
            Self::DriverUnreachable { actuator, driver } => write!(
                f,
                "driver '{driver}' of actuator '{actuator}' is unreachable from the central unit"
            ),
            Self::NotAnActuator(n) => write!(f, "association target '{n}' is not an actuator"),
            Self::NotASensor(n) => write!(f, "associated node '{n}' is not a sensor"),
            Self::NoAssociatedSensors(n) => write!(f, "actuator '{n}' has no associated sensors"),
        }
    }
}
