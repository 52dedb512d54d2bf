//! Causal model builder.
//!
//! Compiles a [`Topology`] into the boolean theory of normal operation:
//! one declared variable per relation key and one biconditional per causal
//! rule.
//!
//! | Rule              | Biconditional                                                     |
//! |-------------------|-------------------------------------------------------------------|
//! | power source      | `powered(src)`                                                    |
//! | power feed        | `powered(n) ⇔ connected(p,n) ∧ working(p) ∧ powered(p)`           |
//! | actuator feed     | `... ∧ signal(a,p)` (the command must reach the driver)           |
//! | sensor generation | `signal(s,s) ⇔ working(s)`                                        |
//! | signal hop        | `signal(x,v) ⇔ connected(u,v) ∧ working(u) ∧ signal(x,u)`         |
//! | expected result   | `expected-result(a) ⇔ signal(a,c) ∧ powered(a) ∧ working(a) ∧ ∨ signal(s,c)` |
//!
//! Every rule must be a true biconditional: a one-way implication leaves
//! derived facts free and lets the solver "explain" anomalies with no
//! broken component at all.

use std::collections::BTreeMap;

use log::debug;

use crate::error::{Error, Result};
use crate::formula::{Clause, Formula};
use crate::relation::{NodeId, RelationKey};
use crate::topology::Topology;

// ───────────────────────────────────────────────────────────────
// Namespace
// ───────────────────────────────────────────────────────────────

/// Dense variable index assigned to a declared key.
pub type VarIndex = u32;

/// Declared relation keys and their variable indices.
///
/// Indices follow key order, so the same topology always yields the same
/// numbering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Namespace {
    index: BTreeMap<RelationKey, VarIndex>,
    keys: Vec<RelationKey>,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a key, returning its index.  Re-declaring is a no-op.
    pub fn declare(&mut self, key: RelationKey) -> VarIndex {
        if let Some(&idx) = self.index.get(&key) {
            return idx;
        }
        let idx = self.keys.len() as VarIndex;
        self.index.insert(key.clone(), idx);
        self.keys.push(key);
        idx
    }

    pub fn index_of(&self, key: &RelationKey) -> Result<VarIndex> {
        self.index
            .get(key)
            .copied()
            .ok_or_else(|| Error::UndeclaredKey(key.clone()))
    }

    pub fn contains(&self, key: &RelationKey) -> bool {
        self.index.contains_key(key)
    }

    pub fn key(&self, idx: VarIndex) -> Option<&RelationKey> {
        self.keys.get(idx as usize)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Keys in index order.
    pub fn keys(&self) -> impl Iterator<Item = &RelationKey> {
        self.keys.iter()
    }

    /// `working`/`connected` keys in index order.
    pub fn structural_keys(&self) -> impl Iterator<Item = &RelationKey> {
        self.keys.iter().filter(|k| k.is_structural())
    }
}

// ───────────────────────────────────────────────────────────────
// Causal model
// ───────────────────────────────────────────────────────────────

/// Declared variables plus the constraints over them.
#[derive(Debug, Clone, Default)]
pub struct CausalModel {
    namespace: Namespace,
    constraints: Vec<Formula>,
}

impl CausalModel {
    /// An empty model over an explicit key set (no rules).
    pub fn with_keys(keys: impl IntoIterator<Item = RelationKey>) -> Self {
        let mut namespace = Namespace::new();
        for key in keys {
            namespace.declare(key);
        }
        Self {
            namespace,
            constraints: Vec::new(),
        }
    }

    /// Build the full causal model of `topology`.
    pub fn build(topology: &Topology) -> Result<Self> {
        topology.validate()?;
        let mut model = Self::with_keys(topology.relation_keys()?);

        model.add_power_rules(topology)?;
        model.add_sensor_generation_rules(topology)?;
        model.add_signal_rules(topology)?;
        model.add_expected_result_rules(topology)?;

        debug!(
            "causal model: {} variables, {} constraints",
            model.namespace.len(),
            model.constraints.len()
        );
        Ok(model)
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn constraints(&self) -> &[Formula] {
        &self.constraints
    }

    /// Add a constraint.  Every key it mentions must be declared.
    pub fn add_constraint(&mut self, formula: Formula) -> Result<()> {
        if let Some(undeclared) = formula.keys().into_iter().find(|k| !self.namespace.contains(k)) {
            return Err(Error::UndeclaredKey(undeclared.clone()));
        }
        self.constraints.push(formula);
        Ok(())
    }

    /// All constraints in clause form.
    pub fn clauses(&self) -> Vec<Clause> {
        self.constraints.iter().flat_map(Formula::to_clauses).collect()
    }

    /// Check a total valuation against every constraint.
    pub fn is_satisfied_by(&self, value_of: &impl Fn(&RelationKey) -> Option<bool>) -> bool {
        self.constraints
            .iter()
            .all(|c| c.eval(value_of) == Some(true))
    }

    // ── Rules ─────────────────────────────────────────────────

    fn add_power_rules(&mut self, topology: &Topology) -> Result<()> {
        for src in topology.power_sources() {
            self.add_constraint(Formula::var(RelationKey::Powered(src.clone())))?;
        }

        for edge in &topology.power_edges {
            let (feed, node) = (&edge.from, &edge.to);
            let mut conditions = vec![
                Formula::var(edge.connected_key()),
                Formula::var(RelationKey::Working(feed.clone())),
                Formula::var(RelationKey::Powered(feed.clone())),
            ];
            if topology.actuators().any(|a| a == node) {
                conditions.push(Formula::var(RelationKey::signal(node.clone(), feed.clone())));
            }
            self.add_constraint(Formula::iff(
                Formula::var(RelationKey::Powered(node.clone())),
                Formula::and(conditions),
            ))?;
        }
        Ok(())
    }

    fn add_sensor_generation_rules(&mut self, topology: &Topology) -> Result<()> {
        for s in topology.sensors() {
            self.add_constraint(Formula::iff(
                Formula::var(RelationKey::signal(s.clone(), s.clone())),
                Formula::var(RelationKey::Working(s.clone())),
            ))?;
        }
        Ok(())
    }

    fn add_signal_rules(&mut self, topology: &Topology) -> Result<()> {
        let routes = topology
            .sensor_routes()?
            .into_iter()
            .chain(topology.command_routes()?);
        for route in routes {
            for (from, to) in route.hops() {
                self.add_constraint(hop_rule(&route.origin, from, to))?;
            }
        }
        Ok(())
    }

    fn add_expected_result_rules(&mut self, topology: &Topology) -> Result<()> {
        let central = &topology.central;
        for a in topology.actuators() {
            let sensor_reports = topology
                .associated_sensors(a)
                .iter()
                .map(|s| Formula::var(RelationKey::signal(s.clone(), central.clone())));

            self.add_constraint(Formula::iff(
                Formula::var(RelationKey::ExpectedResult(a.clone())),
                Formula::and([
                    Formula::var(RelationKey::signal(a.clone(), central.clone())),
                    Formula::var(RelationKey::Powered(a.clone())),
                    Formula::var(RelationKey::Working(a.clone())),
                    Formula::or(sensor_reports),
                ]),
            ))?;
        }
        Ok(())
    }
}

/// `signal(origin, to) ⇔ connected(from, to) ∧ working(from) ∧ signal(origin, from)`
fn hop_rule(origin: &NodeId, from: &NodeId, to: &NodeId) -> Formula {
    Formula::iff(
        Formula::var(RelationKey::signal(origin.clone(), to.clone())),
        Formula::and([
            Formula::var(RelationKey::connected(from.clone(), to.clone())),
            Formula::var(RelationKey::Working(from.clone())),
            Formula::var(RelationKey::signal(origin.clone(), from.clone())),
        ]),
    )
}
