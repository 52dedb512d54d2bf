//! Diagnosis extraction, minimality filtering and the request entry point.
//!
//! A diagnosis is the set of structural facts (`working`, `connected`) that
//! are false in a model of *causal rules ∧ observations*.  The answer to a
//! request is the set of subset-minimal diagnoses, ordered
//! lexicographically over each diagnosis's sorted keys.
//!
//! ```text
//!   Topology ─▶ CausalModel ─▶ SolverSession (+ observations)
//!                                     │
//!                 Exhaustive:   enumerate_all ─▶ signatures ─▶ minimal_diagnoses
//!                 MinimalFirst: solve ─▶ shrink ─▶ block supersets ─▶ repeat
//!                                     │
//!                                     ▼
//!                               DiagnosisSet
//! ```

use core::fmt;
use core::ops::ControlFlow;
use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::config::{DiagnosisConfig, Strategy};
use crate::error::{Error, Result};
use crate::model::CausalModel;
use crate::relation::{Literal, RelationKey};
use crate::solver::{Assignment, SolverSession};
use crate::topology::Topology;

// ───────────────────────────────────────────────────────────────
// Observations
// ───────────────────────────────────────────────────────────────

/// Forced literals describing what was actually seen.
///
/// Order is preserved and contradictions are kept: observing a key both
/// true and false makes the request unsatisfiable rather than silently
/// picking one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Observations {
    literals: Vec<Literal>,
}

impl Observations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style: observe `key` with `value`.
    pub fn with(mut self, key: RelationKey, value: bool) -> Self {
        self.observe(key, value);
        self
    }

    pub fn observe(&mut self, key: RelationKey, value: bool) {
        self.literals.push(Literal::new(key, value));
    }

    pub fn extend(&mut self, other: &Observations) {
        self.literals.extend(other.literals.iter().cloned());
    }

    pub fn literals(&self) -> &[Literal] {
        &self.literals
    }

    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }

    /// Parse `{"expected-result(Fans)": false, "working(Rasp-Pi)": true}`.
    pub fn from_json(json: &str) -> Result<Self> {
        let map: BTreeMap<RelationKey, bool> =
            serde_json::from_str(json).map_err(|e| Error::Json(e.to_string()))?;
        Ok(map.into_iter().collect())
    }
}

impl FromIterator<(RelationKey, bool)> for Observations {
    fn from_iter<I: IntoIterator<Item = (RelationKey, bool)>>(iter: I) -> Self {
        Self {
            literals: iter
                .into_iter()
                .map(|(key, value)| Literal::new(key, value))
                .collect(),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Diagnosis
// ───────────────────────────────────────────────────────────────

/// Structural facts that are false in one explanation.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diagnosis(BTreeSet<RelationKey>);

impl Diagnosis {
    /// The empty diagnosis: nothing is broken.
    pub fn healthy() -> Self {
        Self::default()
    }

    /// Extract the signature of one solution.
    pub fn from_assignment(assignment: &Assignment<'_>) -> Self {
        Self(
            assignment
                .iter()
                .filter(|(key, value)| key.is_structural() && !value)
                .map(|(key, _)| key.clone())
                .collect(),
        )
    }

    pub fn keys(&self) -> impl Iterator<Item = &RelationKey> {
        self.0.iter()
    }

    pub fn contains(&self, key: &RelationKey) -> bool {
        self.0.contains(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_subset(&self, other: &Diagnosis) -> bool {
        self.0.is_subset(&other.0)
    }

    /// Strictly contains `other`.
    pub fn is_strict_superset(&self, other: &Diagnosis) -> bool {
        self.0.len() > other.0.len() && self.0.is_superset(&other.0)
    }
}

impl FromIterator<RelationKey> for Diagnosis {
    fn from_iter<I: IntoIterator<Item = RelationKey>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, key) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}")?;
        }
        f.write_str("}")
    }
}

// ───────────────────────────────────────────────────────────────
// Diagnosis set
// ───────────────────────────────────────────────────────────────

/// What a diagnosis request concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The observation is consistent with a fully healthy device.
    Healthy,
    /// At least one fault is required to explain the observation.
    Faulty,
    /// No assignment of faults explains the observation.
    UnsatisfiableObservation,
}

/// Deduplicated, subset-minimal, ordered diagnoses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiagnosisSet(Vec<Diagnosis>);

impl DiagnosisSet {
    pub fn as_slice(&self) -> &[Diagnosis] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnosis> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn verdict(&self) -> Verdict {
        match self.0.as_slice() {
            [] => Verdict::UnsatisfiableObservation,
            [only] if only.is_empty() => Verdict::Healthy,
            _ => Verdict::Faulty,
        }
    }

    /// Every structural fact named by at least one diagnosis.
    pub fn suspects(&self) -> BTreeSet<&RelationKey> {
        self.0.iter().flat_map(Diagnosis::keys).collect()
    }

    pub fn into_vec(self) -> Vec<Diagnosis> {
        self.0
    }
}

impl fmt::Display for DiagnosisSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("no diagnosis");
        }
        for (i, d) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{d}")?;
        }
        Ok(())
    }
}

/// Deduplicate, drop strict supersets and sort.
///
/// Idempotent: filtering an already minimal set returns it unchanged.
pub fn minimal_diagnoses(signatures: impl IntoIterator<Item = Diagnosis>) -> DiagnosisSet {
    // BTreeSet deduplicates and orders: `Diagnosis` compares as its sorted
    // key sequence, which is the lexicographic order we want.
    let unique: BTreeSet<Diagnosis> = signatures.into_iter().collect();
    let minimal = unique
        .iter()
        .filter(|d| !unique.iter().any(|other| d.is_strict_superset(other)))
        .cloned()
        .collect();
    DiagnosisSet(minimal)
}

// ───────────────────────────────────────────────────────────────
// Request entry point
// ───────────────────────────────────────────────────────────────

/// Run one diagnosis request.
///
/// Builds a fresh model and solver session; nothing persists between
/// calls.  An observation that no fault combination explains yields an
/// empty set ([`Verdict::UnsatisfiableObservation`]); a model that is
/// unsatisfiable even without observations is [`Error::ModelUnsatisfiable`].
pub fn diagnose(
    topology: &Topology,
    observations: &Observations,
    config: &DiagnosisConfig,
) -> Result<DiagnosisSet> {
    config.validate()?;
    let model = CausalModel::build(topology)?;
    diagnose_model(&model, observations, config)
}

/// [`diagnose`] over an already built model.
pub fn diagnose_model(
    model: &CausalModel,
    observations: &Observations,
    config: &DiagnosisConfig,
) -> Result<DiagnosisSet> {
    let mut session = SolverSession::for_model(model)?;
    for lit in observations.literals() {
        session.force(lit)?;
    }

    let set = match config.strategy {
        Strategy::Exhaustive => exhaustive(&mut session, config.max_solutions)?,
        Strategy::MinimalFirst => minimal_first(&mut session, config.max_diagnoses)?,
    };

    if set.is_empty() {
        if SolverSession::for_model(model)?.solve_under(&[])?.is_none() {
            return Err(Error::ModelUnsatisfiable);
        }
        warn!(
            "no diagnosis explains {} observation(s)",
            observations.literals().len()
        );
    } else {
        info!("{} minimal diagnosis(es): {set}", set.len());
    }
    Ok(set)
}

/// Enumerate every assignment and filter the collected signatures.
fn exhaustive(session: &mut SolverSession, limit: Option<usize>) -> Result<DiagnosisSet> {
    let mut seen: BTreeSet<Diagnosis> = BTreeSet::new();
    let solutions = session.enumerate_all(limit, |assignment| {
        seen.insert(Diagnosis::from_assignment(assignment));
        Ok(ControlFlow::Continue(()))
    })?;
    debug!(
        "exhaustive: {solutions} solutions, {} distinct signatures",
        seen.len()
    );
    Ok(minimal_diagnoses(seen))
}

/// Find minimal diagnoses directly.
///
/// Each round takes any solution, shrinks its signature until no strict
/// subset is consistent, records it and forbids its supersets.  Every
/// recorded signature is minimal, and every minimal signature is
/// eventually found because only supersets of recorded ones are blocked.
fn minimal_first(session: &mut SolverSession, limit: Option<usize>) -> Result<DiagnosisSet> {
    let structural: Vec<RelationKey> = session.namespace().structural_keys().cloned().collect();
    let mut found: Vec<Diagnosis> = Vec::new();

    loop {
        let Some(mut current) = session
            .solve_under(&[])?
            .map(|a| Diagnosis::from_assignment(&a))
        else {
            break;
        };

        while let Some(smaller) = shrink(session, &structural, &current)? {
            current = smaller;
        }
        debug!("minimal diagnosis: {current}");

        if current.is_empty() {
            // The empty diagnosis subsumes every other candidate.
            found = vec![current];
            break;
        }

        // At least one member of `current` must hold from now on.
        let blocking: Vec<Literal> = current.keys().map(|k| k.clone().holds()).collect();
        found.push(current);
        session.add_clause(&blocking)?;

        if let Some(n) = limit {
            if found.len() >= n {
                warn!("stopping after {n} diagnoses");
                break;
            }
        }
    }

    Ok(minimal_diagnoses(found))
}

/// A consistent signature strictly inside `current`, if one exists.
fn shrink(
    session: &mut SolverSession,
    structural: &[RelationKey],
    current: &Diagnosis,
) -> Result<Option<Diagnosis>> {
    let outside: Vec<Literal> = structural
        .iter()
        .filter(|k| !current.contains(k))
        .map(|k| k.clone().holds())
        .collect();

    for repaired in current.keys() {
        let mut assumptions = outside.clone();
        assumptions.push(repaired.clone().holds());
        if let Some(a) = session.solve_under(&assumptions)? {
            return Ok(Some(Diagnosis::from_assignment(&a)));
        }
    }
    Ok(None)
}

/// Whether `diagnosis` explains the observations on its own: forcing its
/// keys false and every other structural key true must be consistent.
pub fn explains(
    model: &CausalModel,
    observations: &Observations,
    diagnosis: &Diagnosis,
) -> Result<bool> {
    let mut session = SolverSession::for_model(model)?;
    for lit in observations.literals() {
        session.force(lit)?;
    }
    let assumptions: Vec<Literal> = model
        .namespace()
        .structural_keys()
        .map(|k| Literal::new(k.clone(), !diagnosis.contains(k)))
        .collect();
    Ok(session.solve_under(&assumptions)?.is_some())
}
