//! Unified error type for the diagnosis engine.
//!
//! One `Error` enum that every subsystem converts into.  Configuration
//! defects (bad topology, undeclared keys) fail fast; solver failures are
//! propagated untouched.  An observation that no healthy-or-faulty device
//! could produce is *not* an error: it is reported as
//! [`Verdict::UnsatisfiableObservation`](crate::diagnosis::Verdict).

use core::fmt;

use crate::relation::{ParseKeyError, RelationKey};
use crate::topology::TopologyError;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The hardware description is inconsistent.
    Topology(TopologyError),
    /// A constraint or observation references a key the model never declared.
    UndeclaredKey(RelationKey),
    /// The causal model has no solution even without observations.
    ModelUnsatisfiable,
    /// The SAT backend failed or could not finish.
    Solver(String),
    /// Exhaustive enumeration exceeded the configured solution cap.
    EnumerationLimit(usize),
    /// A relation key could not be parsed.
    Parse(ParseKeyError),
    /// JSON configuration could not be decoded.
    Json(String),
    /// Configuration values are out of range.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Topology(e) => write!(f, "topology: {e}"),
            Self::UndeclaredKey(k) => write!(f, "model: undeclared relation key {k}"),
            Self::ModelUnsatisfiable => write!(f, "model: unsatisfiable without observations"),
            Self::Solver(msg) => write!(f, "solver: {msg}"),
            Self::EnumerationLimit(n) => write!(f, "solver: more than {n} solutions"),
            Self::Parse(e) => write!(f, "parse: {e}"),
            Self::Json(msg) => write!(f, "json: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<TopologyError> for Error {
    fn from(e: TopologyError) -> Self {
        Self::Topology(e)
    }
}

impl From<ParseKeyError> for Error {
    fn from(e: ParseKeyError) -> Self {
        Self::Parse(e)
    }
}

/// rustsat reports backend failures as `anyhow::Error`.
impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Self::Solver(format!("{e:#}"))
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

pub type Result<T> = core::result::Result<T, Error>;
