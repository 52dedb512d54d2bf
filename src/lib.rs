//! Greenhouse hardware diagnosis library.
//!
//! Explains why an actuator failed to produce its expected result by
//! searching for the smallest sets of broken components and links that
//! make the observations consistent with a causal model of the device.
//!
//! ```text
//!   Topology ──▶ CausalModel ──▶ SolverSession ──▶ DiagnosisSet
//!                     ▲                 ▲
//!                 formula           Observations
//! ```

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod diagnosis;
pub mod formula;
pub mod model;
pub mod relation;
pub mod solver;
pub mod topology;

mod error;

pub use config::{DiagnosisConfig, Strategy};
pub use diagnosis::{Diagnosis, DiagnosisSet, Observations, Verdict, diagnose, diagnose_model};
pub use error::{Error, Result};
pub use model::CausalModel;
pub use relation::{Literal, NodeId, RelationKey, RelationKind};
pub use topology::{Topology, TopologyError};
