//! Integration tests for a single power chain loaded from JSON.

use core::ops::ControlFlow;

use greenhouse_diagnosis::diagnosis::explains;
use greenhouse_diagnosis::solver::SolverSession;
use greenhouse_diagnosis::{
    CausalModel, Diagnosis, DiagnosisConfig, Observations, Strategy, Verdict, diagnose, diagnose_model,
};

use crate::fixtures::{PUMP_FAILURE_JSON, diag, key, linear_chain};

fn config(strategy: Strategy) -> DiagnosisConfig {
    DiagnosisConfig {
        strategy,
        ..DiagnosisConfig::default()
    }
}

#[test]
fn pump_failure_blames_board_or_its_feed() {
    let obs = Observations::from_json(PUMP_FAILURE_JSON).unwrap();
    let set = diagnose(&linear_chain(), &obs, &DiagnosisConfig::default()).unwrap();

    assert_eq!(
        set.as_slice(),
        [
            diag(&["connected(Outlet,Power-Board)"]),
            diag(&["working(Power-Board)"]),
        ]
    );
    assert_eq!(set.verdict(), Verdict::Faulty);
    assert_eq!(
        set.to_string(),
        "{connected(Outlet,Power-Board)} | {working(Power-Board)}"
    );
}

#[test]
fn strategies_agree() {
    let topology = linear_chain();
    let obs = Observations::from_json(PUMP_FAILURE_JSON).unwrap();
    let exhaustive = diagnose(&topology, &obs, &config(Strategy::Exhaustive)).unwrap();
    let minimal_first = diagnose(&topology, &obs, &config(Strategy::MinimalFirst)).unwrap();
    assert_eq!(exhaustive, minimal_first);
}

#[test]
fn every_diagnosis_explains_the_failure() {
    let model = CausalModel::build(&linear_chain()).unwrap();
    let obs = Observations::from_json(PUMP_FAILURE_JSON).unwrap();
    let set = diagnose_model(&model, &obs, &DiagnosisConfig::default()).unwrap();
    for d in set.iter() {
        assert!(explains(&model, &obs, d).unwrap(), "{d} does not explain");
    }
    // Nothing broken cannot explain a failed pump.
    assert!(!explains(&model, &obs, &diag(&[])).unwrap());
}

#[test]
fn no_observations_is_healthy() {
    let set = diagnose(&linear_chain(), &Observations::new(), &DiagnosisConfig::default()).unwrap();
    assert_eq!(set.as_slice(), [diag(&[])]);
    assert_eq!(set.verdict(), Verdict::Healthy);
}

#[test]
fn unobserved_enumeration_includes_the_healthy_assignment() {
    let model = CausalModel::build(&linear_chain()).unwrap();
    let mut session = SolverSession::for_model(&model).unwrap();
    let mut healthy_seen = false;
    let solutions = session
        .enumerate_all(None, |assignment| {
            healthy_seen |= Diagnosis::from_assignment(assignment).is_empty();
            Ok(ControlFlow::Continue(()))
        })
        .unwrap();
    // 12 structural facts plus the free command input, all else derived.
    assert_eq!(solutions, 1 << 13);
    assert!(healthy_seen);
}

#[test]
fn exhaustive_without_observations_is_healthy() {
    let set = diagnose(
        &linear_chain(),
        &Observations::new(),
        &config(Strategy::Exhaustive),
    )
    .unwrap();
    assert_eq!(set.as_slice(), [diag(&[])]);
    assert_eq!(set.verdict(), Verdict::Healthy);
}

#[test]
fn success_with_everything_confirmed_is_healthy() {
    let obs = Observations::new()
        .with(key("expected-result(Pump)"), true)
        .with(key("working(Power-Board)"), true);
    let set = diagnose(&linear_chain(), &obs, &DiagnosisConfig::default()).unwrap();
    assert_eq!(set.verdict(), Verdict::Healthy);
}

#[test]
fn working_pump_with_dead_board_is_contradictory() {
    let obs = Observations::new()
        .with(key("expected-result(Pump)"), true)
        .with(key("working(Power-Board)"), false);
    let set = diagnose(&linear_chain(), &obs, &DiagnosisConfig::default()).unwrap();
    assert!(set.is_empty());
    assert_eq!(set.verdict(), Verdict::UnsatisfiableObservation);
}

#[test]
fn silent_sensor_alone_explains_failure() {
    // Without confirming the sensor report, a dead sensor path is enough.
    let obs = Observations::new()
        .with(key("expected-result(Pump)"), false)
        .with(key("signal(Pump,Rasp-Pi)"), true)
        .with(key("powered(Pump)"), true)
        .with(key("working(Pump)"), true);
    let set = diagnose(&linear_chain(), &obs, &DiagnosisConfig::default()).unwrap();
    assert!(set.as_slice().contains(&diag(&["working(Moisture0)"])));
    assert!(set.as_slice().contains(&diag(&["connected(Moisture0,Arduino)"])));
    for d in set.iter() {
        assert_eq!(d.len(), 1, "{d} is not a single fault");
    }
}

#[test]
fn results_are_deterministic() {
    let topology = linear_chain();
    let obs = Observations::from_json(PUMP_FAILURE_JSON).unwrap();
    let first = diagnose(&topology, &obs, &DiagnosisConfig::default()).unwrap();
    for _ in 0..5 {
        assert_eq!(diagnose(&topology, &obs, &DiagnosisConfig::default()).unwrap(), first);
    }
}

#[test]
fn max_diagnoses_caps_output() {
    let obs = Observations::from_json(PUMP_FAILURE_JSON).unwrap();
    let capped = DiagnosisConfig {
        max_diagnoses: Some(1),
        ..DiagnosisConfig::default()
    };
    let set = diagnose(&linear_chain(), &obs, &capped).unwrap();
    assert_eq!(set.len(), 1);
}
