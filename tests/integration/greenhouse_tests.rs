//! Integration tests against the reference greenhouse rig.

use std::collections::BTreeSet;

use greenhouse_diagnosis::diagnosis::explains;
use greenhouse_diagnosis::{
    CausalModel, Diagnosis, DiagnosisConfig, Error, Observations, Strategy, Topology, Verdict,
    diagnose, diagnose_model,
};

use crate::fixtures::{diag, key, pin_structure};

/// Structural facts left open in the "everything went dark" scenario.
const POWER_CHAIN: [&str; 10] = [
    "working(Outlet)",
    "connected(Outlet,Power-Board)",
    "working(Power-Board)",
    "connected(Arduino,Power-Board)",
    "connected(Power-Board,Fans)",
    "working(Fans)",
    "connected(Power-Board,LEDs)",
    "working(LEDs)",
    "connected(Power-Board,Pump)",
    "working(Pump)",
];

/// Every actuator failed although every command left the Pi and every
/// sensor reported in.
fn blackout(model: &CausalModel) -> Observations {
    let mut observed = Vec::new();
    for a in ["Fans", "LEDs", "Pump"] {
        observed.push((format!("expected-result({a})"), false));
        observed.push((format!("signal({a},Rasp-Pi)"), true));
    }
    for s in ["H-T0", "Light0", "Moisture0", "H-T1", "Light1", "Moisture1", "Wlevel"] {
        observed.push((format!("signal({s},Rasp-Pi)"), true));
    }
    let observed: Vec<(&str, bool)> = observed.iter().map(|(k, v)| (k.as_str(), *v)).collect();
    pin_structure(model, &POWER_CHAIN, &observed)
}

fn exhaustive() -> DiagnosisConfig {
    DiagnosisConfig {
        strategy: Strategy::Exhaustive,
        ..DiagnosisConfig::default()
    }
}

#[test]
fn blackout_single_faults_are_upstream() {
    let model = CausalModel::build(&Topology::greenhouse()).unwrap();
    let set = diagnose_model(&model, &blackout(&model), &DiagnosisConfig::default()).unwrap();

    let singles: BTreeSet<&Diagnosis> = set.iter().filter(|d| d.len() == 1).collect();
    let expected = [
        diag(&["connected(Arduino,Power-Board)"]),
        diag(&["connected(Outlet,Power-Board)"]),
        diag(&["working(Outlet)"]),
        diag(&["working(Power-Board)"]),
    ];
    assert_eq!(singles, expected.iter().collect::<BTreeSet<_>>());
}

#[test]
fn blackout_triples_break_each_actuator() {
    let model = CausalModel::build(&Topology::greenhouse()).unwrap();
    let set = diagnose_model(&model, &blackout(&model), &DiagnosisConfig::default()).unwrap();

    // One of {link, device} per actuator: 2 * 2 * 2 combinations.
    let triples: Vec<&Diagnosis> = set.iter().filter(|d| d.len() == 3).collect();
    assert_eq!(triples.len(), 8);
    assert_eq!(set.len(), 4 + 8);
    for t in triples {
        for a in ["Fans", "LEDs", "Pump"] {
            assert!(
                t.contains(&key(&format!("working({a})")))
                    || t.contains(&key(&format!("connected(Power-Board,{a})"))),
                "{t} leaves {a} intact"
            );
        }
    }
}

#[test]
fn blackout_strategies_agree() {
    let model = CausalModel::build(&Topology::greenhouse()).unwrap();
    let obs = blackout(&model);
    let fast = diagnose_model(&model, &obs, &DiagnosisConfig::default()).unwrap();
    let slow = diagnose_model(&model, &obs, &exhaustive()).unwrap();
    assert_eq!(fast, slow);
}

#[test]
fn blackout_diagnoses_are_sound_and_minimal() {
    let model = CausalModel::build(&Topology::greenhouse()).unwrap();
    let obs = blackout(&model);
    let set = diagnose_model(&model, &obs, &DiagnosisConfig::default()).unwrap();

    for d in set.iter() {
        assert!(explains(&model, &obs, d).unwrap(), "{d} does not explain");
        for dropped in d.keys() {
            let smaller: Diagnosis = d.keys().filter(|k| *k != dropped).cloned().collect();
            assert!(
                !explains(&model, &obs, &smaller).unwrap(),
                "{smaller} already explains, {d} is not minimal"
            );
        }
    }
}

#[test]
fn output_is_sorted_and_unique() {
    let model = CausalModel::build(&Topology::greenhouse()).unwrap();
    let set = diagnose_model(&model, &blackout(&model), &DiagnosisConfig::default()).unwrap();
    for pair in set.as_slice().windows(2) {
        assert!(pair[0] < pair[1], "{} !< {}", pair[0], pair[1]);
    }
}

#[test]
fn suspects_cover_the_power_chain() {
    let model = CausalModel::build(&Topology::greenhouse()).unwrap();
    let set = diagnose_model(&model, &blackout(&model), &DiagnosisConfig::default()).unwrap();
    let suspects: BTreeSet<String> = set.suspects().iter().map(ToString::to_string).collect();
    let expected: BTreeSet<String> = POWER_CHAIN.iter().map(ToString::to_string).collect();
    assert_eq!(suspects, expected);
}

#[test]
fn healthy_readings_are_healthy() {
    let obs: Observations = ["Fans", "LEDs", "Pump"]
        .into_iter()
        .map(|a| (key(&format!("expected-result({a})")), true))
        .collect();
    let set = diagnose(&Topology::greenhouse(), &obs, &DiagnosisConfig::default()).unwrap();
    assert_eq!(set.verdict(), Verdict::Healthy);
}

#[test]
fn exhaustive_without_observations_hits_the_cap() {
    let capped = DiagnosisConfig {
        max_solutions: Some(1000),
        ..exhaustive()
    };
    let err = diagnose(&Topology::greenhouse(), &Observations::new(), &capped).unwrap_err();
    assert_eq!(err, Error::EnumerationLimit(1000));
}

#[test]
fn topology_survives_json_round_trip() {
    let topology = Topology::greenhouse();
    let json = serde_json::to_string(&topology).unwrap();
    assert_eq!(Topology::from_json(&json).unwrap(), topology);
}

#[test]
fn unknown_observation_is_rejected() {
    let obs = Observations::new().with(key("working(Heater)"), false);
    let err = diagnose(&Topology::greenhouse(), &obs, &DiagnosisConfig::default()).unwrap_err();
    assert_eq!(err, Error::UndeclaredKey(key("working(Heater)")));
}
