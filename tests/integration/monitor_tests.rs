//! Integration tests for the anomaly monitor → diagnosis → sink pipeline.

use greenhouse_diagnosis::adapters::log_sink::LogEventSink;
use greenhouse_diagnosis::app::events::DiagnosisEvent;
use greenhouse_diagnosis::app::monitor::{ActuatorReading, AnomalyMonitor};
use greenhouse_diagnosis::{DiagnosisConfig, NodeId, Topology, Verdict};

use crate::fixtures::{RecordingSink, diag, key, linear_chain};

fn config(sustain: u32) -> DiagnosisConfig {
    DiagnosisConfig {
        anomaly_sustain_ticks: sustain,
        ..DiagnosisConfig::default()
    }
}

fn pump_monitor() -> AnomalyMonitor {
    let mut m = AnomalyMonitor::new(&linear_chain(), config(5)).unwrap();
    for (k, v) in [
        ("working(Pump)", true),
        ("working(Outlet)", true),
        ("connected(Power-Board,Pump)", true),
        ("signal(Pump,Power-Board)", true),
        ("signal(Moisture0,Rasp-Pi)", true),
    ] {
        m.confirm(key(k), v).unwrap();
    }
    m
}

#[test]
fn stalled_pump_is_diagnosed_once() {
    let mut m = pump_monitor();
    let mut sink = RecordingSink::new();
    for _ in 0..20 {
        m.evaluate(&[ActuatorReading::new("Pump", true, false)], &mut sink);
    }

    assert_eq!(
        sink.count(|e| matches!(e, DiagnosisEvent::AnomalyDetected { .. })),
        1
    );
    match sink.last() {
        Some(DiagnosisEvent::Diagnosed {
            actuator,
            verdict,
            diagnoses,
        }) => {
            assert_eq!(actuator, &NodeId::from("Pump"));
            assert_eq!(*verdict, Verdict::Faulty);
            assert_eq!(
                diagnoses.as_slice(),
                [
                    diag(&["connected(Outlet,Power-Board)"]),
                    diag(&["working(Power-Board)"]),
                ]
            );
        }
        other => panic!("expected a diagnosis, got {other:?}"),
    }
}

#[test]
fn recovery_then_relapse_diagnoses_again() {
    let mut m = pump_monitor();
    let mut sink = RecordingSink::new();
    let stalled = [ActuatorReading::new("Pump", true, false)];

    for _ in 0..6 {
        m.evaluate(&stalled, &mut sink);
    }
    m.evaluate(&[ActuatorReading::new("Pump", true, true)], &mut sink);
    for _ in 0..6 {
        m.evaluate(&stalled, &mut sink);
    }

    let kinds: Vec<&str> = sink
        .events
        .iter()
        .map(|e| match e {
            DiagnosisEvent::AnomalyDetected { .. } => "detected",
            DiagnosisEvent::Diagnosed { .. } => "diagnosed",
            DiagnosisEvent::DiagnosisFailed { .. } => "failed",
            DiagnosisEvent::AnomalyCleared { .. } => "cleared",
        })
        .collect();
    assert_eq!(
        kinds,
        ["detected", "diagnosed", "cleared", "detected", "diagnosed"]
    );
}

#[test]
fn greenhouse_actuators_are_tracked_independently() {
    let mut m = AnomalyMonitor::new(&Topology::greenhouse(), config(2)).unwrap();
    let mut sink = RecordingSink::new();
    for _ in 0..3 {
        m.evaluate(
            &[
                ActuatorReading::new("Fans", true, false),
                ActuatorReading::new("LEDs", true, true),
                ActuatorReading::new("Pump", false, false),
            ],
            &mut sink,
        );
    }
    let latched: Vec<&NodeId> = m.latched().collect();
    assert_eq!(latched, [&NodeId::from("Fans")]);
    assert!(sink.events.iter().all(|e| e.actuator() == &NodeId::from("Fans")));
}

#[test]
fn log_sink_accepts_monitor_output() {
    let mut m = pump_monitor();
    let mut sink = LogEventSink::new();
    for _ in 0..7 {
        m.evaluate(&[ActuatorReading::new("Pump", true, false)], &mut sink);
    }
    m.evaluate(&[ActuatorReading::new("Pump", true, true)], &mut sink);
    assert!(m.latched().next().is_none());
}

#[test]
fn invalid_config_is_rejected() {
    assert!(AnomalyMonitor::new(&linear_chain(), config(0)).is_err());
}
