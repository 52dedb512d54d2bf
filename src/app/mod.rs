//! Application layer: supervision around the pure diagnosis engine.
//!
//! The [`monitor`] watches actuator readings and requests a diagnosis when
//! an actuator stops producing its effect.  Results leave through the
//! [`ports::EventSink`] port, keeping this layer testable without any
//! real output channel.

pub mod events;
pub mod monitor;
pub mod ports;
