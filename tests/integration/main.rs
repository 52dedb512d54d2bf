//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises one end-to-end path
//! through the public API.  `fixtures` holds the shared topologies and
//! the recording event sink.

mod fixtures;
mod greenhouse_tests;
mod linear_chain_tests;
mod monitor_tests;
