//! RainGuard library.
//!
//! Keeps a parked vehicle's windows shut when rain is detected, closes them
//! at sunset and flags overheat conditions on sunny days.  The pure-logic
//! modules are exposed for the integration tests and the fuzz targets;
//! the binary in `main.rs` wires them to the real adapters.

#![deny(unused_must_use)]

pub mod adapters;
pub mod alerts;
pub mod app;
pub mod config;
pub mod error;
pub mod geo;
pub mod policy;
pub mod rain;
pub mod runtime;
pub mod scheduler;
pub mod solar;
pub mod state;
pub mod vehicle;
pub mod watchdog;
pub mod weather;
