//! Application core: domain orchestration behind port traits.
//!
//! [`service::MonitorService`] ties the rain debouncer, window policy,
//! daily scheduler and liveness watchdog together.  All interaction with
//! the vehicle, the weather API, the mail relay and the clock happens
//! through the traits in [`ports`], so the core runs unchanged against the
//! mocks in `tests/`.

pub mod events;
pub mod ports;
pub mod service;
