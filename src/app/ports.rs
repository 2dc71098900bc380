//! Port traits: the hexagonal boundary between the monitor core and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ MonitorService (domain)
//! ```
//!
//! Driven adapters (vehicle API, weather API, mail relay, clock, log sink,
//! config file) implement these traits.  The
//! [`MonitorService`](super::service::MonitorService) holds them as
//! `Arc<dyn …>` so the feed consumer, scheduler worker and watchdog can
//! share one instance across threads.
//!
//! ## Error contract
//!
//! - Gateways return [`GatewayError`]; only transport-level variants count
//!   towards the consecutive-failure alert.
//! - **ConfigPort** implementations MUST validate before returning.

use chrono::{DateTime, Utc};

use crate::config::MonitorConfig;
use crate::error::{ConfigError, GatewayError, NotifyError};
use crate::vehicle::{ActuationResult, VehicleSnapshot, VehicleStatus};
use crate::weather::WeatherSnapshot;

// ───────────────────────────────────────────────────────────────
// Vehicle gateway (driven adapter: domain ↔ vehicle API)
// ───────────────────────────────────────────────────────────────

pub trait VehicleGateway: Send + Sync {
    /// Online status without waking the vehicle.
    fn status(&self) -> Result<VehicleStatus, GatewayError>;

    /// Full state.  `use_cache` avoids waking a sleeping vehicle.
    fn state(&self, use_cache: bool) -> Result<VehicleSnapshot, GatewayError>;

    /// Wake the vehicle.  `Ok(true)` once it reports awake.
    fn wake(&self) -> Result<bool, GatewayError>;

    /// Close all windows, letting the API retry for up to `max_wait_secs`.
    ///
    /// Any HTTP answer is `Ok` with its status code; `Err` means no answer.
    fn close_windows(&self, max_wait_secs: u64) -> Result<ActuationResult, GatewayError>;
}

// ───────────────────────────────────────────────────────────────
// Weather gateway (driven adapter: domain → weather API)
// ───────────────────────────────────────────────────────────────

pub trait WeatherGateway: Send + Sync {
    fn current_conditions(&self, latitude: f64, longitude: f64)
    -> Result<WeatherSnapshot, GatewayError>;
}

// ───────────────────────────────────────────────────────────────
// Notifier (driven adapter: domain → operator)
// ───────────────────────────────────────────────────────────────

/// Sends an operator alert to the configured recipient.
pub trait Notifier: Send + Sync {
    fn notify(&self, subject: &str, body: &str) -> Result<(), NotifyError>;
}

// ───────────────────────────────────────────────────────────────
// Clock
// ───────────────────────────────────────────────────────────────

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

// ───────────────────────────────────────────────────────────────
// Event sink (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`MonitorEvent`](super::events::MonitorEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &super::events::MonitorEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port
// ───────────────────────────────────────────────────────────────

/// Loads the monitor configuration once at startup.
///
/// Implementations MUST validate the loaded values and reject invalid
/// ranges with [`ConfigError::ValidationFailed`] rather than clamping.
pub trait ConfigPort {
    fn load(&self) -> Result<MonitorConfig, ConfigError>;
}

