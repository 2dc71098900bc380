//! Window protection policy.
//!
//! Given a fresh vehicle snapshot and an active rain trigger, decide
//! whether to close the windows and, if so, issue the command.
//!
//! ```text
//!   windows closed? ──yes──▶ NoActionClosed
//!        │ no
//!   parked/unknown? ──no───▶ NoActionMoving
//!        │ yes
//!   distance < max  ─┐
//!   or weather rain ─┴─yes─▶ close_windows(wait) ──▶ Closed | ActuationFailed
//!        │ no
//!        └─────────────────▶ NoActionTooFar
//! ```
//!
//! Weather-API rain is already localised to the vehicle's own position,
//! so it skips the distance gate.  Feed rain is measured at the home
//! station and is only trusted nearby.

use chrono::{DateTime, Local, Utc};
use log::{info, trace, warn};

use crate::alerts::{AlertScope, Notification};
use crate::app::ports::VehicleGateway;
use crate::config::MonitorConfig;
use crate::error::GatewayError;
use crate::geo;
use crate::vehicle::{ActuationResult, VehicleSnapshot};

/// Magnitude used for weather-API rain, which reports no amount.
pub const WEATHER_RAIN_SENTINEL_CM: f64 = -1.0;

/// Upper bound on the close command's retry window.
pub const MAX_ACTUATION_WAIT_SECS: u64 = 90;

/// Headroom kept below the watchdog period.
const WATCHDOG_MARGIN_SECS: u64 = 5;

/// `min(90, watchdog − 5)`, never zero.
pub fn actuation_wait_secs(watchdog_interval_secs: u64) -> u64 {
    watchdog_interval_secs
        .saturating_sub(WATCHDOG_MARGIN_SECS)
        .clamp(1, MAX_ACTUATION_WAIT_SECS)
}

// ═══════════════════════════════════════════════════════════════
//  Trigger and outcome
// ═══════════════════════════════════════════════════════════════

/// An active rain episode handed to the policy.
#[derive(Debug, Clone, PartialEq)]
pub struct RainTrigger {
    /// Feed amount in cm, or [`WEATHER_RAIN_SENTINEL_CM`].
    pub magnitude_cm: f64,
    /// Weather station name for API rain; empty for the feed.
    pub source_label: String,
}

impl RainTrigger {
    pub fn feed(rain_cm: f64) -> Self {
        Self {
            magnitude_cm: rain_cm,
            source_label: String::new(),
        }
    }

    pub fn weather(station: impl Into<String>) -> Self {
        Self {
            magnitude_cm: WEATHER_RAIN_SENTINEL_CM,
            source_label: station.into(),
        }
    }

    pub fn is_weather_sourced(&self) -> bool {
        self.magnitude_cm < 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PolicyOutcome {
    NoActionClosed,
    NoActionMoving,
    Closed { distance_km: f64 },
    /// `status_code` is `None` when the command got no answer.
    ActuationFailed {
        status_code: Option<u16>,
        distance_km: f64,
    },
    NoActionTooFar { distance_km: f64 },
}

impl PolicyOutcome {
    /// Outcomes only worth logging at verbose level.
    pub const fn is_verbose(&self) -> bool {
        matches!(self, Self::NoActionClosed | Self::NoActionMoving)
    }

    pub fn notification(&self, trigger: &RainTrigger, at: DateTime<Utc>) -> Notification {
        let time = at.with_timezone(&Local).format("%H:%M:%S");
        let subject = if trigger.is_weather_sourced() {
            format!(
                "It has rained according to weather station '{}' at {}",
                trigger.source_label, time
            )
        } else {
            format!("It has rained {} cm at {}", trigger.magnitude_cm, time)
        };

        let body = match self {
            Self::NoActionClosed => "It has rained and the windows are closed".to_owned(),
            Self::NoActionMoving => "It has rained but the vehicle is moving".to_owned(),
            Self::Closed { .. } if trigger.is_weather_sourced() => format!(
                "Windows are open and it is raining according to the nearest weather station ({})! Closing them",
                trigger.source_label
            ),
            Self::Closed { .. } => {
                "Parked close to the station with windows open in the rain! Closing them".to_owned()
            }
            Self::ActuationFailed {
                status_code: Some(200),
                ..
            } => "It's raining and the windows could not be closed! Check vehicle!".to_owned(),
            Self::ActuationFailed {
                status_code: Some(code),
                ..
            } => format!(
                "It's raining and the windows could not be closed! Status code was {code}. Check vehicle!"
            ),
            Self::ActuationFailed {
                status_code: None, ..
            } => "It's raining and the close command never reached the vehicle! Check vehicle!"
                .to_owned(),
            Self::NoActionTooFar { distance_km } => format!(
                "Parked with windows open in the rain but too far ({distance_km:.1} km) to be sure it's raining on us, leaving as is"
            ),
        };

        Notification::new(AlertScope::Rain, subject, body)
    }
}

// ═══════════════════════════════════════════════════════════════
//  Policy
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowPolicy {
    station: (f64, f64),
    max_distance_km: f64,
    wait_secs: u64,
}

impl WindowPolicy {
    pub fn new(station: (f64, f64), max_distance_km: f64, watchdog_interval_secs: u64) -> Self {
        Self {
            station,
            max_distance_km,
            wait_secs: actuation_wait_secs(watchdog_interval_secs),
        }
    }

    pub fn from_config(config: &MonitorConfig) -> Self {
        Self::new(
            (config.station.latitude, config.station.longitude),
            config.station.max_distance_km,
            config.timers.watchdog_interval_secs,
        )
    }

    pub const fn wait_secs(&self) -> u64 {
        self.wait_secs
    }

    pub const fn max_distance_km(&self) -> f64 {
        self.max_distance_km
    }

    /// Vehicle position, or the station when the vehicle did not report one.
    pub fn position(&self, snapshot: &VehicleSnapshot) -> (f64, f64) {
        snapshot.location().unwrap_or(self.station)
    }

    pub fn distance_km(&self, snapshot: &VehicleSnapshot) -> f64 {
        geo::distance_km(self.station, self.position(snapshot))
    }

    /// Run the decision tree and, when warranted, the close command.
    pub fn evaluate(
        &self,
        snapshot: &VehicleSnapshot,
        trigger: &RainTrigger,
        vehicle: &dyn VehicleGateway,
    ) -> PolicyOutcome {
        if !snapshot.has_open_windows() {
            return PolicyOutcome::NoActionClosed;
        }
        if !snapshot.shift_state.allows_closing() {
            return PolicyOutcome::NoActionMoving;
        }

        let distance_km = self.distance_km(snapshot);
        if distance_km < self.max_distance_km || trigger.is_weather_sourced() {
            match self.actuate(vehicle) {
                Ok(r) if r.succeeded() => PolicyOutcome::Closed { distance_km },
                Ok(r) => PolicyOutcome::ActuationFailed {
                    status_code: Some(r.status_code),
                    distance_km,
                },
                Err(e) => PolicyOutcome::ActuationFailed {
                    status_code: e.status_code(),
                    distance_km,
                },
            }
        } else {
            PolicyOutcome::NoActionTooFar { distance_km }
        }
    }

    /// Issue the close command with the watchdog-bounded wait.
    pub fn actuate(&self, vehicle: &dyn VehicleGateway) -> Result<ActuationResult, GatewayError> {
        let result = vehicle.close_windows(self.wait_secs);
        match &result {
            Ok(r) if r.succeeded() => {
                info!("Policy: windows closed (woke={})", r.woke);
            }
            Ok(r) => warn!(
                "Policy: close rejected (status={}, result={})",
                r.status_code, r.result
            ),
            Err(e) => warn!("Policy: close command failed: {}", e),
        }
        result
    }
}

/// One log line per outcome; closed/moving only at trace.
pub fn log_outcome(outcome: &PolicyOutcome, note: &Notification) {
    if outcome.is_verbose() {
        trace!("{} | {}", note.subject, note.body);
    } else {
        info!("{} | {}", note.subject, note.body);
    }
}
