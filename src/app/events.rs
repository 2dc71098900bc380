//! Outbound structured events emitted through the
//! [`EventSink`](super::ports::EventSink) port.

use crate::rain::RainSource;
use crate::solar::DayPhase;

/// Domain events for logging and telemetry.
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorEvent {
    /// The service is wired up; which inputs are active.
    Started { feed: bool, weather: bool },
    /// A new rain episode was accepted for evaluation.
    RainOnset { source: RainSource, rain_cm: f64 },
    /// The scheduler crossed sunrise or sunset.
    PhaseChanged { from: DayPhase, to: DayPhase },
    /// Conditions favour cabin overheating.
    OverheatWatch(OverheatReading),
}

/// Snapshot carried by [`MonitorEvent::OverheatWatch`].
#[derive(Debug, Clone, PartialEq)]
pub struct OverheatReading {
    pub outside_temp_c: f64,
    /// Only known while the vehicle is awake.
    pub inside_temp_c: Option<f64>,
    pub active_cooling: Option<bool>,
    pub battery_soc_percent: u8,
    pub awake: bool,
    pub sky: String,
    pub station: String,
}
