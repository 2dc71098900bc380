//! Daily thermal / night scheduler.
//!
//! Runs once per timer tick on its own worker thread.  Each cycle reads
//! the vehicle, works out day or night at the vehicle's position, and
//! then either closes the windows at sunset or consults the weather API.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  tick ──▶ stamp clock ──▶ enter_cycle ─┬─ Skip ──▶ return    │
//! │                                        ├─ Hung ──▶ Fatal     │
//! │                                        └─ Run                │
//! │                                             │                │
//! │                    read status + state ◀────┘                │
//! │                             │                                │
//! │               moving? ──yes──▶ done                          │
//! │                             │                                │
//! │              ┌──── sun at vehicle position ────┐             │
//! │              ▼                                 ▼             │
//! │   Night: edge-triggered close        Day: weather API        │
//! │   (re-armed after 10 failed ticks)     ├─ rainy ─▶ policy    │
//! │                                        └─ sunny ─▶ overheat  │
//! │                                                    telemetry │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The scheduler never wakes the vehicle.  A forced wake does not let the
//! cabin overheat protection run once the post-drive window has passed,
//! so the overheat branch only reports.

use core::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Local, Utc};
use log::{debug, error, info, trace, warn};

use crate::alerts::{AlertScope, Notification};
use crate::app::events::{MonitorEvent, OverheatReading};
use crate::app::service::MonitorService;
use crate::config::DebugFlags;
use crate::error::FatalError;
use crate::policy::{RainTrigger, WEATHER_RAIN_SENTINEL_CM};
use crate::rain::RainSource;
use crate::solar::{self, DayPhase, Daylight};
use crate::state::{CycleEntry, MonitorState, MonitoredTask};
use crate::vehicle::VehicleSnapshot;
use crate::weather::WeatherSnapshot;

/// Failed-close ticks after which the sunset close is retried.
pub const NIGHT_RETRY_REARM: u8 = 10;

/// Below this the cabin will not overheat.
pub const OVERHEAT_MIN_OUTSIDE_C: f64 = 10.0;

/// Keeping the vehicle observable below this would drain the battery.
pub const OVERHEAT_MIN_SOC: u8 = 20;

// ═══════════════════════════════════════════════════════════════
//  Night tracker
// ═══════════════════════════════════════════════════════════════

/// Day/night edge detection with the failed-close retry counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NightTracker {
    phase: DayPhase,
    retry: u8,
}

impl NightTracker {
    pub const fn phase(&self) -> DayPhase {
        self.phase
    }

    pub const fn retry(&self) -> u8 {
        self.retry
    }

    /// Record a night tick.  Returns `true` when a close should be
    /// attempted: on the first night tick, or once a failed close has
    /// waited [`NIGHT_RETRY_REARM`] ticks.
    pub fn night_tick(&mut self) -> bool {
        let rearmed = self.retry >= NIGHT_RETRY_REARM;
        let edge = self.phase == DayPhase::Day || rearmed;
        self.phase = DayPhase::Night;
        if rearmed {
            self.retry = 0;
        }
        if !edge && self.retry != 0 {
            self.retry += 1;
        }
        edge
    }

    pub fn day_tick(&mut self) {
        self.phase = DayPhase::Day;
        self.retry = 0;
    }

    pub fn close_succeeded(&mut self) {
        self.retry = 0;
    }

    pub fn close_failed(&mut self) {
        self.retry = self.retry.saturating_add(1);
    }

    /// Nothing to close at sunset.
    pub fn windows_closed(&mut self) {
        self.retry = 0;
    }
}

// ═══════════════════════════════════════════════════════════════
//  Pure helpers
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sky {
    Sunny,
    Rainy,
    Overcast,
}

pub fn classify_sky(weather: &WeatherSnapshot) -> Sky {
    if weather.is_sunny() {
        Sky::Sunny
    } else if weather.is_rainy() {
        Sky::Rainy
    } else {
        Sky::Overcast
    }
}

/// The vehicle's own sensor while awake, else the weather API reading.
pub fn resolve_outside_temp(snapshot: &VehicleSnapshot, weather: &WeatherSnapshot) -> Option<f64> {
    snapshot
        .awake
        .then_some(snapshot.outside_temp_c)
        .flatten()
        .or_else(|| weather.temp_celsius())
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OverheatVerdict {
    Risk { outside_temp_c: f64, soc: u8 },
    SunTooLow,
    TooCold(Option<f64>),
    LowCharge(Option<u8>),
}

impl fmt::Display for OverheatVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Risk { outside_temp_c, soc } => {
                write!(f, "overheat risk at {outside_temp_c:.1}C, SoC {soc}%")
            }
            Self::SunTooLow => write!(f, "too early or too late to warm the cabin"),
            Self::TooCold(Some(t)) => write!(f, "outside is cold at {t:.1}C"),
            Self::TooCold(None) => write!(f, "outside temperature unknown"),
            Self::LowCharge(Some(soc)) => write!(f, "SoC at {soc}% is too low"),
            Self::LowCharge(None) => write!(f, "SoC unknown"),
        }
    }
}

/// High sun, outside above 10 °C and SoC of at least 20 %, checked in that order.
pub fn assess_overheat(
    high_sun: bool,
    outside_temp_c: Option<f64>,
    soc: Option<u8>,
) -> OverheatVerdict {
    if !high_sun {
        return OverheatVerdict::SunTooLow;
    }
    let outside_temp_c = match outside_temp_c {
        Some(t) if t > OVERHEAT_MIN_OUTSIDE_C => t,
        other => return OverheatVerdict::TooCold(other),
    };
    match soc {
        Some(soc) if soc >= OVERHEAT_MIN_SOC => OverheatVerdict::Risk {
            outside_temp_c,
            soc,
        },
        other => OverheatVerdict::LowCharge(other),
    }
}

// ═══════════════════════════════════════════════════════════════
//  Scheduler
// ═══════════════════════════════════════════════════════════════

/// Resets the cycle depth however the cycle ends.
struct CycleGuard<'a>(&'a MonitorState);

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.0.finish_cycle();
    }
}

#[derive(Debug, Default)]
pub struct DailyScheduler {
    night: Mutex<NightTracker>,
}

impl DailyScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> DayPhase {
        self.tracker().phase()
    }

    pub fn night_retry(&self) -> u8 {
        self.tracker().retry()
    }

    fn tracker(&self) -> MutexGuard<'_, NightTracker> {
        self.night.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// One timer tick.  Only a hung scheduler is fatal here; every other
    /// failure ends the cycle early and the next tick starts fresh.
    pub fn run_cycle(&self, svc: &MonitorService) -> Result<(), FatalError> {
        let now = svc.now();
        let state = svc.state();
        state.stamp(MonitoredTask::Scheduler, now);

        match state.enter_cycle() {
            CycleEntry::Run => {}
            CycleEntry::Skip => {
                warn!("Timer: previous cycle still running, skipping this iteration");
                return Ok(());
            }
            CycleEntry::Hung => {
                let text = "Previous cycle still running after two ticks, the monitor is hung. Quitting";
                if state.mark_alerted(MonitoredTask::Scheduler) {
                    svc.notify(&Notification::headline(AlertScope::Timer, text));
                }
                error!("Timer: {}", text);
                return Err(FatalError::SchedulerHung);
            }
        }

        let _guard = CycleGuard(state);
        self.evaluate(svc, now);
        Ok(())
    }

    fn evaluate(&self, svc: &MonitorService, now: DateTime<Utc>) {
        let Some(snapshot) = svc.read_vehicle(AlertScope::Timer) else {
            return;
        };

        if !snapshot.shift_state.allows_closing() {
            debug!("Timer: vehicle in motion, skipping window and cabin checks");
            return;
        }
        if snapshot.has_open_windows() {
            debug!("Timer: {} window(s) open", snapshot.windows_open_count);
        }
        if snapshot.location().is_none() {
            trace!("Timer: no vehicle location, assuming it is at the station");
        }

        let (lat, lon) = svc.policy().position(&snapshot);
        let daylight = solar::daylight(now, lat, lon);
        if svc.flags().has(DebugFlags::SUN) {
            info!("Timer: sun at ({lat:.4}, {lon:.4}) is {daylight:?}, now {now}");
        }

        let phase = daylight.phase(now);
        let previous = self.phase();
        if previous != phase {
            svc.emit(&MonitorEvent::PhaseChanged {
                from: previous,
                to: phase,
            });
        }

        match phase {
            DayPhase::Night => {
                svc.state().clear_rain(RainSource::WeatherApi);
                self.close_for_night(svc, &snapshot, now);
            }
            DayPhase::Day => {
                self.tracker().day_tick();
                self.check_weather(svc, &snapshot, &daylight, now, (lat, lon));
            }
        }
    }

    fn close_for_night(&self, svc: &MonitorService, snapshot: &VehicleSnapshot, now: DateTime<Utc>) {
        if !self.tracker().night_tick() {
            trace!("Timer: night, retry counter at {}", self.night_retry());
            return;
        }
        if !snapshot.has_open_windows() {
            self.tracker().windows_closed();
            debug!("Timer: it's night and the windows are closed");
            return;
        }

        info!(
            "Timer: it's night with {} window(s) open, closing",
            snapshot.windows_open_count
        );
        let vehicle = svc.vehicle();
        // `Some(code)` on failure; the inner `None` means no answer.
        let failure = match svc.policy().actuate(&vehicle) {
            Ok(r) if r.succeeded() => None,
            Ok(r) => Some(Some(r.status_code)),
            Err(e) => Some(e.status_code()),
        };

        let note = match failure {
            None => {
                self.tracker().close_succeeded();
                let time = now.with_timezone(&Local).format("%H:%M:%S");
                Notification::new(
                    AlertScope::Timer,
                    format!("Windows were open at sunset ({time})"),
                    "Closing windows because it's night time.",
                )
            }
            Some(code) => {
                self.tracker().close_failed();
                let text = match code {
                    Some(200) => "Unable to close windows at sunset. Check vehicle!".to_owned(),
                    Some(code) => format!(
                        "Unable to close windows at sunset. Status code was {code}. Check vehicle!"
                    ),
                    None => "Unable to close windows at sunset, the command got no answer. Check vehicle!"
                        .to_owned(),
                };
                Notification::headline(AlertScope::Timer, text)
            }
        };
        info!("{}", note.subject);
        svc.notify(&note);
    }

    fn check_weather(
        &self,
        svc: &MonitorService,
        snapshot: &VehicleSnapshot,
        daylight: &Daylight,
        now: DateTime<Utc>,
        (lat, lon): (f64, f64),
    ) {
        let Some(weather_api) = svc.weather() else {
            trace!("Timer: no weather API key");
            return;
        };
        let weather = match weather_api.current_conditions(lat, lon) {
            Ok(w) => w,
            Err(e) => {
                // Not a dry reading; the current episode stays open.
                debug!("Timer: weather lookup failed: {}", e);
                return;
            }
        };

        let outside = resolve_outside_temp(snapshot, &weather);
        if svc.flags().has(DebugFlags::CLIMATE) {
            info!(
                "Timer: climate inside={:?} outside={:?} cooling={:?} awake={}",
                snapshot.inside_temp_c, outside, snapshot.active_cooling, snapshot.awake
            );
        }

        match classify_sky(&weather) {
            Sky::Sunny => {
                svc.state().clear_rain(RainSource::WeatherApi);
                self.watch_overheat(svc, snapshot, &weather, daylight.is_high_sun(now), outside);
            }
            Sky::Rainy => {
                let decision = svc.state().observe_raining(RainSource::WeatherApi, true);
                if decision.should_evaluate {
                    svc.emit(&MonitorEvent::RainOnset {
                        source: RainSource::WeatherApi,
                        rain_cm: WEATHER_RAIN_SENTINEL_CM,
                    });
                    svc.protect_from_rain(snapshot, &RainTrigger::weather(&weather.station_name));
                } else {
                    debug!(
                        "Timer: '{}' reports {}, waiting for the rain to stop",
                        weather.station_name, weather.description
                    );
                }
            }
            Sky::Overcast => {
                svc.state().clear_rain(RainSource::WeatherApi);
                trace!(
                    "Timer: no sun with {} ({:02}) at '{}'",
                    weather.description, weather.icon_code, weather.station_name
                );
            }
        }
    }

    fn watch_overheat(
        &self,
        svc: &MonitorService,
        snapshot: &VehicleSnapshot,
        weather: &WeatherSnapshot,
        high_sun: bool,
        outside: Option<f64>,
    ) {
        match assess_overheat(high_sun, outside, snapshot.battery_soc_percent) {
            OverheatVerdict::Risk {
                outside_temp_c,
                soc,
            } => {
                if !snapshot.awake {
                    trace!("Timer: vehicle asleep, inside temperature unknown");
                }
                svc.emit(&MonitorEvent::OverheatWatch(OverheatReading {
                    outside_temp_c,
                    inside_temp_c: snapshot.awake.then_some(snapshot.inside_temp_c).flatten(),
                    active_cooling: snapshot.awake.then_some(snapshot.active_cooling).flatten(),
                    battery_soc_percent: soc,
                    awake: snapshot.awake,
                    sky: weather.description.clone(),
                    station: weather.station_name.clone(),
                }));
            }
            verdict => trace!(
                "Timer: sun with {} at '{}' but {}",
                weather.description, weather.station_name, verdict
            ),
        }
    }
}
