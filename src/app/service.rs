//! Application service: the hexagonal core.
//!
//! [`MonitorService`] owns the shared [`MonitorState`], the window policy,
//! the daily scheduler and the liveness watchdog.  All I/O flows through
//! the port traits held in [`Ports`], so the whole service runs against
//! mock adapters in tests.
//!
//! ```text
//!  VehicleGateway ◀──┐ ┌────────────────────────────┐ ──▶ EventSink
//!                    ├─│       MonitorService       │
//!  WeatherGateway ◀──┘ │ Policy · Scheduler · WDT   │ ──▶ Notifier
//!                      │       MonitorState         │
//!  RainEvent ─────────▶└────────────────────────────┘ ◀── Clock
//! ```
//!
//! Entry points are called from three threads: the feed consumer
//! ([`handle_rain_event`](MonitorService::handle_rain_event)), the cycle
//! worker ([`run_cycle`](MonitorService::run_cycle)) and the timer thread
//! ([`check_liveness`](MonitorService::check_liveness)).  Each returns a
//! [`FatalError`] instead of exiting; the supervisor in `main` decides.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, error, info, trace, warn};

use crate::alerts::{self, AlertScope, Notification};
use crate::config::{DebugFlags, MonitorConfig};
use crate::error::{FatalError, GatewayError};
use crate::policy::{self, PolicyOutcome, RainTrigger, WindowPolicy};
use crate::rain::{RainEvent, RainSource};
use crate::scheduler::DailyScheduler;
use crate::state::{FeedHeartbeat, MonitorState, MonitoredTask};
use crate::vehicle::{ActuationResult, VehicleSnapshot, VehicleStatus};
use crate::watchdog::LivenessWatchdog;

use super::events::MonitorEvent;
use super::ports::{Clock, EventSink, Notifier, VehicleGateway, WeatherGateway};

/// Rain amount substituted when [`DebugFlags::FORCE_RAIN`] is set.
pub const FORCED_RAIN_CM: f64 = 0.01;

// ───────────────────────────────────────────────────────────────
// Ports bundle
// ───────────────────────────────────────────────────────────────

/// Adapters injected into the service.
#[derive(Clone)]
pub struct Ports {
    pub vehicle: Arc<dyn VehicleGateway>,
    /// `None` when no weather API key is configured.
    pub weather: Option<Arc<dyn WeatherGateway>>,
    pub notifier: Arc<dyn Notifier>,
    pub clock: Arc<dyn Clock>,
    pub events: Arc<dyn EventSink>,
}

// ───────────────────────────────────────────────────────────────
// MonitorService
// ───────────────────────────────────────────────────────────────

pub struct MonitorService {
    config: Arc<MonitorConfig>,
    ports: Ports,
    state: Arc<MonitorState>,
    policy: WindowPolicy,
    scheduler: DailyScheduler,
    watchdog: LivenessWatchdog,
}

impl MonitorService {
    /// Wire the service.  Liveness clocks start at the clock's current time.
    pub fn new(config: Arc<MonitorConfig>, ports: Ports) -> Self {
        let state = Arc::new(MonitorState::new(ports.clock.now()));
        let policy = WindowPolicy::from_config(&config);
        let watchdog = LivenessWatchdog::from_config(&config);
        Self {
            config,
            ports,
            state,
            policy,
            scheduler: DailyScheduler::new(),
            watchdog,
        }
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    /// Handle the feed subscriber uses to stamp packet arrivals.
    pub fn feed_heartbeat(&self) -> FeedHeartbeat {
        FeedHeartbeat::new(Arc::clone(&self.state))
    }

    pub fn policy(&self) -> &WindowPolicy {
        &self.policy
    }

    pub fn scheduler(&self) -> &DailyScheduler {
        &self.scheduler
    }

    pub fn watchdog(&self) -> &LivenessWatchdog {
        &self.watchdog
    }

    pub fn flags(&self) -> DebugFlags {
        self.config.debug_level
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.ports.clock.now()
    }

    pub fn weather(&self) -> Option<&dyn WeatherGateway> {
        self.ports.weather.as_deref()
    }

    /// The vehicle gateway with transport failures charged to the retry budget.
    pub fn vehicle(&self) -> BudgetedVehicle<'_> {
        BudgetedVehicle {
            inner: self.ports.vehicle.as_ref(),
            state: &*self.state,
        }
    }

    pub fn emit(&self, event: &MonitorEvent) {
        self.ports.events.emit(event);
    }

    /// Fire-and-forget alert; a failure is logged by [`alerts::dispatch`].
    pub fn notify(&self, note: &Notification) {
        let _ = alerts::dispatch(self.ports.notifier.as_ref(), note);
    }

    // ── Lifecycle ─────────────────────────────────────────────

    pub fn announce(&self) {
        let feed = self.config.feed.is_some();
        let weather = self.ports.weather.is_some();
        info!(
            "MonitorService started (feed={}, weather={}, wait={}s)",
            feed,
            weather,
            self.policy.wait_secs()
        );
        self.emit(&MonitorEvent::Started { feed, weather });
    }

    /// Wake a sleeping vehicle once if the config asks for it.
    pub fn startup_wake(&self) -> Result<(), FatalError> {
        let vehicle = self.vehicle();
        match vehicle.status() {
            Ok(status) if status.is_sleeping() => {
                if self.config.vehicle.wake_at_start {
                    info!("Waking up vehicle {}", self.config.vehicle.vin);
                    match vehicle.wake() {
                        Ok(woke) => info!("Wake requested (awake={})", woke),
                        Err(e) => warn!("Wake failed: {}", e),
                    }
                } else {
                    info!(
                        "Vehicle {} is {} and wake_at_start is off",
                        self.config.vehicle.vin, status
                    );
                }
            }
            Ok(VehicleStatus::Awake) => info!("Vehicle {} is already awake", self.config.vehicle.vin),
            Ok(status) => info!("Vehicle {} reported status {}", self.config.vehicle.vin, status),
            Err(e) => warn!("Vehicle status unavailable at startup: {}", e),
        }
        self.settle_escalation()
    }

    // ── Feed path ─────────────────────────────────────────────

    /// Handle one feed reading: stamp the feed clock, debounce, and on a
    /// new shower run the window policy.  The subscriber has normally
    /// stamped the clock already through [`FeedHeartbeat`].
    pub fn handle_rain_event(&self, event: RainEvent) -> Result<Option<PolicyOutcome>, FatalError> {
        self.state.stamp(MonitoredTask::Feed, event.received_at);

        let flags = self.flags();
        let rain_cm = if flags.has(DebugFlags::FORCE_RAIN) {
            FORCED_RAIN_CM
        } else {
            event.rain_cm
        };

        if flags.level() > 2 || (flags.verbose() && rain_cm > 0.0) {
            trace!("Feed: {:.4} cm, outside {:?}C", rain_cm, event.outside_temp_c);
        }

        let decision = self.state.observe_rain(RainSource::Feed, rain_cm);
        if !decision.should_evaluate {
            if rain_cm > 0.0 {
                debug!("Feed: skipping, waiting for the rain to stop");
            } else if flags.has(DebugFlags::DRY_READINGS) {
                info!("Feed: all is fine");
            }
            return Ok(None);
        }

        self.emit(&MonitorEvent::RainOnset {
            source: RainSource::Feed,
            rain_cm,
        });
        let outcome = self.check_windows_for_rain(&RainTrigger::feed(rain_cm), AlertScope::Feed);
        self.settle_escalation()?;
        Ok(outcome)
    }

    /// Read the vehicle and run the policy for `trigger`.  `None` when the
    /// read failed and the evaluation was abandoned.
    pub fn check_windows_for_rain(
        &self,
        trigger: &RainTrigger,
        scope: AlertScope,
    ) -> Option<PolicyOutcome> {
        let snapshot = self.read_vehicle(scope)?;
        Some(self.protect_from_rain(&snapshot, trigger))
    }

    /// Run the policy on an already-read snapshot, then log and notify.
    pub fn protect_from_rain(&self, snapshot: &VehicleSnapshot, trigger: &RainTrigger) -> PolicyOutcome {
        let vehicle = self.vehicle();
        let outcome = self.policy.evaluate(snapshot, trigger, &vehicle);
        let note = outcome.notification(trigger, self.now());
        policy::log_outcome(&outcome, &note);
        self.notify(&note);
        outcome
    }

    // ── Scheduler / watchdog entry points ─────────────────────

    pub fn run_cycle(&self) -> Result<(), FatalError> {
        let result = self.scheduler.run_cycle(self);
        self.settle_escalation()?;
        result
    }

    pub fn check_liveness(&self) -> Result<(), FatalError> {
        self.watchdog
            .check(&self.state, self.now(), self.ports.notifier.as_ref())
    }

    // ── Vehicle reads ─────────────────────────────────────────

    /// Status then cached state.  Any failure aborts the caller's
    /// evaluation; non-transport failures alert once until a read succeeds.
    pub fn read_vehicle(&self, scope: AlertScope) -> Option<VehicleSnapshot> {
        let vehicle = self.vehicle();
        let result = vehicle.status().and_then(|status| {
            if self.flags().has(DebugFlags::VEHICLE_STATUS) {
                info!("{}: vehicle status {}", scope.label(), status);
            }
            let mut snapshot = vehicle.state(true)?;
            snapshot.awake = status == VehicleStatus::Awake;
            Ok(snapshot)
        });

        match result {
            Ok(snapshot) => {
                self.state.clear_read_error();
                Some(snapshot)
            }
            Err(e) => {
                self.report_read_error(scope, &e);
                None
            }
        }
    }

    fn report_read_error(&self, scope: AlertScope, err: &GatewayError) {
        if err.is_transport() {
            debug!("{}: vehicle unreachable: {}", scope.label(), err);
            return;
        }
        if !self.state.latch_read_error() {
            debug!("{}: vehicle read still failing: {}", scope.label(), err);
            return;
        }
        let text = match err {
            GatewayError::Status(code) => format!(
                "Error #{} getting vehicle data for VIN {}",
                code, self.config.vehicle.vin
            ),
            GatewayError::MissingData(section) => format!(
                "Missing data reading vehicle state for VIN {} ({})",
                self.config.vehicle.vin, section
            ),
            other => format!(
                "Bad vehicle data for VIN {} ({})",
                self.config.vehicle.vin, other
            ),
        };
        warn!("{}: {}", scope.label(), text);
        self.notify(&Notification::headline(scope, text));
    }

    /// Send the pending retry-budget alert, if any.  Failing to send it
    /// means both the vehicle and notification paths are down.
    fn settle_escalation(&self) -> Result<(), FatalError> {
        let Some(detail) = self.state.take_escalation() else {
            return Ok(());
        };
        let note = Notification::new(
            AlertScope::Vehicle,
            "command failed three times in a row",
            format!("Vehicle API failed three consecutive times: {detail}"),
        );
        warn!("{}", note.body);
        alerts::dispatch(self.ports.notifier.as_ref(), &note).map_err(|e| {
            error!("Vehicle: escalation alert not sent ({}), giving up", e);
            FatalError::AlertPathDown
        })
    }
}

// ───────────────────────────────────────────────────────────────
// Budgeted vehicle gateway
// ───────────────────────────────────────────────────────────────

/// Decorator that charges every vehicle call to the retry budget: no
/// answer is a failure, any answer resets the count.
pub struct BudgetedVehicle<'a> {
    inner: &'a dyn VehicleGateway,
    state: &'a MonitorState,
}

impl BudgetedVehicle<'_> {
    fn account<T>(&self, result: Result<T, GatewayError>) -> Result<T, GatewayError> {
        match &result {
            Err(e) if e.is_transport() => {
                if self.state.record_vehicle_failure(&e.to_string()) {
                    debug!("Vehicle: retry budget exhausted");
                }
            }
            _ => self.state.record_vehicle_success(),
        }
        result
    }
}

impl VehicleGateway for BudgetedVehicle<'_> {
    fn status(&self) -> Result<VehicleStatus, GatewayError> {
        self.account(self.inner.status())
    }

    fn state(&self, use_cache: bool) -> Result<VehicleSnapshot, GatewayError> {
        self.account(self.inner.state(use_cache))
    }

    fn wake(&self) -> Result<bool, GatewayError> {
        self.account(self.inner.wake())
    }

    fn close_windows(&self, max_wait_secs: u64) -> Result<ActuationResult, GatewayError> {
        self.account(self.inner.close_windows(max_wait_secs))
    }
}
