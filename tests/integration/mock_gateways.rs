//! Mock gateways for integration tests.
//!
//! Every adapter records what the service asked of it so tests can assert
//! on the full call history.  Responses are set up front and can be
//! changed between steps.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, mpsc};

use chrono::{DateTime, TimeDelta, TimeZone, Utc};

use rainguard::app::events::MonitorEvent;
use rainguard::app::ports::{Clock, EventSink, Notifier, VehicleGateway, WeatherGateway};
use rainguard::app::service::{MonitorService, Ports};
use rainguard::config::{MonitorConfig, WeatherConfig};
use rainguard::error::{GatewayError, NotifyError};
use rainguard::geo::EARTH_RADIUS_KM;
use rainguard::vehicle::{ActuationResult, ShiftState, VehicleSnapshot, VehicleStatus};
use rainguard::weather::WeatherSnapshot;

pub const STATION: (f64, f64) = (45.5017, -73.5673);

/// Midday in Montreal (13:00 EDT).
pub fn montreal_noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 21, 17, 0, 0).unwrap()
}

/// Middle of the night in Montreal (01:00 EDT).
pub fn montreal_night() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 21, 5, 0, 0).unwrap()
}

/// A point `km` due north of the station.
pub fn north_of_station(km: f64) -> (f64, f64) {
    (STATION.0 + (km / EARTH_RADIUS_KM).to_degrees(), STATION.1)
}

/// Parked at `position` with two windows down.
pub fn parked_open_at(position: (f64, f64)) -> VehicleSnapshot {
    VehicleSnapshot {
        windows_open_count: 2,
        shift_state: ShiftState::Parked,
        latitude: Some(position.0),
        longitude: Some(position.1),
        battery_soc_percent: Some(80),
        ..VehicleSnapshot::default()
    }
}

pub fn closed_ok() -> ActuationResult {
    ActuationResult {
        status_code: 200,
        result: true,
        woke: false,
    }
}

// ── Vehicle ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleCall {
    Status,
    State { use_cache: bool },
    Wake,
    CloseWindows { max_wait_secs: u64 },
}

pub struct MockVehicle {
    pub status: Mutex<Result<VehicleStatus, GatewayError>>,
    pub state: Mutex<Result<VehicleSnapshot, GatewayError>>,
    /// Consumed one per close; empty means success.
    pub close_script: Mutex<VecDeque<Result<ActuationResult, GatewayError>>>,
    pub calls: Mutex<Vec<VehicleCall>>,
    /// When set, the next close reports entry and blocks until released.
    pub close_gate: Mutex<Option<(mpsc::Sender<()>, mpsc::Receiver<()>)>>,
}

impl MockVehicle {
    pub fn new(snapshot: VehicleSnapshot) -> Self {
        Self {
            status: Mutex::new(Ok(VehicleStatus::Awake)),
            state: Mutex::new(Ok(snapshot)),
            close_script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            close_gate: Mutex::new(None),
        }
    }

    /// Make the next close block.  Returns `(entered, release)`.
    pub fn hold_close(&self) -> (mpsc::Receiver<()>, mpsc::Sender<()>) {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        *self.close_gate.lock().unwrap() = Some((entered_tx, release_rx));
        (entered_rx, release_tx)
    }

    pub fn set_status(&self, status: Result<VehicleStatus, GatewayError>) {
        *self.status.lock().unwrap() = status;
    }

    pub fn set_state(&self, state: Result<VehicleSnapshot, GatewayError>) {
        *self.state.lock().unwrap() = state;
    }

    pub fn script_close(&self, result: Result<ActuationResult, GatewayError>) {
        self.close_script.lock().unwrap().push_back(result);
    }

    pub fn calls(&self) -> Vec<VehicleCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn close_calls(&self) -> Vec<u64> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                VehicleCall::CloseWindows { max_wait_secs } => Some(max_wait_secs),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: VehicleCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl VehicleGateway for MockVehicle {
    fn status(&self) -> Result<VehicleStatus, GatewayError> {
        self.record(VehicleCall::Status);
        self.status.lock().unwrap().clone()
    }

    fn state(&self, use_cache: bool) -> Result<VehicleSnapshot, GatewayError> {
        self.record(VehicleCall::State { use_cache });
        self.state.lock().unwrap().clone()
    }

    fn wake(&self) -> Result<bool, GatewayError> {
        self.record(VehicleCall::Wake);
        Ok(true)
    }

    fn close_windows(&self, max_wait_secs: u64) -> Result<ActuationResult, GatewayError> {
        self.record(VehicleCall::CloseWindows { max_wait_secs });
        let gate = self.close_gate.lock().unwrap().take();
        if let Some((entered, release)) = gate {
            let _ = entered.send(());
            let _ = release.recv();
        }
        self.close_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(closed_ok()))
    }
}

// ── Weather ───────────────────────────────────────────────────

pub struct MockWeather {
    pub conditions: Mutex<Result<WeatherSnapshot, GatewayError>>,
    pub lookups: Mutex<Vec<(f64, f64)>>,
}

impl MockWeather {
    pub fn new() -> Self {
        Self {
            conditions: Mutex::new(Ok(Self::conditions("04d", None))),
            lookups: Mutex::new(Vec::new()),
        }
    }

    /// Conditions for an icon like `"10d"` at station "Dorval".
    pub fn conditions(icon: &str, temp_c: Option<f64>) -> WeatherSnapshot {
        let (icon_code, daytime) = rainguard::weather::parse_icon(icon).unwrap();
        WeatherSnapshot {
            icon_code,
            daytime,
            description: format!("icon {icon}"),
            temp_kelvin: temp_c.map(|t| t + rainguard::weather::KELVIN_OFFSET),
            station_name: "Dorval".into(),
        }
    }

    pub fn set(&self, conditions: Result<WeatherSnapshot, GatewayError>) {
        *self.conditions.lock().unwrap() = conditions;
    }

    pub fn lookups(&self) -> usize {
        self.lookups.lock().unwrap().len()
    }
}

impl WeatherGateway for MockWeather {
    fn current_conditions(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<WeatherSnapshot, GatewayError> {
        self.lookups.lock().unwrap().push((latitude, longitude));
        self.conditions.lock().unwrap().clone()
    }
}

// ── Notifier ──────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, String)>>,
    pub failing: AtomicBool,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn subjects(&self) -> Vec<String> {
        self.sent().into_iter().map(|(s, _)| s).collect()
    }

    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::Send("relay unreachable".into()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((subject.to_owned(), body.to_owned()));
        Ok(())
    }
}

// ── Clock ─────────────────────────────────────────────────────

pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }

    pub fn advance_secs(&self, secs: i64) {
        *self.now.lock().unwrap() += TimeDelta::seconds(secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Mutex<Vec<MonitorEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<MonitorEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &MonitorEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

// ── Harness ───────────────────────────────────────────────────

/// Feed and weather both enabled, station in Montreal.
pub fn test_config() -> MonitorConfig {
    let mut cfg = MonitorConfig::default();
    cfg.station.latitude = STATION.0;
    cfg.station.longitude = STATION.1;
    cfg.station.max_distance_km = 5.0;
    cfg.vehicle.vin = "5YJ3E1EA7KF000000".into();
    cfg.vehicle.api_token = "token".into();
    cfg.email.to = "ops@example.com".into();
    cfg.weather = Some(WeatherConfig {
        api_key: "key".into(),
        base_url: "http://localhost".into(),
    });
    cfg
}

pub struct Harness {
    pub svc: MonitorService,
    pub vehicle: Arc<MockVehicle>,
    pub weather: Arc<MockWeather>,
    pub notifier: Arc<RecordingNotifier>,
    pub clock: Arc<ManualClock>,
    pub sink: Arc<RecordingSink>,
}

impl Harness {
    pub fn new(config: MonitorConfig, snapshot: VehicleSnapshot, now: DateTime<Utc>) -> Self {
        let vehicle = Arc::new(MockVehicle::new(snapshot));
        let weather = Arc::new(MockWeather::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let clock = Arc::new(ManualClock::new(now));
        let sink = Arc::new(RecordingSink::default());

        let has_weather = config.weather.is_some();
        let ports = Ports {
            vehicle: vehicle.clone(),
            weather: has_weather.then(|| weather.clone() as Arc<dyn WeatherGateway>),
            notifier: notifier.clone(),
            clock: clock.clone(),
            events: sink.clone(),
        };
        let svc = MonitorService::new(Arc::new(config), ports);
        Self {
            svc,
            vehicle,
            weather,
            notifier,
            clock,
            sink,
        }
    }

    pub fn default_at(now: DateTime<Utc>) -> Self {
        Self::new(test_config(), parked_open_at(STATION), now)
    }
}
