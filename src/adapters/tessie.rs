//! Vehicle API adapter (Tessie REST).
//!
//! Implements [`VehicleGateway`] over blocking `reqwest`.  Every call is
//! `GET {base_url}/{vin}/{command}{query}` with a bearer token and a
//! per-call timeout.
//!
//! | Call             | Endpoint                                  | Timeout              |
//! |------------------|-------------------------------------------|----------------------|
//! | `status`         | `status`                                  | `request_timeout`    |
//! | `state`          | `state?use_cache=true`                    | `request_timeout`    |
//! | `wake`           | `wake`                                    | `request_timeout`    |
//! | `close_windows`  | `command/close_windows?retry_duration=N`  | `N` seconds          |
//!
//! Response decoding lives in free functions so the fuzz targets and the
//! tests can drive it without a network.

use core::time::Duration;

use log::{info, warn};
use serde::Deserialize;

use crate::app::ports::VehicleGateway;
use crate::config::{DebugFlags, VehicleConfig};
use crate::error::GatewayError;
use crate::vehicle::{ActuationResult, ShiftState, VehicleSnapshot, VehicleStatus};

// ───────────────────────────────────────────────────────────────
// Wire types
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct StatusBody {
    status: String,
}

#[derive(Debug, Default, Deserialize)]
struct StateBody {
    vehicle_state: Option<VehicleSection>,
    drive_state: Option<DriveSection>,
    climate_state: Option<ClimateSection>,
    charge_state: Option<ChargeSection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct VehicleSection {
    fd_window: Option<i64>,
    fp_window: Option<i64>,
    rd_window: Option<i64>,
    rp_window: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DriveSection {
    shift_state: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ClimateSection {
    inside_temp: Option<f64>,
    outside_temp: Option<f64>,
    cabin_overheat_protection_actively_cooling: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ChargeSection {
    battery_level: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CommandBody {
    result: bool,
    woke: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WakeBody {
    result: bool,
}

// ───────────────────────────────────────────────────────────────
// Decoding
// ───────────────────────────────────────────────────────────────

fn decode<'a, T: Deserialize<'a>>(body: &'a [u8]) -> Result<T, GatewayError> {
    serde_json::from_slice(body).map_err(|e| GatewayError::Malformed(e.to_string()))
}

/// Decode the `status` answer.
pub fn parse_status(body: &[u8]) -> Result<VehicleStatus, GatewayError> {
    let parsed: StatusBody = decode(body)?;
    Ok(VehicleStatus::from_api(&parsed.status))
}

/// Decode the `state` answer.  All four sections must be present; a window
/// counts as open when its position is nonzero.
pub fn parse_state(body: &[u8]) -> Result<VehicleSnapshot, GatewayError> {
    let parsed: StateBody = decode(body)?;
    let vehicle = parsed
        .vehicle_state
        .ok_or(GatewayError::MissingData("vehicle_state"))?;
    let drive = parsed
        .drive_state
        .ok_or(GatewayError::MissingData("drive_state"))?;
    let climate = parsed
        .climate_state
        .ok_or(GatewayError::MissingData("climate_state"))?;
    let charge = parsed
        .charge_state
        .ok_or(GatewayError::MissingData("charge_state"))?;

    let windows_open_count = [
        vehicle.fd_window,
        vehicle.fp_window,
        vehicle.rd_window,
        vehicle.rp_window,
    ]
    .iter()
    .filter(|w| w.is_some_and(|pos| pos != 0))
    .count() as u8;

    Ok(VehicleSnapshot {
        windows_open_count,
        shift_state: ShiftState::from_code(drive.shift_state.as_deref()),
        latitude: drive.latitude,
        longitude: drive.longitude,
        inside_temp_c: climate.inside_temp,
        outside_temp_c: climate.outside_temp,
        battery_soc_percent: charge
            .battery_level
            .filter(|l| l.is_finite())
            .map(|l| l.round().clamp(0.0, 100.0) as u8),
        active_cooling: climate.cabin_overheat_protection_actively_cooling,
        awake: false,
    })
}

/// Decode a command answer.  The body is only trusted on a 200.
pub fn parse_command(status_code: u16, body: &[u8]) -> ActuationResult {
    let parsed = if status_code == 200 {
        serde_json::from_slice::<CommandBody>(body).unwrap_or_default()
    } else {
        CommandBody::default()
    };
    ActuationResult {
        status_code,
        result: parsed.result,
        woke: parsed.woke,
    }
}

// ───────────────────────────────────────────────────────────────
// Client
// ───────────────────────────────────────────────────────────────

pub struct TessieClient {
    http: reqwest::blocking::Client,
    base_url: String,
    vin: String,
    token: String,
    timeout: Duration,
    flags: DebugFlags,
}

impl TessieClient {
    pub fn new(
        config: &VehicleConfig,
        request_timeout_secs: u64,
        flags: DebugFlags,
    ) -> Result<Self, GatewayError> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(concat!("rainguard/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GatewayError::Transport(format!("cannot build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            vin: config.vin.clone(),
            token: config.api_token.clone(),
            timeout: Duration::from_secs(request_timeout_secs),
            flags,
        })
    }

    /// One round trip.  Returns the status code and the raw body; only a
    /// missing answer is an error here.
    fn call(&self, command: &str, query: &str, timeout: Duration) -> Result<(u16, Vec<u8>), GatewayError> {
        let url = format!("{}/{}/{}{}", self.base_url, self.vin, command, query);
        if self.flags.has(DebugFlags::VEHICLE_URL) {
            info!("Tessie: GET {}", url);
        }

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, "application/json")
            .timeout(timeout)
            .send()
            .map_err(map_transport)?;

        let status = response.status().as_u16();
        let body = response.bytes().map_err(map_transport)?.to_vec();

        if self.flags.has(DebugFlags::VEHICLE_RESPONSE) {
            info!("Tessie: {} -> {} {}", command, status, String::from_utf8_lossy(&body));
        }
        Ok((status, body))
    }

    /// Like [`call`](Self::call) but anything except 200 is an error.
    fn call_ok(&self, command: &str, query: &str) -> Result<Vec<u8>, GatewayError> {
        match self.call(command, query, self.timeout)? {
            (200, body) => Ok(body),
            (status, _) => Err(GatewayError::Status(status)),
        }
    }
}

fn map_transport(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Timeout
    } else {
        GatewayError::Transport(e.to_string())
    }
}

impl VehicleGateway for TessieClient {
    fn status(&self) -> Result<VehicleStatus, GatewayError> {
        let status = parse_status(&self.call_ok("status", "")?)?;
        if self.flags.has(DebugFlags::VEHICLE_STATUS) {
            info!("Tessie: vehicle {} is {}", self.vin, status);
        }
        Ok(status)
    }

    fn state(&self, use_cache: bool) -> Result<VehicleSnapshot, GatewayError> {
        parse_state(&self.call_ok("state", &format!("?use_cache={use_cache}"))?)
    }

    fn wake(&self) -> Result<bool, GatewayError> {
        let body = self.call_ok("wake", "")?;
        let parsed: WakeBody = decode(&body)?;
        Ok(parsed.result)
    }

    fn close_windows(&self, max_wait_secs: u64) -> Result<ActuationResult, GatewayError> {
        let (status, body) = self.call(
            "command/close_windows",
            &format!("?retry_duration={max_wait_secs}"),
            Duration::from_secs(max_wait_secs),
        )?;
        let result = parse_command(status, &body);
        if !result.succeeded() {
            warn!("Tessie: close_windows answered {} (result={})", status, result.result);
        }
        Ok(result)
    }
}
