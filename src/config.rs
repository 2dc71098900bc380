//! Monitor configuration.
//!
//! Read once at startup by a [`ConfigPort`](crate::app::ports::ConfigPort)
//! and shared immutably as `Arc<MonitorConfig>`.  Optional sections decide
//! which inputs are active: no `feed` means weather-only mode, no `weather`
//! means feed-only mode.  At least one of the two is required.

use log::LevelFilter;
use serde::{Deserialize, Serialize};

/// Top-level configuration document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub station: StationConfig,
    #[serde(default)]
    pub timers: TimerConfig,
    #[serde(default)]
    pub debug_level: DebugFlags,
    pub vehicle: VehicleConfig,
    #[serde(default)]
    pub weather: Option<WeatherConfig>,
    #[serde(default)]
    pub feed: Option<FeedConfig>,
    pub email: EmailConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            station: StationConfig::default(),
            timers: TimerConfig::default(),
            debug_level: DebugFlags::default(),
            vehicle: VehicleConfig::default(),
            weather: None,
            feed: Some(FeedConfig::default()),
            email: EmailConfig::default(),
        }
    }
}

// --- Station ---

/// Home weather station; the geofence is centred here.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StationConfig {
    pub latitude: f64,
    pub longitude: f64,
    /// Feed-reported rain is trusted within this radius.
    pub max_distance_km: f64,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            latitude: 45.5017,
            longitude: -73.5673,
            max_distance_km: 5.0,
        }
    }
}

// --- Timers ---

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerConfig {
    /// Scheduler period.
    pub timer_interval_secs: u64,
    /// Watchdog period, and the scheduler's max silence.
    pub watchdog_interval_secs: u64,
    /// Longest acceptable gap between two feed messages.
    pub feed_max_silence_secs: u64,
    /// Per-call timeout for vehicle and weather requests.
    pub request_timeout_secs: u64,
    /// Grace period before the watchdog starts.
    pub watchdog_start_delay_secs: u64,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            timer_interval_secs: 60,
            watchdog_interval_secs: 90,
            feed_max_silence_secs: 60,
            request_timeout_secs: 30,
            watchdog_start_delay_secs: 30,
        }
    }
}

// --- Vehicle ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleConfig {
    pub vin: String,
    pub api_token: String,
    #[serde(default = "default_vehicle_url")]
    pub base_url: String,
    /// Wake a sleeping vehicle once at startup.
    #[serde(default)]
    pub wake_at_start: bool,
}

fn default_vehicle_url() -> String {
    "https://api.tessie.com".into()
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            vin: String::new(),
            api_token: String::new(),
            base_url: default_vehicle_url(),
            wake_at_start: false,
        }
    }
}

// --- Weather API ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    pub api_key: String,
    #[serde(default = "default_weather_url")]
    pub base_url: String,
}

fn default_weather_url() -> String {
    "https://api.openweathermap.org/data/2.5".into()
}

// --- Station feed ---

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub hostname: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub use_tls: bool,
    pub topic: String,
    pub client_id: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            hostname: "localhost".into(),
            port: 1883,
            username: None,
            password: None,
            use_tls: false,
            topic: "acurite/loop".into(),
            client_id: "rainguard".into(),
        }
    }
}

// --- Email ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    /// Sender address; defaults to `username`.
    #[serde(default)]
    pub from: Option<String>,
    pub to: String,
}

fn default_smtp_host() -> String {
    "smtp.gmail.com".into()
}

const fn default_smtp_port() -> u16 {
    587
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
            username: String::new(),
            password: String::new(),
            from: None,
            to: String::new(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Debug bitmask
// ═══════════════════════════════════════════════════════════════

/// Verbosity level in bits 0-1 plus independent trace switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DebugFlags(pub u32);

impl DebugFlags {
    /// Log dry feed readings.
    pub const DRY_READINGS: u32 = 0x04;
    /// Treat every feed message as rain.
    pub const FORCE_RAIN: u32 = 0x08;
    pub const FEED_PAYLOAD: u32 = 0x10;
    pub const VEHICLE_URL: u32 = 0x20;
    pub const VEHICLE_RESPONSE: u32 = 0x40;
    pub const VEHICLE_STATUS: u32 = 0x80;
    pub const WEATHER_URL: u32 = 0x100;
    pub const WEATHER_RESPONSE: u32 = 0x200;
    pub const CLIMATE: u32 = 0x800;
    pub const SUN: u32 = 0x4000;

    const LEVEL_MASK: u32 = 0x03;

    pub const fn level(self) -> u8 {
        (self.0 & Self::LEVEL_MASK) as u8
    }

    /// Level 2 and up.
    pub const fn verbose(self) -> bool {
        self.level() >= 2
    }

    pub const fn has(self, flag: u32) -> bool {
        self.0 & flag != 0
    }

    pub const fn level_filter(self) -> LevelFilter {
        match self.level() {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}
