//! JSON config file adapter.
//!
//! Implements [`ConfigPort`] for a single JSON document on disk.  The path
//! comes from the first command-line argument, then `RAINGUARD_CONFIG`,
//! then `rainguard.json` in the working directory.
//!
//! Values are range-checked after parsing; an out-of-range field is
//! rejected rather than clamped.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::info;

use crate::app::ports::ConfigPort;
use crate::config::MonitorConfig;
use crate::error::ConfigError;

pub const CONFIG_ENV: &str = "RAINGUARD_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "rainguard.json";

/// Lowest watchdog period that leaves room for the close command's wait.
const MIN_WATCHDOG_SECS: u64 = 6;

pub struct JsonFileConfig {
    path: PathBuf,
}

impl JsonFileConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Resolve the path from the process arguments and environment.
    pub fn from_args() -> Self {
        let path = std::env::args_os()
            .nth(1)
            .map(PathBuf::from)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigPort for JsonFileConfig {
    fn load(&self) -> Result<MonitorConfig, ConfigError> {
        let raw = std::fs::read(&self.path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ConfigError::NotFound(self.path.display().to_string()),
            _ => ConfigError::Io(format!("{}: {}", self.path.display(), e)),
        })?;
        let config: MonitorConfig =
            serde_json::from_slice(&raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
        validate_config(&config)?;
        info!("Config: loaded {}", self.path.display());
        Ok(config)
    }
}

pub fn validate_config(cfg: &MonitorConfig) -> Result<(), ConfigError> {
    if !(-90.0..=90.0).contains(&cfg.station.latitude) {
        return Err(ConfigError::ValidationFailed(
            "station.latitude must be -90..90",
        ));
    }
    if !(-180.0..=180.0).contains(&cfg.station.longitude) {
        return Err(ConfigError::ValidationFailed(
            "station.longitude must be -180..180",
        ));
    }
    if !cfg.station.max_distance_km.is_finite() || cfg.station.max_distance_km <= 0.0 {
        return Err(ConfigError::ValidationFailed(
            "station.max_distance_km must be > 0",
        ));
    }
    if cfg.timers.timer_interval_secs == 0 {
        return Err(ConfigError::ValidationFailed(
            "timers.timer_interval_secs must be > 0",
        ));
    }
    if cfg.timers.watchdog_interval_secs < MIN_WATCHDOG_SECS {
        return Err(ConfigError::ValidationFailed(
            "timers.watchdog_interval_secs must be > 5",
        ));
    }
    if cfg.timers.timer_interval_secs >= cfg.timers.watchdog_interval_secs {
        return Err(ConfigError::ValidationFailed(
            "timers.timer_interval_secs must be shorter than watchdog_interval_secs",
        ));
    }
    if cfg.timers.feed_max_silence_secs == 0 {
        return Err(ConfigError::ValidationFailed(
            "timers.feed_max_silence_secs must be > 0",
        ));
    }
    if cfg.timers.request_timeout_secs == 0 {
        return Err(ConfigError::ValidationFailed(
            "timers.request_timeout_secs must be > 0",
        ));
    }
    if cfg.feed.is_none() && cfg.weather.is_none() {
        return Err(ConfigError::ValidationFailed(
            "at least one of feed or weather must be configured",
        ));
    }
    if cfg.weather.as_ref().is_some_and(|w| w.api_key.trim().is_empty()) {
        return Err(ConfigError::ValidationFailed("weather.api_key is empty"));
    }
    if cfg.vehicle.vin.trim().is_empty() {
        return Err(ConfigError::ValidationFailed("vehicle.vin is empty"));
    }
    if cfg.vehicle.api_token.trim().is_empty() {
        return Err(ConfigError::ValidationFailed("vehicle.api_token is empty"));
    }
    if cfg.email.to.trim().is_empty() {
        return Err(ConfigError::ValidationFailed("email.to is empty"));
    }
    Ok(())
}
