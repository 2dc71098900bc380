//! Weather API adapter (OpenWeatherMap current conditions).
//!
//! `GET {base_url}/weather?lat=..&lon=..&appid=..`.  Only the first
//! `weather[]` entry, `main.temp` and `name` are read.

use core::time::Duration;

use log::info;
use serde::Deserialize;

use crate::app::ports::WeatherGateway;
use crate::config::{DebugFlags, WeatherConfig};
use crate::error::GatewayError;
use crate::weather::{self, WeatherSnapshot};

#[derive(Debug, Deserialize)]
struct ConditionsBody {
    #[serde(default)]
    weather: Vec<WeatherEntry>,
    #[serde(default)]
    main: Option<MainSection>,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct WeatherEntry {
    icon: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct MainSection {
    temp: Option<f64>,
}

/// Decode a current-conditions answer.
pub fn parse_weather(body: &[u8]) -> Result<WeatherSnapshot, GatewayError> {
    let parsed: ConditionsBody =
        serde_json::from_slice(body).map_err(|e| GatewayError::Malformed(e.to_string()))?;
    let entry = parsed
        .weather
        .into_iter()
        .next()
        .ok_or(GatewayError::MissingData("weather"))?;
    let (icon_code, daytime) = weather::parse_icon(&entry.icon)
        .ok_or_else(|| GatewayError::Malformed(format!("icon '{}'", entry.icon)))?;

    Ok(WeatherSnapshot {
        icon_code,
        daytime,
        description: entry.description,
        temp_kelvin: parsed.main.and_then(|m| m.temp),
        station_name: parsed.name,
    })
}

pub struct OwmClient {
    http: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
    flags: DebugFlags,
}

impl OwmClient {
    pub fn new(
        config: &WeatherConfig,
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
            api_key: config.api_key.clone(),
            timeout: Duration::from_secs(request_timeout_secs),
            flags,
        })
    }
}

impl WeatherGateway for OwmClient {
    fn current_conditions(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<WeatherSnapshot, GatewayError> {
        let url = format!("{}/weather", self.base_url);
        if self.flags.has(DebugFlags::WEATHER_URL) {
            info!("OWM: GET {}?lat={}&lon={}", url, latitude, longitude);
        }

        let response = self
            .http
            .get(&url)
            .query(&[
                ("lat", latitude.to_string()),
                ("lon", longitude.to_string()),
                ("appid", self.api_key.clone()),
            ])
            .timeout(self.timeout)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::Timeout
                } else {
                    GatewayError::Transport(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        if self.flags.has(DebugFlags::WEATHER_RESPONSE) {
            info!("OWM: {} {}", status, String::from_utf8_lossy(&body));
        }
        if status != 200 {
            return Err(GatewayError::Status(status));
        }
        parse_weather(&body)
    }
}
