//! Current-conditions snapshot from the weather API.

/// Offset between Kelvin and Celsius.
pub const KELVIN_OFFSET: f64 = 273.15;

/// Highest icon category that still shows some sun (01 clear .. 03 scattered).
const MAX_SUNNY_ICON: u8 = 3;

/// Icon categories that mean precipitation: 09 shower, 10 rain, 11 thunderstorm.
const RAIN_ICONS: core::ops::RangeInclusive<u8> = 9..=11;

pub fn kelvin_to_celsius(kelvin: f64) -> f64 {
    kelvin - KELVIN_OFFSET
}

/// Split an icon like `"10d"` into its category and day flag.
///
/// Returns `None` when the first two characters are not a number.
pub fn parse_icon(icon: &str) -> Option<(u8, bool)> {
    let code = icon.get(..2)?.parse().ok()?;
    let daytime = icon.get(2..3) == Some("d");
    Some((code, daytime))
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct WeatherSnapshot {
    pub icon_code: u8,
    /// Icon suffix was `d`.
    pub daytime: bool,
    pub description: String,
    /// Ambient temperature; the API reports Kelvin.
    pub temp_kelvin: Option<f64>,
    /// Name of the reporting station.
    pub station_name: String,
}

impl WeatherSnapshot {
    pub fn is_sunny(&self) -> bool {
        self.icon_code <= MAX_SUNNY_ICON && self.daytime
    }

    pub fn is_rainy(&self) -> bool {
        RAIN_ICONS.contains(&self.icon_code)
    }

    pub fn temp_celsius(&self) -> Option<f64> {
        self.temp_kelvin.map(kelvin_to_celsius)
    }
}
