//! Rain debounce engine.
//!
//! Two independent sources report rain: the local weather-station feed and
//! the weather API.  Each holds an "active episode" flag.  A positive
//! reading only triggers a window evaluation when *neither* flag was set,
//! so one shower is acted on once, by whichever source saw it first.
//!
//! ```text
//!                  reading > 0                       reading = 0
//!   ┌──────────┐ ─────────────▶ ┌──────────┐ ─────────────────▶ ┌──────────┐
//!   │   idle   │   evaluate if  │  active  │   flag cleared     │   idle   │
//!   └──────────┘  other is idle └──────────┘                    └──────────┘
//! ```

use chrono::{DateTime, Utc};

/// Which source produced a rain reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RainSource {
    Feed,
    WeatherApi,
}

impl core::fmt::Display for RainSource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Feed => write!(f, "feed"),
            Self::WeatherApi => write!(f, "weather-api"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RainDecision {
    /// First droplet of a new shower; the window policy should run.
    pub should_evaluate: bool,
}

impl RainDecision {
    const SKIP: Self = Self {
        should_evaluate: false,
    };
}

/// The two episode flags.  Pure state, no I/O.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RainDebouncer {
    feed_active: bool,
    weather_active: bool,
}

impl RainDebouncer {
    pub const fn new() -> Self {
        Self {
            feed_active: false,
            weather_active: false,
        }
    }

    /// Feed a rain amount.  Anything that is not strictly positive
    /// (including NaN) ends the source's episode.
    pub fn observe(&mut self, source: RainSource, rain_cm: f64) -> RainDecision {
        self.observe_raining(source, rain_cm > 0.0)
    }

    /// Same as [`observe`](Self::observe) for sources that only report a
    /// yes/no condition.
    pub fn observe_raining(&mut self, source: RainSource, raining: bool) -> RainDecision {
        if !raining {
            *self.flag_mut(source) = false;
            return RainDecision::SKIP;
        }
        let idle = !self.any_active();
        *self.flag_mut(source) = true;
        RainDecision {
            should_evaluate: idle,
        }
    }

    pub fn clear(&mut self, source: RainSource) {
        *self.flag_mut(source) = false;
    }

    pub const fn is_active(&self, source: RainSource) -> bool {
        match source {
            RainSource::Feed => self.feed_active,
            RainSource::WeatherApi => self.weather_active,
        }
    }

    pub const fn any_active(&self) -> bool {
        self.feed_active || self.weather_active
    }

    fn flag_mut(&mut self, source: RainSource) -> &mut bool {
        match source {
            RainSource::Feed => &mut self.feed_active,
            RainSource::WeatherApi => &mut self.weather_active,
        }
    }
}

/// One reading delivered by the feed subscriber.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RainEvent {
    /// Rain since the previous reading.  A null payload value is 0.
    pub rain_cm: f64,
    pub outside_temp_c: Option<f64>,
    pub received_at: DateTime<Utc>,
}
