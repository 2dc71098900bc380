//! Sunrise / sunset and the day/night split used by the scheduler.
//!
//! Uses the Almanac for Computers algorithm (official zenith 90°50′),
//! accurate to a couple of minutes, which is plenty for deciding whether
//! the windows should be shut for the night.
//!
//! ```text
//!   local solar date ──▶ sun_event(rise) ──┐
//!                        sun_event(set)  ──┴─▶ NightWindow::new ──▶ Day / Night
//!                                                (sunset += 24h if ≤ sunrise)
//! ```
//!
//! Events are anchored on the local solar date: mean local midnight is
//! `date 00:00 UT - lon/15 h`, and the event's local mean hour is added to
//! it.  An event can therefore fall on the previous or next UT day.  When
//! the local mean hour wraps past midnight (high latitudes) the raw sunset
//! can still land before sunrise; [`NightWindow::new`] corrects that by
//! rolling the sunset forward one day.

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};

/// Official zenith for sunrise/sunset, including refraction and disc radius.
const ZENITH_DEG: f64 = 90.8333;

/// The sun counts as "high" this long after sunrise and before sunset.
pub const HIGH_SUN_MARGIN_HOURS: i64 = 3;

// ═══════════════════════════════════════════════════════════════
//  Day phase
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DayPhase {
    #[default]
    Day,
    Night,
}

// ═══════════════════════════════════════════════════════════════
//  Night window
// ═══════════════════════════════════════════════════════════════

/// Sunrise and sunset for one date with `sunset > sunrise` guaranteed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NightWindow {
    sunrise: DateTime<Utc>,
    sunset: DateTime<Utc>,
}

impl NightWindow {
    /// Build from raw computed instants, pushing `raw_sunset` forward by a
    /// day when it is not strictly after `sunrise`.
    pub fn new(sunrise: DateTime<Utc>, raw_sunset: DateTime<Utc>) -> Self {
        let sunset = if raw_sunset <= sunrise {
            raw_sunset + TimeDelta::days(1)
        } else {
            raw_sunset
        };
        Self { sunrise, sunset }
    }

    pub const fn sunrise(&self) -> DateTime<Utc> {
        self.sunrise
    }

    pub const fn sunset(&self) -> DateTime<Utc> {
        self.sunset
    }

    /// Day is the half-open interval `[sunrise, sunset)`.
    pub fn is_day(&self, now: DateTime<Utc>) -> bool {
        self.sunrise <= now && now < self.sunset
    }

    pub fn phase(&self, now: DateTime<Utc>) -> DayPhase {
        if self.is_day(now) { DayPhase::Day } else { DayPhase::Night }
    }

    /// `sunrise + 3h < now < sunset - 3h`.
    pub fn is_high_sun(&self, now: DateTime<Utc>) -> bool {
        let margin = TimeDelta::hours(HIGH_SUN_MARGIN_HOURS);
        self.sunrise + margin < now && now < self.sunset - margin
    }
}

// ═══════════════════════════════════════════════════════════════
//  Daylight for a position
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Daylight {
    Window(NightWindow),
    /// Sun never sets on this date.
    PolarDay,
    /// Sun never rises on this date.
    PolarNight,
}

impl Daylight {
    pub fn phase(&self, now: DateTime<Utc>) -> DayPhase {
        match self {
            Self::Window(w) => w.phase(now),
            Self::PolarDay => DayPhase::Day,
            Self::PolarNight => DayPhase::Night,
        }
    }

    pub fn is_high_sun(&self, now: DateTime<Utc>) -> bool {
        match self {
            Self::Window(w) => w.is_high_sun(now),
            Self::PolarDay => true,
            Self::PolarNight => false,
        }
    }
}

/// Sun times for the position's local solar date at `now`.
pub fn daylight(now: DateTime<Utc>, latitude: f64, longitude: f64) -> Daylight {
    let date = local_solar_date(now, longitude);
    match (
        sun_event(date, latitude, longitude, true),
        sun_event(date, latitude, longitude, false),
    ) {
        (SunEvent::At(rise), SunEvent::At(set)) => Daylight::Window(NightWindow::new(rise, set)),
        (SunEvent::NeverSets, _) | (_, SunEvent::NeverSets) => Daylight::PolarDay,
        _ => Daylight::PolarNight,
    }
}

/// Calendar date at the position's mean solar time (`UTC + lon/15 h`).
pub fn local_solar_date(now: DateTime<Utc>, longitude: f64) -> NaiveDate {
    let offset_secs = (longitude / 15.0 * 3600.0).round() as i64;
    (now + TimeDelta::seconds(offset_secs)).date_naive()
}

// ═══════════════════════════════════════════════════════════════
//  Almanac algorithm
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SunEvent {
    At(DateTime<Utc>),
    NeverRises,
    NeverSets,
}

/// Sunrise (`rising`) or sunset for `date` at the given position.
///
/// `date` is the local solar date; the returned instant is uncorrected,
/// see [`NightWindow::new`].
pub fn sun_event(date: NaiveDate, latitude: f64, longitude: f64, rising: bool) -> SunEvent {
    let day_of_year = f64::from(chrono::Datelike::ordinal(&date));
    let lng_hour = longitude / 15.0;
    let base_hour = if rising { 6.0 } else { 18.0 };
    let t = day_of_year + (base_hour - lng_hour) / 24.0;

    // Sun's mean anomaly and true longitude.
    let m = 0.9856 * t - 3.289;
    let l = (m
        + 1.916 * sin_deg(m)
        + 0.020 * sin_deg(2.0 * m)
        + 282.634)
        .rem_euclid(360.0);

    // Right ascension, moved into the same quadrant as L.
    let mut ra = (0.91764 * tan_deg(l)).atan().to_degrees().rem_euclid(360.0);
    ra += (l / 90.0).floor() * 90.0 - (ra / 90.0).floor() * 90.0;
    let ra_hours = ra / 15.0;

    let sin_dec = 0.39782 * sin_deg(l);
    let cos_dec = sin_dec.asin().cos();

    let cos_h = (cos_deg(ZENITH_DEG) - sin_dec * sin_deg(latitude)) / (cos_dec * cos_deg(latitude));
    if cos_h > 1.0 {
        return SunEvent::NeverRises;
    }
    if cos_h < -1.0 {
        return SunEvent::NeverSets;
    }

    let h_deg = if rising {
        360.0 - cos_h.acos().to_degrees()
    } else {
        cos_h.acos().to_degrees()
    };
    let local_mean = (h_deg / 15.0 + ra_hours - 0.06571 * t - 6.622).rem_euclid(24.0);

    let secs = ((local_mean - lng_hour) * 3600.0).round() as i64;
    SunEvent::At(date.and_time(chrono::NaiveTime::MIN).and_utc() + TimeDelta::seconds(secs))
}

fn sin_deg(deg: f64) -> f64 {
    deg.to_radians().sin()
}

fn cos_deg(deg: f64) -> f64 {
    deg.to_radians().cos()
}

fn tan_deg(deg: f64) -> f64 {
    deg.to_radians().tan()
}
