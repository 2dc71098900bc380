//! Vehicle-side domain types.
//!
//! These are what the [`VehicleGateway`](crate::app::ports::VehicleGateway)
//! hands back to the core.  Parsing the vendor JSON into them is the
//! adapter's job; everything here is plain data plus a few predicates.

use core::fmt;

/// Number of side windows that are summed into `windows_open_count`.
pub const WINDOW_COUNT: u8 = 4;

// ───────────────────────────────────────────────────────────────
// Shift state
// ───────────────────────────────────────────────────────────────

/// Gear selector position as reported by the drive telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShiftState {
    Parked,
    /// Any of R / N / D.
    Other,
    /// No shift state reported (vehicle asleep or telemetry missing).
    #[default]
    Unknown,
}

impl ShiftState {
    /// Map the vendor's single-letter code.  `None` and blank codes are
    /// `Unknown`, `"P"` is `Parked`, anything else counts as moving.
    pub fn from_code(code: Option<&str>) -> Self {
        match code.map(str::trim) {
            None | Some("") => Self::Unknown,
            Some(c) if c.eq_ignore_ascii_case("p") => Self::Parked,
            Some(_) => Self::Other,
        }
    }

    /// Window closing is only considered while parked.  `Unknown` is
    /// treated as parked so a missing shift state never keeps windows open.
    pub const fn allows_closing(self) -> bool {
        matches!(self, Self::Parked | Self::Unknown)
    }
}

// ───────────────────────────────────────────────────────────────
// Online status
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleStatus {
    Asleep,
    WaitingForSleep,
    Awake,
    Other,
}

impl VehicleStatus {
    pub fn from_api(status: &str) -> Self {
        match status {
            "asleep" => Self::Asleep,
            "waiting_for_sleep" => Self::WaitingForSleep,
            "awake" => Self::Awake,
            _ => Self::Other,
        }
    }

    pub const fn is_sleeping(self) -> bool {
        matches!(self, Self::Asleep | Self::WaitingForSleep)
    }
}

impl fmt::Display for VehicleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asleep => write!(f, "asleep"),
            Self::WaitingForSleep => write!(f, "waiting_for_sleep"),
            Self::Awake => write!(f, "awake"),
            Self::Other => write!(f, "other"),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Snapshot
// ───────────────────────────────────────────────────────────────

/// One read of the vehicle's cached state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VehicleSnapshot {
    /// Open side windows, 0 ..= [`WINDOW_COUNT`].  0 means fully closed.
    pub windows_open_count: u8,
    pub shift_state: ShiftState,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub inside_temp_c: Option<f64>,
    pub outside_temp_c: Option<f64>,
    pub battery_soc_percent: Option<u8>,
    /// Cabin overheat protection fan currently running.
    pub active_cooling: Option<bool>,
    /// Set from the status call; cached state alone cannot tell.
    pub awake: bool,
}

impl VehicleSnapshot {
    /// Last known position, only when both coordinates are present.
    pub fn location(&self) -> Option<(f64, f64)> {
        Some((self.latitude?, self.longitude?))
    }

    pub const fn has_open_windows(&self) -> bool {
        self.windows_open_count > 0
    }
}

// ───────────────────────────────────────────────────────────────
// Actuation
// ───────────────────────────────────────────────────────────────

/// Answer to a close-windows command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActuationResult {
    /// HTTP-style status; 200 means the command was accepted.
    pub status_code: u16,
    /// Vendor-reported command result.
    pub result: bool,
    /// Whether the vehicle had to be woken to run the command.
    pub woke: bool,
}

impl ActuationResult {
    pub const fn succeeded(&self) -> bool {
        self.status_code == 200 && self.result
    }
}
