//! Error taxonomy for the monitor.
//!
//! Three runtime layers, from recoverable to terminal:
//!
//! - [`GatewayError`]: a vehicle or weather call failed.  Handled locally:
//!   the current evaluation aborts and the next cycle tries again.
//! - [`NotifyError`]: an operator alert could not be sent.  Logged only,
//!   except on the escalation path where it becomes fatal.
//! - [`FatalError`]: the process must stop so the supervisor restarts it.
//!
//! [`ConfigError`] only occurs at startup, before any of the above.

use core::fmt;

use chrono::{DateTime, Utc};

use crate::state::MonitoredTask;

// ---------------------------------------------------------------------------
// Gateway errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The call did not complete within the per-call timeout.
    Timeout,
    /// Connection refused, DNS, TLS and similar.
    Transport(String),
    /// The remote answered with a non-200 status.
    Status(u16),
    /// The answer is missing a required section.
    MissingData(&'static str),
    /// The answer could not be decoded.
    Malformed(String),
}

impl GatewayError {
    /// Failures where no answer came back at all.  Only these are charged
    /// to the consecutive-failure budget.
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Timeout | Self::Transport(_))
    }

    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status(code) => Some(*code),
            _ => None,
        }
    }
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "request timed out"),
            Self::Transport(msg) => write!(f, "transport: {msg}"),
            Self::Status(code) => write!(f, "status {code}"),
            Self::MissingData(section) => write!(f, "missing {section}"),
            Self::Malformed(msg) => write!(f, "malformed response: {msg}"),
        }
    }
}

impl std::error::Error for GatewayError {}

// ---------------------------------------------------------------------------
// Notification errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// The message could not be assembled (bad address, header).
    Build(String),
    /// The relay refused or could not be reached.
    Send(String),
}

impl fmt::Display for NotifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Build(msg) => write!(f, "cannot build message: {msg}"),
            Self::Send(msg) => write!(f, "send failed: {msg}"),
        }
    }
}

impl std::error::Error for NotifyError {}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from [`ConfigPort`](crate::app::ports::ConfigPort) operations.
#[derive(Debug)]
pub enum ConfigError {
    /// No config at the given location.
    NotFound(String),
    /// The source exists but could not be read.
    Io(String),
    /// The document is not valid for `MonitorConfig`.
    Parse(String),
    /// A field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(path) => write!(f, "config not found: {path}"),
            Self::Io(msg) => write!(f, "I/O error: {msg}"),
            Self::Parse(msg) => write!(f, "config parse error: {msg}"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// Fatal errors
// ---------------------------------------------------------------------------

/// Conditions that end the process.  Raised by the core, acted on by the
/// supervisor in `main`, never by the code that detects them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatalError {
    /// A monitored task has been silent past its threshold.
    LivenessBreach {
        task: MonitoredTask,
        last_run: DateTime<Utc>,
    },
    /// Three scheduler cycles overlapped.
    SchedulerHung,
    /// The vehicle kept failing and the alert about it could not be sent.
    AlertPathDown,
}

impl fmt::Display for FatalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LivenessBreach { task, last_run } => {
                write!(f, "{task} silent since {}", last_run.format("%H:%M:%S"))
            }
            Self::SchedulerHung => write!(f, "scheduler hung"),
            Self::AlertPathDown => write!(f, "vehicle and notification paths both down"),
        }
    }
}

impl std::error::Error for FatalError {}
