//! Alert bookkeeping: failure budget, notify-once latch, and dispatch.

use log::warn;

use crate::app::ports::Notifier;
use crate::error::NotifyError;

/// Consecutive vehicle-call transport failures before the operator is told.
pub const RETRY_ALERT_THRESHOLD: u8 = 3;

// ── Retry budget ─────────────────────────────────────────────

/// Consecutive-failure counter for vehicle calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    failures: u8,
    threshold: u8,
}

impl Default for RetryBudget {
    fn default() -> Self {
        Self::new(RETRY_ALERT_THRESHOLD)
    }
}

impl RetryBudget {
    pub const fn new(threshold: u8) -> Self {
        Self {
            failures: 0,
            threshold,
        }
    }

    pub fn record_success(&mut self) {
        self.failures = 0;
    }

    /// Count one failure.  Returns `true` exactly when the threshold is
    /// reached; the counter then starts over.
    pub fn record_failure(&mut self) -> bool {
        self.failures = self.failures.saturating_add(1);
        if self.failures >= self.threshold {
            self.failures = 0;
            true
        } else {
            false
        }
    }

    pub const fn failures(&self) -> u8 {
        self.failures
    }
}

// ── Notify-once latch ────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlertLatch {
    raised: bool,
}

impl AlertLatch {
    /// Returns `true` if this call raised the latch.
    pub fn raise(&mut self) -> bool {
        !core::mem::replace(&mut self.raised, true)
    }

    pub fn clear(&mut self) {
        self.raised = false;
    }

    pub const fn is_raised(&self) -> bool {
        self.raised
    }
}

// ── Notifications ────────────────────────────────────────────

/// Where an alert came from; becomes the subject prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertScope {
    Rain,
    Feed,
    Timer,
    Watchdog,
    Vehicle,
}

impl AlertScope {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Rain => "Rain",
            Self::Feed => "Feed",
            Self::Timer => "Timer",
            Self::Watchdog => "Watchdog",
            Self::Vehicle => "Vehicle",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    pub body: String,
}

impl Notification {
    pub fn new(scope: AlertScope, subject: impl AsRef<str>, body: impl Into<String>) -> Self {
        Self {
            subject: format!("RainGuard {}: {}", scope.label(), subject.as_ref()),
            body: body.into(),
        }
    }

    /// Subject and body carry the same text.
    pub fn headline(scope: AlertScope, text: impl Into<String>) -> Self {
        let body = text.into();
        Self::new(scope, &body, body.clone())
    }
}

/// Send a notification.  Failures are logged and handed back; most
/// callers ignore them.
pub fn dispatch(notifier: &dyn Notifier, note: &Notification) -> Result<(), NotifyError> {
    notifier.notify(&note.subject, &note.body).inspect_err(|e| {
        warn!("Alert '{}' not sent: {}", note.subject, e);
    })
}
