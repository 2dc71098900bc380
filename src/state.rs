//! Shared monitor state.
//!
//! Everything the feed consumer, the scheduler and the watchdog have in
//! common lives in one [`MonitorState`] behind a single mutex.  Callers
//! only get check-and-set operations; no field is ever handed out.
//!
//! ```text
//!   feed consumer ──┐                         ┌── watchdog (reads clocks)
//!                   ├──▶ MonitorState(Mutex) ◀┤
//!   scheduler ──────┘   rain flags · clocks   └── alerts (latch, budget)
//!                       latch · budget · cycle depth
//! ```
//!
//! The lock is never held across network I/O.

use core::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use crate::alerts::{AlertLatch, RetryBudget};
use crate::rain::{RainDebouncer, RainDecision, RainSource};

/// Tasks whose liveness the watchdog supervises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitoredTask {
    Feed,
    Scheduler,
}

impl fmt::Display for MonitoredTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Feed => write!(f, "feed"),
            Self::Scheduler => write!(f, "scheduler"),
        }
    }
}

/// What a new scheduler cycle should do given how many are in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleEntry {
    /// Nothing else running.
    Run,
    /// Previous cycle still running; skip this one.
    Skip,
    /// Two earlier cycles never finished.
    Hung,
}

#[derive(Debug, Clone, Copy)]
struct TaskClock {
    last_run: DateTime<Utc>,
    alerted: bool,
}

impl TaskClock {
    const fn new(at: DateTime<Utc>) -> Self {
        Self {
            last_run: at,
            alerted: false,
        }
    }
}

#[derive(Debug)]
struct Inner {
    rain: RainDebouncer,
    feed: TaskClock,
    scheduler: TaskClock,
    read_error: AlertLatch,
    retries: RetryBudget,
    /// Detail of the failure that exhausted the retry budget, until sent.
    escalation: Option<String>,
    cycle_depth: u8,
}

impl Inner {
    fn clock_mut(&mut self, task: MonitoredTask) -> &mut TaskClock {
        match task {
            MonitoredTask::Feed => &mut self.feed,
            MonitoredTask::Scheduler => &mut self.scheduler,
        }
    }
}

pub struct MonitorState {
    inner: Mutex<Inner>,
}

impl MonitorState {
    /// Both liveness clocks start at `started_at`.
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                rain: RainDebouncer::new(),
                feed: TaskClock::new(started_at),
                scheduler: TaskClock::new(started_at),
                read_error: AlertLatch::default(),
                retries: RetryBudget::default(),
                escalation: None,
                cycle_depth: 0,
            }),
        }
    }

    // A panicking holder cannot leave these plain fields half-written.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Rain flags ────────────────────────────────────────────

    pub fn observe_rain(&self, source: RainSource, rain_cm: f64) -> RainDecision {
        self.lock().rain.observe(source, rain_cm)
    }

    pub fn observe_raining(&self, source: RainSource, raining: bool) -> RainDecision {
        self.lock().rain.observe_raining(source, raining)
    }

    pub fn clear_rain(&self, source: RainSource) {
        self.lock().rain.clear(source);
    }

    pub fn rain_active(&self, source: RainSource) -> bool {
        self.lock().rain.is_active(source)
    }

    // ── Liveness clocks ───────────────────────────────────────

    /// Advance `task`'s clock to `at`.  Never moves it backwards.
    pub fn stamp(&self, task: MonitoredTask, at: DateTime<Utc>) {
        let mut inner = self.lock();
        let clock = inner.clock_mut(task);
        clock.last_run = clock.last_run.max(at);
    }

    pub fn last_run(&self, task: MonitoredTask) -> DateTime<Utc> {
        self.lock().clock_mut(task).last_run
    }

    /// Mark `task` as alerted.  `true` only on the first call.
    pub fn mark_alerted(&self, task: MonitoredTask) -> bool {
        let mut inner = self.lock();
        let clock = inner.clock_mut(task);
        !core::mem::replace(&mut clock.alerted, true)
    }

    // ── Read-error latch ──────────────────────────────────────

    /// `true` if this call raised the latch and an alert should go out.
    pub fn latch_read_error(&self) -> bool {
        self.lock().read_error.raise()
    }

    pub fn clear_read_error(&self) {
        self.lock().read_error.clear();
    }

    // ── Vehicle retry budget ──────────────────────────────────

    pub fn record_vehicle_success(&self) {
        self.lock().retries.record_success();
    }

    /// Charge one transport failure.  Returns `true` when it exhausted the
    /// budget; the detail is then kept for [`take_escalation`](Self::take_escalation).
    pub fn record_vehicle_failure(&self, detail: &str) -> bool {
        let mut inner = self.lock();
        let escalate = inner.retries.record_failure();
        if escalate {
            inner.escalation = Some(detail.to_owned());
        }
        escalate
    }

    pub fn take_escalation(&self) -> Option<String> {
        self.lock().escalation.take()
    }

    pub fn vehicle_failures(&self) -> u8 {
        self.lock().retries.failures()
    }

    // ── Scheduler re-entrancy ─────────────────────────────────

    /// Register a cycle start.  A skipped or hung entry still counts until
    /// the running cycle calls [`finish_cycle`](Self::finish_cycle).
    pub fn enter_cycle(&self) -> CycleEntry {
        let mut inner = self.lock();
        inner.cycle_depth = inner.cycle_depth.saturating_add(1);
        match inner.cycle_depth {
            1 => CycleEntry::Run,
            2 => CycleEntry::Skip,
            _ => CycleEntry::Hung,
        }
    }

    pub fn finish_cycle(&self) {
        self.lock().cycle_depth = 0;
    }
}

/// Feed liveness handle for the subscriber thread.
///
/// Stamps on packet arrival, independently of how long the consumer takes
/// to act on the queued reading.
#[derive(Clone)]
pub struct FeedHeartbeat {
    state: Arc<MonitorState>,
}

impl FeedHeartbeat {
    pub fn new(state: Arc<MonitorState>) -> Self {
        Self { state }
    }

    pub fn beat(&self, at: DateTime<Utc>) {
        self.state.stamp(MonitoredTask::Feed, at);
    }
}
