//! Liveness watchdog.
//!
//! Compares each monitored task's last-run stamp against its silence
//! budget.  A breach sends one alert per task and reports
//! [`FatalError::LivenessBreach`]; the supervisor then exits so the
//! process manager restarts the monitor with fresh state.  There is no
//! in-process repair.
//!
//! | Task        | Stamped by              | Max silence                |
//! |-------------|-------------------------|----------------------------|
//! | `Scheduler` | every timer tick        | `watchdog_interval_secs`   |
//! | `Feed`      | every feed message      | `feed_max_silence_secs`    |
//!
//! The feed row is absent in weather-only mode.

use chrono::{DateTime, Local, TimeDelta, Utc};
use heapless::Vec;
use log::{debug, error};

use crate::alerts::{self, AlertScope, Notification};
use crate::app::ports::Notifier;
use crate::config::MonitorConfig;
use crate::error::FatalError;
use crate::state::{MonitorState, MonitoredTask};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskBudget {
    pub task: MonitoredTask,
    pub max_silence: TimeDelta,
}

#[derive(Debug, Clone)]
pub struct LivenessWatchdog {
    budgets: Vec<TaskBudget, 2>,
}

impl LivenessWatchdog {
    /// `feed_max_silence_secs` is `None` when the feed is disabled.
    pub fn new(scheduler_max_silence_secs: u64, feed_max_silence_secs: Option<u64>) -> Self {
        let mut budgets = Vec::new();
        // Capacity covers both tasks.
        let _ = budgets.push(TaskBudget {
            task: MonitoredTask::Scheduler,
            max_silence: secs(scheduler_max_silence_secs),
        });
        if let Some(feed) = feed_max_silence_secs {
            let _ = budgets.push(TaskBudget {
                task: MonitoredTask::Feed,
                max_silence: secs(feed),
            });
        }
        Self { budgets }
    }

    pub fn from_config(config: &MonitorConfig) -> Self {
        Self::new(
            config.timers.watchdog_interval_secs,
            config
                .feed
                .as_ref()
                .map(|_| config.timers.feed_max_silence_secs),
        )
    }

    pub fn monitors(&self, task: MonitoredTask) -> bool {
        self.budgets.iter().any(|b| b.task == task)
    }

    pub fn budgets(&self) -> &[TaskBudget] {
        &self.budgets
    }

    /// One watchdog pass.  Every breached check returns an error; only the
    /// first breach per task sends an alert.
    pub fn check(
        &self,
        state: &MonitorState,
        now: DateTime<Utc>,
        notifier: &dyn Notifier,
    ) -> Result<(), FatalError> {
        let mut breach = None;
        for budget in &self.budgets {
            let last_run = state.last_run(budget.task);
            debug!(
                "WD: {} last ran at {}",
                budget.task,
                last_run.with_timezone(&Local).format("%H:%M:%S")
            );
            if now - last_run <= budget.max_silence {
                continue;
            }

            if state.mark_alerted(budget.task) {
                let note = Notification::new(
                    AlertScope::Watchdog,
                    format!(
                        "{} hasn't run in over {} seconds, quitting",
                        budget.task,
                        budget.max_silence.num_seconds()
                    ),
                    format!(
                        "Last ran at {}",
                        last_run.with_timezone(&Local).format("%H:%M:%S")
                    ),
                );
                let _ = alerts::dispatch(notifier, &note);
                error!("WD: {}", note.subject);
            }
            if breach.is_none() {
                breach = Some(FatalError::LivenessBreach {
                    task: budget.task,
                    last_run,
                });
            }
        }
        breach.map_or(Ok(()), Err)
    }
}

fn secs(s: u64) -> TimeDelta {
    // TimeDelta tops out at i64::MAX milliseconds.
    TimeDelta::seconds(s.min(i64::MAX as u64 / 1000) as i64)
}
