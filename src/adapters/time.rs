//! System clock adapter.

use chrono::{DateTime, Utc};

use crate::app::ports::Clock;

/// Wall clock from the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
