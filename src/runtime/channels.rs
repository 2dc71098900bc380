//! Inter-thread channels.
//!
//! Uses `embassy-sync` primitives so the feed thread, the feed consumer,
//! the timer thread and the supervisor share static queues without any
//! setup.
//!
//! ```text
//! ┌─────────────┐  RainEvent   ┌───────────────┐
//! │ Feed thread │─────────────▶│ Feed consumer │
//! └─────────────┘  (depth 16)  └───────────────┘
//!
//!  any thread ── FatalError ──▶ FATAL_SIGNAL ──▶ supervisor (main)
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use log::{error, warn};

use crate::error::FatalError;
use crate::rain::RainEvent;

/// Channel depth for feed readings.  Readings arrive every few seconds,
/// so a full queue means the consumer is stuck in a vehicle call.
pub const FEED_DEPTH: usize = 16;

/// Feed readings: subscriber → consumer.
pub static FEED_CHANNEL: Channel<CriticalSectionRawMutex, RainEvent, FEED_DEPTH> = Channel::new();

/// First fatal condition raised anywhere in the process.
pub static FATAL_SIGNAL: Signal<CriticalSectionRawMutex, FatalError> = Signal::new();

/// Queue a reading.  Dropped with a warning when the consumer is behind.
pub fn push_rain_event(event: RainEvent) -> bool {
    if FEED_CHANNEL.try_send(event).is_err() {
        warn!("Feed: channel full, dropping reading");
        return false;
    }
    true
}

/// Wait for the next reading.
pub async fn next_rain_event() -> RainEvent {
    FEED_CHANNEL.receive().await
}

/// Report a fatal condition to the supervisor.  The first one wins.
pub fn raise_fatal(err: FatalError) {
    error!("Fatal: {}", err);
    if !FATAL_SIGNAL.signaled() {
        FATAL_SIGNAL.signal(err);
    }
}

/// Block the calling thread until a fatal condition is raised.
pub fn wait_fatal() -> FatalError {
    futures_lite::future::block_on(FATAL_SIGNAL.wait())
}
