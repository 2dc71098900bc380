//! Periodic loops: scheduler ticker and liveness watchdog.
//!
//! Runs in a dedicated thread using `edge-executor` for cooperative
//! scheduling and `async-io-mini` for reactor-driven timers (no
//! busy-spinning).  Two concurrent futures:
//!
//! 1. **Ticker**: every `timer_interval_secs` launches a scheduler cycle
//!    on its own worker thread, so a cycle stuck in a vehicle call never
//!    delays the next tick (which is how overlap gets detected).
//! 2. **Watchdog**: waits `watchdog_start_delay_secs`, then checks the
//!    liveness clocks every `watchdog_interval_secs`.
//!
//! ```text
//!  ┌──────────────────────────────────────────────────────┐
//!  │  Timer Thread                                        │
//!  │  ┌────────────────────────────────────────────────┐  │
//!  │  │  edge_executor::LocalExecutor                  │  │
//!  │  │   ┌──────────────┐        ┌───────────────┐    │  │
//!  │  │   │ Ticker  60s ⏱│        │ Watchdog 90s ⏱│    │  │
//!  │  │   └──────┬───────┘        └───────┬───────┘    │  │
//!  │  └──────────┼────────────────────────┼────────────┘  │
//!  └─────────────┼────────────────────────┼───────────────┘
//!                ▼                        ▼
//!        cycle worker thread       FATAL_SIGNAL on breach
//! ```
//!
//! The feed consumer lives here too: a plain thread blocked on
//! [`FEED_CHANNEL`](super::channels::FEED_CHANNEL).

use core::time::Duration;
use std::io;
use std::sync::Arc;
use std::thread::JoinHandle;

use log::{error, info};

use crate::app::service::MonitorService;

use super::channels::{next_rain_event, raise_fatal};
use super::tasks::{IO_STACK_KB, TIMER_STACK_KB, spawn_named};

// ── Async loops ──────────────────────────────────────────────

async fn ticker_loop(svc: Arc<MonitorService>, period: Duration) {
    loop {
        async_io_mini::Timer::after(period).await;
        let worker = Arc::clone(&svc);
        let spawned = spawn_named("cycle", IO_STACK_KB, move || {
            if let Err(fatal) = worker.run_cycle() {
                raise_fatal(fatal);
            }
        });
        if let Err(e) = spawned {
            error!("Timer: cannot start cycle worker: {}", e);
        }
    }
}

async fn watchdog_loop(svc: Arc<MonitorService>, start_delay: Duration, period: Duration) {
    info!("WD: starting in {}s", start_delay.as_secs());
    async_io_mini::Timer::after(start_delay).await;
    info!(
        "WD: running every {}s, watching {} task(s)",
        period.as_secs(),
        svc.watchdog().budgets().len()
    );
    loop {
        async_io_mini::Timer::after(period).await;
        if let Err(fatal) = svc.check_liveness() {
            raise_fatal(fatal);
            return;
        }
    }
}

/// Entry point for the timer thread.  Sets up the executor, spawns both
/// loops and drives them on the `async-io-mini` reactor.
fn run_timer_loop(svc: Arc<MonitorService>) {
    let timers = svc.config().timers;
    let executor: edge_executor::LocalExecutor<'_, 4> = edge_executor::LocalExecutor::new();

    executor
        .spawn(ticker_loop(
            Arc::clone(&svc),
            Duration::from_secs(timers.timer_interval_secs),
        ))
        .detach();
    executor
        .spawn(watchdog_loop(
            Arc::clone(&svc),
            Duration::from_secs(timers.watchdog_start_delay_secs),
            Duration::from_secs(timers.watchdog_interval_secs),
        ))
        .detach();

    info!(
        "Timer: started (cycle every {}s)",
        timers.timer_interval_secs
    );

    futures_lite::future::block_on(executor.run(core::future::pending::<()>()));
}

// ── Thread spawn ─────────────────────────────────────────────

/// Spawn the timer thread.
pub fn spawn_timers(svc: Arc<MonitorService>) -> io::Result<JoinHandle<()>> {
    spawn_named("timers", TIMER_STACK_KB, move || run_timer_loop(svc))
}

/// Spawn the feed consumer: drains the feed channel one reading at a time.
pub fn spawn_feed_consumer(svc: Arc<MonitorService>) -> io::Result<JoinHandle<()>> {
    spawn_named("feed-consumer", IO_STACK_KB, move || {
        loop {
            let event = futures_lite::future::block_on(next_rain_event());
            if let Err(fatal) = svc.handle_rain_event(event) {
                raise_fatal(fatal);
            }
        }
    })
}
