//! Process runtime: threads, channels and the fatal-error signal.
//!
//! ```text
//!  ┌─────────────┐ RainEvent ┌───────────────┐
//!  │ feed thread │──────────▶│ feed consumer │──▶ MonitorService::handle_rain_event
//!  └─────────────┘  channel  └───────────────┘
//!  ┌──────────────────────────────────────────┐
//!  │ timer thread (LocalExecutor)             │
//!  │   scheduler ticker ──▶ cycle worker ─────┼──▶ MonitorService::run_cycle
//!  │   watchdog loop ─────────────────────────┼──▶ MonitorService::check_liveness
//!  └──────────────────────────────────────────┘
//!             any FatalError ──▶ FATAL_SIGNAL ──▶ main: exit(1)
//! ```

pub mod channels;
pub mod tasks;
pub mod timers;
