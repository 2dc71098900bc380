//! RainGuard: main entry point.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  TessieClient     OwmClient       SmtpNotifier   SystemClock   │
//! │  (Vehicle)        (Weather)       (Notifier)     (Clock)       │
//! │  FeedSubscriber   LogEventSink    JsonFileConfig               │
//! │  (MQTT feed)      (EventSink)     (ConfigPort)                 │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              MonitorService                            │    │
//! │  │  Debounce · Policy · Scheduler · Watchdog              │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Threads: feed · feed-consumer · timers · cycle workers        │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The process exits non-zero on the first fatal condition and relies on
//! the service manager to restart it.

#![deny(unused_must_use)]

use std::sync::Arc;

use anyhow::{Context, Result};
use log::{LevelFilter, error, info, warn};

use rainguard::adapters::config_file::JsonFileConfig;
use rainguard::adapters::email::SmtpNotifier;
use rainguard::adapters::log_sink::LogEventSink;
use rainguard::adapters::mqtt::FeedSubscriber;
use rainguard::adapters::owm::OwmClient;
use rainguard::adapters::tessie::TessieClient;
use rainguard::adapters::time::SystemClock;
use rainguard::app::ports::{Clock, ConfigPort, WeatherGateway};
use rainguard::app::service::{MonitorService, Ports};
use rainguard::runtime::{channels, timers};

fn init_logging() {
    let mut builder = env_logger::Builder::from_default_env();
    if std::env::var_os("RUST_LOG").is_none() {
        // Narrowed to the debug bitmask's level once the config is loaded.
        builder
            .filter_level(LevelFilter::Trace)
            .filter_module("rumqttc", LevelFilter::Warn)
            .filter_module("rustls", LevelFilter::Warn)
            .filter_module("reqwest", LevelFilter::Warn)
            .filter_module("hyper", LevelFilter::Warn);
    }
    builder.format_timestamp_secs().init();
}

fn main() -> Result<()> {
    // ── 1. Logging ────────────────────────────────────────────
    init_logging();
    info!("RainGuard v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. Config ─────────────────────────────────────────────
    let source = JsonFileConfig::from_args();
    let config = source
        .load()
        .with_context(|| format!("loading {}", source.path().display()))?;
    if std::env::var_os("RUST_LOG").is_none() {
        log::set_max_level(config.debug_level.level_filter());
    }
    let config = Arc::new(config);
    let flags = config.debug_level;
    let request_timeout = config.timers.request_timeout_secs;

    // ── 3. Adapters ───────────────────────────────────────────
    let vehicle = TessieClient::new(&config.vehicle, request_timeout, flags)
        .context("building vehicle client")?;
    let weather = config
        .weather
        .as_ref()
        .map(|w| OwmClient::new(w, request_timeout, flags))
        .transpose()
        .context("building weather client")?
        .map(|client| Arc::new(client) as Arc<dyn WeatherGateway>);
    if weather.is_none() {
        warn!("No weather API configured, running on the station feed only");
    }
    let notifier = SmtpNotifier::new(&config.email).context("building mail transport")?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let ports = Ports {
        vehicle: Arc::new(vehicle),
        weather,
        notifier: Arc::new(notifier),
        clock: Arc::clone(&clock),
        events: Arc::new(LogEventSink::new()),
    };
    let svc = Arc::new(MonitorService::new(Arc::clone(&config), ports));

    // ── 4. Startup ────────────────────────────────────────────
    svc.announce();
    svc.startup_wake()?;

    // ── 5. Feed ───────────────────────────────────────────────
    if let Some(feed) = &config.feed {
        FeedSubscriber::new(feed.clone(), flags, svc.feed_heartbeat())
            .spawn(Arc::clone(&clock))
            .context("starting feed subscriber")?;
        timers::spawn_feed_consumer(Arc::clone(&svc)).context("starting feed consumer")?;
    } else {
        info!("No station feed configured, running on the weather API only");
    }

    // ── 6. First cycle, then the timers ───────────────────────
    svc.run_cycle()?;
    timers::spawn_timers(Arc::clone(&svc)).context("starting timers")?;
    info!("System ready.");

    // ── 7. Supervise ──────────────────────────────────────────
    let fatal = channels::wait_fatal();
    error!("Exiting: {}", fatal);
    std::process::exit(1);
}
