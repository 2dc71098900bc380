//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing one pipe-delimited line per
//! [`MonitorEvent`] to the `log` facade (stderr via `env_logger`).
//! A telemetry adapter would implement the same trait.

use log::info;

use crate::app::events::MonitorEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`MonitorEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&self, event: &MonitorEvent) {
        match event {
            MonitorEvent::OverheatWatch(r) => {
                info!(
                    "HEAT | outside={:.1}\u{00b0}C | inside={} | cooling={} | soc={}% | \
                     awake={} | sky={} @ {}",
                    r.outside_temp_c,
                    r.inside_temp_c
                        .map_or_else(|| "?".to_owned(), |t| format!("{t:.1}\u{00b0}C")),
                    r.active_cooling
                        .map_or("?", |on| if on { "on" } else { "off" }),
                    r.battery_soc_percent,
                    r.awake,
                    r.sky,
                    r.station,
                );
            }
            MonitorEvent::RainOnset { source, rain_cm } => {
                info!("RAIN | source={} | amount={:.4}cm", source, rain_cm);
            }
            MonitorEvent::PhaseChanged { from, to } => {
                info!("SUN | {:?} -> {:?}", from, to);
            }
            MonitorEvent::Started { feed, weather } => {
                info!("START | feed={} | weather={}", feed, weather);
            }
        }
    }
}
