//! Rain feed subscriber (MQTT).
//!
//! Connects to the station's broker, subscribes to the loop topic on every
//! ConnAck and turns each publish into a [`RainEvent`] queued on
//! [`FEED_CHANNEL`](crate::runtime::channels::FEED_CHANNEL).  The feed
//! liveness clock is stamped here, on arrival, so a consumer stuck in a
//! vehicle call does not look like a silent feed.
//!
//! ## Reconnection policy
//!
//! `rumqttc` reconnects on the next poll after an error.  Between polls the
//! subscriber waits an exponential backoff (2 s → 4 s → 8 s … capped at
//! 60 s), reset on the next ConnAck.
//!
//! ## Payload
//!
//! ```json
//! { "rain_cm": "0.0254", "outTemp_C": 18.3, ... }
//! ```
//!
//! Both fields may be numbers, numeric strings or absent.  Everything
//! else in the document is ignored.

use core::time::Duration;
use std::io;
use std::sync::Arc;
use std::thread::JoinHandle;

use chrono::{DateTime, Utc};
use log::{info, warn};
use rumqttc::{Client, Event, MqttOptions, Packet, QoS, Transport};
use serde::Deserialize;

use crate::app::ports::Clock;
use crate::config::{DebugFlags, FeedConfig};
use crate::error::GatewayError;
use crate::rain::RainEvent;
use crate::runtime::channels::push_rain_event;
use crate::state::FeedHeartbeat;
use crate::runtime::tasks::{IO_STACK_KB, spawn_named};

const KEEP_ALIVE_SECS: u64 = 60;
const REQUEST_CAPACITY: usize = 10;
const MIN_BACKOFF_SECS: u64 = 2;
const MAX_BACKOFF_SECS: u64 = 60;

// ───────────────────────────────────────────────────────────────
// Payload decoding
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Reading {
    Number(f64),
    Text(String),
}

impl Reading {
    fn value(&self, field: &str) -> Result<f64, GatewayError> {
        match self {
            Self::Number(n) => Ok(*n),
            Self::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| GatewayError::Malformed(format!("{field} = '{s}'"))),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct LoopPayload {
    #[serde(default)]
    rain_cm: Option<Reading>,
    #[serde(default, rename = "outTemp_C")]
    out_temp_c: Option<Reading>,
}

/// Decode one loop packet.  A missing `rain_cm` reads as a dry packet.
pub fn parse_payload(payload: &[u8], received_at: DateTime<Utc>) -> Result<RainEvent, GatewayError> {
    let parsed: LoopPayload =
        serde_json::from_slice(payload).map_err(|e| GatewayError::Malformed(e.to_string()))?;

    let rain_cm = match &parsed.rain_cm {
        Some(r) => r.value("rain_cm")?,
        None => 0.0,
    };
    let outside_temp_c = parsed
        .out_temp_c
        .as_ref()
        .map(|t| t.value("outTemp_C"))
        .transpose()?;

    Ok(RainEvent {
        rain_cm,
        outside_temp_c,
        received_at,
    })
}

// ───────────────────────────────────────────────────────────────
// Subscriber
// ───────────────────────────────────────────────────────────────

pub struct FeedSubscriber {
    config: FeedConfig,
    flags: DebugFlags,
    heartbeat: FeedHeartbeat,
}

impl FeedSubscriber {
    pub fn new(config: FeedConfig, flags: DebugFlags, heartbeat: FeedHeartbeat) -> Self {
        Self {
            config,
            flags,
            heartbeat,
        }
    }

    fn options(&self) -> MqttOptions {
        let mut opts = MqttOptions::new(
            self.config.client_id.clone(),
            self.config.hostname.clone(),
            self.config.port,
        );
        opts.set_keep_alive(Duration::from_secs(KEEP_ALIVE_SECS));
        if let Some(user) = &self.config.username {
            opts.set_credentials(user.clone(), self.config.password.clone().unwrap_or_default());
        }
        if self.config.use_tls {
            opts.set_transport(Transport::tls_with_default_config());
        }
        opts
    }

    /// Spawn the subscriber thread.  It runs for the life of the process.
    pub fn spawn(self, clock: Arc<dyn Clock>) -> io::Result<JoinHandle<()>> {
        spawn_named("feed", IO_STACK_KB, move || self.run(clock.as_ref()))
    }

    fn run(&self, clock: &dyn Clock) {
        let (client, mut connection) = Client::new(self.options(), REQUEST_CAPACITY);
        info!(
            "Feed: connecting to {}:{} (tls={})",
            self.config.hostname, self.config.port, self.config.use_tls
        );

        let mut backoff_secs = MIN_BACKOFF_SECS;
        for notification in connection.iter() {
            match notification {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    info!("Feed: connected ({:?}), subscribing to {}", ack.code, self.config.topic);
                    backoff_secs = MIN_BACKOFF_SECS;
                    if let Err(e) = client.try_subscribe(self.config.topic.as_str(), QoS::AtMostOnce) {
                        warn!("Feed: subscribe failed: {}", e);
                    }
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    self.on_message(&publish.topic, &publish.payload, clock.now());
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("Feed: connection error: {} (retry in {}s)", e, backoff_secs);
                    std::thread::sleep(Duration::from_secs(backoff_secs));
                    backoff_secs = (backoff_secs * 2).min(MAX_BACKOFF_SECS);
                }
            }
        }
    }

    /// Stamp, decode and queue one publish.  Malformed packets are dropped
    /// without stamping.
    pub fn on_message(&self, topic: &str, payload: &[u8], received_at: DateTime<Utc>) {
        if self.flags.has(DebugFlags::FEED_PAYLOAD) {
            info!("Feed: {} {}", topic, String::from_utf8_lossy(payload));
        }
        match parse_payload(payload, received_at) {
            Ok(event) => {
                self.heartbeat.beat(received_at);
                push_rain_event(event);
            }
            Err(e) => warn!("Feed: dropping packet: {}", e),
        }
    }
}
