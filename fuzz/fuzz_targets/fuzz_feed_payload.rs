//! Fuzz target: `mqtt::parse_payload`
//!
//! Drives arbitrary bytes through the feed decoder and the debounce
//! engine.  Decoding may fail but must never panic, and a decoded
//! reading must leave the engine in a consistent state.
//!
//! cargo fuzz run fuzz_feed_payload

#![no_main]

use chrono::DateTime;
use libfuzzer_sys::fuzz_target;
use rainguard::adapters::mqtt::parse_payload;
use rainguard::rain::{RainDebouncer, RainSource};

fuzz_target!(|data: &[u8]| {
    let Some(at) = DateTime::from_timestamp(1_718_960_000, 0) else {
        return;
    };
    let Ok(event) = parse_payload(data, at) else {
        return;
    };
    assert_eq!(event.received_at, at);

    let mut engine = RainDebouncer::new();
    let decision = engine.observe(RainSource::Feed, event.rain_cm);
    // NaN and non-positive amounts never open an episode.
    assert_eq!(decision.should_evaluate, event.rain_cm > 0.0);
    assert_eq!(engine.is_active(RainSource::Feed), event.rain_cm > 0.0);
});
