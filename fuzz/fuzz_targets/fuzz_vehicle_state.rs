//! Fuzz target: `tessie::parse_state`
//!
//! cargo fuzz run fuzz_vehicle_state

#![no_main]

use libfuzzer_sys::fuzz_target;
use rainguard::adapters::tessie::{parse_command, parse_state};
use rainguard::vehicle::WINDOW_COUNT;

fuzz_target!(|data: &[u8]| {
    if let Ok(snapshot) = parse_state(data) {
        assert!(snapshot.windows_open_count <= WINDOW_COUNT);
        if let Some(soc) = snapshot.battery_soc_percent {
            assert!(soc <= 100);
        }
    }

    // Command answers are decoded leniently and never fail.
    let result = parse_command(200, data);
    assert_eq!(result.status_code, 200);
});
