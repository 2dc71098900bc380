//! Daily scheduler cycles driven through `MonitorService::run_cycle`.

use rainguard::app::events::MonitorEvent;
use rainguard::error::{FatalError, GatewayError};
use rainguard::rain::RainSource;
use rainguard::solar::DayPhase;
use rainguard::state::MonitoredTask;
use rainguard::vehicle::{ActuationResult, ShiftState, VehicleSnapshot, VehicleStatus};

use crate::mock_gateways::{
    Harness, MockWeather, STATION, montreal_night, montreal_noon, north_of_station, parked_open_at,
    test_config,
};

// ── Re-entrancy ───────────────────────────────────────────────

#[test]
fn overlapping_tick_is_skipped_then_hung() {
    let h = Harness::default_at(montreal_noon());
    // A cycle that never finishes.
    h.svc.state().enter_cycle();

    assert_eq!(h.svc.run_cycle(), Ok(()));
    assert!(h.vehicle.calls().is_empty(), "skipped tick does no work");
    assert!(h.notifier.sent().is_empty());

    assert_eq!(h.svc.run_cycle(), Err(FatalError::SchedulerHung));
    assert_eq!(h.notifier.sent().len(), 1);
    assert!(h.notifier.subjects()[0].contains("hung"));

    assert_eq!(h.svc.run_cycle(), Err(FatalError::SchedulerHung));
    assert_eq!(h.notifier.sent().len(), 1, "hung alert goes out once");
}

#[test]
fn finished_cycle_releases_the_guard() {
    let h = Harness::default_at(montreal_noon());
    for _ in 0..3 {
        assert_eq!(h.svc.run_cycle(), Ok(()));
    }
}

#[test]
fn every_tick_stamps_the_scheduler_clock() {
    let h = Harness::default_at(montreal_noon());
    h.clock.advance_secs(60);
    h.svc.run_cycle().unwrap();
    assert_eq!(
        h.svc.state().last_run(MonitoredTask::Scheduler),
        montreal_noon() + chrono::TimeDelta::seconds(60)
    );
}

// ── Night ─────────────────────────────────────────────────────

#[test]
fn closes_once_at_sunset() {
    let h = Harness::default_at(montreal_night());

    h.svc.run_cycle().unwrap();
    assert_eq!(h.vehicle.close_calls().len(), 1);
    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].0.contains("Windows were open at sunset"));
    assert_eq!(sent[0].1, "Closing windows because it's night time.");
    assert!(h.sink.events().contains(&MonitorEvent::PhaseChanged {
        from: DayPhase::Day,
        to: DayPhase::Night
    }));

    h.clock.advance_secs(60);
    h.svc.run_cycle().unwrap();
    assert_eq!(h.vehicle.close_calls().len(), 1, "same night, no second close");
    assert_eq!(h.weather.lookups(), 0, "weather is a daytime check");
}

#[test]
fn failed_sunset_close_retries_after_ten_ticks() {
    let h = Harness::default_at(montreal_night());
    for _ in 0..11 {
        h.vehicle.script_close(Ok(ActuationResult {
            status_code: 500,
            result: false,
            woke: false,
        }));
    }

    h.svc.run_cycle().unwrap();
    assert_eq!(h.vehicle.close_calls().len(), 1);
    assert!(h.notifier.subjects()[0].contains("Status code was 500"));

    for _ in 0..9 {
        h.clock.advance_secs(60);
        h.svc.run_cycle().unwrap();
    }
    assert_eq!(h.vehicle.close_calls().len(), 1);
    assert_eq!(h.svc.scheduler().night_retry(), 10);

    h.clock.advance_secs(60);
    h.svc.run_cycle().unwrap();
    assert_eq!(h.vehicle.close_calls().len(), 2);
}

#[test]
fn night_with_closed_windows_is_quiet() {
    let snap = VehicleSnapshot {
        windows_open_count: 0,
        ..parked_open_at(STATION)
    };
    let h = Harness::new(test_config(), snap, montreal_night());
    h.svc.run_cycle().unwrap();
    assert!(h.vehicle.close_calls().is_empty());
    assert!(h.notifier.sent().is_empty());
}

#[test]
fn night_clears_weather_rain() {
    let h = Harness::default_at(montreal_night());
    h.svc.state().observe_raining(RainSource::WeatherApi, true);
    h.svc.run_cycle().unwrap();
    assert!(!h.svc.state().rain_active(RainSource::WeatherApi));
}

#[test]
fn moving_vehicle_skips_everything() {
    let snap = VehicleSnapshot {
        shift_state: ShiftState::Other,
        ..parked_open_at(STATION)
    };
    let h = Harness::new(test_config(), snap, montreal_night());
    h.svc.run_cycle().unwrap();
    assert!(h.vehicle.close_calls().is_empty());
    assert_eq!(h.svc.scheduler().phase(), DayPhase::Day, "phase untouched");
}

// ── Day ───────────────────────────────────────────────────────

#[test]
fn weather_rain_closes_far_from_station() {
    let h = Harness::new(
        test_config(),
        parked_open_at(north_of_station(50.0)),
        montreal_noon(),
    );
    h.weather.set(Ok(MockWeather::conditions("10d", Some(18.0))));

    h.svc.run_cycle().unwrap();
    assert_eq!(h.vehicle.close_calls().len(), 1);
    assert!(h.sink.events().contains(&MonitorEvent::RainOnset {
        source: RainSource::WeatherApi,
        rain_cm: -1.0
    }));
    let subjects = h.notifier.subjects();
    assert!(subjects[0].contains("weather station 'Dorval'"));

    h.clock.advance_secs(60);
    h.svc.run_cycle().unwrap();
    assert_eq!(h.vehicle.close_calls().len(), 1, "same shower");

    h.weather.set(Ok(MockWeather::conditions("04d", Some(18.0))));
    h.clock.advance_secs(60);
    h.svc.run_cycle().unwrap();
    assert!(!h.svc.state().rain_active(RainSource::WeatherApi));
}

#[test]
fn weather_lookup_is_done_at_vehicle_position() {
    let pos = north_of_station(20.0);
    let h = Harness::new(test_config(), parked_open_at(pos), montreal_noon());
    h.svc.run_cycle().unwrap();
    let lookups = h.weather.lookups.lock().unwrap().clone();
    assert_eq!(lookups, vec![pos]);
}

#[test]
fn weather_error_keeps_rain_flag() {
    let h = Harness::default_at(montreal_noon());
    h.svc.state().observe_raining(RainSource::WeatherApi, true);
    h.weather.set(Err(GatewayError::Status(401)));
    h.svc.run_cycle().unwrap();
    assert!(h.svc.state().rain_active(RainSource::WeatherApi));
    assert!(h.vehicle.close_calls().is_empty());
}

#[test]
fn weather_timeout_mid_shower_does_not_close_twice() {
    let h = Harness::default_at(montreal_noon());
    h.weather.set(Ok(MockWeather::conditions("10d", Some(18.0))));
    h.svc.run_cycle().unwrap();
    assert_eq!(h.vehicle.close_calls().len(), 1);
    let mails = h.notifier.subjects().len();

    h.weather.set(Err(GatewayError::Timeout));
    h.clock.advance_secs(60);
    h.svc.run_cycle().unwrap();

    h.weather.set(Ok(MockWeather::conditions("10d", Some(18.0))));
    h.clock.advance_secs(60);
    h.svc.run_cycle().unwrap();

    assert_eq!(h.vehicle.close_calls().len(), 1, "same shower");
    assert_eq!(h.notifier.subjects().len(), mails);
}

#[test]
fn feed_rain_suppresses_weather_onset() {
    let h = Harness::default_at(montreal_noon());
    h.svc.state().observe_rain(RainSource::Feed, 0.2);
    h.weather.set(Ok(MockWeather::conditions("09d", None)));
    h.svc.run_cycle().unwrap();
    assert!(h.vehicle.close_calls().is_empty());
    assert!(h.svc.state().rain_active(RainSource::WeatherApi));
}

#[test]
fn sunny_noon_reports_overheat_risk() {
    let snap = VehicleSnapshot {
        windows_open_count: 0,
        inside_temp_c: Some(45.0),
        ..parked_open_at(STATION)
    };
    let h = Harness::new(test_config(), snap, montreal_noon());
    h.vehicle.set_status(Ok(VehicleStatus::Asleep));
    h.weather.set(Ok(MockWeather::conditions("01d", Some(30.0))));

    h.svc.run_cycle().unwrap();
    let reading = h
        .sink
        .events()
        .into_iter()
        .find_map(|e| match e {
            MonitorEvent::OverheatWatch(r) => Some(r),
            _ => None,
        })
        .expect("overheat event");
    assert!((reading.outside_temp_c - 30.0).abs() < 1e-9);
    assert_eq!(reading.inside_temp_c, None, "asleep, cabin unknown");
    assert_eq!(reading.battery_soc_percent, 80);
    assert!(!reading.awake);
    assert_eq!(reading.station, "Dorval");
    assert!(!h.vehicle.calls().contains(&crate::mock_gateways::VehicleCall::Wake));
}

#[test]
fn cold_sunny_day_is_not_a_risk() {
    let h = Harness::default_at(montreal_noon());
    h.weather.set(Ok(MockWeather::conditions("02d", Some(5.0))));
    h.svc.run_cycle().unwrap();
    assert!(!h
        .sink
        .events()
        .iter()
        .any(|e| matches!(e, MonitorEvent::OverheatWatch(_))));
}

// ── Read errors ───────────────────────────────────────────────

#[test]
fn state_error_alerts_once_until_recovery() {
    let h = Harness::default_at(montreal_noon());
    h.vehicle.set_state(Err(GatewayError::Status(401)));

    h.svc.run_cycle().unwrap();
    h.svc.run_cycle().unwrap();
    let subjects = h.notifier.subjects();
    assert_eq!(subjects.len(), 1);
    assert!(subjects[0].contains("Error #401 getting vehicle data for VIN 5YJ3E1EA7KF000000"));

    h.vehicle.set_state(Ok(parked_open_at(STATION)));
    h.svc.run_cycle().unwrap();
    h.vehicle.set_state(Err(GatewayError::MissingData("drive_state")));
    h.svc.run_cycle().unwrap();
    let subjects = h.notifier.subjects();
    assert_eq!(subjects.len(), 2, "latch re-armed by the good read");
    assert!(subjects[1].contains("Missing data"));
}

#[test]
fn unreachable_vehicle_is_logged_not_mailed() {
    let h = Harness::default_at(montreal_noon());
    h.vehicle.set_status(Err(GatewayError::Transport("refused".into())));
    h.svc.run_cycle().unwrap();
    h.svc.run_cycle().unwrap();
    assert!(h.notifier.sent().is_empty());
    assert_eq!(h.svc.state().vehicle_failures(), 2);
}
