//! Feed path and startup through `MonitorService`.

use chrono::{DateTime, Utc};

use rainguard::app::events::MonitorEvent;
use rainguard::app::service::FORCED_RAIN_CM;
use rainguard::config::DebugFlags;
use rainguard::error::{FatalError, GatewayError};
use rainguard::policy::PolicyOutcome;
use rainguard::rain::{RainEvent, RainSource};
use rainguard::state::MonitoredTask;
use rainguard::vehicle::VehicleStatus;

use crate::mock_gateways::{
    Harness, STATION, VehicleCall, montreal_noon, north_of_station, parked_open_at, test_config,
};

fn reading(h: &Harness, rain_cm: f64) -> RainEvent {
    RainEvent {
        rain_cm,
        outside_temp_c: Some(17.5),
        received_at: h.svc.now(),
    }
}

fn feed(h: &Harness, rain_cm: f64) -> Result<Option<PolicyOutcome>, FatalError> {
    h.clock.advance_secs(5);
    h.svc.handle_rain_event(reading(h, rain_cm))
}

// ── Debounce ──────────────────────────────────────────────────

#[test]
fn one_evaluation_per_shower() {
    let h = Harness::default_at(montreal_noon());

    let first = feed(&h, 0.02).unwrap();
    assert_eq!(first, Some(PolicyOutcome::Closed { distance_km: 0.0 }));
    assert_eq!(feed(&h, 0.05).unwrap(), None);
    assert_eq!(feed(&h, 0.01).unwrap(), None);
    assert_eq!(h.vehicle.close_calls().len(), 1);

    assert_eq!(feed(&h, 0.0).unwrap(), None);
    assert!(feed(&h, 0.03).unwrap().is_some(), "new shower after a dry reading");
    assert_eq!(h.vehicle.close_calls().len(), 2);
    assert_eq!(h.notifier.sent().len(), 2);
}

#[test]
fn vehicle_is_read_with_cache() {
    let h = Harness::default_at(montreal_noon());
    feed(&h, 0.02).unwrap();
    let calls = h.vehicle.calls();
    assert_eq!(calls[0], VehicleCall::Status);
    assert_eq!(calls[1], VehicleCall::State { use_cache: true });
}

#[test]
fn weather_episode_blocks_feed_onset() {
    let h = Harness::default_at(montreal_noon());
    h.svc.state().observe_raining(RainSource::WeatherApi, true);

    assert_eq!(feed(&h, 0.2).unwrap(), None);
    assert!(h.vehicle.calls().is_empty());
    assert!(h.svc.state().rain_active(RainSource::Feed));
}

#[test]
fn rain_onset_is_emitted() {
    let h = Harness::default_at(montreal_noon());
    feed(&h, 0.04).unwrap();
    assert!(h.sink.events().contains(&MonitorEvent::RainOnset {
        source: RainSource::Feed,
        rain_cm: 0.04
    }));
}

#[test]
fn far_from_station_is_reported_not_closed() {
    let h = Harness::new(
        test_config(),
        parked_open_at(north_of_station(12.0)),
        montreal_noon(),
    );
    let outcome = feed(&h, 0.1).unwrap();
    assert!(matches!(outcome, Some(PolicyOutcome::NoActionTooFar { .. })));
    assert!(h.vehicle.close_calls().is_empty());
    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].0.contains("It has rained 0.1 cm"));
    assert!(sent[0].1.contains("too far"));
}

#[test]
fn force_rain_flag_substitutes_amount() {
    let mut cfg = test_config();
    cfg.debug_level = DebugFlags(DebugFlags::FORCE_RAIN);
    let h = Harness::new(cfg, parked_open_at(STATION), montreal_noon());

    assert!(feed(&h, 0.0).unwrap().is_some());
    assert!(h.sink.events().contains(&MonitorEvent::RainOnset {
        source: RainSource::Feed,
        rain_cm: FORCED_RAIN_CM
    }));
}

// ── Liveness ──────────────────────────────────────────────────

#[test]
fn every_reading_stamps_feed_clock() {
    let h = Harness::default_at(montreal_noon());
    let at: DateTime<Utc> = montreal_noon() + chrono::TimeDelta::seconds(42);
    h.svc
        .handle_rain_event(RainEvent {
            rain_cm: 0.0,
            outside_temp_c: None,
            received_at: at,
        })
        .unwrap();
    assert_eq!(h.svc.state().last_run(MonitoredTask::Feed), at);
}

// ── Failure escalation ────────────────────────────────────────

#[test]
fn third_unreachable_call_escalates() {
    let h = Harness::default_at(montreal_noon());
    h.vehicle.set_status(Err(GatewayError::Timeout));

    for _ in 0..2 {
        assert_eq!(feed(&h, 0.1).unwrap(), None);
        feed(&h, 0.0).unwrap();
    }
    assert!(h.notifier.sent().is_empty());

    assert_eq!(feed(&h, 0.1).unwrap(), None);
    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].0.contains("three times"));
    assert!(sent[0].1.contains("timed out"));
    assert_eq!(h.svc.state().vehicle_failures(), 0);
}

#[test]
fn answer_resets_failure_count() {
    let h = Harness::default_at(montreal_noon());
    h.vehicle.set_status(Err(GatewayError::Timeout));
    feed(&h, 0.1).unwrap();
    feed(&h, 0.0).unwrap();
    feed(&h, 0.1).unwrap();
    feed(&h, 0.0).unwrap();
    assert_eq!(h.svc.state().vehicle_failures(), 2);

    h.vehicle.set_status(Err(GatewayError::Status(503)));
    feed(&h, 0.1).unwrap();
    assert_eq!(h.svc.state().vehicle_failures(), 0, "any answer counts as contact");
}

#[test]
fn escalation_without_mail_is_fatal() {
    let h = Harness::default_at(montreal_noon());
    h.vehicle.set_status(Err(GatewayError::Transport("dns".into())));
    h.notifier.fail(true);

    for _ in 0..2 {
        feed(&h, 0.1).unwrap();
        feed(&h, 0.0).unwrap();
    }
    assert_eq!(feed(&h, 0.1), Err(FatalError::AlertPathDown));
}

#[test]
fn failed_mail_is_otherwise_harmless() {
    let h = Harness::default_at(montreal_noon());
    h.notifier.fail(true);
    assert!(feed(&h, 0.1).unwrap().is_some());
}

// ── Startup ───────────────────────────────────────────────────

#[test]
fn wakes_sleeping_vehicle_when_asked() {
    let mut cfg = test_config();
    cfg.vehicle.wake_at_start = true;
    let h = Harness::new(cfg, parked_open_at(STATION), montreal_noon());
    h.vehicle.set_status(Ok(VehicleStatus::Asleep));

    h.svc.startup_wake().unwrap();
    assert!(h.vehicle.calls().contains(&VehicleCall::Wake));
}

#[test]
fn leaves_sleeping_vehicle_by_default() {
    let h = Harness::default_at(montreal_noon());
    h.vehicle.set_status(Ok(VehicleStatus::Asleep));
    h.svc.startup_wake().unwrap();
    assert!(!h.vehicle.calls().contains(&VehicleCall::Wake));
}

#[test]
fn announce_reports_inputs() {
    let mut cfg = test_config();
    cfg.feed = None;
    let h = Harness::new(cfg, parked_open_at(STATION), montreal_noon());
    h.svc.announce();
    assert_eq!(
        h.sink.events(),
        vec![MonitorEvent::Started {
            feed: false,
            weather: true
        }]
    );
}
