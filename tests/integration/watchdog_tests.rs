//! Liveness watchdog through `MonitorService::check_liveness`.

use std::thread;

use rainguard::adapters::mqtt::FeedSubscriber;
use rainguard::config::DebugFlags;
use rainguard::error::FatalError;
use rainguard::rain::RainEvent;
use rainguard::state::MonitoredTask;

use crate::mock_gateways::{Harness, STATION, montreal_noon, parked_open_at, test_config};

fn weather_only() -> Harness {
    let mut cfg = test_config();
    cfg.feed = None;
    Harness::new(cfg, parked_open_at(STATION), montreal_noon())
}

#[test]
fn silent_scheduler_alerts_once_and_stays_fatal() {
    let h = weather_only();
    h.clock.advance_secs(90);
    assert_eq!(h.svc.check_liveness(), Ok(()), "exactly at the budget is fine");

    h.clock.advance_secs(1);
    let err = h.svc.check_liveness().unwrap_err();
    assert_eq!(
        err,
        FatalError::LivenessBreach {
            task: MonitoredTask::Scheduler,
            last_run: montreal_noon()
        }
    );
    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].0.contains("hasn't run in over 90 seconds"));

    assert!(h.svc.check_liveness().is_err());
    assert_eq!(h.notifier.sent().len(), 1, "one alert per task");
}

#[test]
fn ticking_scheduler_keeps_watchdog_quiet() {
    let h = weather_only();
    for _ in 0..5 {
        h.clock.advance_secs(60);
        h.svc.run_cycle().unwrap();
        assert_eq!(h.svc.check_liveness(), Ok(()));
    }
    assert!(h.notifier.sent().is_empty());
}

#[test]
fn weather_only_ignores_feed_clock() {
    let h = weather_only();
    h.clock.advance_secs(80);
    assert_eq!(h.svc.check_liveness(), Ok(()));
    assert!(!h.svc.watchdog().monitors(MonitoredTask::Feed));
}

#[test]
fn silent_feed_is_fatal() {
    let h = Harness::default_at(montreal_noon());
    h.clock.advance_secs(61);
    h.svc
        .state()
        .stamp(MonitoredTask::Scheduler, h.svc.now());

    match h.svc.check_liveness() {
        Err(FatalError::LivenessBreach { task, .. }) => assert_eq!(task, MonitoredTask::Feed),
        other => panic!("expected feed breach, got {other:?}"),
    }
    assert!(h.notifier.subjects()[0].contains("feed hasn't run"));
}

#[test]
fn feed_stays_alive_while_consumer_is_closing() {
    let h = Harness::default_at(montreal_noon());
    let (entered, release) = h.vehicle.hold_close();
    let subscriber = FeedSubscriber::new(
        test_config().feed.unwrap(),
        DebugFlags::default(),
        h.svc.feed_heartbeat(),
    );

    thread::scope(|s| {
        let consumer = s.spawn(|| {
            h.svc.handle_rain_event(RainEvent {
                rain_cm: 0.3,
                outside_temp_c: None,
                received_at: h.svc.now(),
            })
        });
        entered.recv().unwrap();

        // 80 s inside the close, past the 60 s feed budget.
        for _ in 0..4 {
            h.clock.advance_secs(20);
            subscriber.on_message("acurite/loop", br#"{"rain_cm": "0.3"}"#, h.svc.now());
            assert_eq!(h.svc.check_liveness(), Ok(()));
        }

        release.send(()).unwrap();
        assert!(consumer.join().unwrap().unwrap().is_some());
    });

    assert_eq!(h.svc.state().last_run(MonitoredTask::Feed), h.svc.now());
    assert!(h.notifier.subjects().iter().all(|s| !s.contains("hasn't run")));
}

#[test]
fn malformed_packet_does_not_stamp_feed() {
    let h = Harness::default_at(montreal_noon());
    let subscriber = FeedSubscriber::new(
        test_config().feed.unwrap(),
        DebugFlags::default(),
        h.svc.feed_heartbeat(),
    );
    h.clock.advance_secs(30);
    subscriber.on_message("acurite/loop", b"not json", h.svc.now());
    assert_eq!(h.svc.state().last_run(MonitoredTask::Feed), montreal_noon());
}
