//! Integration tests for the subscription lifecycle
//!
//! These tests drive a [`GraphPresenter`] the way the frame loop does, with
//! provider events arriving from other threads:
//! - Connect, subscribe and first data
//! - Signal cap and legend construction
//! - Historical replay handing back to real time
//! - Disconnect and teardown
//! - End-to-end against the simulated publisher

mod common;

use common::builders::{manual_subscribe_config, signal, signals, BatchBuilder, CatalogBuilder};
use common::mock_helpers::{ProviderCall, RecordingRenderer, ScriptedProvider};
use common::run_until;
use gridlines_rs::config::{AppConfig, DEFAULT_FILTER_EXPRESSION};
use gridlines_rs::simulation::{SimulatedPublisher, SimulationSettings};
use gridlines_rs::subscription::{
    GraphPresenter, HistoricalRange, ProviderEvent, SubscriptionMode, SubscriptionState,
};
use gridlines_rs::types::SignalKind;

const DT: f64 = 1.0 / 30.0;

fn presenter(config: &AppConfig) -> (GraphPresenter<RecordingRenderer>, ScriptedProvider) {
    let provider = ScriptedProvider::new();
    let remote = provider.clone();
    let presenter =
        GraphPresenter::new(Box::new(provider), RecordingRenderer::default(), config).unwrap();
    (presenter, remote)
}

fn state(presenter: &GraphPresenter<RecordingRenderer>) -> SubscriptionState {
    presenter.with_controller(|c| c.state()).unwrap()
}

#[test]
fn test_connect_subscribe_and_first_data() {
    let (presenter, remote) = presenter(&AppConfig::default());
    let handle = presenter.handle();

    assert!(handle.connect("server=localhost:7175").is_signaled());
    assert_eq!(state(&presenter), SubscriptionState::Connecting);

    let catalog = CatalogBuilder::new("SHELBY")
        .measurement(signal(1), SignalKind::Frequency, None, "SHELBY-FQ")
        .measurement(signal(2), SignalKind::Magnitude, Some(1), "SHELBY-PM1")
        .build();
    remote.emit_from_thread(vec![
        ProviderEvent::ConnectionEstablished,
        ProviderEvent::ReceivedMetadata(catalog),
    ]);

    // Events wait for the presentation tick
    assert_eq!(state(&presenter), SubscriptionState::Connecting);
    presenter.tick(DT).unwrap();
    assert_eq!(
        state(&presenter),
        SubscriptionState::Subscribing(SubscriptionMode::RealTime)
    );
    assert_eq!(
        remote.calls(),
        vec![
            ProviderCall::Connect("localhost:7175".to_string()),
            ProviderCall::HistoricalRange(None),
            ProviderCall::Filter(DEFAULT_FILTER_EXPRESSION.to_string()),
        ]
    );

    remote.emit_from_thread(vec![
        ProviderEvent::SubscriptionUpdated(signals(3)),
        ProviderEvent::ReceivedNewMeasurements(
            BatchBuilder::new()
                .value(signal(1), 60.0)
                .value(signal(2), 500_000.0)
                .value(signal(3), 1.0)
                .build(),
        ),
    ]);
    assert!(presenter.rebuild_pending());

    // The rebuild runs first, so the batch lands in the new epoch
    let stats = presenter.tick(DT).unwrap();
    assert_eq!(stats.batches, 1);
    assert_eq!(stats.applied, 3);
    assert!(!presenter.rebuild_pending());

    presenter
        .with_controller(|c| {
            assert_eq!(
                c.state(),
                SubscriptionState::Subscribed(SubscriptionMode::RealTime)
            );
            assert_eq!(c.epoch().len(), 3);
            assert!(c.epoch().group("FREQ").is_some());
            assert!(c.epoch().group("VPHM").is_some());
            assert!(c.epoch().group("UNKNOWN").is_some());

            // Signal 3 has no metadata and gets no legend row
            let legend: Vec<&str> = c.legend().iter().map(|e| e.text.as_str()).collect();
            assert_eq!(
                legend,
                vec![
                    "FREQ: SHELBY SHELBY-FQ [SHELBY-FQ]",
                    "VPHM: SHELBY SHELBY-PM1 [SHELBY-PM1]",
                ]
            );

            let renderer = c.renderer();
            assert_eq!(renderer.started.len(), 3);
            assert!(renderer.points(signal(1)).is_some());
        })
        .unwrap();
}

#[test]
fn test_subscription_capped_at_configured_maximum() {
    let (presenter, remote) = presenter(&AppConfig::default());
    presenter.handle().connect("server=localhost");
    remote.emit_from_thread(vec![ProviderEvent::ConnectionEstablished]);
    presenter.tick(DT).unwrap();

    remote.emit_from_thread(vec![ProviderEvent::SubscriptionUpdated(signals(35))]);
    presenter.tick(DT).unwrap();

    presenter
        .with_controller(|c| {
            assert!(c.state().is_subscribed());
            assert_eq!(c.epoch().signal_ids(), &signals(30)[..]);
            assert!(c
                .status()
                .rows()
                .any(|r| r == "Reduced 35 subscribed measurements to 30, configured maximum."));
        })
        .unwrap();
}

#[test]
fn test_replay_hands_back_to_real_time() {
    let (presenter, remote) = presenter(&manual_subscribe_config());
    let handle = presenter.handle();
    handle.connect("server=localhost");
    remote.emit_from_thread(vec![ProviderEvent::ConnectionEstablished]);
    presenter.tick(DT).unwrap();
    assert_eq!(state(&presenter), SubscriptionState::Connected);

    let range = HistoricalRange::new("*-10M", "*-5M");
    handle.replay("FILTER ActiveMeasurements", range.clone(), 100);
    assert_eq!(
        state(&presenter),
        SubscriptionState::Subscribing(SubscriptionMode::HistoricalReplay)
    );

    remote.emit_from_thread(vec![ProviderEvent::SubscriptionUpdated(signals(2))]);
    presenter.tick(DT).unwrap();
    assert_eq!(
        state(&presenter),
        SubscriptionState::Subscribed(SubscriptionMode::HistoricalReplay)
    );

    remote.emit_from_thread(vec![ProviderEvent::HistoricalReadComplete]);
    presenter.tick(DT).unwrap();
    assert_eq!(
        state(&presenter),
        SubscriptionState::Subscribing(SubscriptionMode::RealTime)
    );

    let calls = remote.calls();
    assert_eq!(
        &calls[1..],
        &[
            ProviderCall::HistoricalRange(Some(range)),
            ProviderCall::ReplayInterval(100),
            ProviderCall::Filter("FILTER ActiveMeasurements".to_string()),
            ProviderCall::HistoricalRange(None),
            ProviderCall::Filter("FILTER ActiveMeasurements".to_string()),
        ]
    );
}

#[test]
fn test_disconnect_tears_down_and_discards_data() {
    let (presenter, remote) = presenter(&AppConfig::default());
    let handle = presenter.handle();
    handle.connect("server=localhost");
    remote.emit_from_thread(vec![
        ProviderEvent::ConnectionEstablished,
        ProviderEvent::SubscriptionUpdated(signals(2)),
    ]);
    presenter.tick(DT).unwrap();
    assert!(state(&presenter).is_subscribed());

    let late_sink = remote.sink();
    handle.disconnect();
    assert_eq!(state(&presenter), SubscriptionState::Disconnected);
    assert_eq!(remote.calls().last(), Some(&ProviderCall::Disconnect));

    // A batch already in flight from the network thread
    std::thread::spawn(move || {
        late_sink.measurements(BatchBuilder::new().value(signal(1), 1.0).build())
    })
    .join()
    .unwrap();

    let stats = presenter.tick(DT).unwrap();
    assert_eq!(stats.discarded, 1);
    presenter
        .with_controller(|c| {
            assert!(c.epoch().is_empty());
            assert_eq!(c.renderer().stopped, signals(2));
            assert!(c.renderer().legend.is_empty());
        })
        .unwrap();
}

#[test]
fn test_bad_connection_string_reports_and_stays_put() {
    let (presenter, remote) = presenter(&AppConfig::default());
    presenter.handle().connect("host=localhost");

    assert_eq!(state(&presenter), SubscriptionState::Disconnected);
    assert!(remote.calls().is_empty());
    let reported = presenter
        .with_controller(|c| {
            c.status()
                .rows()
                .any(|r| r.starts_with("ERROR: Cannot connect"))
        })
        .unwrap();
    assert!(reported);
}

#[test]
fn test_simulated_publisher_end_to_end() {
    let publisher = SimulatedPublisher::new(SimulationSettings::default().with_devices(2));
    let presenter = GraphPresenter::new(
        Box::new(publisher),
        RecordingRenderer::default(),
        &AppConfig::default(),
    )
    .unwrap();
    let handle = presenter.handle();
    handle.connect("server=localhost");

    run_until("live traces", || {
        presenter.tick(DT).unwrap();
        presenter
            .with_controller(|c| {
                c.state().is_subscribed() && c.epoch().lines().all(|l| !l.latest().is_nan())
            })
            .unwrap()
    });

    presenter
        .with_controller(|c| {
            // Two devices: FREQ, VPHM and VPHA each
            assert_eq!(c.epoch().len(), 6);
            assert_eq!(c.epoch().groups().len(), 3);
            assert_eq!(c.legend().len(), 6);
            assert_eq!(c.metadata().device_count(), 2);
        })
        .unwrap();

    handle.disconnect();
    assert_eq!(state(&presenter), SubscriptionState::Disconnected);
}
