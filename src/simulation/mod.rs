//! Simulated measurement publisher
//!
//! Stands in for a streaming publisher connection: a worker thread publishes
//! a synthetic PMU fleet through the [`EventSink`], honoring filter
//! expressions, historical replay and disconnects the way a live client
//! reports them.
//!
//! # Main Types
//!
//! - [`SimulatedPublisher`] - [`Provider`] backed by a worker thread
//! - [`SimulationSettings`] - Fleet size, publish rate and session limit
//! - [`SimulatedFleet`] - Devices, signals and their metadata
//! - [`FilterExpression`] - Parsed `FILTER ... WHERE SignalType ...` expression

pub mod filter;
pub mod fleet;
pub mod patterns;
pub mod time;

pub use filter::{FilterExpression, TypeCondition};
pub use fleet::{SimulatedFleet, SimulatedSignal};
pub use patterns::{SignalGenerator, Waveform};
pub use time::parse_time_expression;

use crate::connection::ConnectionTarget;
use crate::error::{GridLinesError, Result};
use crate::subscription::{EventSink, HistoricalRange, Provider, ProviderEvent};
use crate::types::Measurement;
use chrono::{DateTime, Utc};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// How long the idle worker waits for a command before checking its session
const IDLE_TIMEOUT: Duration = Duration::from_millis(100);

/// Simulation parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationSettings {
    /// Number of simulated devices
    pub devices: usize,
    /// Frames per second of real-time data (also the replay sample rate)
    pub publish_rate_hz: u32,
    /// Close the connection from the publisher side after this long
    pub session_limit: Option<Duration>,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            devices: 4,
            publish_rate_hz: 30,
            session_limit: None,
        }
    }
}

impl SimulationSettings {
    pub fn with_devices(mut self, devices: usize) -> Self {
        self.devices = devices;
        self
    }

    pub fn with_publish_rate(mut self, hz: u32) -> Self {
        self.publish_rate_hz = hz.max(1);
        self
    }

    pub fn with_session_limit(mut self, limit: Duration) -> Self {
        self.session_limit = Some(limit);
        self
    }

    fn frame_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.publish_rate_hz.max(1)))
    }

    /// Spacing of replayed sample timestamps
    fn sample_step(&self) -> chrono::Duration {
        chrono::Duration::microseconds(1_000_000 / i64::from(self.publish_rate_hz.max(1)))
    }
}

/// Commands from the provider handle to the worker
#[derive(Debug)]
enum PublisherCommand {
    Subscribe {
        filter: FilterExpression,
        historical: Option<HistoricalRange>,
        replay_interval_ms: u32,
    },
    SetReplayInterval(u32),
    ChangeConfiguration,
    Shutdown,
}

/// [`Provider`] that publishes a [`SimulatedFleet`] from a worker thread
pub struct SimulatedPublisher {
    fleet: SimulatedFleet,
    settings: SimulationSettings,
    historical: Option<HistoricalRange>,
    replay_interval_ms: u32,
    commands: Option<Sender<PublisherCommand>>,
    worker: Option<JoinHandle<()>>,
}

impl SimulatedPublisher {
    pub fn new(settings: SimulationSettings) -> Self {
        Self {
            fleet: SimulatedFleet::new(settings.devices),
            settings,
            historical: None,
            replay_interval_ms: 0,
            commands: None,
            worker: None,
        }
    }

    pub fn fleet(&self) -> &SimulatedFleet {
        &self.fleet
    }

    pub fn is_connected(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }

    /// Report a publisher configuration change followed by fresh metadata
    pub fn announce_configuration_change(&self) -> Result<()> {
        self.send(PublisherCommand::ChangeConfiguration)
    }

    fn send(&self, command: PublisherCommand) -> Result<()> {
        let commands = self
            .commands
            .as_ref()
            .ok_or_else(|| GridLinesError::Provider("not connected to a publisher".to_string()))?;
        commands
            .send(command)
            .map_err(|_| GridLinesError::Provider("publisher connection closed".to_string()))
    }

    fn shutdown(&mut self) {
        if let Some(commands) = self.commands.take() {
            let _ = commands.send(PublisherCommand::Shutdown);
        }

        if let Some(worker) = self.worker.take() {
            // The last presentation handle can be released on the worker itself
            if worker.thread().id() == thread::current().id() {
                return;
            }
            if worker.join().is_err() {
                tracing::error!("Simulated publisher thread panicked");
            }
        }
    }
}

impl Default for SimulatedPublisher {
    fn default() -> Self {
        Self::new(SimulationSettings::default())
    }
}

impl Drop for SimulatedPublisher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Provider for SimulatedPublisher {
    fn connect(&mut self, target: &ConnectionTarget, sink: EventSink) -> Result<()> {
        self.shutdown();

        let (tx, rx) = unbounded();
        let worker = PublisherWorker {
            fleet: self.fleet.clone(),
            settings: self.settings.clone(),
            address: target.address(),
            commands: rx,
            sink,
            stream: None,
            connected_at: Instant::now(),
        };

        let handle = thread::Builder::new()
            .name("simulated-publisher".to_string())
            .spawn(move || worker.run())?;

        self.commands = Some(tx);
        self.worker = Some(handle);
        Ok(())
    }

    fn disconnect(&mut self) {
        self.shutdown();
    }

    fn set_historical_read_range(&mut self, range: Option<HistoricalRange>) {
        self.historical = range;
    }

    fn set_replay_interval(&mut self, interval_ms: u32) {
        self.replay_interval_ms = interval_ms;
        if self.commands.is_some() {
            let _ = self.send(PublisherCommand::SetReplayInterval(interval_ms));
        }
    }

    fn set_filter_expression(&mut self, expression: &str) -> Result<()> {
        let filter = FilterExpression::parse(expression)?;
        self.send(PublisherCommand::Subscribe {
            filter,
            historical: self.historical.clone(),
            replay_interval_ms: self.replay_interval_ms,
        })
    }
}

// ==================== Worker ====================

enum StreamSource {
    Live,
    Replay {
        cursor: DateTime<Utc>,
        stop: DateTime<Utc>,
        interval: Duration,
    },
}

struct Stream {
    /// Indices into the fleet's signals
    signals: Vec<usize>,
    source: StreamSource,
    next_frame: Instant,
    started: bool,
}

struct PublisherWorker {
    fleet: SimulatedFleet,
    settings: SimulationSettings,
    address: String,
    commands: Receiver<PublisherCommand>,
    sink: EventSink,
    stream: Option<Stream>,
    connected_at: Instant,
}

impl PublisherWorker {
    fn run(mut self) {
        tracing::info!("Simulated publisher serving {}", self.address);
        self.sink.send(ProviderEvent::ConnectionEstablished);
        self.sink
            .send(ProviderEvent::ReceivedMetadata(self.fleet.catalog().clone()));

        loop {
            if self
                .settings
                .session_limit
                .is_some_and(|limit| self.connected_at.elapsed() >= limit)
            {
                tracing::info!("Simulated publisher closing session for {}", self.address);
                self.sink.send(ProviderEvent::ConnectionTerminated);
                break;
            }

            let now = Instant::now();
            if self.stream.as_ref().is_some_and(|s| s.next_frame <= now) {
                self.publish_frame();
            }

            let timeout = self
                .stream
                .as_ref()
                .map(|s| s.next_frame.saturating_duration_since(Instant::now()))
                .unwrap_or(IDLE_TIMEOUT)
                .min(IDLE_TIMEOUT);

            match self.commands.recv_timeout(timeout) {
                Ok(PublisherCommand::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
                Ok(command) => self.handle_command(command),
                Err(RecvTimeoutError::Timeout) => {}
            }
        }

        tracing::info!("Simulated publisher stopped");
    }

    fn handle_command(&mut self, command: PublisherCommand) {
        match command {
            PublisherCommand::Subscribe {
                filter,
                historical,
                replay_interval_ms,
            } => self.subscribe(filter, historical, replay_interval_ms),
            PublisherCommand::SetReplayInterval(interval_ms) => {
                if let Some(Stream {
                    source: StreamSource::Replay { interval, .. },
                    ..
                }) = self.stream.as_mut()
                {
                    *interval = Duration::from_millis(u64::from(interval_ms));
                }
            }
            PublisherCommand::ChangeConfiguration => {
                self.sink.send(ProviderEvent::ConfigurationChanged);
                self.sink
                    .send(ProviderEvent::ReceivedMetadata(self.fleet.catalog().clone()));
            }
            PublisherCommand::Shutdown => {}
        }
    }

    fn subscribe(
        &mut self,
        filter: FilterExpression,
        historical: Option<HistoricalRange>,
        replay_interval_ms: u32,
    ) {
        self.stream = None;

        let source = match historical {
            None => StreamSource::Live,
            Some(range) => match replay_window(&range) {
                Ok((start, stop)) => StreamSource::Replay {
                    cursor: start,
                    stop,
                    interval: Duration::from_millis(u64::from(replay_interval_ms)),
                },
                Err(e) => {
                    tracing::warn!("Rejected historical range: {}", e);
                    self.sink.error(format!("Failed to start replay: {}", e));
                    return;
                }
            },
        };

        let limit = filter.top.unwrap_or(usize::MAX);
        let signals: Vec<usize> = self
            .fleet
            .signals()
            .iter()
            .enumerate()
            .filter(|(_, signal)| filter.matches(signal.signal_type.acronym()))
            .map(|(index, _)| index)
            .take(limit)
            .collect();

        let signal_ids = signals
            .iter()
            .map(|&index| self.fleet.signals()[index].signal_id)
            .collect();

        tracing::debug!(
            "Simulated subscription to {} of {} signals",
            signals.len(),
            self.fleet.len()
        );
        self.sink.send(ProviderEvent::SubscriptionUpdated(signal_ids));
        self.sink
            .status(format!("Subscribed to {} measurements.", signals.len()));

        self.stream = Some(Stream {
            signals,
            source,
            next_frame: Instant::now(),
            started: false,
        });
    }

    fn publish_frame(&mut self) {
        let frame_period = self.settings.frame_period();
        let sample_step = self.settings.sample_step();
        let Some(stream) = self.stream.as_mut() else {
            return;
        };

        let timestamp = match &mut stream.source {
            StreamSource::Live => {
                stream.next_frame += frame_period;
                Some(Utc::now())
            }
            StreamSource::Replay { cursor, stop, .. } if *cursor > *stop => None,
            StreamSource::Replay {
                cursor, interval, ..
            } => {
                let timestamp = *cursor;
                *cursor += sample_step;
                stream.next_frame += *interval;
                Some(timestamp)
            }
        };

        let Some(timestamp) = timestamp else {
            self.stream = None;
            self.sink.send(ProviderEvent::HistoricalReadComplete);
            return;
        };

        // Don't try to catch up after a stall
        let now = Instant::now();
        if stream.next_frame + frame_period < now {
            stream.next_frame = now;
        }

        if !stream.started {
            stream.started = true;
            self.sink.send(ProviderEvent::DataStartTime(timestamp));
        }

        let elapsed = timestamp.timestamp_millis() as f64 / 1000.0;
        let signals = self.fleet.signals_mut();
        let batch = stream
            .signals
            .iter()
            .map(|&index| {
                let signal = &mut signals[index];
                Measurement::new(signal.signal_id, signal.generator.sample(elapsed), timestamp)
            })
            .collect();

        self.sink.measurements(batch);
    }
}

/// Resolve a historical range against the current time
fn replay_window(range: &HistoricalRange) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let now = Utc::now();
    let start = parse_time_expression(&range.start_time, now)?;
    let stop = parse_time_expression(&range.stop_time, now)?;

    if start > stop {
        return Err(GridLinesError::Provider(format!(
            "start time {} is after stop time {}",
            range.start_time, range.stop_time
        )));
    }

    Ok((start, stop))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_FILTER_EXPRESSION;
    use crate::dispatch::Waitable;
    use crate::ingest::IngestionQueue;
    use crate::subscription::RebuildGate;
    use crate::types::SignalId;

    const TIMEOUT: Duration = Duration::from_secs(5);

    struct Harness {
        publisher: SimulatedPublisher,
        queue: IngestionQueue,
        events: Receiver<ProviderEvent>,
    }

    impl Harness {
        fn connect(settings: SimulationSettings) -> Self {
            let queue = IngestionQueue::new();
            let (tx, events) = unbounded();
            let sink = EventSink::new(queue.producer(), RebuildGate::new(), move |event| {
                let _ = tx.send(event);
                Waitable::signaled()
            });

            let mut publisher = SimulatedPublisher::new(settings);
            let target = ConnectionTarget::parse("server=localhost").unwrap();
            publisher.connect(&target, sink).unwrap();

            Self {
                publisher,
                queue,
                events,
            }
        }

        fn next_event(&self) -> ProviderEvent {
            self.events.recv_timeout(TIMEOUT).unwrap()
        }

        /// Skip events until one named `name` arrives
        fn expect(&self, name: &str) -> ProviderEvent {
            loop {
                let event = self.next_event();
                if event.name() == name {
                    return event;
                }
            }
        }

        fn wait_for_batches(&self, count: usize) {
            let deadline = Instant::now() + TIMEOUT;
            while self.queue.len() < count {
                assert!(Instant::now() < deadline, "timed out waiting for data");
                thread::sleep(Duration::from_millis(5));
            }
        }
    }

    #[test]
    fn test_connect_reports_connection_and_metadata() {
        let harness = Harness::connect(SimulationSettings::default().with_devices(2));

        assert!(matches!(
            harness.next_event(),
            ProviderEvent::ConnectionEstablished
        ));
        match harness.next_event() {
            ProviderEvent::ReceivedMetadata(catalog) => {
                assert_eq!(catalog.len(), 14);
                assert_eq!(catalog.device_count(), 2);
            }
            other => panic!("unexpected {}", other.name()),
        }
        assert!(harness.publisher.is_connected());
    }

    #[test]
    fn test_real_time_subscription_honors_filter() {
        let mut harness = Harness::connect(SimulationSettings::default());
        harness
            .publisher
            .set_filter_expression(DEFAULT_FILTER_EXPRESSION)
            .unwrap();

        let ProviderEvent::SubscriptionUpdated(ids) = harness.expect("SubscriptionUpdated") else {
            unreachable!()
        };
        assert_eq!(ids.len(), 10);
        let catalog = harness.publisher.fleet().catalog();
        for id in &ids {
            let acronym = catalog.signal_type(*id).unwrap().acronym();
            assert!(acronym == "FREQ" || acronym.starts_with("VPH"), "{}", acronym);
        }

        harness.expect("DataStartTime");
        harness.wait_for_batches(2);
        let batch = &harness.queue.drain_all()[0];
        let published: Vec<SignalId> = batch.iter().map(|m| m.signal_id).collect();
        assert_eq!(published, ids);
        assert!(batch.iter().all(|m| m.value.is_finite()));
    }

    #[test]
    fn test_historical_replay_completes() {
        let mut harness = Harness::connect(SimulationSettings::default().with_publish_rate(20));
        harness
            .publisher
            .set_historical_read_range(Some(HistoricalRange::new("*-1S", "*")));
        harness.publisher.set_replay_interval(0);
        harness
            .publisher
            .set_filter_expression("FILTER ActiveMeasurements WHERE SignalType = 'FREQ'")
            .unwrap();

        harness.expect("SubscriptionUpdated");
        harness.expect("HistoricalReadComplete");

        let batches = harness.queue.drain_all();
        assert!((20..=22).contains(&batches.len()), "{}", batches.len());
        assert!(batches
            .windows(2)
            .all(|pair| pair[0][0].timestamp < pair[1][0].timestamp));
    }

    #[test]
    fn test_invalid_replay_range_reports_error() {
        let mut harness = Harness::connect(SimulationSettings::default());
        harness
            .publisher
            .set_historical_read_range(Some(HistoricalRange::new("*", "*-5M")));
        harness
            .publisher
            .set_filter_expression("FILTER ActiveMeasurements")
            .unwrap();

        match harness.expect("ErrorMessage") {
            ProviderEvent::ErrorMessage(message) => assert!(message.contains("after stop time")),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_out_of_range_replay_keeps_worker_alive() {
        let mut harness = Harness::connect(SimulationSettings::default());
        harness
            .publisher
            .set_historical_read_range(Some(HistoricalRange::new("*-99999999999D", "*")));
        harness
            .publisher
            .set_filter_expression("FILTER ActiveMeasurements")
            .unwrap();

        match harness.expect("ErrorMessage") {
            ProviderEvent::ErrorMessage(message) => {
                assert!(message.contains("Invalid time expression"))
            }
            _ => unreachable!(),
        }

        harness.publisher.set_historical_read_range(None);
        harness
            .publisher
            .set_filter_expression("FILTER ActiveMeasurements")
            .unwrap();
        harness.expect("SubscriptionUpdated");
        assert!(harness.publisher.is_connected());
    }

    #[test]
    fn test_filter_errors_are_synchronous() {
        let mut publisher = SimulatedPublisher::default();
        assert!(publisher.set_filter_expression("FILTER ActiveMeasurements").is_err());

        let mut harness = Harness::connect(SimulationSettings::default());
        assert!(harness
            .publisher
            .set_filter_expression("SELECT everything")
            .is_err());
    }

    #[test]
    fn test_configuration_change_refreshes_metadata() {
        let harness = Harness::connect(SimulationSettings::default().with_devices(1));
        harness.expect("ReceivedMetadata");

        harness.publisher.announce_configuration_change().unwrap();
        harness.expect("ConfigurationChanged");
        harness.expect("ReceivedMetadata");
    }

    #[test]
    fn test_disconnect_stops_events() {
        let mut harness = Harness::connect(SimulationSettings::default());
        harness
            .publisher
            .set_filter_expression("FILTER ActiveMeasurements")
            .unwrap();
        harness.expect("SubscriptionUpdated");

        harness.publisher.disconnect();
        assert!(!harness.publisher.is_connected());
        while harness.events.try_recv().is_ok() {}
        harness.queue.discard_all();

        thread::sleep(Duration::from_millis(100));
        assert!(harness.events.try_recv().is_err());
        assert!(harness.queue.is_empty());
    }

    #[test]
    fn test_session_limit_terminates_connection() {
        let harness = Harness::connect(
            SimulationSettings::default().with_session_limit(Duration::from_millis(50)),
        );
        harness.expect("ConnectionTerminated");
    }
}
