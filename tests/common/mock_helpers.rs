//! Recording doubles for the provider and renderer seams

use gridlines_rs::connection::ConnectionTarget;
use gridlines_rs::graph::{LegendEntry, LineRenderer, LineStyle};
use gridlines_rs::subscription::{EventSink, HistoricalRange, Provider, ProviderEvent};
use gridlines_rs::types::SignalId;
use gridlines_rs::Result;
use std::sync::{Arc, Mutex};

/// Renderer that remembers everything it was told
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    pub started: Vec<LineStyle>,
    pub stopped: Vec<SignalId>,
    pub legend: Vec<LegendEntry>,
    pub last_points: Vec<(SignalId, Vec<[f64; 2]>)>,
    pub draws: usize,
}

impl RecordingRenderer {
    pub fn points(&self, signal_id: SignalId) -> Option<&[[f64; 2]]> {
        self.last_points
            .iter()
            .find(|(id, _)| *id == signal_id)
            .map(|(_, points)| points.as_slice())
    }
}

impl LineRenderer for RecordingRenderer {
    fn start_line(&mut self, style: &LineStyle) {
        self.started.push(style.clone());
    }

    fn stop_line(&mut self, signal_id: SignalId) {
        self.stopped.push(signal_id);
        self.last_points.retain(|(id, _)| *id != signal_id);
    }

    fn draw_line(&mut self, signal_id: SignalId, points: &[[f64; 2]]) {
        self.draws += 1;
        match self.last_points.iter_mut().find(|(id, _)| *id == signal_id) {
            Some((_, last)) => *last = points.to_vec(),
            None => self.last_points.push((signal_id, points.to_vec())),
        }
    }

    fn set_legend(&mut self, entries: &[LegendEntry]) {
        self.legend = entries.to_vec();
    }
}

/// A call made on [`ScriptedProvider`]
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderCall {
    Connect(String),
    Disconnect,
    HistoricalRange(Option<HistoricalRange>),
    ReplayInterval(u32),
    Filter(String),
}

#[derive(Default)]
struct Shared {
    calls: Vec<ProviderCall>,
    sink: Option<EventSink>,
}

/// Provider that records calls and lets the test play the publisher side
#[derive(Clone, Default)]
pub struct ScriptedProvider {
    shared: Arc<Mutex<Shared>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        self.shared.lock().unwrap().calls.clone()
    }

    /// Sink handed over by the last connect
    pub fn sink(&self) -> EventSink {
        self.shared
            .lock()
            .unwrap()
            .sink
            .clone()
            .expect("provider was never connected")
    }

    /// Send `events` from a separate thread, as a network client would
    pub fn emit_from_thread(&self, events: Vec<ProviderEvent>) {
        let sink = self.sink();
        std::thread::spawn(move || {
            for event in events {
                sink.send(event);
            }
        })
        .join()
        .unwrap();
    }
}

impl Provider for ScriptedProvider {
    fn connect(&mut self, target: &ConnectionTarget, sink: EventSink) -> Result<()> {
        let mut shared = self.shared.lock().unwrap();
        shared.calls.push(ProviderCall::Connect(target.address()));
        shared.sink = Some(sink);
        Ok(())
    }

    fn disconnect(&mut self) {
        let mut shared = self.shared.lock().unwrap();
        shared.calls.push(ProviderCall::Disconnect);
        shared.sink = None;
    }

    fn set_historical_read_range(&mut self, range: Option<HistoricalRange>) {
        self.shared
            .lock()
            .unwrap()
            .calls
            .push(ProviderCall::HistoricalRange(range));
    }

    fn set_replay_interval(&mut self, interval_ms: u32) {
        self.shared
            .lock()
            .unwrap()
            .calls
            .push(ProviderCall::ReplayInterval(interval_ms));
    }

    fn set_filter_expression(&mut self, expression: &str) -> Result<()> {
        self.shared
            .lock()
            .unwrap()
            .calls
            .push(ProviderCall::Filter(expression.to_string()));
        Ok(())
    }
}
