//! The subscription lifecycle state machine
//!
//! The controller is the presentation context: it owns the current
//! [`Epoch`], the renderer, the status log and the provider, and is only
//! touched on the presentation thread (directly, or through work dispatched
//! by the [`EventSink`]).
//!
//! # Transitions
//!
//! | From                                     | Trigger                 | To                    |
//! |------------------------------------------|-------------------------|-----------------------|
//! | Disconnected or any connected state      | `connect`               | Connecting            |
//! | Connecting                               | `ConnectionEstablished` | Connected/Subscribing |
//! | Connected, Subscribing, Subscribed       | `subscribe`             | Subscribing(mode)     |
//! | Connected, Subscribing, Subscribed       | `SubscriptionUpdated`   | Subscribed(mode)      |
//! | Subscribed(HistoricalReplay)             | `HistoricalReadComplete`| Subscribing(RealTime) |
//! | any connected state                      | `disconnect`            | Disconnected          |
//! | any                                      | `ConnectionTerminated`  | Disconnected          |

use super::events::{EventSink, ProviderEvent};
use super::provider::Provider;
use super::{HistoricalRange, SubscriptionMode, SubscriptionRequest, SubscriptionState};
use crate::config::{AppConfig, GraphConfig, ScaleTuning, SubscriptionConfig};
use crate::connection::ConnectionTarget;
use crate::error::{GridLinesError, Result};
use crate::graph::{Epoch, LegendEntry, LineRenderer, LineStyle};
use crate::ingest::IngestionQueue;
use crate::metadata::{LegendFormatter, MetadataCatalog};
use crate::status::StatusLog;
use crate::types::{LineColor, SignalId, UNKNOWN_SIGNAL_TYPE_KEY};

/// Legend acronym for signals whose type cannot be resolved
const UNRESOLVED_TYPE_ACRONYM: &str = "UNST";

/// What one presentation tick did with queued measurements
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickStats {
    /// Batches taken off the ingestion queue
    pub batches: usize,
    /// Measurements written into a buffer of the current epoch
    pub applied: usize,
    /// Batches dropped because nothing is subscribed
    pub discarded: usize,
}

pub struct SubscriptionController<R> {
    state: SubscriptionState,
    provider: Box<dyn Provider>,
    renderer: R,
    sink: Option<EventSink>,
    ingest: IngestionQueue,

    graph: GraphConfig,
    tuning: ScaleTuning,
    subscription: SubscriptionConfig,
    connection_string: String,
    filter_expression: String,

    epoch: Epoch,
    metadata: MetadataCatalog,
    legend_format: LegendFormatter,
    legend: Vec<LegendEntry>,
    status: StatusLog,

    /// Request issued once the pending connection is established
    staged: Option<SubscriptionRequest>,
    /// Request most recently issued to the provider
    active: Option<SubscriptionRequest>,
}

impl<R: LineRenderer> SubscriptionController<R> {
    pub fn new(
        provider: Box<dyn Provider>,
        renderer: R,
        config: &AppConfig,
        ingest: IngestionQueue,
    ) -> Self {
        Self {
            state: SubscriptionState::Disconnected,
            provider,
            renderer,
            sink: None,
            ingest,
            graph: config.graph.clone(),
            tuning: config.scale,
            subscription: config.subscription.clone(),
            connection_string: config.connection_string.clone(),
            filter_expression: config.filter_expression.clone(),
            epoch: Epoch::default(),
            metadata: MetadataCatalog::new(),
            legend_format: LegendFormatter::new(&config.graph.legend_format),
            legend: Vec::new(),
            status: StatusLog::new(&config.status),
            staged: None,
            active: None,
        }
    }

    /// Attach the event path handed to the provider on every connect
    pub fn attach_sink(&mut self, sink: EventSink) {
        self.sink = Some(sink);
    }

    // ==================== User Operations ====================

    /// Parse `connection_string` and (re)connect to the publisher.
    ///
    /// Any existing connection is torn down first. A real-time subscription
    /// with the current filter expression is staged and issued once the
    /// connection is established.
    pub fn connect(&mut self, connection_string: &str) -> Result<()> {
        if matches!(
            self.state,
            SubscriptionState::Connecting | SubscriptionState::Terminating
        ) {
            return Err(self.invalid("connect"));
        }

        let target = match ConnectionTarget::parse(connection_string) {
            Ok(target) => target,
            Err(e) => {
                tracing::warn!("Rejected connection string: {}", e);
                self.status.push_error(format!(
                    "Cannot connect - {}. For example: \"server=localhost:7165\"",
                    e
                ));
                return Err(e);
            }
        };

        let Some(sink) = self.sink.clone() else {
            let e = GridLinesError::Provider("no event sink attached".to_string());
            self.status.push_error(e.to_string());
            return Err(e);
        };

        if self.state != SubscriptionState::Disconnected {
            self.terminate();
        }

        self.connection_string = connection_string.to_string();
        self.staged = Some(SubscriptionRequest::real_time(self.filter_expression.clone()));
        self.status
            .push(format!("Attempting connection to \"{}\"...", target.address()));
        self.set_state(SubscriptionState::Connecting);

        if let Err(e) = self.provider.connect(&target, sink) {
            self.status.push_error(format!("Failed to connect: {}", e));
            self.staged = None;
            self.set_state(SubscriptionState::Disconnected);
            return Err(e);
        }

        Ok(())
    }

    /// Subscribe (or resubscribe) with `request`.
    ///
    /// The current epoch is cleared right away; the next one is built when
    /// the provider reports the new signal set.
    pub fn subscribe(&mut self, request: SubscriptionRequest) -> Result<()> {
        if !self.state.is_connected() {
            return Err(self.invalid("subscribe"));
        }

        if request.filter_expression.trim().is_empty() {
            self.status
                .push_error("Cannot subscribe - filter expression is empty");
            return Err(GridLinesError::MissingParameter(
                "filter expression".to_string(),
            ));
        }

        self.clear_epoch();

        let mode = request.mode();
        self.provider
            .set_historical_read_range(request.historical.clone());

        if mode == SubscriptionMode::HistoricalReplay {
            self.provider.set_replay_interval(request.replay_interval_ms);
            self.status.push(format!(
                "Starting historical replay at {} playback speed...",
                describe_interval(request.replay_interval_ms)
            ));
        }

        if let Err(e) = self.provider.set_filter_expression(&request.filter_expression) {
            self.status.push_error(format!("Failed to subscribe: {}", e));
            self.active = None;
            self.set_state(SubscriptionState::Connected);
            return Err(e);
        }

        self.filter_expression = request.filter_expression.clone();
        self.active = Some(request);
        self.set_state(SubscriptionState::Subscribing(mode));
        Ok(())
    }

    /// Close the connection and clear every trace
    pub fn disconnect(&mut self) -> Result<()> {
        match self.state {
            SubscriptionState::Disconnected => Ok(()),
            SubscriptionState::Terminating => Err(self.invalid("disconnect")),
            _ => {
                self.terminate();
                Ok(())
            }
        }
    }

    /// Change the historical replay speed; applied immediately during replay
    pub fn set_replay_interval(&mut self, interval_ms: u32) {
        self.subscription.process_interval_ms = interval_ms;

        if self.state.mode() == Some(SubscriptionMode::HistoricalReplay) {
            self.provider.set_replay_interval(interval_ms);
            if let Some(active) = self.active.as_mut() {
                active.replay_interval_ms = interval_ms;
            }
            self.status.push(format!(
                "Adjusted historical playback speed to {}...",
                describe_interval(interval_ms)
            ));
        }
    }

    /// Filter expression used by the next subscription
    pub fn set_filter_expression(&mut self, expression: impl Into<String>) {
        self.filter_expression = expression.into();
    }

    /// Replay range used by [`replay_request`](Self::replay_request)
    pub fn set_historical_range(&mut self, range: HistoricalRange) {
        self.subscription.start_time = range.start_time;
        self.subscription.stop_time = range.stop_time;
    }

    /// Real-time request for the current filter expression
    pub fn real_time_request(&self) -> SubscriptionRequest {
        SubscriptionRequest::real_time(self.filter_expression.clone())
    }

    /// Historical request for the current filter expression and replay settings
    pub fn replay_request(&self) -> SubscriptionRequest {
        SubscriptionRequest::historical(
            self.filter_expression.clone(),
            HistoricalRange::new(
                self.subscription.start_time.clone(),
                self.subscription.stop_time.clone(),
            ),
            self.subscription.process_interval_ms,
        )
    }

    // ==================== Provider Events ====================

    /// Apply one provider event; runs on the presentation thread
    pub fn handle_event(&mut self, event: ProviderEvent) {
        match event {
            ProviderEvent::ConnectionEstablished => self.on_connection_established(),
            ProviderEvent::ConnectionTerminated => {
                self.status.push("Connection terminated.");
                self.clear_epoch();
                self.staged = None;
                self.active = None;
                self.set_state(SubscriptionState::Disconnected);
            }
            ProviderEvent::SubscriptionUpdated(signal_ids) => self.rebuild(signal_ids),
            ProviderEvent::ReceivedNewMeasurements(batch) => self.ingest.push(batch),
            ProviderEvent::HistoricalReadComplete => self.on_historical_read_complete(),
            ProviderEvent::StatusMessage(message) => self.status.push(message),
            ProviderEvent::ErrorMessage(message) => self.status.push_error(message),
            ProviderEvent::ReceivedMetadata(catalog) => {
                self.status.push(format!(
                    "Received metadata for {} measurements from {} devices.",
                    catalog.len(),
                    catalog.device_count()
                ));
                self.metadata = catalog;
            }
            ProviderEvent::DataStartTime(start) => self.status.push(format!(
                "Received first measurement at timestamp {}",
                start.format("%Y-%m-%d %H:%M:%S%.3f")
            )),
            ProviderEvent::ConfigurationChanged => self
                .status
                .push("Configuration change detected. Metadata refresh requested."),
        }
    }

    fn on_connection_established(&mut self) {
        if self.state != SubscriptionState::Connecting {
            tracing::debug!("Ignoring ConnectionEstablished while {}", self.state);
            return;
        }

        self.status.push("Connection established.");
        self.set_state(SubscriptionState::Connected);

        if !self.subscription.subscribe_on_connect {
            return;
        }

        if let Some(request) = self.staged.take() {
            if let Err(e) = self.subscribe(request) {
                tracing::warn!("Initial subscription failed: {}", e);
            }
        }
    }

    fn on_historical_read_complete(&mut self) {
        if self.state.mode() != Some(SubscriptionMode::HistoricalReplay) {
            tracing::debug!("Ignoring HistoricalReadComplete while {}", self.state);
            return;
        }

        self.status
            .push("Historical data read complete. Restarting real-time subscription...");
        if let Err(e) = self.subscribe(self.real_time_request()) {
            tracing::warn!("Real-time resubscription failed: {}", e);
        }
    }

    /// Replace the epoch with one built for `signal_ids`
    fn rebuild(&mut self, mut signal_ids: Vec<SignalId>) {
        let mode = match self.state {
            SubscriptionState::Subscribing(mode) | SubscriptionState::Subscribed(mode) => mode,
            SubscriptionState::Connected => self
                .active
                .as_ref()
                .map(SubscriptionRequest::mode)
                .unwrap_or(SubscriptionMode::RealTime),
            _ => {
                tracing::debug!("Ignoring SubscriptionUpdated while {}", self.state);
                return;
            }
        };

        self.clear_epoch();

        let max = self.subscription.max_signals;
        if signal_ids.len() > max {
            tracing::warn!(
                "Subscription returned {} signals, keeping the first {}",
                signal_ids.len(),
                max
            );
            self.status.push(format!(
                "Reduced {} subscribed measurements to {}, configured maximum.",
                signal_ids.len(),
                max
            ));
            signal_ids.truncate(max);
        }

        let mut epoch = Epoch::empty(self.epoch.id().next());
        for &signal_id in &signal_ids {
            let (key, auto_shrink) = match self.metadata.signal_type(signal_id) {
                Some(signal_type) => (signal_type.acronym(), signal_type.auto_shrinks()),
                None => (UNKNOWN_SIGNAL_TYPE_KEY, false),
            };

            if let Err(e) = epoch.insert(signal_id, key, auto_shrink, &self.graph, self.tuning) {
                self.status
                    .push_error(format!("Cannot create trace for {}: {}", signal_id, e));
            }
        }

        for line in epoch.lines() {
            let index = line.index();
            self.renderer.start_line(&LineStyle {
                signal_id: line.signal_id(),
                index,
                color: LineColor::for_index(&self.graph.line_colors, index),
                width: self.graph.line_width,
                depth: index as f32 * self.graph.line_depth_offset,
            });
        }

        self.legend = self.legend_entries(&epoch);
        self.renderer.set_legend(&self.legend);

        tracing::info!(
            "Built epoch {} with {} traces in {} scale groups",
            epoch.id(),
            epoch.len(),
            epoch.groups().len()
        );
        self.epoch = epoch;
        self.set_state(SubscriptionState::Subscribed(mode));
    }

    /// Legend rows for every signal that has metadata
    fn legend_entries(&self, epoch: &Epoch) -> Vec<LegendEntry> {
        epoch
            .lines()
            .filter_map(|line| {
                let signal_id = line.signal_id();
                let record = self.metadata.measurement(signal_id)?;
                let acronym = self
                    .metadata
                    .signal_type(signal_id)
                    .map(|t| t.acronym())
                    .unwrap_or(UNRESOLVED_TYPE_ACRONYM);

                Some(LegendEntry {
                    signal_id,
                    text: self.legend_format.format(record, acronym),
                    color: LineColor::for_index(&self.graph.line_colors, line.index()),
                })
            })
            .collect()
    }

    // ==================== Presentation Tick ====================

    /// Advance the graph by `dt` seconds.
    ///
    /// `apply_data` is false while an epoch rebuild is still pending; queued
    /// measurements then wait for the next tick.
    pub fn tick(&mut self, dt: f64, apply_data: bool) -> TickStats {
        let mut stats = TickStats::default();

        match self.state {
            SubscriptionState::Subscribed(_) => {
                if apply_data {
                    for batch in self.ingest.drain_all() {
                        stats.batches += 1;
                        stats.applied += self.epoch.apply_batch(&batch);
                    }
                }

                self.epoch.update(dt);
                for line in self.epoch.lines() {
                    self.renderer.draw_line(line.signal_id(), line.points());
                }
            }
            // Data for the upcoming epoch is kept until it exists
            SubscriptionState::Subscribing(_) => {}
            _ => {
                stats.discarded = self.ingest.discard_all();
            }
        }

        if stats.batches > 0 || stats.discarded > 0 {
            tracing::trace!(
                "Tick: {} batches, {} measurements applied, {} batches discarded",
                stats.batches,
                stats.applied,
                stats.discarded
            );
        }
        stats
    }

    // ==================== Internals ====================

    fn terminate(&mut self) {
        self.clear_epoch();
        self.set_state(SubscriptionState::Terminating);
        self.status.push("Terminating current connection...");
        self.provider.disconnect();
        self.staged = None;
        self.active = None;
        self.set_state(SubscriptionState::Disconnected);
    }

    /// Stop every trace and clear the legend
    fn clear_epoch(&mut self) {
        for &signal_id in self.epoch.signal_ids() {
            self.renderer.stop_line(signal_id);
        }
        if !self.legend.is_empty() || !self.epoch.is_empty() {
            self.renderer.set_legend(&[]);
        }
        self.legend.clear();
        self.epoch = Epoch::empty(self.epoch.id());
    }

    fn set_state(&mut self, state: SubscriptionState) {
        if self.state != state {
            tracing::info!("Subscription state: {} -> {}", self.state, state);
            self.state = state;
        }
    }

    fn invalid(&self, operation: &'static str) -> GridLinesError {
        GridLinesError::InvalidTransition {
            operation,
            state: self.state.to_string(),
        }
    }

    // ==================== Accessors ====================

    pub fn state(&self) -> SubscriptionState {
        self.state
    }

    pub fn epoch(&self) -> &Epoch {
        &self.epoch
    }

    pub fn legend(&self) -> &[LegendEntry] {
        &self.legend
    }

    pub fn status(&self) -> &StatusLog {
        &self.status
    }

    pub fn status_mut(&mut self) -> &mut StatusLog {
        &mut self.status
    }

    pub fn metadata(&self) -> &MetadataCatalog {
        &self.metadata
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }

    pub fn filter_expression(&self) -> &str {
        &self.filter_expression
    }

    pub fn subscription_config(&self) -> &SubscriptionConfig {
        &self.subscription
    }

    /// Request most recently issued to the provider
    pub fn active_request(&self) -> Option<&SubscriptionRequest> {
        self.active.as_ref()
    }

    /// Batches waiting on the ingestion queue
    pub fn queued_batches(&self) -> usize {
        self.ingest.len()
    }
}

fn describe_interval(interval_ms: u32) -> String {
    if interval_ms == 0 {
        "fast as possible".to_string()
    } else {
        format!("{}ms", interval_ms)
    }
}
