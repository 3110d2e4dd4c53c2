//! Presentation-side wiring of the controller
//!
//! [`GraphPresenter`] owns the dispatcher that holds the controller, and the
//! rebuild gate shared with the event sink. The host calls
//! [`GraphPresenter::tick`] once per frame on the thread that created it.

use super::controller::{SubscriptionController, TickStats};
use super::events::{EventSink, RebuildGate};
use super::provider::Provider;
use super::{HistoricalRange, SubscriptionRequest};
use crate::config::AppConfig;
use crate::dispatch::{Dispatcher, Waitable};
use crate::error::Result;
use crate::graph::LineRenderer;
use crate::ingest::IngestionQueue;

pub struct GraphPresenter<R> {
    dispatcher: Dispatcher<SubscriptionController<R>>,
    gate: RebuildGate,
}

impl<R> GraphPresenter<R>
where
    R: LineRenderer + Send + 'static,
{
    /// Build the controller on the calling thread, which becomes the
    /// presentation thread.
    pub fn new(provider: Box<dyn Provider>, renderer: R, config: &AppConfig) -> Result<Self> {
        let ingest = IngestionQueue::new();
        let producer = ingest.producer();
        let controller = SubscriptionController::new(provider, renderer, config, ingest);
        let dispatcher = Dispatcher::new(controller);
        let gate = RebuildGate::new();

        let weak = dispatcher.downgrade();
        let sink = EventSink::new(producer, gate.clone(), move |event| match weak.upgrade() {
            Some(dispatcher) => dispatcher.invoke(move |controller| controller.handle_event(event)),
            None => Waitable::signaled(),
        });
        dispatcher.with_context(|controller| controller.attach_sink(sink))?;

        Ok(Self { dispatcher, gate })
    }

    /// One presentation tick: run dispatched events, then advance the graph.
    pub fn tick(&self, dt: f64) -> Result<TickStats> {
        self.dispatcher.drain()?;
        let apply_data = self.gate.poll();
        self.dispatcher
            .with_context(|controller| controller.tick(dt, apply_data))
    }

    /// Borrow the controller on the presentation thread
    pub fn with_controller<T>(
        &self,
        f: impl FnOnce(&mut SubscriptionController<R>) -> T,
    ) -> Result<T> {
        self.dispatcher.with_context(f)
    }

    /// Handle for issuing user intents from any thread
    pub fn handle(&self) -> ControllerHandle<R> {
        ControllerHandle {
            dispatcher: self.dispatcher.clone(),
        }
    }

    /// Whether a subscription rebuild is holding back data
    pub fn rebuild_pending(&self) -> bool {
        self.gate.is_pending()
    }
}

/// Thread-safe user intents.
///
/// Each call runs on the presentation thread (immediately when already
/// there). Failures are reported to the status log by the controller.
pub struct ControllerHandle<R> {
    dispatcher: Dispatcher<SubscriptionController<R>>,
}

impl<R> Clone for ControllerHandle<R> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: self.dispatcher.clone(),
        }
    }
}

impl<R> ControllerHandle<R>
where
    R: LineRenderer + Send + 'static,
{
    pub fn connect(&self, connection_string: impl Into<String>) -> Waitable {
        let connection_string = connection_string.into();
        self.dispatcher.invoke(move |controller| {
            if let Err(e) = controller.connect(&connection_string) {
                tracing::debug!("connect: {}", e);
            }
        })
    }

    pub fn subscribe(&self, request: SubscriptionRequest) -> Waitable {
        self.dispatcher.invoke(move |controller| {
            if let Err(e) = controller.subscribe(request) {
                tracing::debug!("subscribe: {}", e);
            }
        })
    }

    /// Real-time subscription with `filter_expression`
    pub fn update_subscription(&self, filter_expression: impl Into<String>) -> Waitable {
        let filter_expression = filter_expression.into();
        self.dispatcher.invoke(move |controller| {
            controller.set_filter_expression(filter_expression);
            if let Err(e) = controller.subscribe(controller.real_time_request()) {
                tracing::debug!("update subscription: {}", e);
            }
        })
    }

    /// Historical replay of `range` with `filter_expression`
    pub fn replay(
        &self,
        filter_expression: impl Into<String>,
        range: HistoricalRange,
        interval_ms: u32,
    ) -> Waitable {
        let filter_expression = filter_expression.into();
        self.dispatcher.invoke(move |controller| {
            controller.set_filter_expression(filter_expression);
            controller.set_historical_range(range);
            controller.set_replay_interval(interval_ms);
            if let Err(e) = controller.subscribe(controller.replay_request()) {
                tracing::debug!("replay: {}", e);
            }
        })
    }

    pub fn set_replay_interval(&self, interval_ms: u32) -> Waitable {
        self.dispatcher
            .invoke(move |controller| controller.set_replay_interval(interval_ms))
    }

    pub fn disconnect(&self) -> Waitable {
        self.dispatcher.invoke(|controller| {
            if let Err(e) = controller.disconnect() {
                tracing::debug!("disconnect: {}", e);
            }
        })
    }
}
