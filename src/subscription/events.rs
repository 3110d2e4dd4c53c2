//! Inbound provider events
//!
//! Providers report everything through one [`EventSink`]. Measurement
//! batches go straight onto the ingestion queue; every other event is
//! handed to the presentation thread in the order it was sent.

use crate::dispatch::{Waitable, POLL_INTERVAL};
use crate::ingest::IngestionProducer;
use crate::metadata::MetadataCatalog;
use crate::types::{MeasurementBatch, SignalId};
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, PoisonError};

/// Something the provider has to report
#[derive(Debug, Clone)]
pub enum ProviderEvent {
    ConnectionEstablished,
    ConnectionTerminated,
    /// The set of signals now being streamed, in provider order
    SubscriptionUpdated(Vec<SignalId>),
    ReceivedNewMeasurements(MeasurementBatch),
    /// Historical replay reached its stop time
    HistoricalReadComplete,
    StatusMessage(String),
    ErrorMessage(String),
    ReceivedMetadata(MetadataCatalog),
    /// Timestamp of the first measurement of a subscription
    DataStartTime(DateTime<Utc>),
    /// The publisher's configuration changed and metadata will be refreshed
    ConfigurationChanged,
}

impl ProviderEvent {
    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            ProviderEvent::ConnectionEstablished => "ConnectionEstablished",
            ProviderEvent::ConnectionTerminated => "ConnectionTerminated",
            ProviderEvent::SubscriptionUpdated(_) => "SubscriptionUpdated",
            ProviderEvent::ReceivedNewMeasurements(_) => "ReceivedNewMeasurements",
            ProviderEvent::HistoricalReadComplete => "HistoricalReadComplete",
            ProviderEvent::StatusMessage(_) => "StatusMessage",
            ProviderEvent::ErrorMessage(_) => "ErrorMessage",
            ProviderEvent::ReceivedMetadata(_) => "ReceivedMetadata",
            ProviderEvent::DataStartTime(_) => "DataStartTime",
            ProviderEvent::ConfigurationChanged => "ConfigurationChanged",
        }
    }
}

/// Pending epoch rebuild that measurement ingestion must wait for
#[derive(Clone, Default)]
pub struct RebuildGate {
    pending: Arc<Mutex<Option<Waitable>>>,
}

impl RebuildGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold ingestion until `rebuild` is signaled
    pub fn install(&self, rebuild: Waitable) {
        *self.pending.lock().unwrap_or_else(PoisonError::into_inner) = Some(rebuild);
    }

    /// Whether data may be applied this tick.
    ///
    /// Waits at most [`POLL_INTERVAL`] for a pending rebuild and clears the
    /// gate once it has completed.
    pub fn poll(&self) -> bool {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        match pending.as_ref() {
            None => true,
            Some(rebuild) if rebuild.wait_timeout(POLL_INTERVAL) => {
                *pending = None;
                true
            }
            Some(_) => false,
        }
    }

    /// Whether a rebuild is still outstanding (without waiting)
    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|w| !w.is_signaled())
    }
}

type Deliver = dyn Fn(ProviderEvent) -> Waitable + Send + Sync;

/// Ordered inbound path for provider events
#[derive(Clone)]
pub struct EventSink {
    ingest: IngestionProducer,
    gate: RebuildGate,
    deliver: Arc<Deliver>,
}

impl std::fmt::Debug for EventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSink")
            .field("rebuild_pending", &self.gate.is_pending())
            .finish()
    }
}

impl EventSink {
    /// `deliver` hands a non-measurement event to the presentation thread
    pub fn new<F>(ingest: IngestionProducer, gate: RebuildGate, deliver: F) -> Self
    where
        F: Fn(ProviderEvent) -> Waitable + Send + Sync + 'static,
    {
        Self {
            ingest,
            gate,
            deliver: Arc::new(deliver),
        }
    }

    /// Report an event; never blocks
    pub fn send(&self, event: ProviderEvent) {
        match event {
            ProviderEvent::ReceivedNewMeasurements(batch) => self.ingest.push(batch),
            ProviderEvent::SubscriptionUpdated(_) => {
                let rebuild = (self.deliver)(event);
                self.gate.install(rebuild);
            }
            other => {
                tracing::trace!("Provider event {}", other.name());
                (self.deliver)(other);
            }
        }
    }

    pub fn measurements(&self, batch: MeasurementBatch) {
        self.ingest.push(batch);
    }

    pub fn status(&self, message: impl Into<String>) {
        self.send(ProviderEvent::StatusMessage(message.into()));
    }

    pub fn error(&self, message: impl Into<String>) {
        self.send(ProviderEvent::ErrorMessage(message.into()));
    }
}
