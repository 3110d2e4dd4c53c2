//! Subscription lifecycle
//!
//! This module drives a measurement [`Provider`] through connect, subscribe,
//! historical replay and disconnect, and rebuilds the graph epoch whenever
//! the provider reports a new set of subscribed signals.
//!
//! # Main Types
//!
//! - [`SubscriptionController`] - The lifecycle state machine
//! - [`GraphPresenter`] - Controller + dispatcher + rebuild gate, ticked per frame
//! - [`ControllerHandle`] - Thread-safe user intents
//! - [`Provider`] / [`ProviderEvent`] / [`EventSink`] - Provider seam
//!
//! # States
//!
//! ```text
//! Disconnected -> Connecting -> Connected -> Subscribing(mode) -> Subscribed(mode)
//!      ^                                                              |
//!      +------------------------- Terminating <-----------------------+
//! ```

pub mod controller;
pub mod events;
pub mod presenter;
pub mod provider;

pub use controller::{SubscriptionController, TickStats};
pub use events::{EventSink, ProviderEvent, RebuildGate};
pub use presenter::{ControllerHandle, GraphPresenter};
pub use provider::Provider;

use serde::{Deserialize, Serialize};

/// Real-time streaming or replay of archived data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubscriptionMode {
    RealTime,
    HistoricalReplay,
}

impl std::fmt::Display for SubscriptionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubscriptionMode::RealTime => write!(f, "real-time"),
            SubscriptionMode::HistoricalReplay => write!(f, "historical replay"),
        }
    }
}

/// Lifecycle state of the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubscriptionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Subscribing(SubscriptionMode),
    Subscribed(SubscriptionMode),
    Terminating,
}

impl SubscriptionState {
    /// Whether a provider connection is up
    pub fn is_connected(&self) -> bool {
        matches!(
            self,
            SubscriptionState::Connected
                | SubscriptionState::Subscribing(_)
                | SubscriptionState::Subscribed(_)
        )
    }

    pub fn is_subscribed(&self) -> bool {
        matches!(self, SubscriptionState::Subscribed(_))
    }

    /// Mode of the active or pending subscription
    pub fn mode(&self) -> Option<SubscriptionMode> {
        match self {
            SubscriptionState::Subscribing(mode) | SubscriptionState::Subscribed(mode) => {
                Some(*mode)
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for SubscriptionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubscriptionState::Disconnected => write!(f, "disconnected"),
            SubscriptionState::Connecting => write!(f, "connecting"),
            SubscriptionState::Connected => write!(f, "connected"),
            SubscriptionState::Subscribing(mode) => write!(f, "subscribing ({})", mode),
            SubscriptionState::Subscribed(mode) => write!(f, "subscribed ({})", mode),
            SubscriptionState::Terminating => write!(f, "terminating"),
        }
    }
}

/// Time window for historical replay, as publisher time expressions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricalRange {
    /// e.g. `*-5M` (five minutes ago)
    pub start_time: String,
    /// e.g. `*` (now)
    pub stop_time: String,
}

impl HistoricalRange {
    pub fn new(start_time: impl Into<String>, stop_time: impl Into<String>) -> Self {
        Self {
            start_time: start_time.into(),
            stop_time: stop_time.into(),
        }
    }
}

/// What to subscribe to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionRequest {
    pub filter_expression: String,
    /// `Some` for historical replay
    pub historical: Option<HistoricalRange>,
    /// Replay processing interval in milliseconds (0 = as fast as possible)
    pub replay_interval_ms: u32,
}

impl SubscriptionRequest {
    pub fn real_time(filter_expression: impl Into<String>) -> Self {
        Self {
            filter_expression: filter_expression.into(),
            historical: None,
            replay_interval_ms: 0,
        }
    }

    pub fn historical(
        filter_expression: impl Into<String>,
        range: HistoricalRange,
        replay_interval_ms: u32,
    ) -> Self {
        Self {
            filter_expression: filter_expression.into(),
            historical: Some(range),
            replay_interval_ms,
        }
    }

    pub fn mode(&self) -> SubscriptionMode {
        if self.historical.is_some() {
            SubscriptionMode::HistoricalReplay
        } else {
            SubscriptionMode::RealTime
        }
    }
}
