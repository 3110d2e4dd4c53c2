//! Measurement provider seam

use super::events::EventSink;
use super::HistoricalRange;
use crate::connection::ConnectionTarget;
use crate::error::Result;

/// A client for a streaming measurement publisher.
///
/// Calls come from the presentation thread. Everything the provider has to
/// report, including the outcome of `connect`, is delivered later through
/// the [`EventSink`] handed to [`connect`](Provider::connect), from whatever
/// thread the provider receives on.
#[cfg_attr(test, mockall::automock)]
pub trait Provider: Send {
    /// Start connecting; success is reported as `ConnectionEstablished`
    fn connect(&mut self, target: &ConnectionTarget, sink: EventSink) -> Result<()>;

    /// Close the connection; no further events are delivered afterwards
    fn disconnect(&mut self);

    /// Range for the next subscription; `None` subscribes in real time
    fn set_historical_read_range(&mut self, range: Option<HistoricalRange>);

    /// Processing interval for historical replay, in milliseconds
    fn set_replay_interval(&mut self, interval_ms: u32);

    /// Set the filter expression and issue the (re)subscription
    fn set_filter_expression(&mut self, expression: &str) -> Result<()>;
}
