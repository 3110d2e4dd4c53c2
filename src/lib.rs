//! # GridLines-RS: Streaming Telemetry Trace Viewer
//!
//! A real-time viewer for streaming time-series measurements. A provider
//! connection delivers batches of `(signal id, value, timestamp)` on its own
//! threads; the viewer keeps one fixed-length rolling trace per subscribed
//! signal, groups traces by signal type and auto-scales every group into a
//! shared vertical range.
//!
//! ## Architecture
//!
//! - **Dispatch**: A [`dispatch::Dispatcher`] serializes all presentation
//!   state onto the UI thread
//! - **Ingestion**: Measurement batches cross threads through an MPSC
//!   [`ingest::IngestionQueue`] and are applied once per tick
//! - **Graph**: [`graph::RollingBuffer`]s grouped into auto-scaling
//!   [`graph::ScaleGroup`]s, rebuilt as a fresh [`graph::Epoch`] on every
//!   subscription change
//! - **Subscription**: [`subscription::SubscriptionController`] drives the
//!   provider through connect, subscribe, replay and disconnect
//! - **Frontend**: eframe/egui with egui_plot for the traces
//!
//! ## Configuration
//!
//! Settings are stored as TOML in the platform-appropriate data directory
//! under `dev.hxyulin.gridlines-rs`:
//!
//! - **Linux**: `~/.local/share/dev.hxyulin.gridlines-rs/`
//! - **macOS**: `~/Library/Application Support/dev.hxyulin.gridlines-rs/`
//! - **Windows**: `%APPDATA%\dev.hxyulin.gridlines-rs\`
//!
//! ## Example
//!
//! ```ignore
//! use gridlines_rs::{
//!     config::AppConfig,
//!     frontend::GridLinesApp,
//!     simulation::SimulatedPublisher,
//! };
//!
//! fn main() -> eframe::Result<()> {
//!     let config = AppConfig::load_or_default();
//!     eframe::run_native(
//!         "Grid Lines",
//!         eframe::NativeOptions::default(),
//!         Box::new(|cc| {
//!             let provider = Box::new(SimulatedPublisher::default());
//!             Ok(Box::new(GridLinesApp::new(cc, config, provider)?))
//!         }),
//!     )
//! }
//! ```

pub mod config;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod frontend;
pub mod graph;
pub mod ingest;
pub mod metadata;
pub mod simulation;
pub mod status;
pub mod subscription;
pub mod types;

// Re-export commonly used types
pub use config::AppConfig;
pub use connection::ConnectionTarget;
pub use dispatch::{Dispatcher, Waitable};
pub use error::{GridLinesError, Result};
pub use frontend::GridLinesApp;
pub use graph::{LineRenderer, RollingBuffer, ScaleGroup};
pub use ingest::IngestionQueue;
pub use simulation::SimulatedPublisher;
pub use subscription::{GraphPresenter, Provider, ProviderEvent, SubscriptionController};
pub use types::{Measurement, SignalId};
