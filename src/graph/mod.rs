//! Graph core: rolling buffers, shared scaling and the render seam
//!
//! # Main Types
//!
//! - [`RollingBuffer`] - Fixed window of one signal's recent samples
//! - [`ScaleGroup`] - Buffers sharing one auto-scaled domain
//! - [`Epoch`] - Every buffer and group of one subscription cycle
//! - [`LineRenderer`] - Drawing backend implemented by the frontend
//!
//! Nothing in this module is thread-safe. It is owned by the presentation
//! context and only touched from the presentation thread.

pub mod buffer;
pub mod epoch;
pub mod renderer;
pub mod scale;

pub use buffer::RollingBuffer;
pub use epoch::Epoch;
pub use renderer::{LegendEntry, LineRenderer, LineStyle};
pub use scale::ScaleGroup;
