//! Rendering seam between the graph core and a drawing backend

use crate::types::{LineColor, SignalId};

/// Visual attributes of one trace, fixed for the lifetime of an epoch
#[derive(Debug, Clone, PartialEq)]
pub struct LineStyle {
    pub signal_id: SignalId,
    /// Position of the line within its epoch
    pub index: usize,
    pub color: LineColor,
    pub width: f32,
    /// Depth offset for renderers that stack traces in 3D
    pub depth: f32,
}

/// One legend row
#[derive(Debug, Clone, PartialEq)]
pub struct LegendEntry {
    pub signal_id: SignalId,
    pub text: String,
    pub color: LineColor,
}

/// A surface that can draw scrolling traces.
///
/// Only ever called on the presentation thread.
pub trait LineRenderer {
    /// Begin drawing a new trace
    fn start_line(&mut self, style: &LineStyle);

    /// Stop drawing and release a trace
    fn stop_line(&mut self, signal_id: SignalId);

    /// Replace the trace's geometry with render-space points
    fn draw_line(&mut self, signal_id: SignalId, points: &[[f64; 2]]);

    /// Replace the legend; an empty slice clears it
    fn set_legend(&mut self, entries: &[LegendEntry]);
}

impl<R: LineRenderer + ?Sized> LineRenderer for Box<R> {
    fn start_line(&mut self, style: &LineStyle) {
        (**self).start_line(style)
    }

    fn stop_line(&mut self, signal_id: SignalId) {
        (**self).stop_line(signal_id)
    }

    fn draw_line(&mut self, signal_id: SignalId, points: &[[f64; 2]]) {
        (**self).draw_line(signal_id, points)
    }

    fn set_legend(&mut self, entries: &[LegendEntry]) {
        (**self).set_legend(entries)
    }
}
