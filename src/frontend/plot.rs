//! Trace rendering with egui_plot
//!
//! [`PlotLines`] is the [`LineRenderer`] the controller drives. It only
//! keeps the last points handed to it for each trace; the egui frame then
//! paints them inside a fixed window of `[-x_extent, x_extent]` by
//! `[-graph_scale, graph_scale]`, which is the coordinate space the rolling
//! buffers and scale groups produce.

use crate::config::GraphConfig;
use crate::graph::{LegendEntry, LineRenderer, LineStyle};
use crate::types::{LineColor, SignalId};
use egui::{Color32, RichText, Ui};
use egui_plot::{Line, Plot, PlotBounds, PlotPoints};

/// Extra room around the scaled traces so the widest lines aren't clipped
const BOUNDS_MARGIN: f64 = 1.05;

fn to_color32(color: LineColor) -> Color32 {
    let [r, g, b, a] = color.0;
    Color32::from_rgba_unmultiplied(r, g, b, a)
}

/// One trace as last drawn
#[derive(Debug, Clone)]
pub struct PlotTrace {
    pub style: LineStyle,
    pub points: Vec<[f64; 2]>,
}

/// egui_plot-backed trace surface
#[derive(Debug, Clone)]
pub struct PlotLines {
    traces: Vec<PlotTrace>,
    legend: Vec<LegendEntry>,
    x_extent: f64,
    graph_scale: f64,
    pub show_grid: bool,
    pub show_legend: bool,
}

impl PlotLines {
    pub fn new(config: &GraphConfig) -> Self {
        Self {
            traces: Vec::new(),
            legend: Vec::new(),
            x_extent: config.x_extent,
            graph_scale: config.graph_scale,
            show_grid: true,
            show_legend: true,
        }
    }

    pub fn traces(&self) -> &[PlotTrace] {
        &self.traces
    }

    pub fn trace(&self, signal_id: SignalId) -> Option<&PlotTrace> {
        self.traces.iter().find(|t| t.style.signal_id == signal_id)
    }

    pub fn legend(&self) -> &[LegendEntry] {
        &self.legend
    }

    /// Paint every trace, deepest first so lower indices end up on top
    pub fn render(&self, ui: &mut Ui) {
        let x = self.x_extent * BOUNDS_MARGIN;
        let y = self.graph_scale * BOUNDS_MARGIN;

        let plot = Plot::new("grid_lines")
            .allow_zoom(false)
            .allow_drag(false)
            .allow_scroll(false)
            .allow_boxed_zoom(false)
            .show_axes([false, false])
            .show_grid(self.show_grid)
            .show_x(false)
            .show_y(false);

        plot.show(ui, |plot_ui| {
            plot_ui.set_plot_bounds(PlotBounds::from_min_max([-x, -y], [x, y]));

            let mut order: Vec<&PlotTrace> = self
                .traces
                .iter()
                .filter(|t| !t.points.is_empty())
                .collect();
            order.sort_by(|a, b| b.style.depth.total_cmp(&a.style.depth));

            for trace in order {
                let line = Line::new(
                    trace.style.signal_id.to_string(),
                    PlotPoints::from(trace.points.clone()),
                )
                .color(to_color32(trace.style.color))
                .width(trace.style.width);

                plot_ui.line(line);
            }
        });
    }

    /// Legend rows in trace order
    pub fn render_legend(&self, ui: &mut Ui) {
        if !self.show_legend {
            return;
        }

        for entry in &self.legend {
            ui.horizontal(|ui| {
                ui.colored_label(to_color32(entry.color), "■");
                ui.label(RichText::new(&entry.text).small());
            });
        }
    }
}

impl LineRenderer for PlotLines {
    fn start_line(&mut self, style: &LineStyle) {
        self.traces.retain(|t| t.style.signal_id != style.signal_id);
        self.traces.push(PlotTrace {
            style: style.clone(),
            points: Vec::new(),
        });
    }

    fn stop_line(&mut self, signal_id: SignalId) {
        self.traces.retain(|t| t.style.signal_id != signal_id);
    }

    fn draw_line(&mut self, signal_id: SignalId, points: &[[f64; 2]]) {
        if let Some(trace) = self
            .traces
            .iter_mut()
            .find(|t| t.style.signal_id == signal_id)
        {
            trace.points.clear();
            trace.points.extend_from_slice(points);
        }
    }

    fn set_legend(&mut self, entries: &[LegendEntry]) {
        self.legend = entries.to_vec();
    }
}
