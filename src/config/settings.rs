//! Tunable settings for the graph core
//!
//! These sections of [`AppConfig`](super::AppConfig) configure how traces are
//! buffered and scaled, how subscriptions are issued, and how long status
//! text stays on screen.
//!
//! # Main Types
//!
//! - [`GraphConfig`] - Window size, render scale, palette, legend template
//! - [`ScaleTuning`] - Auto-shrink hysteresis parameters
//! - [`SubscriptionConfig`] - Signal cap, replay range and interval
//! - [`StatusConfig`] - Status log rows, wrap width and hide delay
//!
//! # Auto-shrink
//!
//! A scale domain only ever grows while data is moving. Once the observed
//! range has stayed inside `shrink_start_threshold` of the domain width for
//! `shrink_delay_secs`, the domain eases toward the data at `shrink_rate`
//! per second until the data fills `shrink_stop_threshold` of it again.

use crate::error::{GridLinesError, Result};
use crate::types::LineColor;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default number of samples per trace
pub const DEFAULT_POINTS_IN_LINE: usize = 50;

/// Default half-height of the render space
pub const DEFAULT_GRAPH_SCALE: f64 = 5.0;

/// Default maximum number of subscribed signals to draw
pub const DEFAULT_MAX_SIGNALS: usize = 30;

/// Default legend template
pub const DEFAULT_LEGEND_FORMAT: &str = "{0:SignalTypeAcronym}: {0:Description} [{0:PointTag}]";

/// Which end of the window new samples enter from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ScrollDirection {
    /// Append on the right, evict the oldest sample on the left
    #[default]
    Left,
    /// Append on the left, evict the oldest sample on the right
    Right,
}

/// Trace buffering and render-space configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Samples kept per trace
    #[serde(default = "default_points_in_line")]
    pub points_in_line: usize,

    /// Scaled values span `[-graph_scale, graph_scale]`
    #[serde(default = "default_graph_scale")]
    pub graph_scale: f64,

    /// Horizontal extent of the render space (x spans `[-x_extent, x_extent]`)
    #[serde(default = "default_graph_scale")]
    pub x_extent: f64,

    /// Line width in pixels
    #[serde(default = "default_line_width")]
    pub line_width: f32,

    /// Depth spacing between traces for 3D renderers
    #[serde(default = "default_line_depth_offset")]
    pub line_depth_offset: f32,

    /// Scroll direction of every trace
    #[serde(default)]
    pub scroll_direction: ScrollDirection,

    /// Trace colors, assigned round-robin by line index
    #[serde(default = "LineColor::default_palette")]
    pub line_colors: Vec<LineColor>,

    /// Legend template, e.g. `{0:SignalTypeAcronym}: {0:Description}`
    #[serde(default = "default_legend_format")]
    pub legend_format: String,
}

fn default_points_in_line() -> usize {
    DEFAULT_POINTS_IN_LINE
}

fn default_graph_scale() -> f64 {
    DEFAULT_GRAPH_SCALE
}

fn default_line_width() -> f32 {
    4.0
}

fn default_line_depth_offset() -> f32 {
    0.75
}

fn default_legend_format() -> String {
    DEFAULT_LEGEND_FORMAT.to_string()
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            points_in_line: DEFAULT_POINTS_IN_LINE,
            graph_scale: DEFAULT_GRAPH_SCALE,
            x_extent: DEFAULT_GRAPH_SCALE,
            line_width: default_line_width(),
            line_depth_offset: default_line_depth_offset(),
            scroll_direction: ScrollDirection::Left,
            line_colors: LineColor::default_palette(),
            legend_format: default_legend_format(),
        }
    }
}

/// Auto-shrink hysteresis parameters
///
/// The defaults are empirically tuned; only their rough proportions matter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleTuning {
    /// Observed/domain width ratio at or below which the settle timer runs
    pub shrink_start_threshold: f64,
    /// Observed/domain width ratio at or above which shrinking halts
    pub shrink_stop_threshold: f64,
    /// Seconds the range must stay inside the start threshold before shrinking
    pub shrink_delay_secs: f64,
    /// Easing rate toward the observed range, per second
    pub shrink_rate: f64,
}

impl Default for ScaleTuning {
    fn default() -> Self {
        Self {
            shrink_start_threshold: 0.5,
            shrink_stop_threshold: 0.9,
            shrink_delay_secs: 1.0,
            shrink_rate: 5.0,
        }
    }
}

impl ScaleTuning {
    /// Check the thresholds describe a usable hysteresis band
    pub fn validate(&self) -> Result<()> {
        let start = self.shrink_start_threshold;
        let stop = self.shrink_stop_threshold;

        if !(start > 0.0 && start < stop && stop <= 1.0) {
            return Err(GridLinesError::Config(format!(
                "shrink thresholds must satisfy 0 < start < stop <= 1 (start = {}, stop = {})",
                start, stop
            )));
        }

        if !self.shrink_delay_secs.is_finite() || self.shrink_delay_secs < 0.0 {
            return Err(GridLinesError::Config(format!(
                "shrink delay must be a non-negative number of seconds (got {})",
                self.shrink_delay_secs
            )));
        }

        if !self.shrink_rate.is_finite() || self.shrink_rate <= 0.0 {
            return Err(GridLinesError::Config(format!(
                "shrink rate must be positive (got {})",
                self.shrink_rate
            )));
        }

        Ok(())
    }
}

/// Subscription request defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionConfig {
    /// Signals beyond this count are dropped (first N kept in provider order)
    #[serde(default = "default_max_signals")]
    pub max_signals: usize,

    /// Historical replay start time expression
    #[serde(default = "default_start_time")]
    pub start_time: String,

    /// Historical replay stop time expression
    #[serde(default = "default_stop_time")]
    pub stop_time: String,

    /// Historical replay processing interval in milliseconds (0 = as fast as possible)
    #[serde(default = "default_process_interval_ms")]
    pub process_interval_ms: u32,

    /// Connect automatically at startup
    #[serde(default)]
    pub auto_initiate_connection: bool,

    /// Issue the real-time subscription as soon as the connection is up
    #[serde(default = "default_true")]
    pub subscribe_on_connect: bool,
}

fn default_max_signals() -> usize {
    DEFAULT_MAX_SIGNALS
}

fn default_start_time() -> String {
    "*-5M".to_string()
}

fn default_stop_time() -> String {
    "*".to_string()
}

fn default_process_interval_ms() -> u32 {
    33
}

fn default_true() -> bool {
    true
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            max_signals: DEFAULT_MAX_SIGNALS,
            start_time: default_start_time(),
            stop_time: default_stop_time(),
            process_interval_ms: default_process_interval_ms(),
            auto_initiate_connection: false,
            subscribe_on_connect: true,
        }
    }
}

/// Status log presentation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusConfig {
    /// Number of visible status rows
    #[serde(default = "default_status_rows")]
    pub rows: usize,

    /// Hide the status block after this many milliseconds without updates
    #[serde(default = "default_display_interval_ms")]
    pub display_interval_ms: u64,

    /// Long messages are wrapped into segments of this many characters
    #[serde(default = "default_wrap_width")]
    pub wrap_width: usize,
}

fn default_status_rows() -> usize {
    4
}

fn default_display_interval_ms() -> u64 {
    10_000
}

fn default_wrap_width() -> usize {
    85
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            rows: default_status_rows(),
            display_interval_ms: default_display_interval_ms(),
            wrap_width: default_wrap_width(),
        }
    }
}

impl StatusConfig {
    /// Hide delay as a duration
    pub fn display_interval(&self) -> Duration {
        Duration::from_millis(self.display_interval_ms)
    }
}
