//! Shared auto-scaling for traces of one classification
//!
//! All buffers in a [`ScaleGroup`] are drawn against the same `[min, max]`
//! domain so that traces of the same kind stay comparable.
//!
//! # Update Steps
//!
//! 1. Observe the finite `[display_min, display_max]` across every member
//! 2. Grow the retained domain to cover it (growth restarts the shrink timer)
//! 3. If auto-shrink is enabled and the observed range has stayed narrow for
//!    the settle delay, ease the domain back toward the observed range
//! 4. Map every sample into `[-graph_scale, graph_scale]`

use super::buffer::RollingBuffer;
use crate::config::ScaleTuning;
use crate::error::{GridLinesError, Result};

/// A set of rolling buffers sharing one display domain
#[derive(Debug)]
pub struct ScaleGroup {
    key: String,
    graph_scale: f64,
    auto_shrink: bool,
    tuning: ScaleTuning,
    lines: Vec<RollingBuffer>,
    scale_min: f64,
    scale_max: f64,
    shrink_timer: f64,
    updated: bool,
}

impl ScaleGroup {
    /// Create an empty group; the domain is undefined until data arrives
    pub fn new(key: impl Into<String>, graph_scale: f64, auto_shrink: bool, tuning: ScaleTuning) -> Self {
        Self {
            key: key.into(),
            graph_scale,
            auto_shrink,
            tuning,
            lines: Vec::new(),
            scale_min: f64::NAN,
            scale_max: f64::NAN,
            shrink_timer: tuning.shrink_delay_secs,
            updated: false,
        }
    }

    /// Attach a buffer; returns its position within the group.
    ///
    /// Membership is frozen once the group has been updated.
    pub fn add(&mut self, buffer: RollingBuffer) -> Result<usize> {
        if self.updated {
            return Err(GridLinesError::ScaleGroupFrozen(self.key.clone()));
        }
        self.lines.push(buffer);
        Ok(self.lines.len() - 1)
    }

    /// Advance the group by `dt` seconds and rescale every member
    pub fn update(&mut self, dt: f64) {
        self.updated = true;
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };

        let Some((display_min, display_max)) = self.observed_range() else {
            for line in &mut self.lines {
                line.write_scaled(|_| 0.0);
            }
            return;
        };

        if self.scale_min.is_nan() || display_min < self.scale_min {
            self.scale_min = display_min;
            self.shrink_timer = self.tuning.shrink_delay_secs;
        }

        if self.scale_max.is_nan() || display_max > self.scale_max {
            self.scale_max = display_max;
            self.shrink_timer = self.tuning.shrink_delay_secs;
        }

        if self.auto_shrink {
            self.shrink(display_min, display_max, dt);
        }

        let min = self.scale_min;
        let range = self.scale_max - self.scale_min;
        let graph_scale = self.graph_scale;

        if !range.is_finite() || range <= 0.0 {
            for line in &mut self.lines {
                line.write_scaled(|_| 0.0);
            }
            return;
        }

        for line in &mut self.lines {
            line.write_scaled(|v| {
                if v.is_nan() {
                    return 0.0;
                }
                let scaled = (v - min) * (2.0 * graph_scale) / range - graph_scale;
                if scaled.is_finite() {
                    scaled
                } else {
                    0.0
                }
            });
        }
    }

    fn shrink(&mut self, display_min: f64, display_max: f64, dt: f64) {
        let observed = display_max - display_min;
        let domain = self.scale_max - self.scale_min;

        if self.shrink_timer > 0.0 {
            if observed <= domain * self.tuning.shrink_start_threshold {
                self.shrink_timer -= dt;
            } else {
                self.shrink_timer = self.tuning.shrink_delay_secs;
            }
        }

        // Easing starts on the same tick the countdown runs out
        if self.shrink_timer > 0.0 {
            return;
        }

        let ease = (dt * self.tuning.shrink_rate).min(1.0);
        self.scale_min += (display_min - self.scale_min) * ease;
        self.scale_max -= (self.scale_max - display_max) * ease;

        if (self.scale_max - self.scale_min) * self.tuning.shrink_stop_threshold <= observed {
            self.shrink_timer = self.tuning.shrink_delay_secs;
        }
    }

    /// Finite `(min, max)` across every member, or `None` without data
    pub fn observed_range(&self) -> Option<(f64, f64)> {
        self.lines
            .iter()
            .filter_map(RollingBuffer::observed_range)
            .reduce(|(lo, hi), (l, h)| (lo.min(l), hi.max(h)))
    }

    /// Retained display domain, `None` until the first data
    pub fn domain(&self) -> Option<(f64, f64)> {
        if self.scale_min.is_nan() || self.scale_max.is_nan() {
            None
        } else {
            Some((self.scale_min, self.scale_max))
        }
    }

    /// Seconds of settled data left before the domain starts shrinking
    pub fn time_until_shrink(&self) -> f64 {
        self.shrink_timer.max(0.0)
    }

    /// Whether the domain is currently easing toward the data
    pub fn is_shrinking(&self) -> bool {
        self.auto_shrink && self.shrink_timer <= 0.0
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn auto_shrink(&self) -> bool {
        self.auto_shrink
    }

    pub fn lines(&self) -> &[RollingBuffer] {
        &self.lines
    }

    pub fn line_mut(&mut self, position: usize) -> Option<&mut RollingBuffer> {
        self.lines.get_mut(position)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
