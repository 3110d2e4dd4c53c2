//! Rolling status text shown over the graph
//!
//! Each message takes one row, and older rows roll off the top once the row
//! limit is reached. Long messages are wrapped into fixed-width segments only
//! when displayed, so a single long error never evicts earlier messages. The
//! block hides itself once no message has arrived for the display interval.
//! Every message is also emitted as a tracing event.

use crate::config::StatusConfig;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Prefix marking error messages
pub const ERROR_PREFIX: &str = "ERROR: ";

/// One message as displayed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRow {
    /// Wrapped segments, at most `wrap_width` characters each
    pub segments: Vec<String>,
    pub is_error: bool,
}

#[derive(Debug, Clone)]
pub struct StatusLog {
    rows: VecDeque<String>,
    capacity: usize,
    wrap_width: usize,
    display_interval: Duration,
    last_update: Option<Instant>,
}

impl Default for StatusLog {
    fn default() -> Self {
        Self::new(&StatusConfig::default())
    }
}

impl StatusLog {
    pub fn new(config: &StatusConfig) -> Self {
        Self {
            rows: VecDeque::with_capacity(config.rows),
            capacity: config.rows.max(1),
            wrap_width: config.wrap_width.max(1),
            display_interval: config.display_interval(),
            last_update: None,
        }
    }

    /// Append an informational message
    pub fn push(&mut self, message: impl AsRef<str>) {
        self.push_at(message, Instant::now());
    }

    /// Append an error message (prefixed with `ERROR: `)
    pub fn push_error(&mut self, message: impl AsRef<str>) {
        self.push_at(format!("{}{}", ERROR_PREFIX, message.as_ref()), Instant::now());
    }

    /// Append a message as if it arrived at `now`
    pub fn push_at(&mut self, message: impl AsRef<str>, now: Instant) {
        let message = message.as_ref();

        if let Some(error) = message.strip_prefix(ERROR_PREFIX) {
            tracing::warn!(target: "gridlines_rs::status", "{}", error);
        } else {
            tracing::info!(target: "gridlines_rs::status", "{}", message);
        }

        if self.rows.len() == self.capacity {
            self.rows.pop_front();
        }
        self.rows.push_back(message.to_string());

        self.last_update = Some(now);
    }

    /// Whether the block should be drawn
    pub fn is_visible(&self) -> bool {
        self.is_visible_at(Instant::now())
    }

    pub fn is_visible_at(&self, now: Instant) -> bool {
        match self.last_update {
            Some(at) => now.saturating_duration_since(at) < self.display_interval,
            None => false,
        }
    }

    /// Stored messages, oldest first
    pub fn rows(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(String::as_str)
    }

    /// Rows wrapped for display, oldest first
    pub fn display_rows(&self) -> Vec<StatusRow> {
        self.rows
            .iter()
            .map(|row| StatusRow {
                segments: row
                    .lines()
                    .flat_map(|line| wrap(line, self.wrap_width))
                    .collect(),
                is_error: row.starts_with(ERROR_PREFIX),
            })
            .collect()
    }

    /// Wrapped rows joined with newlines
    pub fn text(&self) -> String {
        self.display_rows()
            .iter()
            .flat_map(|row| row.segments.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Most recent row
    pub fn latest(&self) -> Option<&str> {
        self.rows.back().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.rows.clear();
        self.last_update = None;
    }
}

fn wrap(line: &str, width: usize) -> Vec<String> {
    if line.is_empty() {
        return vec![String::new()];
    }

    let chars: Vec<char> = line.chars().collect();
    chars
        .chunks(width)
        .map(|chunk| chunk.iter().collect())
        .collect()
}
