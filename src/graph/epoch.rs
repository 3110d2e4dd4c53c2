//! One subscription cycle's worth of graph state
//!
//! An [`Epoch`] maps every subscribed signal to its rolling buffer and the
//! buffer to its scale group. A new subscription builds a new epoch; the old
//! one is dropped whole, so nothing from a previous cycle can be written to.

use super::buffer::RollingBuffer;
use super::scale::ScaleGroup;
use crate::config::{GraphConfig, ScaleTuning};
use crate::error::Result;
use crate::types::{BufferId, EpochId, Measurement, SignalId};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct Epoch {
    id: EpochId,
    groups: Vec<ScaleGroup>,
    group_index: HashMap<String, usize>,
    /// signal -> (group position, line position within the group)
    routes: HashMap<SignalId, (usize, usize)>,
    order: Vec<SignalId>,
}

impl Epoch {
    /// An epoch with no signals
    pub fn empty(id: EpochId) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    pub fn id(&self) -> EpochId {
        self.id
    }

    /// Add a signal under the scale group `group_key`, creating the group on
    /// first use.
    ///
    /// Returns `false` when the signal is already part of this epoch.
    pub fn insert(
        &mut self,
        signal_id: SignalId,
        group_key: &str,
        auto_shrink: bool,
        graph: &GraphConfig,
        tuning: ScaleTuning,
    ) -> Result<bool> {
        if self.routes.contains_key(&signal_id) {
            return Ok(false);
        }

        let buffer = RollingBuffer::new(
            signal_id,
            self.order.len(),
            graph.points_in_line,
            graph.scroll_direction,
            graph.x_extent,
        )?;

        let group_pos = match self.group_index.get(group_key) {
            Some(&pos) => pos,
            None => {
                let pos = self.groups.len();
                self.groups.push(ScaleGroup::new(
                    group_key,
                    graph.graph_scale,
                    auto_shrink,
                    tuning,
                ));
                self.group_index.insert(group_key.to_string(), pos);
                pos
            }
        };

        let line_pos = self.groups[group_pos].add(buffer)?;
        self.routes.insert(signal_id, (group_pos, line_pos));
        self.order.push(signal_id);
        Ok(true)
    }

    /// Write one measurement into its buffer; unknown signals are ignored
    pub fn apply(&mut self, measurement: &Measurement) -> bool {
        let Some(&(group, line)) = self.routes.get(&measurement.signal_id) else {
            return false;
        };

        match self.groups[group].line_mut(line) {
            Some(buffer) => {
                buffer.update_value(measurement.value);
                true
            }
            None => false,
        }
    }

    /// Apply a batch in order; returns how many measurements matched
    pub fn apply_batch(&mut self, batch: &[Measurement]) -> usize {
        batch.iter().filter(|m| self.apply(m)).count()
    }

    /// Advance every scale group
    pub fn update(&mut self, dt: f64) {
        for group in &mut self.groups {
            group.update(dt);
        }
    }

    /// Buffer for a signal
    pub fn line(&self, signal_id: SignalId) -> Option<&RollingBuffer> {
        let &(group, line) = self.routes.get(&signal_id)?;
        self.groups[group].lines().get(line)
    }

    /// Buffers in subscription order
    pub fn lines(&self) -> impl Iterator<Item = &RollingBuffer> + '_ {
        self.order.iter().filter_map(move |id| self.line(*id))
    }

    /// Signals in subscription order
    pub fn signal_ids(&self) -> &[SignalId] {
        &self.order
    }

    pub fn buffer_ids(&self) -> Vec<BufferId> {
        self.lines().map(RollingBuffer::buffer_id).collect()
    }

    pub fn groups(&self) -> &[ScaleGroup] {
        &self.groups
    }

    pub fn group(&self, key: &str) -> Option<&ScaleGroup> {
        self.group_index.get(key).map(|&pos| &self.groups[pos])
    }

    /// Key of the group a signal belongs to
    pub fn group_key_of(&self, signal_id: SignalId) -> Option<&str> {
        let &(group, _) = self.routes.get(&signal_id)?;
        Some(self.groups[group].key())
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
