//! Fixed-window rolling sample buffer for one signal

use crate::config::ScrollDirection;
use crate::error::{GridLinesError, Result};
use crate::types::{BufferId, SignalId, ABSENT};

/// Sliding window of the most recent samples of one signal
///
/// The window length never changes. Slots that have not received data yet
/// hold [`ABSENT`]. The parallel render-space points share the window's x
/// positions; their y values are written by the owning
/// [`ScaleGroup`](super::ScaleGroup) on each update.
#[derive(Debug, Clone)]
pub struct RollingBuffer {
    buffer_id: BufferId,
    signal_id: SignalId,
    index: usize,
    direction: ScrollDirection,
    values: Vec<f64>,
    points: Vec<[f64; 2]>,
}

impl RollingBuffer {
    /// Create an empty buffer spanning `[-x_extent, x_extent]` horizontally
    pub fn new(
        signal_id: SignalId,
        index: usize,
        window: usize,
        direction: ScrollDirection,
        x_extent: f64,
    ) -> Result<Self> {
        if window < 1 {
            return Err(GridLinesError::Config(format!(
                "Rolling window for {} must hold at least one sample",
                signal_id
            )));
        }

        let points = (0..window)
            .map(|i| [lerp(-x_extent, x_extent, i as f64 / window as f64), 0.0])
            .collect();

        Ok(Self {
            buffer_id: BufferId::next(),
            signal_id,
            index,
            direction,
            values: vec![ABSENT; window],
            points,
        })
    }

    /// Shift the window by one slot and write `value` into the freed end.
    ///
    /// Non-finite input is stored as an absent sample.
    pub fn update_value(&mut self, value: f64) {
        let value = if value.is_finite() { value } else { ABSENT };
        let last = self.values.len() - 1;

        match self.direction {
            ScrollDirection::Left => {
                self.values.rotate_left(1);
                self.values[last] = value;
            }
            ScrollDirection::Right => {
                self.values.rotate_right(1);
                self.values[0] = value;
            }
        }
    }

    /// Current window, oldest-to-newest in scroll order
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Render-space points as of the last scale update
    pub fn points(&self) -> &[[f64; 2]] {
        &self.points
    }

    /// Most recently written sample (may be absent)
    pub fn latest(&self) -> f64 {
        match self.direction {
            ScrollDirection::Left => self.values[self.values.len() - 1],
            ScrollDirection::Right => self.values[0],
        }
    }

    pub fn signal_id(&self) -> SignalId {
        self.signal_id
    }

    /// Line index within the epoch (drives color and depth)
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn buffer_id(&self) -> BufferId {
        self.buffer_id
    }

    pub fn direction(&self) -> ScrollDirection {
        self.direction
    }

    /// Window length
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no slot holds a sample yet
    pub fn is_empty(&self) -> bool {
        self.values.iter().all(|v| v.is_nan())
    }

    /// Finite `(min, max)` over the window, or `None` when every slot is absent
    pub fn observed_range(&self) -> Option<(f64, f64)> {
        self.values
            .iter()
            .filter(|v| !v.is_nan())
            .fold(None, |acc, &v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    pub(crate) fn write_scaled(&mut self, map: impl Fn(f64) -> f64) {
        for (point, value) in self.points.iter_mut().zip(self.values.iter()) {
            point[1] = map(*value);
        }
    }
}

fn lerp(from: f64, to: f64, t: f64) -> f64 {
    from + (to - from) * t
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn buffer(window: usize, direction: ScrollDirection) -> RollingBuffer {
        RollingBuffer::new(SignalId::from_u128(1), 0, window, direction, 5.0).unwrap()
    }

    #[test]
    fn test_evict_left_keeps_newest() {
        let mut buf = buffer(4, ScrollDirection::Left);
        for v in 1..=5 {
            buf.update_value(v as f64);
        }
        assert_eq!(buf.values(), &[2.0, 3.0, 4.0, 5.0]);
        assert_eq!(buf.latest(), 5.0);
    }

    #[test]
    fn test_evict_right_appends_at_front() {
        let mut buf = buffer(3, ScrollDirection::Right);
        buf.update_value(1.0);
        buf.update_value(2.0);

        let values = buf.values();
        assert_eq!(values[0], 2.0);
        assert_eq!(values[1], 1.0);
        assert!(values[2].is_nan());
        assert_eq!(buf.latest(), 2.0);
    }

    #[test]
    fn test_new_buffer_is_absent() {
        let buf = buffer(5, ScrollDirection::Left);
        assert!(buf.is_empty());
        assert_eq!(buf.observed_range(), None);
        assert_eq!(buf.len(), 5);
    }

    #[test]
    fn test_zero_window_rejected() {
        let result = RollingBuffer::new(SignalId::from_u128(1), 0, 0, ScrollDirection::Left, 5.0);
        assert!(matches!(result, Err(GridLinesError::Config(_))));
    }

    #[test]
    fn test_point_x_spans_extent() {
        let buf = buffer(4, ScrollDirection::Left);
        let xs: Vec<f64> = buf.points().iter().map(|p| p[0]).collect();
        assert_eq!(xs, vec![-5.0, -2.5, 0.0, 2.5]);
    }

    #[test]
    fn test_non_finite_stored_as_absent() {
        let mut buf = buffer(2, ScrollDirection::Left);
        buf.update_value(f64::INFINITY);
        buf.update_value(3.0);
        assert!(buf.values()[0].is_nan());
        assert_eq!(buf.observed_range(), Some((3.0, 3.0)));
    }

    #[test]
    fn test_buffer_ids_are_unique() {
        let a = buffer(2, ScrollDirection::Left);
        let b = buffer(2, ScrollDirection::Left);
        assert_ne!(a.buffer_id(), b.buffer_id());
    }

    proptest! {
        #[test]
        fn length_never_changes(
            window in 1usize..64,
            values in prop::collection::vec(-1e6f64..1e6, 0..200),
            right in any::<bool>(),
        ) {
            let direction = if right { ScrollDirection::Right } else { ScrollDirection::Left };
            let mut buf = buffer(window, direction);
            for v in &values {
                buf.update_value(*v);
                prop_assert_eq!(buf.values().len(), window);
                prop_assert_eq!(buf.points().len(), window);
            }
        }

        #[test]
        fn window_holds_last_n(values in prop::collection::vec(-1e3f64..1e3, 1..100)) {
            let window = 8;
            let mut buf = buffer(window, ScrollDirection::Left);
            for v in &values {
                buf.update_value(*v);
            }
            let tail = &values[values.len().saturating_sub(window)..];
            let filled = &buf.values()[window - tail.len()..];
            prop_assert_eq!(filled, tail);
        }
    }
}
