// Ring buffer of recent scalar values

use std::collections::VecDeque;

/// Holds the `capacity` most recently pushed values in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSeries {
    capacity: usize,
    values: VecDeque<f64>,
}

impl MetricSeries {
    /// # Panics
    /// If `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "MetricSeries capacity must be > 0");
        Self {
            capacity,
            values: VecDeque::with_capacity(capacity),
        }
    }

    pub fn filled(capacity: usize, value: f64) -> Self {
        let mut s = Self::new(capacity);
        s.values.extend(std::iter::repeat_n(value, capacity));
        s
    }

    /// Appends `value`, evicting exactly the oldest element when full.
    pub fn push(&mut self, value: f64) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.values.len() == self.capacity
    }

    pub fn latest(&self) -> Option<f64> {
        self.values.back().copied()
    }

    pub fn max(&self) -> Option<f64> {
        self.values.iter().copied().reduce(f64::max)
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.values.iter().copied().collect()
    }
}
