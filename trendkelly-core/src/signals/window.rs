//! Bounded boolean windows used by the combiner.
//!
//! `RollingAny` answers "was any of the last N samples true" in O(1) by keeping a
//! running count of true entries. `EdgeWindow` holds the last two samples for
//! rising-edge detection.

use std::collections::VecDeque;

/// Capacity of the Hull "recently long" window.
pub const HULL_WINDOW_CAPACITY: usize = 500;

/// Fixed-capacity FIFO of booleans with an incremental true count.
#[derive(Debug, Clone)]
pub struct RollingAny {
    capacity: usize,
    buf: VecDeque<bool>,
    count_true: usize,
}

impl RollingAny {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 1, "window capacity must be >= 1");
        Self {
            capacity,
            buf: VecDeque::with_capacity(capacity),
            count_true: 0,
        }
    }

    /// Append a sample, evicting the oldest one at capacity.
    pub fn push(&mut self, value: bool) {
        if self.buf.len() == self.capacity {
            if let Some(true) = self.buf.pop_front() {
                self.count_true -= 1;
            }
        }
        self.buf.push_back(value);
        if value {
            self.count_true += 1;
        }
    }

    /// True iff at least one retained sample is true.
    pub fn any(&self) -> bool {
        self.count_true > 0
    }

    pub fn count_true(&self) -> usize {
        self.count_true
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Last two boolean samples; starts as `[false, false]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EdgeWindow {
    previous: bool,
    current: bool,
}

impl EdgeWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a sample and report whether it is a rising edge (false → true).
    pub fn push(&mut self, value: bool) -> bool {
        self.previous = self.current;
        self.current = value;
        self.is_rising()
    }

    pub fn is_rising(&self) -> bool {
        self.current && !self.previous
    }
}
