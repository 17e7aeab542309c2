//! Iteration counter for one loop level.
//!
//! The fields are atomics so a callback can keep an `Arc<Counter>` to read the
//! current iteration, or truncate the level with [`Counter::skip_to_max`],
//! while the scheduler owns the loop.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

/// Current value, upper bound and increment of a loop level.
///
/// `max <= 0` means unbounded: the level only ends through an is-done callback.
#[derive(Debug)]
pub struct Counter {
    cur: AtomicI64,
    max: AtomicI64,
    inc: AtomicI64,
}

impl Counter {
    /// Create a counter at zero with the given bound and an increment of 1
    pub fn new(max: i64) -> Self {
        Self::with_increment(max, 1)
    }

    /// Create a counter at zero with the given bound and increment
    pub fn with_increment(max: i64, inc: i64) -> Self {
        Self {
            cur: AtomicI64::new(0),
            max: AtomicI64::new(max),
            inc: AtomicI64::new(inc),
        }
    }

    pub fn cur(&self) -> i64 {
        self.cur.load(Ordering::Relaxed)
    }

    pub fn max(&self) -> i64 {
        self.max.load(Ordering::Relaxed)
    }

    pub fn inc(&self) -> i64 {
        self.inc.load(Ordering::Relaxed)
    }

    /// Add `inc` to `cur`. Does not look at `max`.
    pub fn increment(&self) {
        self.cur.fetch_add(self.inc(), Ordering::Relaxed);
    }

    /// True if the counter is at or over `max` (only when `max > 0`).
    pub fn is_over_max(&self) -> bool {
        let max = self.max();
        max > 0 && self.cur() >= max
    }

    /// Jump to `max`, skipping the remaining iterations of this level.
    pub fn skip_to_max(&self) {
        self.cur.store(self.max(), Ordering::Relaxed);
    }

    /// Set `cur`, returning whether the value differed from the current one.
    pub fn set(&self, cur: i64) -> bool {
        self.cur.swap(cur, Ordering::Relaxed) != cur
    }

    pub fn reset(&self) {
        self.cur.store(0, Ordering::Relaxed);
    }

    pub fn set_max(&self, max: i64) {
        self.max.store(max, Ordering::Relaxed);
    }

    pub fn set_max_inc(&self, max: i64, inc: i64) {
        self.max.store(max, Ordering::Relaxed);
        self.inc.store(inc, Ordering::Relaxed);
    }

    pub fn set_cur_max(&self, cur: i64, max: i64) {
        self.cur.store(cur, Ordering::Relaxed);
        self.max.store(max, Ordering::Relaxed);
    }

    /// Set `cur` and make `max` be `cur + n`, i.e. run `n` more iterations.
    pub fn set_cur_max_plus_n(&self, cur: i64, n: i64) {
        self.set_cur_max(cur, cur + n);
    }
}

impl Default for Counter {
    fn default() -> Self {
        Self::new(0)
    }
}

impl fmt::Display for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.max() > 0 {
            write!(f, "{}/{}", self.cur(), self.max())
        } else {
            write!(f, "{}/-", self.cur())
        }
    }
}
