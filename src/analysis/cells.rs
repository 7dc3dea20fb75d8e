//! Running statistics cells.
//!
//! A cell accumulates a minimum, maximum, running sum and sample count. The
//! mean is kept in its own field and only exists after [`StatCell::finalize`],
//! so finalizing is repeatable and an empty cell never reports a value.

use serde::Serialize;

/// Numeric sample type a cell can accumulate
pub trait Sample: Copy + Default + PartialOrd + Serialize {
    fn to_f64(self) -> f64;

    /// Running-sum addition
    fn accumulate(self, other: Self) -> Self;
}

impl Sample for f64 {
    #[inline]
    fn to_f64(self) -> f64 {
        self
    }

    #[inline]
    fn accumulate(self, other: Self) -> Self {
        self + other
    }
}

impl Sample for i64 {
    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }

    /// Saturates at the `i64` bounds
    #[inline]
    fn accumulate(self, other: Self) -> Self {
        self.saturating_add(other)
    }
}

/// Min/max/sum/count accumulator with a separately computed mean
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct StatCell<T> {
    low: Option<T>,
    high: Option<T>,
    sum: T,
    count: u64,
    mean: Option<f64>,
}

/// Cell for continuous readings
pub type FloatCell = StatCell<f64>;

/// Cell for integer readings such as counter deltas
pub type IntCell = StatCell<i64>;

impl<T: Sample> StatCell<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one observation
    pub fn record(&mut self, value: T) {
        if self.low.is_none_or(|low| value < low) {
            self.low = Some(value);
        }
        if self.high.is_none_or(|high| value > high) {
            self.high = Some(value);
        }
        self.sum = self.sum.accumulate(value);
        self.count += 1;
        self.mean = None;
    }

    /// Compute the mean from the accumulated sum
    pub fn finalize(&mut self) {
        self.mean = (self.count > 0).then(|| self.sum.to_f64() / self.count as f64);
    }

    /// Fold another cell's observations into this one
    ///
    /// The result needs finalizing again.
    pub fn merge(&mut self, other: &Self) {
        self.low = match (self.low, other.low) {
            (Some(a), Some(b)) => Some(if b < a { b } else { a }),
            (a, b) => a.or(b),
        };
        self.high = match (self.high, other.high) {
            (Some(a), Some(b)) => Some(if b > a { b } else { a }),
            (a, b) => a.or(b),
        };
        self.sum = self.sum.accumulate(other.sum);
        self.count += other.count;
        self.mean = None;
    }

    /// Smallest observation, if any
    pub fn low(&self) -> Option<T> {
        self.low
    }

    /// Largest observation, if any
    pub fn high(&self) -> Option<T> {
        self.high
    }

    /// Running total of all observations
    pub fn sum(&self) -> T {
        self.sum
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Mean of all observations, available after finalizing
    pub fn mean(&self) -> Option<f64> {
        self.mean
    }

    /// Whether the cell has enough samples to be trusted
    pub fn is_reliable(&self, min_counts: u64) -> bool {
        self.count > 0 && self.count >= min_counts
    }
}
