//! Confusion counters for the two tracked buckets.

use std::iter::Sum;
use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

/// Confusion tallies for one bucket.
///
/// `tn` is part of the record for symmetry; nothing in the matcher ever
/// increments it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfusionCounters {
    pub tp: u64,
    pub fp: u64,
    pub tn: u64,
    #[serde(rename = "fn")]
    pub fn_: u64,
}

impl ConfusionCounters {
    pub fn new(tp: u64, fp: u64, fn_: u64) -> Self {
        Self { tp, fp, tn: 0, fn_ }
    }

    /// Total number of counted events.
    pub fn total(&self) -> u64 {
        self.tp + self.fp + self.tn + self.fn_
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl AddAssign for ConfusionCounters {
    fn add_assign(&mut self, rhs: Self) {
        self.tp += rhs.tp;
        self.fp += rhs.fp;
        self.tn += rhs.tn;
        self.fn_ += rhs.fn_;
    }
}

impl Add for ConfusionCounters {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

/// The two buckets every frame is scored into.
///
/// `overall` counts every vehicle; `leading` only counts events that involve
/// a box categorised as the leading vehicle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategoryCounters {
    pub leading: ConfusionCounters,
    pub overall: ConfusionCounters,
}

/// Additive contribution of a single frame.
pub type ConfusionDelta = CategoryCounters;

impl CategoryCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a benchmark box nobody detected.
    pub fn record_miss(&mut self, leading: bool) {
        self.overall.fn_ += 1;
        if leading {
            self.leading.fn_ += 1;
        }
    }

    /// Record a detection with no benchmark counterpart.
    pub fn record_false_alarm(&mut self, leading: bool) {
        self.overall.fp += 1;
        if leading {
            self.leading.fp += 1;
        }
    }

    /// Record a matched pair given the leading flag of each side.
    pub fn record_match(&mut self, benchmark_leading: bool, detected_leading: bool) {
        self.overall.tp += 1;
        match (benchmark_leading, detected_leading) {
            (true, true) => self.leading.tp += 1,
            // detector over-claims leading
            (false, true) => self.leading.fp += 1,
            // detector under-claims leading
            (true, false) => self.leading.fn_ += 1,
            (false, false) => {}
        }
    }
}

impl AddAssign for CategoryCounters {
    fn add_assign(&mut self, rhs: Self) {
        self.leading += rhs.leading;
        self.overall += rhs.overall;
    }
}

impl Add for CategoryCounters {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

impl Sum for CategoryCounters {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}
