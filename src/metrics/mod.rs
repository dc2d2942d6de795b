//! Confusion bookkeeping and precision/recall reduction.
//!
//! - `CategoryCounters` - tp/fp/tn/fn for the leading and overall buckets
//! - `ThresholdAccumulator` - folds frame deltas for one IoU threshold
//! - `finalize` - precision and recall from a counters snapshot
//! - `PerformanceReport` - threshold-ordered results with JSON/CSV writers

mod accumulator;
mod counters;
mod evaluation;
mod report;

pub use accumulator::ThresholdAccumulator;
pub use counters::{CategoryCounters, ConfusionCounters, ConfusionDelta};
pub use evaluation::{finalize, CategoryMetrics, FinalizeOptions, ThresholdMetrics};
pub use report::{Bucket, PerformanceReport};
