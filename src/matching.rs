//! Benchmark-to-detection matching for a single frame.

use std::fmt;
use std::str::FromStr;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::annotation::{Annotation, NULL_LABEL};
use crate::geometry::{iou_matrix, BoundingBox};
use crate::metrics::ConfusionDelta;
use crate::Error;

/// How benchmark and detected boxes are paired once their IoU passes the
/// threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchingStrategy {
    /// Every qualifying pair counts as a match, so a box may match several
    /// partners and `tp` can exceed the number of boxes.
    #[default]
    AllPairs,
    /// One-to-one assignment, highest IoU first.
    Greedy,
}

impl fmt::Display for MatchingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchingStrategy::AllPairs => write!(f, "all_pairs"),
            MatchingStrategy::Greedy => write!(f, "greedy"),
        }
    }
}

impl FromStr for MatchingStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "all_pairs" => Ok(MatchingStrategy::AllPairs),
            "greedy" => Ok(MatchingStrategy::Greedy),
            other => Err(Error::InvalidConfig(format!(
                "unknown matching strategy '{}' (expected 'all_pairs' or 'greedy')",
                other
            ))),
        }
    }
}

/// Scores one frame at a fixed IoU threshold.
#[derive(Debug, Clone)]
pub struct FrameMatcher {
    pub threshold: f64,
    pub strategy: MatchingStrategy,
    /// Detected annotations carrying this label are dropped before matching.
    pub null_label: String,
}

impl FrameMatcher {
    pub fn new(threshold: f64, strategy: MatchingStrategy) -> Self {
        Self {
            threshold,
            strategy,
            null_label: NULL_LABEL.to_string(),
        }
    }

    pub fn with_null_label(mut self, null_label: impl Into<String>) -> Self {
        self.null_label = null_label.into();
        self
    }

    /// Compute the confusion delta contributed by one frame.
    pub fn match_frame(&self, benchmark: &[Annotation], detected: &[Annotation]) -> ConfusionDelta {
        let detected: Vec<&Annotation> = detected
            .iter()
            .filter(|a| a.label != self.null_label)
            .collect();
        let benchmark: Vec<&Annotation> = benchmark.iter().collect();

        let mut delta = ConfusionDelta::default();

        // No detections: every benchmark box was missed
        if detected.is_empty() {
            for bbx in &benchmark {
                delta.record_miss(bbx.is_leading());
            }
            return delta;
        }

        // No benchmark: every detection is a false alarm
        if benchmark.is_empty() {
            for bbx in &detected {
                delta.record_false_alarm(bbx.is_leading());
            }
            return delta;
        }

        let benchmark_boxes: Vec<BoundingBox> = benchmark.iter().map(|a| a.bbox).collect();
        let detected_boxes: Vec<BoundingBox> = detected.iter().map(|a| a.bbox).collect();
        let ious = iou_matrix(&benchmark_boxes, &detected_boxes);

        let (matched_bench, matched_det) = match self.strategy {
            MatchingStrategy::AllPairs => match_all_pairs(&ious, self.threshold),
            MatchingStrategy::Greedy => match_greedy(&ious, self.threshold),
        };

        for (&i, &j) in matched_bench.iter().zip(&matched_det) {
            delta.record_match(benchmark[i].is_leading(), detected[j].is_leading());
        }

        for i in get_unmatched(benchmark.len(), &matched_bench) {
            delta.record_miss(benchmark[i].is_leading());
        }
        for j in get_unmatched(detected.len(), &matched_det) {
            delta.record_false_alarm(detected[j].is_leading());
        }

        delta
    }
}

/// Score one frame with the default placeholder label and all-pairs matching.
pub fn match_frame(
    benchmark: &[Annotation],
    detected: &[Annotation],
    threshold: f64,
) -> ConfusionDelta {
    FrameMatcher::new(threshold, MatchingStrategy::AllPairs).match_frame(benchmark, detected)
}

/// Every (row, col) pair whose IoU reaches `threshold`, in row-major order.
///
/// # Returns
/// Tuple of (matched_row_indices, matched_col_indices) where entry i is one
/// pair. An index may appear more than once.
pub fn match_all_pairs(iou: &DMatrix<f64>, threshold: f64) -> (Vec<usize>, Vec<usize>) {
    let mut rows = Vec::new();
    let mut cols = Vec::new();
    for i in 0..iou.nrows() {
        for j in 0..iou.ncols() {
            if iou[(i, j)] >= threshold {
                rows.push(i);
                cols.push(j);
            }
        }
    }
    (rows, cols)
}

/// One-to-one matching, taking the highest remaining IoU first.
///
/// Ties are broken by row, then column, so the result is deterministic.
///
/// # Returns
/// Tuple of (matched_row_indices, matched_col_indices) in assignment order.
pub fn match_greedy(iou: &DMatrix<f64>, threshold: f64) -> (Vec<usize>, Vec<usize>) {
    let n_rows = iou.nrows();
    let n_cols = iou.ncols();

    if n_rows == 0 || n_cols == 0 {
        return (Vec::new(), Vec::new());
    }

    // Collect all valid (iou, row, col) pairs
    let mut pairs: Vec<(f64, usize, usize)> = Vec::new();
    for i in 0..n_rows {
        for j in 0..n_cols {
            let value = iou[(i, j)];
            if value.is_finite() && value >= threshold {
                pairs.push((value, i, j));
            }
        }
    }

    // Highest IoU first; stable sort keeps row-major order among ties
    pairs.sort_by(|a, b| b.0.total_cmp(&a.0));

    let mut used_rows = vec![false; n_rows];
    let mut used_cols = vec![false; n_cols];

    let mut matched_rows = Vec::new();
    let mut matched_cols = Vec::new();

    for (_iou, row, col) in pairs {
        if used_rows[row] || used_cols[col] {
            continue;
        }

        matched_rows.push(row);
        matched_cols.push(col);
        used_rows[row] = true;
        used_cols[col] = true;
    }

    (matched_rows, matched_cols)
}

/// Get unmatched indices from a match result.
pub fn get_unmatched(total: usize, matched: &[usize]) -> Vec<usize> {
    let mut is_matched = vec![false; total];
    for &idx in matched {
        is_matched[idx] = true;
    }
    (0..total).filter(|&i| !is_matched[i]).collect()
}
