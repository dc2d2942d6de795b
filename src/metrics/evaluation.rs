//! Precision and recall from accumulated counters.

use serde::{Deserialize, Serialize};

use super::counters::ConfusionCounters;

/// Options controlling how empty denominators are reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FinalizeOptions {
    /// Value used for precision when `tp + fp == 0`. `None` keeps it undefined.
    pub precision_default: Option<f64>,
}

/// Counters plus derived metrics for one bucket at one threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryMetrics {
    #[serde(flatten)]
    pub counters: ConfusionCounters,
    /// `tp / (tp + fp)`; `None` when nothing was detected and no default was
    /// requested.
    pub precision: Option<f64>,
    /// `tp / (tp + fn)`; 0 by convention when `tp + fn == 0`.
    pub recall: f64,
    /// Set when `recall` is the conventional 0 rather than a real ratio.
    #[serde(default)]
    pub recall_defaulted: bool,
}

impl CategoryMetrics {
    /// Precision if defined, otherwise `fallback`.
    pub fn precision_or(&self, fallback: f64) -> f64 {
        self.precision.unwrap_or(fallback)
    }

    /// Harmonic mean of precision and recall, when precision is defined.
    pub fn f1(&self) -> Option<f64> {
        let precision = self.precision?;
        if precision + self.recall > 0.0 {
            Some(2.0 * precision * self.recall / (precision + self.recall))
        } else {
            Some(0.0)
        }
    }
}

/// Finalized metrics for both buckets at one threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdMetrics {
    pub threshold: f64,
    pub frames_evaluated: usize,
    pub frames_rejected: usize,
    pub leading: CategoryMetrics,
    pub overall: CategoryMetrics,
}

/// Compute precision and recall from a counters snapshot.
///
/// Pure in `{tp, fp, fn}`. An empty precision denominator stays `None` unless
/// `options.precision_default` is set; an empty recall denominator yields 0
/// with `recall_defaulted` raised.
pub fn finalize(counters: &ConfusionCounters, options: &FinalizeOptions) -> CategoryMetrics {
    let detected = counters.tp + counters.fp;
    let precision = if detected > 0 {
        Some(counters.tp as f64 / detected as f64)
    } else {
        options.precision_default
    };

    let relevant = counters.tp + counters.fn_;
    let (recall, recall_defaulted) = if relevant > 0 {
        (counters.tp as f64 / relevant as f64, false)
    } else {
        (0.0, true)
    };

    CategoryMetrics {
        counters: *counters,
        precision,
        recall,
        recall_defaulted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_precision_recall() {
        let metrics = finalize(&ConfusionCounters::new(7, 3, 2), &FinalizeOptions::default());
        assert_relative_eq!(metrics.precision.unwrap(), 0.7, epsilon = 1e-12);
        assert_relative_eq!(metrics.recall, 7.0 / 9.0, epsilon = 1e-12);
        assert_eq!((metrics.recall * 1000.0).round() / 1000.0, 0.778);
        assert!(!metrics.recall_defaulted);
    }

    #[test]
    fn test_precision_undefined() {
        let metrics = finalize(&ConfusionCounters::new(0, 0, 4), &FinalizeOptions::default());
        assert_eq!(metrics.precision, None);
        assert_eq!(metrics.recall, 0.0);
        assert!(!metrics.recall_defaulted);
        assert_eq!(metrics.f1(), None);
    }

    #[test]
    fn test_precision_default_opt_in() {
        let options = FinalizeOptions {
            precision_default: Some(1.0),
        };
        let metrics = finalize(&ConfusionCounters::default(), &options);
        assert_eq!(metrics.precision, Some(1.0));
    }

    #[test]
    fn test_recall_defaulted() {
        let metrics = finalize(&ConfusionCounters::new(0, 5, 0), &FinalizeOptions::default());
        assert_eq!(metrics.precision, Some(0.0));
        assert_eq!(metrics.recall, 0.0);
        assert!(metrics.recall_defaulted);
    }

    #[test]
    fn test_pure_function_of_counts() {
        let mut counters = ConfusionCounters::new(7, 3, 2);
        let a = finalize(&counters, &FinalizeOptions::default());
        counters.tn = 100;
        let b = finalize(&counters, &FinalizeOptions::default());
        assert_eq!(a.precision, b.precision);
        assert_eq!(a.recall, b.recall);
    }

    #[test]
    fn test_f1() {
        let metrics = finalize(&ConfusionCounters::new(1, 1, 1), &FinalizeOptions::default());
        assert_relative_eq!(metrics.f1().unwrap(), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_undefined_precision_serializes_as_null() {
        let metrics = finalize(&ConfusionCounters::default(), &FinalizeOptions::default());
        let json = serde_json::to_value(metrics).unwrap();
        assert!(json["precision"].is_null());
        assert_eq!(json["recall"], 0.0);
        assert_eq!(json["recall_defaulted"], true);
        assert_eq!(json["tp"], 0);
    }
}
