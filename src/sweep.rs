//! IoU threshold sweep: one independent accumulator per threshold.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::annotation::Frame;
use crate::config::EvaluationConfig;
use crate::matching::FrameMatcher;
use crate::metrics::{PerformanceReport, ThresholdAccumulator, ThresholdMetrics};
use crate::{Error, Result};

/// Thresholds used when none are configured: 0.05 to 0.95 in steps of 0.05,
/// then 0.999.
pub const DEFAULT_THRESHOLDS: [f64; 20] = [
    0.05, 0.1, 0.15, 0.2, 0.25, 0.3, 0.35, 0.4, 0.45, 0.5, 0.55, 0.6, 0.65, 0.7, 0.75, 0.8, 0.85,
    0.9, 0.95, 0.999,
];

/// Ordered, de-duplicated set of IoU thresholds in `(0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct ThresholdSweep {
    thresholds: Vec<f64>,
}

impl ThresholdSweep {
    /// Validate and sort the thresholds.
    pub fn new(mut thresholds: Vec<f64>) -> Result<Self> {
        if thresholds.is_empty() {
            return Err(Error::InvalidConfig(
                "threshold sweep must not be empty".to_string(),
            ));
        }
        if let Some(&bad) = thresholds.iter().find(|&&t| !(t > 0.0 && t <= 1.0)) {
            return Err(Error::InvalidThreshold(bad));
        }

        thresholds.sort_by(f64::total_cmp);
        thresholds.dedup();
        Ok(Self { thresholds })
    }

    /// Parse a comma-separated list such as `"0.5,0.75"`.
    pub fn parse(list: &str) -> Result<Self> {
        let thresholds = list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<f64>().map_err(|e| {
                    Error::InvalidConfig(format!("invalid threshold '{}': {}", s, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(thresholds)
    }

    pub fn thresholds(&self) -> &[f64] {
        &self.thresholds
    }

    pub fn len(&self) -> usize {
        self.thresholds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.thresholds.is_empty()
    }
}

impl Default for ThresholdSweep {
    fn default() -> Self {
        Self {
            thresholds: DEFAULT_THRESHOLDS.to_vec(),
        }
    }
}

impl TryFrom<Vec<f64>> for ThresholdSweep {
    type Error = Error;

    fn try_from(thresholds: Vec<f64>) -> Result<Self> {
        Self::new(thresholds)
    }
}

impl From<ThresholdSweep> for Vec<f64> {
    fn from(sweep: ThresholdSweep) -> Self {
        sweep.thresholds
    }
}

/// Run the full frame set once per threshold and reduce to a report.
///
/// Thresholds are independent, so with `config.parallel` each one runs on the
/// rayon pool. Malformed frames are skipped per threshold and logged.
pub fn evaluate(frames: &[Frame], config: &EvaluationConfig) -> Result<PerformanceReport> {
    config.validate()?;

    let run = |&threshold: &f64| evaluate_threshold(frames, threshold, config);
    let thresholds = config.thresholds.thresholds();

    let entries: Vec<ThresholdMetrics> = if config.parallel {
        thresholds.par_iter().map(run).collect()
    } else {
        thresholds.iter().map(run).collect()
    };

    log::info!(
        "evaluated {} frames at {} IoU thresholds ({} matching)",
        frames.len(),
        entries.len(),
        config.matching
    );
    Ok(PerformanceReport::new(entries))
}

/// Evaluate every frame at one threshold.
pub fn evaluate_threshold(
    frames: &[Frame],
    threshold: f64,
    config: &EvaluationConfig,
) -> ThresholdMetrics {
    let matcher =
        FrameMatcher::new(threshold, config.matching).with_null_label(config.null_label.clone());
    let mut accumulator = ThresholdAccumulator::new(matcher);
    accumulator.update_all(frames);
    accumulator.finish(&config.finalize_options())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{Annotation, LEADING, SIDEWAYS};
    use crate::geometry::BoundingBox;
    use crate::matching::MatchingStrategy;

    fn anno(x: f64, y: f64, w: f64, h: f64, category: &str) -> Annotation {
        Annotation::new(BoundingBox::new(x, y, w, h).unwrap(), "car", category)
    }

    fn frames() -> Vec<Frame> {
        vec![
            Frame::new(
                "0001.jpg",
                vec![anno(300.0, 200.0, 50.0, 40.0, LEADING), anno(0.0, 200.0, 80.0, 60.0, SIDEWAYS)],
                vec![anno(302.0, 198.0, 50.0, 44.0, LEADING), anno(10.0, 210.0, 80.0, 60.0, SIDEWAYS)],
            ),
            Frame::new("0002.jpg", vec![anno(310.0, 220.0, 30.0, 30.0, LEADING)], vec![]),
            Frame::new("0003.jpg", vec![], vec![anno(500.0, 100.0, 40.0, 40.0, SIDEWAYS)]),
        ]
    }

    #[test]
    fn test_sweep_sorted_and_deduplicated() {
        let sweep = ThresholdSweep::new(vec![0.75, 0.5, 0.75, 1.0]).unwrap();
        assert_eq!(sweep.thresholds(), &[0.5, 0.75, 1.0]);
    }

    #[test]
    fn test_sweep_rejects_out_of_range() {
        assert!(matches!(ThresholdSweep::new(vec![0.0]), Err(Error::InvalidThreshold(_))));
        assert!(matches!(ThresholdSweep::new(vec![0.5, 1.2]), Err(Error::InvalidThreshold(t)) if t == 1.2));
        assert!(ThresholdSweep::new(vec![f64::NAN]).is_err());
        assert!(ThresholdSweep::new(vec![]).is_err());
    }

    #[test]
    fn test_sweep_parse() {
        let sweep = ThresholdSweep::parse("0.5, 0.25,0.9").unwrap();
        assert_eq!(sweep.thresholds(), &[0.25, 0.5, 0.9]);
        assert!(ThresholdSweep::parse("0.5,abc").is_err());
    }

    #[test]
    fn test_default_sweep() {
        let sweep = ThresholdSweep::default();
        assert_eq!(sweep.len(), 20);
        assert_eq!(sweep.thresholds()[0], 0.05);
        assert_eq!(sweep.thresholds()[19], 0.999);
        assert_eq!(ThresholdSweep::new(DEFAULT_THRESHOLDS.to_vec()).unwrap(), sweep);
    }

    #[test]
    fn test_sweep_deserialize_validates() {
        let sweep: ThresholdSweep = serde_json::from_str("[0.9, 0.1]").unwrap();
        assert_eq!(sweep.thresholds(), &[0.1, 0.9]);
        assert!(serde_json::from_str::<ThresholdSweep>("[1.5]").is_err());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let frames = frames();
        let parallel = EvaluationConfig::default();
        let sequential = EvaluationConfig {
            parallel: false,
            ..EvaluationConfig::default()
        };

        let a = evaluate(&frames, &parallel).unwrap();
        let b = evaluate(&frames, &sequential).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 20);
    }

    #[test]
    fn test_thresholds_independent() {
        let frames = frames();
        let full = evaluate(&frames, &EvaluationConfig::default()).unwrap();

        let single = EvaluationConfig {
            thresholds: ThresholdSweep::new(vec![0.5]).unwrap(),
            ..EvaluationConfig::default()
        };
        let alone = evaluate(&frames, &single).unwrap();

        assert_eq!(full.get(0.5), alone.get(0.5));
    }

    #[test]
    fn test_evaluate_counts() {
        let config = EvaluationConfig {
            thresholds: ThresholdSweep::new(vec![0.5, 0.999]).unwrap(),
            matching: MatchingStrategy::Greedy,
            ..EvaluationConfig::default()
        };
        let report = evaluate(&frames(), &config).unwrap();

        let low = report.get(0.5).unwrap();
        assert_eq!(low.frames_evaluated, 3);
        assert_eq!((low.overall.counters.tp, low.overall.counters.fp, low.overall.counters.fn_), (2, 1, 1));
        assert_eq!((low.leading.counters.tp, low.leading.counters.fp, low.leading.counters.fn_), (1, 0, 1));

        let high = report.get(0.999).unwrap();
        assert_eq!(high.overall.counters.tp, 0);
        assert_eq!(high.overall.counters.fp, 3);
        assert_eq!(high.overall.counters.fn_, 3);
        assert_eq!(high.overall.precision, Some(0.0));
    }

    #[test]
    fn test_tp_never_increases_with_threshold() {
        for matching in [MatchingStrategy::AllPairs, MatchingStrategy::Greedy] {
            let config = EvaluationConfig {
                matching,
                ..EvaluationConfig::default()
            };
            let report = evaluate(&frames(), &config).unwrap();
            let tps: Vec<u64> = report.entries().iter().map(|e| e.overall.counters.tp).collect();
            assert!(tps.windows(2).all(|w| w[0] >= w[1]), "{:?}", tps);
        }
    }
}
