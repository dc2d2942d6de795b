//! Per-threshold accumulation of frame results.

use crate::annotation::Frame;
use crate::matching::FrameMatcher;
use crate::Result;

use super::counters::{CategoryCounters, ConfusionDelta};
use super::evaluation::{finalize, FinalizeOptions, ThresholdMetrics};

/// Running confusion counts for one IoU threshold.
///
/// Each threshold in a sweep owns its own accumulator, so accumulators never
/// share state and can run on separate threads. Frames are folded in
/// additively and the order they arrive in does not matter.
#[derive(Debug, Clone)]
pub struct ThresholdAccumulator {
    matcher: FrameMatcher,
    counters: CategoryCounters,
    frames_evaluated: usize,
    rejected_frames: Vec<String>,
}

impl ThresholdAccumulator {
    /// Create a zeroed accumulator.
    pub fn new(matcher: FrameMatcher) -> Self {
        Self {
            matcher,
            counters: CategoryCounters::default(),
            frames_evaluated: 0,
            rejected_frames: Vec::new(),
        }
    }

    pub fn threshold(&self) -> f64 {
        self.matcher.threshold
    }

    /// Add a frame delta into the running counters.
    pub fn accumulate(&mut self, delta: ConfusionDelta) {
        self.counters += delta;
        self.frames_evaluated += 1;
    }

    /// Match a frame and fold its delta in.
    ///
    /// A frame with a malformed box is skipped and remembered; the error is
    /// returned so callers may log it, but the accumulator stays usable.
    pub fn update(&mut self, frame: &Frame) -> Result<ConfusionDelta> {
        if let Err(e) = frame.validate() {
            self.rejected_frames.push(frame.name.clone());
            return Err(e);
        }

        let delta = self.matcher.match_frame(&frame.benchmark, &frame.detected);
        self.accumulate(delta);
        Ok(delta)
    }

    /// Run every frame through [`update`](Self::update), logging rejections.
    pub fn update_all<'a, I>(&mut self, frames: I)
    where
        I: IntoIterator<Item = &'a Frame>,
    {
        for frame in frames {
            if let Err(e) = self.update(frame) {
                log::warn!(
                    "IoU {}: skipping frame '{}': {}",
                    self.threshold(),
                    frame.name,
                    e
                );
            }
        }
    }

    pub fn counters(&self) -> &CategoryCounters {
        &self.counters
    }

    /// Number of frames folded in so far.
    pub fn frames_evaluated(&self) -> usize {
        self.frames_evaluated
    }

    /// Names of frames rejected as malformed.
    pub fn rejected_frames(&self) -> &[String] {
        &self.rejected_frames
    }

    /// Consume the accumulator and compute precision and recall.
    pub fn finish(self, options: &FinalizeOptions) -> ThresholdMetrics {
        let threshold = self.threshold();
        let (leading, overall) = (
            finalize(&self.counters.leading, options),
            finalize(&self.counters.overall, options),
        );
        if leading.recall_defaulted {
            log::warn!(
                "IoU {}: tp+fn=0, no leading label in benchmark; recall reported as 0",
                threshold
            );
        }
        if overall.recall_defaulted {
            log::warn!(
                "IoU {}: tp+fn=0, no labels in benchmark; recall reported as 0",
                threshold
            );
        }
        log::debug!(
            "IoU {}: overall {:?}, leading {:?}",
            threshold,
            self.counters.overall,
            self.counters.leading
        );

        ThresholdMetrics {
            threshold,
            frames_evaluated: self.frames_evaluated,
            frames_rejected: self.rejected_frames.len(),
            leading,
            overall,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{Annotation, LEADING, SIDEWAYS};
    use crate::geometry::BoundingBox;
    use crate::matching::MatchingStrategy;
    use crate::metrics::ConfusionCounters;

    fn anno(x: f64, category: &str) -> Annotation {
        Annotation::new(BoundingBox::new(x, 0.0, 10.0, 10.0).unwrap(), "car", category)
    }

    fn accumulator() -> ThresholdAccumulator {
        ThresholdAccumulator::new(FrameMatcher::new(0.5, MatchingStrategy::AllPairs))
    }

    #[test]
    fn test_accumulator_empty() {
        let acc = accumulator();
        assert_eq!(acc.counters(), &CategoryCounters::default());
        assert_eq!(acc.frames_evaluated(), 0);
        assert!(acc.rejected_frames().is_empty());
    }

    #[test]
    fn test_update_sums_frames() {
        let mut acc = accumulator();
        let frames = [
            Frame::new("a", vec![anno(0.0, LEADING)], vec![anno(0.0, LEADING)]),
            Frame::new("b", vec![anno(0.0, SIDEWAYS)], vec![]),
            Frame::new("c", vec![], vec![anno(0.0, LEADING)]),
        ];
        acc.update_all(&frames);

        assert_eq!(acc.frames_evaluated(), 3);
        assert_eq!(acc.counters().overall, ConfusionCounters::new(1, 1, 1));
        assert_eq!(acc.counters().leading, ConfusionCounters::new(1, 1, 0));
    }

    #[test]
    fn test_malformed_frame_skipped() {
        let mut acc = accumulator();
        let bad = Annotation::new(
            BoundingBox { x: 0.0, y: 0.0, width: 10.0, height: -10.0 },
            "car",
            SIDEWAYS,
        );
        let frames = [
            Frame::new("bad", vec![bad], vec![anno(0.0, SIDEWAYS)]),
            Frame::new("good", vec![anno(0.0, SIDEWAYS)], vec![anno(0.0, SIDEWAYS)]),
        ];
        acc.update_all(&frames);

        assert_eq!(acc.frames_evaluated(), 1);
        assert_eq!(acc.rejected_frames(), &["bad".to_string()]);
        assert_eq!(acc.counters().overall, ConfusionCounters::new(1, 0, 0));
    }

    #[test]
    fn test_order_independent() {
        let deltas = [
            CategoryCounters {
                leading: ConfusionCounters::new(1, 0, 2),
                overall: ConfusionCounters::new(3, 1, 2),
            },
            CategoryCounters {
                leading: ConfusionCounters::new(0, 4, 0),
                overall: ConfusionCounters::new(0, 5, 0),
            },
            CategoryCounters {
                leading: ConfusionCounters::new(2, 0, 1),
                overall: ConfusionCounters::new(6, 0, 7),
            },
        ];
        let orders = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];

        let mut results = Vec::new();
        for order in orders {
            let mut acc = accumulator();
            for idx in order {
                acc.accumulate(deltas[idx]);
            }
            results.push(*acc.counters());
        }
        assert!(results.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_finish_carries_frame_counts() {
        let mut acc = accumulator();
        acc.update_all(&[Frame::new("a", vec![anno(0.0, LEADING)], vec![anno(0.0, LEADING)])]);
        let metrics = acc.finish(&FinalizeOptions::default());

        assert_eq!(metrics.threshold, 0.5);
        assert_eq!(metrics.frames_evaluated, 1);
        assert_eq!(metrics.frames_rejected, 0);
        assert_eq!(metrics.overall.precision, Some(1.0));
        assert_eq!(metrics.leading.recall, 1.0);
    }
}
