//! # detection-eval - Object Detection Performance Evaluation
//!
//! Compares a benchmark (ground-truth) set of bounding boxes against a
//! detector's output, frame by frame, and reports confusion counts with
//! precision and recall across a sweep of IoU thresholds.
//!
//! Two buckets are tracked for every threshold:
//!
//! - `overall` - every vehicle box
//! - `leading` - boxes categorised as the vehicle directly ahead of the camera
//!
//! ## Example
//!
//! ```rust
//! use detection_eval::{evaluate, Annotation, BoundingBox, EvaluationConfig, Frame};
//!
//! let car = Annotation::new(BoundingBox::new(300.0, 200.0, 50.0, 40.0).unwrap(), "car", "leading");
//! let frames = vec![Frame::new("0001.jpg", vec![car.clone()], vec![car])];
//!
//! let report = evaluate(&frames, &EvaluationConfig::default()).unwrap();
//! let at_half = report.get(0.5).unwrap();
//! assert_eq!(at_half.leading.counters.tp, 1);
//! assert_eq!(at_half.overall.precision, Some(1.0));
//! ```

pub mod annotation;
pub mod classifier;
pub mod config;
pub mod dataset;
pub mod geometry;
pub mod matching;
pub mod metrics;
pub mod sweep;

// Re-exports for convenience
pub use annotation::{Annotation, Frame};
pub use classifier::LeadingStripClassifier;
pub use config::EvaluationConfig;
pub use dataset::{AnnotationFile, Dataset};
pub use geometry::{iou, BoundingBox};
pub use matching::{match_frame, FrameMatcher, MatchingStrategy};
pub use metrics::{
    finalize, Bucket, CategoryCounters, CategoryMetrics, ConfusionCounters, PerformanceReport,
    ThresholdAccumulator,
};
pub use sweep::{evaluate, ThresholdSweep};

// Error types
pub use crate::error::{Error, Result};

mod error {
    use thiserror::Error;

    /// Errors that can occur while loading or evaluating annotations
    #[derive(Error, Debug)]
    pub enum Error {
        #[error("Invalid configuration: {0}")]
        InvalidConfig(String),

        #[error("Invalid IoU threshold {0}: must be within (0, 1]")]
        InvalidThreshold(f64),

        #[error("Malformed box: {0}")]
        MalformedBox(String),

        #[error("Malformed annotation record: {0}")]
        MalformedRecord(String),

        #[error("IO error: {0}")]
        Io(#[from] std::io::Error),

        #[error("JSON error: {0}")]
        Json(#[from] serde_json::Error),
    }

    /// Result type for evaluation operations
    pub type Result<T> = std::result::Result<T, Error>;
}
