//! Leading-vehicle heuristic based on a fixed vertical strip.
//!
//! The camera faces forward, so the vehicle ahead sits around the horizontal
//! centre of the image. A box is "leading" when it covers enough of the
//! strip `[strip_x1, strip_x2]`.

use serde::{Deserialize, Serialize};

use crate::annotation::{Annotation, LEADING, SIDEWAYS};
use crate::geometry::BoundingBox;
use crate::{Error, Result};

const DEFAULT_STRIP_X1: f64 = 305.0;
const DEFAULT_STRIP_X2: f64 = 335.0;
const DEFAULT_THRESHOLD: f64 = 0.2;
const FALLBACK_THRESHOLD: f64 = 0.5;

/// Strip classifier parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeadingStripClassifier {
    pub strip_x1: f64,
    pub strip_x2: f64,
    /// Required overlap with the strip, as a fraction of the strip width.
    pub threshold: f64,
}

impl Default for LeadingStripClassifier {
    fn default() -> Self {
        Self {
            strip_x1: DEFAULT_STRIP_X1,
            strip_x2: DEFAULT_STRIP_X2,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl LeadingStripClassifier {
    /// Create a classifier. A `threshold` outside `(0, 1]` falls back to 0.5.
    pub fn new(strip_x1: f64, strip_x2: f64, threshold: f64) -> Self {
        Self {
            strip_x1,
            strip_x2,
            threshold,
        }
        .normalized()
    }

    fn normalized(mut self) -> Self {
        if !(self.threshold > 0.0 && self.threshold <= 1.0) {
            log::debug!(
                "strip threshold {} outside (0, 1], using {}",
                self.threshold,
                FALLBACK_THRESHOLD
            );
            self.threshold = FALLBACK_THRESHOLD;
        }
        self
    }

    /// Reject strips that are empty or reversed.
    pub fn validate(&self) -> Result<()> {
        if !(self.strip_x1.is_finite() && self.strip_x2.is_finite()) || self.strip_x2 <= self.strip_x1
        {
            return Err(Error::InvalidConfig(format!(
                "leading strip must satisfy strip_x1 < strip_x2, got [{}, {}]",
                self.strip_x1, self.strip_x2
            )));
        }
        Ok(())
    }

    /// Category for a box: [`LEADING`] or [`SIDEWAYS`].
    pub fn classify(&self, bbox: &BoundingBox) -> &'static str {
        let this = self.normalized();
        let x1 = bbox.x;
        let x2 = bbox.right();
        let margin = (this.strip_x2 - this.strip_x1) * this.threshold;

        let inside = x1 > this.strip_x1 && x2 < this.strip_x2;
        let covers = x2 - this.strip_x1 > margin && x1 - this.strip_x2 < -margin;

        if inside || covers {
            LEADING
        } else {
            SIDEWAYS
        }
    }

    /// Overwrite the category of every annotation with the strip decision.
    pub fn assign(&self, annotations: &mut [Annotation]) {
        for annotation in annotations {
            annotation.category = self.classify(&annotation.bbox).to_string();
        }
    }
}

/// Keep at most one leading vehicle: the nearest one.
///
/// Annotations are reordered by box bottom edge, lowest in the image (closest
/// to the camera) first. The first leading box keeps its category and every
/// other box becomes sideways.
pub fn keep_nearest_leading(annotations: &mut [Annotation]) {
    annotations.sort_by(|a, b| b.bbox.bottom().total_cmp(&a.bbox.bottom()));

    let mut found = false;
    for annotation in annotations {
        if !found && annotation.is_leading() {
            found = true;
        } else {
            annotation.category = SIDEWAYS.to_string();
        }
    }
}
