//! Axis-aligned bounding boxes and IoU (Intersection over Union).

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Axis-aligned box in pixel units, top-left origin.
///
/// Stored as `(x, y, width, height)`, the layout used by the annotation files.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    /// Create a box, rejecting negative or non-finite extents.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Result<Self> {
        let bbox = Self { x, y, width, height };
        bbox.validate()?;
        Ok(bbox)
    }

    /// Check that every coordinate is finite and the extents are non-negative.
    pub fn validate(&self) -> Result<()> {
        if !(self.x.is_finite() && self.y.is_finite()) {
            return Err(Error::MalformedBox(format!(
                "non-finite origin ({}, {})",
                self.x, self.y
            )));
        }
        if !(self.width.is_finite() && self.height.is_finite()) {
            return Err(Error::MalformedBox(format!(
                "non-finite size {}x{}",
                self.width, self.height
            )));
        }
        if self.width < 0.0 || self.height < 0.0 {
            return Err(Error::MalformedBox(format!(
                "negative size {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Right edge (`x + width`).
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge (`y + height`).
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Corners as `[x1, y1, x2, y2]`.
    pub fn corners(&self) -> [f64; 4] {
        [self.x, self.y, self.right(), self.bottom()]
    }
}

/// Intersection over Union of two boxes, in `[0, 1]`.
///
/// The intersection extents are clamped at zero, so disjoint boxes give 0.
/// Two degenerate boxes (zero union) also give 0 instead of dividing by zero.
pub fn iou(a: &BoundingBox, b: &BoundingBox) -> f64 {
    let inter_w = (a.right().min(b.right()) - a.x.max(b.x)).max(0.0);
    let inter_h = (a.bottom().min(b.bottom()) - a.y.max(b.y)).max(0.0);
    let inter_area = inter_w * inter_h;

    let union_area = a.area() + b.area() - inter_area;
    if union_area > 0.0 {
        inter_area / union_area
    } else {
        0.0
    }
}

/// Compute the IoU matrix between two sets of boxes.
///
/// # Arguments
/// * `boxes_a` - Row set, typically the benchmark boxes
/// * `boxes_b` - Column set, typically the detected boxes
///
/// # Returns
/// IoU matrix of shape (n, m)
pub fn iou_matrix(boxes_a: &[BoundingBox], boxes_b: &[BoundingBox]) -> DMatrix<f64> {
    let n = boxes_a.len();
    let m = boxes_b.len();

    if n == 0 || m == 0 {
        return DMatrix::zeros(n, m);
    }

    DMatrix::from_fn(n, m, |i, j| iou(&boxes_a[i], &boxes_b[j]))
}
