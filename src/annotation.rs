//! Annotation records and per-image frames.

use serde::{Deserialize, Serialize};

use crate::geometry::BoundingBox;
use crate::{Error, Result};

/// Category name for the vehicle directly ahead of the camera.
pub const LEADING: &str = "leading";

/// Category name for every other vehicle.
pub const SIDEWAYS: &str = "sideways";

/// Label the detector writes for non-object placeholders.
pub const NULL_LABEL: &str = "null";

/// Returns true if `category` names the leading vehicle (case-insensitive).
///
/// Unknown or empty categories are never leading.
pub fn is_leading(category: &str) -> bool {
    category.eq_ignore_ascii_case(LEADING)
}

/// A labeled box: geometry, detector class and semantic role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(flatten)]
    pub bbox: BoundingBox,
    /// Detector class, e.g. "car", or "null" for a placeholder.
    pub label: String,
    /// Semantic role, e.g. "leading" or "sideways".
    pub category: String,
}

impl Annotation {
    pub fn new(bbox: BoundingBox, label: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            bbox,
            label: label.into(),
            category: category.into(),
        }
    }

    pub fn is_leading(&self) -> bool {
        is_leading(&self.category)
    }
}

/// One annotation entry as it appears in the JSON files.
///
/// Every coordinate is optional here so that a missing field surfaces as
/// [`Error::MalformedBox`] on conversion instead of a whole-file parse error.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AnnotationRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<serde_json::Value>,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub category: String,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

impl TryFrom<AnnotationRecord> for Annotation {
    type Error = Error;

    fn try_from(record: AnnotationRecord) -> Result<Self> {
        let field = |value: Option<f64>, name: &str| {
            value.ok_or_else(|| Error::MalformedBox(format!("missing field '{}'", name)))
        };
        let bbox = BoundingBox::new(
            field(record.x, "x")?,
            field(record.y, "y")?,
            field(record.width, "width")?,
            field(record.height, "height")?,
        )?;
        Ok(Annotation::new(bbox, record.label, record.category))
    }
}

/// Benchmark and detected annotations for a single image.
///
/// Frames carry no cross-frame state; either list may be empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    pub name: String,
    pub benchmark: Vec<Annotation>,
    pub detected: Vec<Annotation>,
}

impl Frame {
    pub fn new(
        name: impl Into<String>,
        benchmark: Vec<Annotation>,
        detected: Vec<Annotation>,
    ) -> Self {
        Self {
            name: name.into(),
            benchmark,
            detected,
        }
    }

    /// Check every box in the frame.
    pub fn validate(&self) -> Result<()> {
        for annotation in self.benchmark.iter().chain(&self.detected) {
            annotation.bbox.validate().map_err(|e| match e {
                Error::MalformedBox(msg) => {
                    Error::MalformedBox(format!("frame '{}': {}", self.name, msg))
                }
                other => other,
            })?;
        }
        Ok(())
    }
}
