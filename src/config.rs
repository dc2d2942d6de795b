//! Evaluation settings.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::annotation::NULL_LABEL;
use crate::classifier::LeadingStripClassifier;
use crate::matching::MatchingStrategy;
use crate::metrics::FinalizeOptions;
use crate::sweep::ThresholdSweep;
use crate::{Error, Result};

/// Settings for a full evaluation run.
///
/// Every field has a default, so a config file only needs the keys it wants
/// to change:
/// ```json
/// { "thresholds": [0.5, 0.75], "matching": "greedy" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvaluationConfig {
    /// IoU thresholds to sweep.
    pub thresholds: ThresholdSweep,
    /// Pairing discipline for boxes above threshold.
    pub matching: MatchingStrategy,
    /// Precision reported when `tp + fp == 0`; unset leaves it undefined.
    pub precision_default: Option<f64>,
    /// Evaluate thresholds on the rayon thread pool.
    pub parallel: bool,
    /// Strip heuristic used when re-deriving leading categories.
    pub classifier: LeadingStripClassifier,
    /// Detector label for non-object placeholders.
    pub null_label: String,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            thresholds: ThresholdSweep::default(),
            matching: MatchingStrategy::default(),
            precision_default: None,
            parallel: true,
            classifier: LeadingStripClassifier::default(),
            null_label: NULL_LABEL.to_string(),
        }
    }
}

impl EvaluationConfig {
    /// Load a configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("failed to open config file '{}': {}", path.display(), e),
            ))
        })?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values serde cannot express on its own.
    pub fn validate(&self) -> Result<()> {
        if let Some(default) = self.precision_default {
            if !(0.0..=1.0).contains(&default) {
                return Err(Error::InvalidConfig(format!(
                    "precision_default must be within [0, 1], got {}",
                    default
                )));
            }
        }
        self.classifier.validate()
    }

    pub fn finalize_options(&self) -> FinalizeOptions {
        FinalizeOptions {
            precision_default: self.precision_default,
        }
    }
}
