//! Loading annotation files and pairing benchmark frames with detections.
//!
//! Both benchmark and detection files are JSON objects keyed by image name:
//! ```json
//! {
//!   "0001.jpg": {
//!     "name": "0001.jpg", "width": 640, "height": 480,
//!     "annotations": [
//!       {"label": "car", "category": "leading", "x": 300, "y": 200, "width": 50, "height": 40}
//!     ]
//!   },
//!   "0002.jpg": {}
//! }
//! ```
//! An empty object means the image was processed and nothing was found.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::annotation::{Annotation, AnnotationRecord, Frame};
use crate::classifier::{keep_nearest_leading, LeadingStripClassifier};
use crate::{Error, Result};

#[derive(Debug, Default, Deserialize)]
struct ImageRecord {
    #[serde(default)]
    #[allow(dead_code)]
    name: Option<String>,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    annotations: Vec<AnnotationRecord>,
}

/// Annotations for one image.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageAnnotations {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub annotations: Vec<Annotation>,
}

impl TryFrom<ImageRecord> for ImageAnnotations {
    type Error = Error;

    fn try_from(record: ImageRecord) -> Result<Self> {
        let annotations = record
            .annotations
            .into_iter()
            .map(Annotation::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            width: record.width,
            height: record.height,
            annotations,
        })
    }
}

/// A parsed annotation file.
///
/// Images whose record is malformed are kept out of `images` and listed in
/// `rejected` instead, so one bad image does not discard the file.
#[derive(Debug, Clone, Default)]
pub struct AnnotationFile {
    pub images: BTreeMap<String, ImageAnnotations>,
    pub rejected: Vec<String>,
}

impl AnnotationFile {
    /// Parse from a JSON string.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let raw: BTreeMap<String, serde_json::Value> = serde_json::from_str(content)?;

        let mut file = AnnotationFile::default();
        for (name, value) in raw {
            let parsed = serde_json::from_value::<ImageRecord>(value)
                .map_err(|e| Error::MalformedRecord(e.to_string()))
                .and_then(ImageAnnotations::try_from);
            match parsed {
                Ok(image) => {
                    file.images.insert(name, image);
                }
                Err(e) => {
                    log::warn!("rejecting image '{}': {}", name, e);
                    file.rejected.push(name);
                }
            }
        }
        Ok(file)
    }

    /// Read and parse a JSON annotation file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("failed to open annotation file '{}': {}", path.display(), e),
            ))
        })?;
        let file = Self::from_json_str(&content)?;
        log::info!(
            "loaded {} images from {} ({} rejected)",
            file.images.len(),
            path.display(),
            file.rejected.len()
        );
        Ok(file)
    }

    /// Find the benchmark entry for a detection image name.
    ///
    /// Detection files often prefix the benchmark name (`<prefix>_<name>`), so
    /// the suffix after the last `_` is tried when the full name is absent.
    pub fn resolve(&self, name: &str) -> Option<&str> {
        if let Some((key, _)) = self.images.get_key_value(name) {
            return Some(key.as_str());
        }
        let suffix = benchmark_key(name);
        self.images.get_key_value(suffix).map(|(key, _)| key.as_str())
    }

    fn is_rejected(&self, name: &str) -> bool {
        self.rejected.iter().any(|r| r == name || r == benchmark_key(name))
    }
}

fn benchmark_key(name: &str) -> &str {
    name.rsplit('_').next().unwrap_or(name)
}

/// Paired frames ready for evaluation.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub frames: Vec<Frame>,
    /// Images skipped because their benchmark or detection record was malformed.
    pub rejected: Vec<String>,
}

impl Dataset {
    /// Pair every detection image with its benchmark image.
    ///
    /// Detection images without a benchmark are evaluated against an empty
    /// benchmark; benchmark images no detection claimed are evaluated with no
    /// detections.
    pub fn pair(benchmark: &AnnotationFile, detected: &AnnotationFile) -> Self {
        let mut dataset = Dataset::default();
        let mut claimed: HashSet<&str> = HashSet::new();

        for name in &detected.rejected {
            dataset.rejected.push(name.clone());
            if let Some(key) = benchmark.resolve(name) {
                claimed.insert(key);
            }
        }

        for (name, image) in &detected.images {
            let key = benchmark.resolve(name);
            if let Some(key) = key {
                claimed.insert(key);
            } else if benchmark.is_rejected(name) {
                log::warn!("skipping '{}': benchmark record is malformed", name);
                dataset.rejected.push(name.clone());
                continue;
            }

            let bench = key
                .and_then(|k| benchmark.images.get(k))
                .map(|b| b.annotations.clone())
                .unwrap_or_default();
            dataset
                .frames
                .push(Frame::new(name.clone(), bench, image.annotations.clone()));
        }

        for (name, image) in &benchmark.images {
            if !claimed.contains(name.as_str()) {
                dataset
                    .frames
                    .push(Frame::new(name.clone(), image.annotations.clone(), Vec::new()));
            }
        }
        for name in &benchmark.rejected {
            if !dataset.rejected.contains(name) {
                dataset.rejected.push(name.clone());
            }
        }

        dataset
    }

    /// Load and pair a benchmark file with a detection file.
    pub fn from_files<P1: AsRef<Path>, P2: AsRef<Path>>(
        benchmark_path: P1,
        detected_path: P2,
    ) -> Result<Self> {
        let benchmark = AnnotationFile::from_json_file(benchmark_path)?;
        let detected = AnnotationFile::from_json_file(detected_path)?;
        Ok(Self::pair(&benchmark, &detected))
    }

    /// Load every sequence folder under `root`.
    ///
    /// Each folder `<f>` holds `annotationfull_<f>.json` (benchmark) and
    /// `annotation_<f>_<model>.json` (detections). Folders missing either file
    /// are skipped. Frame names are prefixed with the folder name.
    pub fn from_folder_layout<P: AsRef<Path>>(root: P, model: &str) -> Result<Self> {
        let root = root.as_ref();
        let mut folders: Vec<_> = fs::read_dir(root)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect();
        folders.sort();

        let mut dataset = Dataset::default();
        for folder in folders {
            let dir = root.join(&folder);
            let benchmark_path = dir.join(format!("annotationfull_{}.json", folder));
            let detected_path = dir.join(format!("annotation_{}_{}.json", folder, model));

            if !benchmark_path.exists() {
                log::debug!("skipping folder '{}': no benchmark file", folder);
                continue;
            }
            if !detected_path.exists() {
                log::warn!(
                    "skipping folder '{}': no detections for model '{}'",
                    folder,
                    model
                );
                continue;
            }

            let part = Self::from_files(&benchmark_path, &detected_path)?;
            dataset.frames.extend(part.frames.into_iter().map(|mut frame| {
                frame.name = format!("{}/{}", folder, frame.name);
                frame
            }));
            dataset
                .rejected
                .extend(part.rejected.into_iter().map(|name| format!("{}/{}", folder, name)));
        }
        Ok(dataset)
    }

    /// Replace detected categories using the strip heuristic.
    ///
    /// With `nearest_only`, at most one detection per frame stays leading.
    pub fn reclassify_detections(&mut self, classifier: &LeadingStripClassifier, nearest_only: bool) {
        for frame in &mut self.frames {
            classifier.assign(&mut frame.detected);
            if nearest_only {
                keep_nearest_leading(&mut frame.detected);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}
