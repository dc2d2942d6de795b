//! Threshold-indexed performance table and its file writers.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use super::evaluation::{CategoryMetrics, ThresholdMetrics};
use crate::{Error, Result};

/// Which of the two buckets to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    Leading,
    Overall,
}

impl Bucket {
    pub const ALL: [Bucket; 2] = [Bucket::Leading, Bucket::Overall];

    pub fn name(&self) -> &'static str {
        match self {
            Bucket::Leading => "leading",
            Bucket::Overall => "overall",
        }
    }
}

impl ThresholdMetrics {
    pub fn bucket(&self, bucket: Bucket) -> &CategoryMetrics {
        match bucket {
            Bucket::Leading => &self.leading,
            Bucket::Overall => &self.overall,
        }
    }
}

/// Finalized metrics for a full sweep, ordered by ascending threshold.
///
/// Serializes as a JSON object keyed by threshold, in threshold order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PerformanceReport {
    entries: Vec<ThresholdMetrics>,
}

impl PerformanceReport {
    /// Build a report, ordering entries by threshold.
    pub fn new(mut entries: Vec<ThresholdMetrics>) -> Self {
        entries.sort_by(|a, b| a.threshold.total_cmp(&b.threshold));
        Self { entries }
    }

    pub fn entries(&self) -> &[ThresholdMetrics] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn thresholds(&self) -> Vec<f64> {
        self.entries.iter().map(|e| e.threshold).collect()
    }

    /// Metrics for an exact threshold value.
    pub fn get(&self, threshold: f64) -> Option<&ThresholdMetrics> {
        self.entries.iter().find(|e| e.threshold == threshold)
    }

    /// `(threshold, precision)` series; undefined precision points are skipped.
    pub fn precision_curve(&self, bucket: Bucket) -> Vec<(f64, f64)> {
        self.entries
            .iter()
            .filter_map(|e| e.bucket(bucket).precision.map(|p| (e.threshold, p)))
            .collect()
    }

    /// `(threshold, recall)` series.
    pub fn recall_curve(&self, bucket: Bucket) -> Vec<(f64, f64)> {
        self.entries
            .iter()
            .map(|e| (e.threshold, e.bucket(bucket).recall))
            .collect()
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the report as pretty-printed JSON, creating parent directories.
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = create_writer(path.as_ref())?;
        serde_json::to_writer_pretty(&mut writer, self)?;
        writeln!(writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Write one CSV row per threshold and bucket.
    ///
    /// Format: `threshold,category,tp,fp,tn,fn,precision,recall,recall_defaulted`,
    /// with an empty precision field when it is undefined.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = create_writer(path.as_ref())?;
        self.write_csv_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    pub fn write_csv_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writeln!(
            writer,
            "threshold,category,tp,fp,tn,fn,precision,recall,recall_defaulted"
        )?;
        for entry in &self.entries {
            for bucket in Bucket::ALL {
                let m = entry.bucket(bucket);
                let precision = m.precision.map(|p| format!("{:.6}", p)).unwrap_or_default();
                writeln!(
                    writer,
                    "{},{},{},{},{},{},{},{:.6},{}",
                    entry.threshold,
                    bucket.name(),
                    m.counters.tp,
                    m.counters.fp,
                    m.counters.tn,
                    m.counters.fn_,
                    precision,
                    m.recall,
                    m.recall_defaulted
                )?;
            }
        }
        Ok(())
    }
}

fn create_writer(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("failed to create output folder {}: {}", parent.display(), e),
            ))
        })?;
    }
    let file = File::create(path).map_err(|e| {
        Error::Io(std::io::Error::new(
            e.kind(),
            format!("failed to create output file {}: {}", path.display(), e),
        ))
    })?;
    Ok(BufWriter::new(file))
}

#[derive(Serialize)]
struct ReportEntry<'a> {
    frames_evaluated: usize,
    frames_rejected: usize,
    leading: &'a CategoryMetrics,
    overall: &'a CategoryMetrics,
}

impl Serialize for PerformanceReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(
                &entry.threshold.to_string(),
                &ReportEntry {
                    frames_evaluated: entry.frames_evaluated,
                    frames_rejected: entry.frames_rejected,
                    leading: &entry.leading,
                    overall: &entry.overall,
                },
            )?;
        }
        map.end()
    }
}
