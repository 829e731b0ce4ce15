// src/assembly/ground_truth.rs
//! Ground-truth (GST) train log
//!
//! One record per aligned firing whose alignment point falls inside the run.
//! The CSV export starts with the unit-0 placeholder and lists the rest
//! ordered by time, then unit.

use crate::config::constants::ground_truth::DEFAULT_CERTAINTY;
use crate::error::{EmgErrorBuilder, EmgResult, FileFormat, IoResultExt};
use crate::utils::{sample_to_byte_offset, samples_to_seconds};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

const COMPONENT: &str = "ground_truth";

/// One aligned firing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundTruthRecord {
    /// 1-based motor unit number
    pub unit: u32,
    /// Base-rate sample of the alignment point in the EMG buffer
    pub sample_offset: usize,
    /// Exact alignment position in samples, sub-sample part included
    pub position: f64,
    /// Detection certainty
    pub certainty: f32,
}

/// Row of the exported CSV
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GstRow {
    /// Alignment time in seconds
    pub time_s: f64,
    /// Byte of the alignment sample in the EMG file
    pub byte_offset: u64,
    /// Motor unit, 0 for the placeholder row
    pub unit: u32,
    /// Detection certainty
    pub certainty: f32,
    /// Configured user id
    pub user_id: i32,
}

/// Capacity-bounded record log over a run of `total_samples`
#[derive(Debug)]
pub struct GroundTruthLog {
    records: Vec<GroundTruthRecord>,
    capacity: usize,
    total_samples: usize,
    dropped: usize,
    outside_run: usize,
}

impl GroundTruthLog {
    /// Empty log keeping at most `capacity` records
    pub fn new(capacity: usize, total_samples: usize) -> Self {
        Self {
            records: Vec::new(),
            capacity,
            total_samples,
            dropped: 0,
            outside_run: 0,
        }
    }

    /// Append a record; once full, records are dropped with a single warning
    pub fn push(&mut self, record: GroundTruthRecord) -> bool {
        if self.records.len() < self.capacity {
            self.records.push(record);
            return true;
        }
        if self.dropped == 0 {
            warn!(capacity = self.capacity, unit = record.unit, "ground-truth log full, dropping records");
        }
        self.dropped += 1;
        false
    }

    /// Aligned firing of `unit` at absolute sample `position`. Positions
    /// before sample 0 or at/after the run end are counted, not logged.
    pub fn push_firing(&mut self, unit: u32, position: f64) -> bool {
        if !(position >= 0.0 && position < self.total_samples as f64) {
            debug!(unit, position, total_samples = self.total_samples, "alignment point outside run");
            self.outside_run += 1;
            return false;
        }
        self.push(GroundTruthRecord {
            unit,
            sample_offset: position.floor() as usize,
            position,
            certainty: DEFAULT_CERTAINTY,
        })
    }

    /// Records in insertion order
    pub fn records(&self) -> &[GroundTruthRecord] {
        &self.records
    }

    /// Records kept
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// No records kept
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records dropped at capacity
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Firings whose alignment point fell outside the run
    pub fn outside_run(&self) -> usize {
        self.outside_run
    }

    /// Placeholder first, then records ordered by time and unit
    pub fn rows(&self, sample_rate_hz: u32, user_id: i32) -> Vec<GstRow> {
        let mut sorted = self.records.clone();
        sorted.sort_by(|a, b| a.position.total_cmp(&b.position).then(a.unit.cmp(&b.unit)));

        let placeholder = GstRow {
            time_s: 0.0,
            byte_offset: sample_to_byte_offset(0),
            unit: 0,
            certainty: DEFAULT_CERTAINTY,
            user_id,
        };
        std::iter::once(placeholder)
            .chain(sorted.iter().map(|r| GstRow {
                time_s: samples_to_seconds(r.position, sample_rate_hz),
                byte_offset: sample_to_byte_offset(r.sample_offset),
                unit: r.unit,
                certainty: r.certainty,
                user_id,
            }))
            .collect()
    }

    /// Export [`rows`](Self::rows) as CSV with a header line
    pub fn write_csv(&self, path: &Path, sample_rate_hz: u32, user_id: i32) -> EmgResult<()> {
        let mut writer = csv::Writer::from_path(path)
            .map_err(|e| csv_error(e, path, "create"))?;
        for row in self.rows(sample_rate_hz, user_id) {
            writer.serialize(&row).map_err(|e| csv_error(e, path, "write"))?;
        }
        writer.flush().io_err(COMPONENT, "flush", path)
    }

    /// Read an exported log back
    pub fn read_csv(path: &Path) -> EmgResult<Vec<GstRow>> {
        let mut reader = csv::Reader::from_path(path).map_err(|e| csv_error(e, path, "open"))?;
        reader
            .deserialize()
            .map(|row| row.map_err(|e| csv_error(e, path, "read")))
            .collect()
    }
}

fn csv_error(err: csv::Error, path: &Path, operation: &str) -> crate::error::EmgError {
    let builder = EmgErrorBuilder::new(COMPONENT, operation);
    if err.is_io_error() {
        match err.into_kind() {
            csv::ErrorKind::Io(source) => builder.io(path, source),
            other => builder.format(FileFormat::GroundTruth, path, format!("{:?}", other)),
        }
    } else {
        builder.format(FileFormat::GroundTruth, path, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_capacity_drops_records() {
        let mut log = GroundTruthLog::new(2, 1_000);
        assert!(log.push_firing(1, 10.0));
        assert!(log.push_firing(1, 20.0));
        assert!(!log.push_firing(2, 30.0));
        assert!(!log.push_firing(2, 40.0));
        assert_eq!(log.len(), 2);
        assert_eq!(log.dropped(), 2);
    }

    #[test]
    fn test_positions_outside_run_not_logged() {
        let mut log = GroundTruthLog::new(10, 1_000);
        assert!(!log.push_firing(1, -0.25));
        assert!(!log.push_firing(1, 1_000.0));
        assert!(!log.push_firing(1, 1_038.5));
        assert!(log.push_firing(1, 999.75));
        assert_eq!(log.len(), 1);
        assert_eq!(log.outside_run(), 3);
        assert_eq!(log.dropped(), 0);

        let rows = log.rows(10_000, 0);
        assert_eq!(rows[1].byte_offset, 8 + 4 * 999);
        assert!(rows[1].time_s < 0.1);
    }

    #[test]
    fn test_rows_ordered_after_placeholder() {
        let mut log = GroundTruthLog::new(10, 1_000);
        log.push_firing(2, 300.5);
        log.push_firing(1, 100.0);
        log.push_firing(3, 100.0);
        log.push_firing(1, 200.25);

        let rows = log.rows(10_000, 4);
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0].unit, 0);
        assert_eq!(rows[0].time_s, 0.0);

        let order: Vec<u32> = rows[1..].iter().map(|r| r.unit).collect();
        assert_eq!(order, vec![1, 3, 1, 2]);
        assert_eq!(rows[4].byte_offset, 8 + 4 * 300);
        assert!((rows[4].time_s - 0.03005).abs() < 1e-12);
        assert!(rows.iter().all(|r| r.user_id == 4));
    }

    #[test]
    fn test_csv_export() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("emg.gst");
        let mut log = GroundTruthLog::new(10, 1_000);
        log.push_firing(1, 50.0);
        log.write_csv(&path, 1_000, 0).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("time_s,byte_offset,unit,certainty,user_id\n"));

        let rows = GroundTruthLog::read_csv(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].unit, 1);
        assert_eq!(rows[1].byte_offset, 208);
    }
}
