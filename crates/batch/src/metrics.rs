//! Per-worker run counters, merged after the job.
use serde::Serialize;

use crate::DataShapeError;

/// Counters one worker keeps while reading its split.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub rows_read: u64,
    pub records_counted: u64,
    pub skipped_malformed: u64,
    pub skipped_out_of_window: u64,
    pub markers_written: u64,
    pub increments: u64,
    pub restarts: u64,
}

impl RunStats {
    pub fn skip(&mut self, err: &DataShapeError) {
        if matches!(err, DataShapeError::OutsideWindow(_)) {
            self.skipped_out_of_window += 1;
        } else {
            self.skipped_malformed += 1;
        }
    }

    pub fn merge(mut self, other: RunStats) -> RunStats {
        self.rows_read += other.rows_read;
        self.records_counted += other.records_counted;
        self.skipped_malformed += other.skipped_malformed;
        self.skipped_out_of_window += other.skipped_out_of_window;
        self.markers_written += other.markers_written;
        self.increments += other.increments;
        self.restarts += other.restarts;
        self
    }
}

impl std::fmt::Display for RunStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "rows={} counted={} malformed={} out_of_window={} markers={} increments={} restarts={}",
            self.rows_read,
            self.records_counted,
            self.skipped_malformed,
            self.skipped_out_of_window,
            self.markers_written,
            self.increments,
            self.restarts
        )
    }
}
