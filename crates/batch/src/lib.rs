//! # Batch - backfill over the report table
//!
//! Recounts processed crashes into the counter table, one worker per split.
//!
//! ```text
//! DateWindow
//!   |  ScanRangePlanner::plan_for_policy   (day × salt descriptors)
//!   v
//! RegionSplitPlanner::split                (cut at report-table regions)
//!   |
//!   v
//! LocalScheduler ──► SplitReader ──► parse_processed_crash ──► CounterAggregator::record
//!   (rayon pool)     (restarts)       (skips bad records)
//!   |
//!   v
//! JobReport (merged RunStats, failed splits, success threshold)
//! ```
//!
//! | Module        | Purpose                                              |
//! |---------------|------------------------------------------------------|
//! | [`record`]    | processed crash JSON → `CrashRecord`; report storage |
//! | [`reader`]    | `SplitReader`: scan one split with partial restart   |
//! | [`scheduler`] | `LocalScheduler`: one pool task per split            |
//! | [`job`]       | `BackfillJob`, `JobReport`                           |
//! | [`metrics`]   | `RunStats`                                           |
mod job;
mod metrics;
mod reader;
mod record;
mod scheduler;

use chrono::NaiveDateTime;
use counter::CounterError;
use planner::PlanningError;
use table::StoreError;
use thiserror::Error;

pub use job::{BackfillJob, JobOptions, JobReport, SplitFailure};
pub use metrics::RunStats;
pub use reader::{ReadSummary, SplitReadError, SplitReader};
pub use record::{
    parse_date_processed, parse_processed_crash, processed_json, store_processed_crash, CrashRecord,
    DateWindow, DATE_PROCESSED_FORMAT, FAMILY_PROCESSED_DATA, NO_SIGNATURE, QUALIFIER_JSON,
};
pub use scheduler::LocalScheduler;

/// A record that cannot be counted. The record is skipped; the split goes on.
#[derive(Debug, Error)]
pub enum DataShapeError {
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("missing or blank field {0}")]
    MissingField(&'static str),

    #[error("unparseable date_processed {0:?}")]
    BadDate(String),

    #[error("processed at {0}, outside the job window")]
    OutsideWindow(NaiveDateTime),

    #[error("malformed dump line {0:?}")]
    DumpLine(String),

    #[error("add-on entry with {0} fields (expected name and version)")]
    Addon(usize),

    #[error("row has no processed crash document")]
    MissingDocument,
}

#[derive(Debug, Error)]
pub enum BatchError {
    #[error(transparent)]
    DataShape(#[from] DataShapeError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("planning error: {0}")]
    Planning(#[from] PlanningError),

    #[error("counter error: {0}")]
    Counter(#[from] CounterError),

    #[error("worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

#[cfg(test)]
mod tests;
