//! # Planner - logical scans and region splits
//!
//! Turns a date range into the set of bounded sub-scans a pool of workers can
//! process independently.
//!
//! ```text
//! (start, end, salts)
//!        |
//!        v
//!  ScanRangePlanner::plan ──> [LogicalScanDescriptor]   one per (date × salt)
//!                                   |
//!        partition boundaries ──────┤
//!                                   v
//!  RegionSplitPlanner::split ──> [Split]                one per overlapping
//!                                                       (descriptor, region)
//! ```
//!
//! Both planners are pure functions over their inputs. Neither talks to the
//! store: the caller lists the partition boundaries and hands them in, and
//! the caller's scheduler fans the splits out.
//!
//! ## Key ranges
//!
//! Every range is half-open, `[start, stop)`. An empty bound is open: an
//! empty start is "from the first key", an empty stop is "to the last key".
//! The first region of a table has an empty start key and the last region
//! has an empty end key.

mod scan;
mod split;

pub use scan::{LogicalScanDescriptor, ScanRangePlanner, DEFAULT_CACHE_HINT};
pub use split::{PartitionBoundary, RegionSplitPlanner, Split};

use rowkey::DateBucket;
use thiserror::Error;

/// Failures while planning scans or splits.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanningError {
    /// The store reported no partitions for the table. This is never the same
    /// as "nothing overlaps": there was nothing to split against at all.
    #[error("no partitions available to split against")]
    NoPartitionsAvailable,

    /// Salt cardinality outside `1..=16`.
    #[error("invalid salt cardinality {0} (expected 1..=16)")]
    InvalidSaltCardinality(usize),

    /// The range runs past the last representable calendar day.
    #[error("date {0} has no following day")]
    DateOutOfRange(DateBucket),
}

/// `true` when `key` lies inside `[start, stop)` with empty bounds open.
pub fn range_contains(start: &[u8], stop: &[u8], key: &[u8]) -> bool {
    (start.is_empty() || key >= start) && (stop.is_empty() || key < stop)
}
