/// Logical scan planning: one descriptor per (calendar day × salt symbol).
///
/// Row keys start with `[salt][yyyyMMdd]`, and everything after the date
/// (product, version, OS, signature or crash id) sorts after it. So
/// `[salt + day, salt + next_day)` holds exactly the rows of one salt bucket
/// for one day, whatever follows the date.
use rowkey::{DateBucket, SaltingPolicy, SALT_SYMBOLS};

use crate::PlanningError;

/// Rows fetched per scanner round trip: a 64 MiB batch over the mean size of
/// a processed crash document.
pub const DEFAULT_CACHE_HINT: u32 = 1788;

/// One contiguous key range to read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalScanDescriptor {
    /// Inclusive start row (empty = open).
    pub start_row: Vec<u8>,
    /// Exclusive stop row (empty = open).
    pub stop_row: Vec<u8>,
    /// Column families the scan projects.
    pub families: Vec<String>,
    /// Rows per scanner round trip.
    pub cache_hint: u32,
    /// Whether the store should keep scanned blocks in its cache. Backfills
    /// read every row once, so this defaults to `false`.
    pub cache_blocks: bool,
}

impl LogicalScanDescriptor {
    pub fn contains(&self, key: &[u8]) -> bool {
        crate::range_contains(&self.start_row, &self.stop_row, key)
    }
}

/// Enumerates the logical scans that cover a date range.
#[derive(Debug, Clone)]
pub struct ScanRangePlanner {
    families: Vec<String>,
    cache_hint: u32,
}

impl ScanRangePlanner {
    /// A planner whose descriptors project `families`.
    pub fn new<I, S>(families: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            families: families.into_iter().map(Into::into).collect(),
            cache_hint: DEFAULT_CACHE_HINT,
        }
    }

    pub fn with_cache_hint(mut self, cache_hint: u32) -> Self {
        self.cache_hint = cache_hint;
        self
    }

    /// Plans `[start, end]` (inclusive) over the first `salt_cardinality`
    /// symbols of `0..f`.
    ///
    /// Produces `days × salt_cardinality` descriptors, ordered by day and then
    /// salt. An inverted range (`end < start`) is an empty plan.
    ///
    /// # Errors
    ///
    /// [`PlanningError::InvalidSaltCardinality`] unless `1 <= n <= 16`;
    /// [`PlanningError::DateOutOfRange`] if a day in the range has no successor.
    pub fn plan(
        &self,
        start: DateBucket,
        end: DateBucket,
        salt_cardinality: usize,
    ) -> Result<Vec<LogicalScanDescriptor>, PlanningError> {
        if salt_cardinality == 0 || salt_cardinality > SALT_SYMBOLS.len() {
            return Err(PlanningError::InvalidSaltCardinality(salt_cardinality));
        }
        let prefixes: Vec<&[u8]> = SALT_SYMBOLS[..salt_cardinality].chunks(1).collect();
        self.plan_prefixes(start, end, &prefixes)
    }

    /// Plans `[start, end]` over every prefix `policy` can write under.
    ///
    /// This is the entry point backfills use, so the scan side always comes
    /// from the same [`SaltingPolicy`] as the write side.
    pub fn plan_for_policy(
        &self,
        policy: SaltingPolicy,
        start: DateBucket,
        end: DateBucket,
    ) -> Result<Vec<LogicalScanDescriptor>, PlanningError> {
        self.plan_prefixes(start, end, &policy.scan_prefixes())
    }

    fn plan_prefixes(
        &self,
        start: DateBucket,
        end: DateBucket,
        prefixes: &[&[u8]],
    ) -> Result<Vec<LogicalScanDescriptor>, PlanningError> {
        let mut descriptors = Vec::new();
        let mut day = start;
        while day <= end {
            let next = day.next_day().ok_or(PlanningError::DateOutOfRange(day))?;
            let (from, to) = (day.encode(), next.encode());
            for prefix in prefixes {
                descriptors.push(LogicalScanDescriptor {
                    start_row: [*prefix, from.as_bytes()].concat(),
                    stop_row: [*prefix, to.as_bytes()].concat(),
                    families: self.families.clone(),
                    cache_hint: self.cache_hint,
                    cache_blocks: false,
                });
            }
            day = next;
        }
        tracing::debug!(
            start = %start,
            end = %end,
            prefixes = prefixes.len(),
            descriptors = descriptors.len(),
            "planned logical scans"
        );
        Ok(descriptors)
    }
}
