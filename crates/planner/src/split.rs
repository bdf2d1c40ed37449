/// Region split planning: intersect logical scans with physical partitions.
///
/// Each physical region of a table is served by one location. A logical scan
/// that spans several regions is cut at region boundaries so every resulting
/// [`Split`] can be read by one worker co-located with its region.
///
/// The work is `O(descriptors × regions)`. Both lists are small: a table has
/// a handful of regions per terabyte, and a backfill plans at most
/// `days × 16` descriptors.
use std::cmp::Ordering;

use crate::{range_contains, LogicalScanDescriptor, PlanningError};

/// One physical partition of the store, as listed by the store.
///
/// The full list tiles the key space: sorted, no gaps, no overlaps, the first
/// start key and the last end key empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionBoundary {
    /// Inclusive start key (empty for the first region).
    pub start_key: Vec<u8>,
    /// Exclusive end key (empty for the last region).
    pub end_key: Vec<u8>,
    /// Where the region is served; workers are scheduled next to it.
    pub location: String,
}

impl PartitionBoundary {
    pub fn new(start_key: impl Into<Vec<u8>>, end_key: impl Into<Vec<u8>>, location: impl Into<String>) -> Self {
        Self {
            start_key: start_key.into(),
            end_key: end_key.into(),
            location: location.into(),
        }
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        range_contains(&self.start_key, &self.end_key, key)
    }
}

/// A bounded sub-range of one logical scan inside one partition: the unit of
/// parallel work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    /// Inclusive start row (empty = open).
    pub start_row: Vec<u8>,
    /// Exclusive stop row (empty = open).
    pub stop_row: Vec<u8>,
    /// Location hint of the partition this split lies in.
    pub location: String,
    /// Column families to project, copied from the descriptor.
    pub families: Vec<String>,
    /// Rows per scanner round trip, copied from the descriptor.
    pub cache_hint: u32,
    /// Index of the partition in the boundary list.
    pub partition_index: usize,
    /// Index of the (first) descriptor this split was cut from.
    pub descriptor_index: usize,
}

impl Split {
    pub fn contains(&self, key: &[u8]) -> bool {
        range_contains(&self.start_row, &self.stop_row, key)
    }
}

/// Cuts logical scans at partition boundaries.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegionSplitPlanner;

impl RegionSplitPlanner {
    /// Intersects every descriptor with every partition.
    ///
    /// Output is ordered by partition index, then descriptor index. Within a
    /// partition, clipped ranges that strictly overlap and project the same
    /// families are coalesced, so each key of the union is covered by
    /// exactly one split even when descriptors overlap each other.
    /// Descriptors outside every partition contribute nothing.
    ///
    /// # Errors
    ///
    /// [`PlanningError::NoPartitionsAvailable`] when `boundaries` is empty.
    pub fn split(
        &self,
        descriptors: &[LogicalScanDescriptor],
        boundaries: &[PartitionBoundary],
    ) -> Result<Vec<Split>, PlanningError> {
        if boundaries.is_empty() {
            return Err(PlanningError::NoPartitionsAvailable);
        }

        let mut splits = Vec::new();
        for (partition_index, boundary) in boundaries.iter().enumerate() {
            let mut candidates: Vec<Split> = descriptors
                .iter()
                .enumerate()
                .filter(|(_, d)| {
                    overlaps(&d.start_row, &d.stop_row, &boundary.start_key, &boundary.end_key)
                })
                .filter_map(|(descriptor_index, d)| {
                    let start_row = clip_start(&d.start_row, &boundary.start_key);
                    let stop_row = clip_stop(&d.stop_row, &boundary.end_key);
                    if !is_non_empty(&start_row, &stop_row) {
                        return None;
                    }
                    Some(Split {
                        start_row,
                        stop_row,
                        location: boundary.location.clone(),
                        families: d.families.clone(),
                        cache_hint: d.cache_hint,
                        partition_index,
                        descriptor_index,
                    })
                })
                .collect();

            coalesce(&mut candidates);
            candidates.sort_by_key(|s| s.descriptor_index);
            splits.extend(candidates);
        }

        tracing::debug!(
            descriptors = descriptors.len(),
            partitions = boundaries.len(),
            splits = splits.len(),
            "planned region splits"
        );
        Ok(splits)
    }
}

/// `[d_start, d_stop)` and `[b_start, b_end)` share at least one key, treating
/// empty bounds as open.
pub(crate) fn overlaps(d_start: &[u8], d_stop: &[u8], b_start: &[u8], b_end: &[u8]) -> bool {
    let stops_before = !d_stop.is_empty() && d_stop <= b_start;
    let starts_after = !b_end.is_empty() && b_end <= d_start;
    !(stops_before || starts_after)
}

/// The tighter of two inclusive starts. Empty sorts first, so the plain byte
/// maximum already treats it as "no constraint".
fn clip_start(a: &[u8], b: &[u8]) -> Vec<u8> {
    a.max(b).to_vec()
}

/// The tighter of two exclusive stops, where empty means unbounded.
fn clip_stop(a: &[u8], b: &[u8]) -> Vec<u8> {
    match (a.is_empty(), b.is_empty()) {
        (true, _) => b.to_vec(),
        (_, true) => a.to_vec(),
        _ => a.min(b).to_vec(),
    }
}

fn is_non_empty(start: &[u8], stop: &[u8]) -> bool {
    stop.is_empty() || start < stop
}

/// Orders exclusive stops with empty (unbounded) last.
fn cmp_stop(a: &[u8], b: &[u8]) -> Ordering {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        _ => a.cmp(b),
    }
}

/// Merges strictly overlapping splits that project the same families.
/// Adjacent splits (`a.stop == b.start`) stay separate.
fn coalesce(splits: &mut Vec<Split>) {
    if splits.len() < 2 {
        return;
    }
    splits.sort_by(|a, b| {
        a.families
            .cmp(&b.families)
            .then_with(|| a.start_row.cmp(&b.start_row))
    });

    let mut merged: Vec<Split> = Vec::with_capacity(splits.len());
    for split in splits.drain(..) {
        if let Some(last) = merged.last_mut() {
            let overlapping = last.families == split.families
                && (last.stop_row.is_empty() || split.start_row < last.stop_row);
            if overlapping {
                if cmp_stop(&split.stop_row, &last.stop_row) == Ordering::Greater {
                    last.stop_row = split.stop_row;
                }
                last.descriptor_index = last.descriptor_index.min(split.descriptor_index);
                continue;
            }
        }
        merged.push(split);
    }
    *splits = merged;
}

#[cfg(test)]
mod unit {
    use super::*;

    #[test]
    fn overlap_rule_respects_open_ends() {
        assert!(overlaps(b"", b"", b"", b""));
        assert!(overlaps(b"b", b"d", b"", b"c"));
        assert!(overlaps(b"b", b"d", b"c", b""));
        assert!(!overlaps(b"a", b"c", b"c", b"e"));
        assert!(!overlaps(b"e", b"f", b"c", b"e"));
        assert!(overlaps(b"", b"b", b"a", b"c"));
        assert!(overlaps(b"d", b"", b"a", b"e"));
    }

    #[test]
    fn clip_stop_prefers_bounded_side() {
        assert_eq!(clip_stop(b"", b"k"), b"k".to_vec());
        assert_eq!(clip_stop(b"k", b""), b"k".to_vec());
        assert_eq!(clip_stop(b"j", b"k"), b"j".to_vec());
        assert!(clip_stop(b"", b"").is_empty());
    }

    #[test]
    fn degenerate_ranges_are_empty() {
        assert!(is_non_empty(b"", b""));
        assert!(is_non_empty(b"a", b""));
        assert!(is_non_empty(b"", b"a"));
        assert!(!is_non_empty(b"b", b"b"));
        assert!(!is_non_empty(b"c", b"b"));
    }
}
