/// Read path: `get()`, `get_row()` and `scan()`.
///
/// Reads take the shared lock only long enough to copy what they need. A
/// scan copies its whole range up front, so a scanner is a point-in-time
/// snapshot that never blocks writers while it is being consumed.
use std::collections::BTreeMap;
use std::ops::Bound;

use crate::{Row, ScanItem, StoreError, Table};

/// A boxed scan iterator. Items are rows in ascending key order; an `Err`
/// item ends the scan.
pub type Scanner<'a> = Box<dyn Iterator<Item = ScanItem> + Send + 'a>;

impl Table {
    pub(crate) fn get_cell(&self, row: &[u8], family: &str, qualifier: &str) -> Option<Vec<u8>> {
        self.inner
            .read()
            .rows
            .get(row)
            .and_then(|r| r.get(family))
            .and_then(|f| f.get(qualifier))
            .cloned()
    }

    pub(crate) fn read_row(&self, row: &[u8]) -> Option<Row> {
        self.inner.read().rows.get(row).cloned()
    }

    pub(crate) fn open_scanner(&self, start: &[u8], stop: &[u8], families: &[String]) -> Scanner<'_> {
        let lower = if start.is_empty() {
            Bound::Unbounded
        } else {
            Bound::Included(start)
        };
        let upper = if stop.is_empty() {
            Bound::Unbounded
        } else {
            Bound::Excluded(stop)
        };

        // BTreeMap::range panics on an inverted range
        let inverted = !start.is_empty() && !stop.is_empty() && start >= stop;

        let snapshot: Vec<(Vec<u8>, Row)> = if inverted {
            Vec::new()
        } else {
            let inner = self.inner.read();
            inner
                .rows
                .range::<[u8], _>((lower, upper))
                .filter_map(|(key, row)| project(row, families).map(|r| (key.clone(), r)))
                .collect()
        };

        tracing::debug!(
            table = %self.name(),
            rows = snapshot.len(),
            "opened scanner"
        );

        let fault_after = self.faults.arm_scan();
        Box::new(FaultingScan {
            rows: snapshot.into_iter(),
            yielded: 0,
            fault_after,
            done: false,
        })
    }
}

/// Keeps only `families` (all when empty); `None` when nothing is left.
fn project(row: &Row, families: &[String]) -> Option<Row> {
    if families.is_empty() {
        return (!row.is_empty()).then(|| row.clone());
    }
    let projected: Row = row
        .iter()
        .filter(|(family, _)| families.iter().any(|f| f == *family))
        .map(|(family, cells)| (family.clone(), cells.clone()))
        .collect::<BTreeMap<_, _>>();
    (!projected.is_empty()).then_some(projected)
}

struct FaultingScan {
    rows: std::vec::IntoIter<(Vec<u8>, Row)>,
    yielded: usize,
    fault_after: Option<usize>,
    done: bool,
}

impl Iterator for FaultingScan {
    type Item = ScanItem;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.fault_after == Some(self.yielded) {
            self.done = true;
            return Some(Err(StoreError::Transient(format!(
                "scanner lost after {} rows",
                self.yielded
            ))));
        }
        let item = self.rows.next()?;
        self.yielded += 1;
        Some(Ok(item))
    }
}
