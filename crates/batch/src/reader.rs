//! Reads one split, resuming after transient scan failures.
use planner::Split;
use table::{CellStore, Row, StoreError};

/// Why a split read stopped early.
#[derive(Debug)]
pub enum SplitReadError<E> {
    /// The store failed: a fatal error, or a transient one after the restart
    /// budget ran out.
    Store(StoreError),
    /// The per-row callback failed.
    Callback(E),
}

/// What a completed split read did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadSummary {
    pub rows: u64,
    pub restarts: u64,
}

/// Scans one [`Split`] and hands every row to a callback.
///
/// On a transient error the scan is reopened at the successor of the last
/// row delivered (`last_row + 0x00`), so no row is delivered twice and none
/// is skipped. At most `max_restarts` reopenings are attempted.
pub struct SplitReader<'a, S> {
    store: &'a S,
    split: &'a Split,
    max_restarts: usize,
}

impl<'a, S: CellStore> SplitReader<'a, S> {
    pub fn new(store: &'a S, split: &'a Split, max_restarts: usize) -> Self {
        Self {
            store,
            split,
            max_restarts,
        }
    }

    pub fn for_each<F, E>(&self, mut on_row: F) -> Result<ReadSummary, SplitReadError<E>>
    where
        F: FnMut(&[u8], &Row) -> Result<(), E>,
    {
        let mut summary = ReadSummary::default();
        let mut start = self.split.start_row.clone();

        loop {
            let err = match self.scan_from(&mut start, &mut summary, &mut on_row)? {
                None => return Ok(summary),
                Some(err) => err,
            };
            if !err.is_transient() || summary.restarts >= self.max_restarts as u64 {
                tracing::error!(
                    location = %self.split.location,
                    restarts = summary.restarts,
                    rows = summary.rows,
                    error = %err,
                    "abandoning split"
                );
                return Err(SplitReadError::Store(err));
            }
            summary.restarts += 1;
            tracing::warn!(
                location = %self.split.location,
                restart = summary.restarts,
                resume_at = %String::from_utf8_lossy(&start),
                error = %err,
                "restarting split scan"
            );
        }
    }

    /// Runs one scanner from `start`. Returns the store error that ended it
    /// early, if any, with `start` moved past the last delivered row.
    fn scan_from<F, E>(
        &self,
        start: &mut Vec<u8>,
        summary: &mut ReadSummary,
        on_row: &mut F,
    ) -> Result<Option<StoreError>, SplitReadError<E>>
    where
        F: FnMut(&[u8], &Row) -> Result<(), E>,
    {
        let scanner = match self.store.scan(start.as_slice(), &self.split.stop_row, &self.split.families) {
            Ok(scanner) => scanner,
            Err(err) => return Ok(Some(err)),
        };
        for item in scanner {
            let (key, row) = match item {
                Ok(entry) => entry,
                Err(err) => return Ok(Some(err)),
            };
            on_row(&key, &row).map_err(SplitReadError::Callback)?;
            summary.rows += 1;
            *start = successor(key);
        }
        Ok(None)
    }
}

/// Smallest key strictly greater than `key`.
fn successor(mut key: Vec<u8>) -> Vec<u8> {
    key.push(0x00);
    key
}
