/// Injected transient failures for scanners and increments.
///
/// A real store loses scanners to lease expiry and region moves, and
/// increments to timeouts. Tests (and the shell's `FAULT` command) arm a
/// number of failures: each of the next scanners opened yields `after_rows`
/// rows and then a [`StoreError::Transient`](crate::StoreError::Transient);
/// each of the next increments fails before it is logged.
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct FaultInjector {
    remaining: AtomicUsize,
    after_rows: AtomicUsize,
    increments: AtomicUsize,
}

fn take_one(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

impl FaultInjector {
    /// Makes the next `failures` scanners fail after `after_rows` rows.
    pub fn fail_scans(&self, failures: usize, after_rows: usize) {
        self.after_rows.store(after_rows, Ordering::SeqCst);
        self.remaining.store(failures, Ordering::SeqCst);
    }

    /// Makes the next `failures` increments fail without applying.
    pub fn fail_increments(&self, failures: usize) {
        self.increments.store(failures, Ordering::SeqCst);
    }

    pub fn clear(&self) {
        self.remaining.store(0, Ordering::SeqCst);
        self.increments.store(0, Ordering::SeqCst);
    }

    /// Armed scan and increment failures not yet consumed.
    pub fn pending(&self) -> usize {
        self.remaining.load(Ordering::SeqCst) + self.increments.load(Ordering::SeqCst)
    }

    /// Consumes one armed scan failure, if any, returning its row offset.
    pub(crate) fn arm_scan(&self) -> Option<usize> {
        take_one(&self.remaining).then(|| self.after_rows.load(Ordering::SeqCst))
    }

    /// Consumes one armed increment failure, if any.
    pub(crate) fn arm_increment(&self) -> bool {
        take_one(&self.increments)
    }
}
