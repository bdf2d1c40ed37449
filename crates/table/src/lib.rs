//! # Table - region-partitioned column-family store
//!
//! The sorted key-value substrate the counting system runs on. Rows are kept
//! in key order, each row holds cells addressed by `(family, qualifier)`, and
//! the key space is cut into regions at configured split points.
//!
//! ## Architecture
//!
//! ```text
//! Client
//!   |
//!   v
//! ┌───────────────────────────────────────────────┐
//! │                    TABLE                      │
//! │                                               │
//! │ write.rs → WAL append → row map update        │
//! │            (put, increment: one write lock)   │
//! │                                               │
//! │ read.rs  → get / get_row / scan snapshot      │
//! │                                               │
//! │ region.rs → split points → PartitionBoundary  │
//! │                                               │
//! │ recovery.rs → WAL replay on open              │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Module Responsibilities
//!
//! | Module       | Purpose                                            |
//! |--------------|----------------------------------------------------|
//! | [`lib.rs`]   | `Table`, `CellStore`, `StoreError`, constructors   |
//! | [`write`]    | `put()`, `increment()`                             |
//! | [`read`]     | `get()`, `get_row()`, `scan()`                     |
//! | [`region`]   | region boundaries from split points                |
//! | [`recovery`] | WAL replay                                         |
//! | [`fault`]    | injected transient scan failures                   |
//!
//! ## Counters
//!
//! A counter is a cell holding exactly 8 bytes, a big-endian `u64`. It is
//! created at zero by its first increment. Increments run under the table's
//! write lock, so add-and-return is atomic across threads.
mod fault;
mod read;
mod recovery;
mod region;
mod write;

use parking_lot::RwLock;
use planner::PartitionBoundary;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use wal::{WalError, WalWriter};

pub use fault::FaultInjector;
pub use read::Scanner;
pub use recovery::replay_wal_into;
pub use region::build_regions;

/// Maximum allowed row key size in bytes (64 KiB).
pub const MAX_KEY_SIZE: usize = 64 * 1024;
/// Maximum allowed cell value size in bytes (10 MiB).
pub const MAX_VALUE_SIZE: usize = 10 * 1024 * 1024;

/// Cells of one row: family → qualifier → value.
pub type Row = BTreeMap<String, BTreeMap<String, Vec<u8>>>;

/// One item yielded by a scan.
pub type ScanItem = Result<(Vec<u8>, Row), StoreError>;

/// Errors raised by the store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("wal error: {0}")]
    Wal(#[from] WalError),

    /// A retryable failure. Readers may reopen the scan and continue.
    #[error("transient store failure: {0}")]
    Transient(String),

    #[error("invalid cell: {0}")]
    InvalidCell(String),

    /// Increment on a cell that does not hold an 8-byte counter.
    #[error("cell {family}:{qualifier} is not a counter ({len} bytes)")]
    NotACounter {
        family: String,
        qualifier: String,
        len: usize,
    },

    #[error("counter {family}:{qualifier} would overflow")]
    CounterOverflow { family: String, qualifier: String },

    #[error("sequence number overflow")]
    SeqOverflow,
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }
}

/// The storage operations the counting system consumes.
///
/// Every method takes `&self`; implementations synchronise internally so one
/// store can be shared across worker threads.
pub trait CellStore: Send + Sync {
    /// Point lookup of one cell.
    fn get(&self, row: &[u8], family: &str, qualifier: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Full-row read; `None` when the row has no cells.
    fn get_row(&self, row: &[u8]) -> Result<Option<Row>, StoreError>;

    fn exists(&self, row: &[u8], family: &str, qualifier: &str) -> Result<bool, StoreError> {
        Ok(self.get(row, family, qualifier)?.is_some())
    }

    /// Overwrites one cell.
    fn put(&self, row: &[u8], family: &str, qualifier: &str, value: &[u8]) -> Result<(), StoreError>;

    /// Atomically adds `delta` to a counter cell and returns the new value.
    fn increment(&self, row: &[u8], family: &str, qualifier: &str, delta: u64) -> Result<u64, StoreError>;

    /// Rows in `[start, stop)` (empty bounds open), projected onto
    /// `families` (empty = all families). Rows without a projected cell are
    /// skipped.
    fn scan(&self, start: &[u8], stop: &[u8], families: &[String]) -> Result<Scanner<'_>, StoreError>;

    /// The regions the table is partitioned into, in key order.
    fn partition_boundaries(&self) -> Result<Vec<PartitionBoundary>, StoreError>;
}

impl<T: CellStore + ?Sized> CellStore for Arc<T> {
    fn get(&self, row: &[u8], family: &str, qualifier: &str) -> Result<Option<Vec<u8>>, StoreError> {
        (**self).get(row, family, qualifier)
    }

    fn get_row(&self, row: &[u8]) -> Result<Option<Row>, StoreError> {
        (**self).get_row(row)
    }

    fn exists(&self, row: &[u8], family: &str, qualifier: &str) -> Result<bool, StoreError> {
        (**self).exists(row, family, qualifier)
    }

    fn put(&self, row: &[u8], family: &str, qualifier: &str, value: &[u8]) -> Result<(), StoreError> {
        (**self).put(row, family, qualifier, value)
    }

    fn increment(&self, row: &[u8], family: &str, qualifier: &str, delta: u64) -> Result<u64, StoreError> {
        (**self).increment(row, family, qualifier, delta)
    }

    fn scan(&self, start: &[u8], stop: &[u8], families: &[String]) -> Result<Scanner<'_>, StoreError> {
        (**self).scan(start, stop, families)
    }

    fn partition_boundaries(&self) -> Result<Vec<PartitionBoundary>, StoreError> {
        (**self).partition_boundaries()
    }
}

pub(crate) struct Inner {
    pub(crate) rows: BTreeMap<Vec<u8>, Row>,
    /// Current monotonic sequence number.
    pub(crate) seq: u64,
    /// `None` for purely in-memory tables.
    pub(crate) wal_writer: Option<WalWriter>,
}

/// A named, region-partitioned table.
///
/// # Write Path
///
/// 1. Validate the cell address.
/// 2. Take the write lock and bump the sequence number.
/// 3. Append the record to the WAL (when the table is durable).
/// 4. Apply the mutation to the row map.
///
/// # Recovery
///
/// [`Table::open`] replays the WAL into an empty row map before opening the
/// writer in append mode.
pub struct Table {
    name: String,
    pub(crate) inner: RwLock<Inner>,
    regions: Vec<PartitionBoundary>,
    wal_path: Option<PathBuf>,
    pub(crate) faults: FaultInjector,
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("Table")
            .field("name", &self.name)
            .field("seq", &inner.seq)
            .field("rows", &inner.rows.len())
            .field("regions", &self.regions.len())
            .field("wal_path", &self.wal_path)
            .finish()
    }
}

impl Table {
    /// Opens (or creates) a durable table whose WAL lives at `wal_path`.
    ///
    /// `split_points` cut the key space into `split_points.len() + 1`
    /// regions; they are sorted and deduplicated, and empty points dropped.
    pub fn open<P: AsRef<Path>>(
        name: impl Into<String>,
        wal_path: P,
        split_points: &[Vec<u8>],
        wal_sync: bool,
    ) -> Result<Self, StoreError> {
        let name = name.into();
        let wal_path = wal_path.as_ref().to_path_buf();
        if let Some(parent) = wal_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        // replay before opening the writer
        let mut rows = BTreeMap::new();
        let seq = replay_wal_into(&wal_path, &mut rows)?;
        let wal_writer = WalWriter::create(&wal_path, wal_sync)?;

        let regions = build_regions(&name, split_points);
        tracing::info!(
            table = %name,
            rows = rows.len(),
            seq,
            regions = regions.len(),
            "opened table"
        );

        Ok(Self {
            name,
            inner: RwLock::new(Inner {
                rows,
                seq,
                wal_writer: Some(wal_writer),
            }),
            regions,
            wal_path: Some(wal_path),
            faults: FaultInjector::default(),
        })
    }

    /// A table with no WAL. Contents are lost on drop.
    pub fn in_memory(name: impl Into<String>, split_points: &[Vec<u8>]) -> Self {
        let name = name.into();
        let regions = build_regions(&name, split_points);
        Self {
            name,
            inner: RwLock::new(Inner {
                rows: BTreeMap::new(),
                seq: 0,
                wal_writer: None,
            }),
            regions,
            wal_path: None,
            faults: FaultInjector::default(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the current monotonic sequence number.
    #[must_use]
    pub fn seq(&self) -> u64 {
        self.inner.read().seq
    }

    /// Number of rows holding at least one cell.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.inner.read().rows.len()
    }

    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.inner
            .read()
            .rows
            .values()
            .flat_map(|row| row.values())
            .map(BTreeMap::len)
            .sum()
    }

    #[must_use]
    pub fn regions(&self) -> &[PartitionBoundary] {
        &self.regions
    }

    /// Fault controls for this table's scanners.
    pub fn faults(&self) -> &FaultInjector {
        &self.faults
    }

    /// Forces buffered WAL data to disk. No-op for in-memory tables.
    pub fn sync(&self) -> Result<(), StoreError> {
        if let Some(w) = self.inner.write().wal_writer.as_mut() {
            w.sync_to_disk()?;
        }
        Ok(())
    }
}

impl CellStore for Table {
    fn get(&self, row: &[u8], family: &str, qualifier: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.get_cell(row, family, qualifier))
    }

    fn get_row(&self, row: &[u8]) -> Result<Option<Row>, StoreError> {
        Ok(self.read_row(row))
    }

    fn put(&self, row: &[u8], family: &str, qualifier: &str, value: &[u8]) -> Result<(), StoreError> {
        self.put_cell(row, family, qualifier, value)
    }

    fn increment(&self, row: &[u8], family: &str, qualifier: &str, delta: u64) -> Result<u64, StoreError> {
        self.increment_cell(row, family, qualifier, delta)
    }

    fn scan(&self, start: &[u8], stop: &[u8], families: &[String]) -> Result<Scanner<'_>, StoreError> {
        Ok(self.open_scanner(start, stop, families))
    }

    fn partition_boundaries(&self) -> Result<Vec<PartitionBoundary>, StoreError> {
        Ok(self.regions.clone())
    }
}

/// Decodes an 8-byte big-endian counter cell.
pub fn decode_counter(value: &[u8]) -> Option<u64> {
    let bytes: [u8; 8] = value.try_into().ok()?;
    Some(u64::from_be_bytes(bytes))
}

pub fn encode_counter(value: u64) -> [u8; 8] {
    value.to_be_bytes()
}

#[cfg(test)]
mod tests;
