/// WAL replay on open.
use std::collections::BTreeMap;
use std::path::Path;

use wal::{WalError, WalReader, WalRecord};

use crate::{Inner, Row, StoreError};

/// Replays the WAL at `path` into `rows`, returning the highest sequence
/// number seen.
///
/// A missing WAL is a fresh table (`Ok(0)`).
///
/// # Errors
///
/// I/O and corruption errors from [`WalReader::replay`]; a record whose
/// family or qualifier is not UTF-8 or that cannot be applied (an increment
/// over a non-counter cell) is reported as corruption too.
pub fn replay_wal_into<P: AsRef<Path>>(path: P, rows: &mut BTreeMap<Vec<u8>, Row>) -> Result<u64, StoreError> {
    let mut reader = match WalReader::open(path.as_ref()) {
        Ok(r) => r,
        Err(WalError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };

    let mut inner = Inner {
        rows: std::mem::take(rows),
        seq: 0,
        wal_writer: None,
    };
    let mut failure: Option<StoreError> = None;
    let mut replayed = 0usize;

    reader.replay(|record| {
        if failure.is_some() {
            return;
        }
        inner.seq = inner.seq.max(record.seq());
        if let Err(e) = apply(&mut inner, record) {
            failure = Some(e);
        } else {
            replayed += 1;
        }
    })?;

    *rows = inner.rows;
    if let Some(e) = failure {
        return Err(e);
    }
    tracing::debug!(path = %path.as_ref().display(), replayed, seq = inner.seq, "replayed wal");
    Ok(inner.seq)
}

fn utf8(bytes: Vec<u8>) -> Result<String, StoreError> {
    String::from_utf8(bytes).map_err(|_| StoreError::Wal(WalError::Corrupt))
}

fn apply(inner: &mut Inner, record: WalRecord) -> Result<(), StoreError> {
    match record {
        WalRecord::Put {
            row,
            family,
            qualifier,
            value,
            ..
        } => {
            inner.apply_put(row, utf8(family)?, utf8(qualifier)?, value);
        }
        WalRecord::Incr {
            row,
            family,
            qualifier,
            delta,
            ..
        } => {
            let family = utf8(family)?;
            let qualifier = utf8(qualifier)?;
            inner
                .apply_incr(&row, &family, &qualifier, delta)
                .map_err(|_| StoreError::Wal(WalError::Corrupt))?;
        }
    }
    Ok(())
}
