/// Write path: `put()` and `increment()`.
///
/// Both run entirely under the table's write lock: sequence bump, WAL append
/// and row-map update happen as one step, so concurrent increments of the
/// same cell never lose an update.
use wal::WalRecord;

use crate::{decode_counter, encode_counter, Inner, StoreError, Table, MAX_KEY_SIZE, MAX_VALUE_SIZE};

fn validate(row: &[u8], family: &str) -> Result<(), StoreError> {
    if row.is_empty() {
        return Err(StoreError::InvalidCell("row key must not be empty".into()));
    }
    if row.len() > MAX_KEY_SIZE {
        return Err(StoreError::InvalidCell(format!(
            "row key too large: {} bytes (max {})",
            row.len(),
            MAX_KEY_SIZE
        )));
    }
    if family.is_empty() {
        return Err(StoreError::InvalidCell("family must not be empty".into()));
    }
    Ok(())
}

impl Inner {
    fn next_seq(&mut self) -> Result<u64, StoreError> {
        self.seq = self.seq.checked_add(1).ok_or(StoreError::SeqOverflow)?;
        Ok(self.seq)
    }

    fn log(&mut self, record: &WalRecord) -> Result<(), StoreError> {
        if let Some(w) = self.wal_writer.as_mut() {
            w.append(record)?;
        }
        Ok(())
    }

    pub(crate) fn apply_put(&mut self, row: Vec<u8>, family: String, qualifier: String, value: Vec<u8>) {
        self.rows
            .entry(row)
            .or_default()
            .entry(family)
            .or_default()
            .insert(qualifier, value);
    }

    /// Adds `delta` to the cell, returning the new value. A missing cell
    /// counts as zero.
    pub(crate) fn apply_incr(
        &mut self,
        row: &[u8],
        family: &str,
        qualifier: &str,
        delta: u64,
    ) -> Result<u64, StoreError> {
        let current = match self
            .rows
            .get(row)
            .and_then(|r| r.get(family))
            .and_then(|f| f.get(qualifier))
        {
            None => 0,
            Some(v) => decode_counter(v).ok_or_else(|| StoreError::NotACounter {
                family: family.to_string(),
                qualifier: qualifier.to_string(),
                len: v.len(),
            })?,
        };
        let next = current
            .checked_add(delta)
            .ok_or_else(|| StoreError::CounterOverflow {
                family: family.to_string(),
                qualifier: qualifier.to_string(),
            })?;
        self.apply_put(
            row.to_vec(),
            family.to_string(),
            qualifier.to_string(),
            encode_counter(next).to_vec(),
        );
        Ok(next)
    }
}

impl Table {
    /// Overwrites one cell. The record hits the WAL before the row map.
    pub(crate) fn put_cell(&self, row: &[u8], family: &str, qualifier: &str, value: &[u8]) -> Result<(), StoreError> {
        validate(row, family)?;
        if value.len() > MAX_VALUE_SIZE {
            return Err(StoreError::InvalidCell(format!(
                "value too large: {} bytes (max {})",
                value.len(),
                MAX_VALUE_SIZE
            )));
        }

        let mut inner = self.inner.write();
        let seq = inner.next_seq()?;
        inner.log(&WalRecord::Put {
            seq,
            row: row.to_vec(),
            family: family.as_bytes().to_vec(),
            qualifier: qualifier.as_bytes().to_vec(),
            value: value.to_vec(),
        })?;
        inner.apply_put(row.to_vec(), family.to_string(), qualifier.to_string(), value.to_vec());
        Ok(())
    }

    /// Atomic add-and-return on a big-endian counter cell.
    ///
    /// The delta is checked against the current value before it is logged,
    /// so a rejected increment leaves neither the WAL nor the row map
    /// changed.
    pub(crate) fn increment_cell(
        &self,
        row: &[u8],
        family: &str,
        qualifier: &str,
        delta: u64,
    ) -> Result<u64, StoreError> {
        validate(row, family)?;
        if self.faults.arm_increment() {
            return Err(StoreError::Transient("injected increment failure".to_string()));
        }

        let mut inner = self.inner.write();
        if let Some(v) = inner
            .rows
            .get(row)
            .and_then(|r| r.get(family))
            .and_then(|f| f.get(qualifier))
        {
            let current = decode_counter(v).ok_or_else(|| StoreError::NotACounter {
                family: family.to_string(),
                qualifier: qualifier.to_string(),
                len: v.len(),
            })?;
            if current.checked_add(delta).is_none() {
                return Err(StoreError::CounterOverflow {
                    family: family.to_string(),
                    qualifier: qualifier.to_string(),
                });
            }
        }

        let seq = inner.next_seq()?;
        inner.log(&WalRecord::Incr {
            seq,
            row: row.to_vec(),
            family: family.as_bytes().to_vec(),
            qualifier: qualifier.as_bytes().to_vec(),
            delta,
        })?;
        inner.apply_incr(row, family, qualifier, delta)
    }
}
