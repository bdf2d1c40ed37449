//! # WAL - Write-Ahead Log
//!
//! Crash-safe durability for the counting table.
//!
//! Every cell mutation (`PUT` of a marker value or `INCR` of a counter) is
//! serialized into a binary record and appended to the WAL **before** the
//! in-memory table is touched. On open the WAL is replayed to rebuild the
//! table, so no acknowledged write or increment is lost.
//!
//! ## Binary Record Format
//!
//! ```text
//! [record_len: u32 LE][crc32: u32 LE][body ...]
//! ```
//!
//! Body (Put):  `[seq: u64][op=0: u8][cell][val_len: u32][value]`
//! Body (Incr): `[seq: u64][op=1: u8][cell][delta: u64]`
//!
//! where `cell` is `[row_len: u32][row][family_len: u32][family][qualifier_len: u32][qualifier]`.
//!
//! `record_len` includes the 4-byte CRC but **not** itself.
//!
//! ## Example
//!
//! ```rust,no_run
//! use wal::{WalWriter, WalReader, WalRecord};
//!
//! let mut w = WalWriter::create("wal.log", true).unwrap();
//! w.append(&WalRecord::Incr {
//!     seq: 1,
//!     row: b"20240101FF10Linux".to_vec(),
//!     family: b"os".to_vec(),
//!     qualifier: b"count".to_vec(),
//!     delta: 1,
//! }).unwrap();
//! drop(w);
//!
//! let mut r = WalReader::open("wal.log").unwrap();
//! r.replay(|rec| println!("{:?}", rec)).unwrap();
//! ```

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use crc32fast::Hasher as Crc32;
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, Read, Write};
use std::path::Path;

use thiserror::Error;

const OP_PUT: u8 = 0;
const OP_INCR: u8 = 1;

/// Records larger than this are treated as corruption on replay.
const MAX_RECORD_SIZE: u32 = 64 * 1024 * 1024;

/// A single WAL record: one mutation of one cell.
///
/// Each record carries the table's monotonically increasing sequence number,
/// so replay can restore the counter the table hands out next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalRecord {
    /// Overwrite a cell with a value.
    Put {
        seq: u64,
        row: Vec<u8>,
        family: Vec<u8>,
        qualifier: Vec<u8>,
        value: Vec<u8>,
    },
    /// Add `delta` to a big-endian counter cell, creating it at zero.
    Incr {
        seq: u64,
        row: Vec<u8>,
        family: Vec<u8>,
        qualifier: Vec<u8>,
        delta: u64,
    },
}

impl WalRecord {
    pub fn seq(&self) -> u64 {
        match self {
            WalRecord::Put { seq, .. } | WalRecord::Incr { seq, .. } => *seq,
        }
    }
}

/// Errors that can occur during WAL operations.
#[derive(Debug, Error)]
pub enum WalError {
    /// An underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// A record failed CRC validation or contained an unknown op code.
    #[error("corrupt record")]
    Corrupt,
}

/// Append-only WAL writer.
///
/// Records are serialized into a scratch buffer, CRC-checksummed, and written
/// to the file in a single `write_all`. With `sync` every append is followed
/// by `sync_all()`.
pub struct WalWriter {
    file: File,
    sync: bool,
    buf: Vec<u8>,
}

impl WalWriter {
    /// Opens (or creates) a WAL file in append mode.
    pub fn create<P: AsRef<Path>>(path: P, sync: bool) -> Result<Self, WalError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(path)?;
        Ok(Self {
            file,
            sync,
            buf: Vec::with_capacity(256),
        })
    }

    /// Serializes `record` and appends it to the WAL file.
    pub fn append(&mut self, record: &WalRecord) -> Result<(), WalError> {
        self.buf.clear();
        // frame header (record_len + crc), filled in below
        self.buf.extend_from_slice(&[0u8; 8]);

        match record {
            WalRecord::Put {
                seq,
                row,
                family,
                qualifier,
                value,
            } => {
                self.buf.write_u64::<LittleEndian>(*seq)?;
                self.buf.write_u8(OP_PUT)?;
                write_cell(&mut self.buf, row, family, qualifier)?;
                write_bytes(&mut self.buf, value)?;
            }
            WalRecord::Incr {
                seq,
                row,
                family,
                qualifier,
                delta,
            } => {
                self.buf.write_u64::<LittleEndian>(*seq)?;
                self.buf.write_u8(OP_INCR)?;
                write_cell(&mut self.buf, row, family, qualifier)?;
                self.buf.write_u64::<LittleEndian>(*delta)?;
            }
        }

        let body = &self.buf[8..];
        let mut hasher = Crc32::new();
        hasher.update(body);
        let crc = hasher.finalize();

        let record_len = (body.len() as u64) + 4;
        if record_len > u64::from(MAX_RECORD_SIZE) {
            return Err(WalError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                "WAL record too large",
            )));
        }

        self.buf[0..4].copy_from_slice(&(record_len as u32).to_le_bytes());
        self.buf[4..8].copy_from_slice(&crc.to_le_bytes());

        self.file.write_all(&self.buf)?;
        self.file.flush()?;

        if self.sync {
            self.file.sync_all()?;
        }

        Ok(())
    }

    /// Forces buffered data to disk. Useful in batched (`sync == false`) mode.
    pub fn sync_to_disk(&mut self) -> Result<(), WalError> {
        self.file.flush()?;
        self.file.sync_all()?;
        Ok(())
    }
}

fn write_bytes(buf: &mut Vec<u8>, bytes: &[u8]) -> io::Result<()> {
    buf.write_u32::<LittleEndian>(bytes.len() as u32)?;
    buf.extend_from_slice(bytes);
    Ok(())
}

fn write_cell(buf: &mut Vec<u8>, row: &[u8], family: &[u8], qualifier: &[u8]) -> io::Result<()> {
    write_bytes(buf, row)?;
    write_bytes(buf, family)?;
    write_bytes(buf, qualifier)
}

/// Sequential WAL reader.
///
/// Generic over any `Read`, so tests can replay in-memory buffers. Every
/// record's CRC32 is verified. A truncated tail record (crash mid-write) is a
/// clean EOF: all complete records before it are still returned.
pub struct WalReader<R: Read> {
    rdr: BufReader<R>,
}

impl WalReader<File> {
    /// Opens an existing WAL file for sequential replay.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<WalReader<File>, WalError> {
        let f = File::open(path)?;
        Ok(WalReader {
            rdr: BufReader::new(f),
        })
    }
}

impl<R: Read> WalReader<R> {
    pub fn from_reader(reader: R) -> Self {
        WalReader {
            rdr: BufReader::new(reader),
        }
    }

    /// Replays every valid record in the WAL, calling `apply` for each one.
    ///
    /// # Termination
    ///
    /// - **Clean EOF** or **truncated tail** -> `Ok(())`.
    /// - **CRC mismatch**, **unknown op code**, **impossible lengths** ->
    ///   `Err(WalError::Corrupt)`.
    /// - **I/O error** -> `Err(WalError::Io(...))`.
    pub fn replay<F>(&mut self, mut apply: F) -> Result<(), WalError>
    where
        F: FnMut(WalRecord),
    {
        let mut body = Vec::with_capacity(256);

        loop {
            let record_len = match self.rdr.read_u32::<LittleEndian>() {
                Ok(v) => v,
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(()),
                Err(e) => return Err(WalError::Io(e)),
            };

            if record_len <= 4 || record_len > MAX_RECORD_SIZE {
                return Err(WalError::Corrupt);
            }

            let crc = match self.rdr.read_u32::<LittleEndian>() {
                Ok(v) => v,
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(()),
                Err(e) => return Err(WalError::Io(e)),
            };

            let body_len = (record_len - 4) as usize;
            body.clear();
            body.resize(body_len, 0);
            match self.rdr.read_exact(&mut body) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(()),
                Err(e) => return Err(WalError::Io(e)),
            }

            let mut hasher = Crc32::new();
            hasher.update(&body);
            if hasher.finalize() != crc {
                return Err(WalError::Corrupt);
            }

            apply(decode_body(&body)?);
        }
    }
}

fn read_bytes(br: &mut &[u8]) -> Result<Vec<u8>, WalError> {
    let len = br.read_u32::<LittleEndian>().map_err(|_| WalError::Corrupt)? as usize;
    if len > br.len() {
        return Err(WalError::Corrupt);
    }
    let (head, tail) = br.split_at(len);
    let out = head.to_vec();
    *br = tail;
    Ok(out)
}

/// Parses a CRC-verified body. Any short read inside a verified body means the
/// writer and reader disagree on the format, which is corruption.
fn decode_body(body: &[u8]) -> Result<WalRecord, WalError> {
    let mut br = body;
    let seq = br.read_u64::<LittleEndian>().map_err(|_| WalError::Corrupt)?;
    let op = br.read_u8().map_err(|_| WalError::Corrupt)?;
    let row = read_bytes(&mut br)?;
    let family = read_bytes(&mut br)?;
    let qualifier = read_bytes(&mut br)?;

    match op {
        OP_PUT => {
            let value = read_bytes(&mut br)?;
            Ok(WalRecord::Put {
                seq,
                row,
                family,
                qualifier,
                value,
            })
        }
        OP_INCR => {
            let delta = br.read_u64::<LittleEndian>().map_err(|_| WalError::Corrupt)?;
            Ok(WalRecord::Incr {
                seq,
                row,
                family,
                qualifier,
                delta,
            })
        }
        _ => Err(WalError::Corrupt),
    }
}

#[cfg(test)]
mod tests;
