use super::*;
use std::fs;
use std::io::Cursor;
use tempfile::tempdir;

// -------------------- Helpers --------------------

fn make_put(seq: u64, row: &[u8], value: &[u8]) -> WalRecord {
    WalRecord::Put {
        seq,
        row: row.to_vec(),
        family: b"os".to_vec(),
        qualifier: b"name".to_vec(),
        value: value.to_vec(),
    }
}

fn make_incr(seq: u64, row: &[u8], qualifier: &[u8], delta: u64) -> WalRecord {
    WalRecord::Incr {
        seq,
        row: row.to_vec(),
        family: b"arch".to_vec(),
        qualifier: qualifier.to_vec(),
        delta,
    }
}

fn replay_all(path: &std::path::Path) -> Result<Vec<WalRecord>, WalError> {
    let mut reader = WalReader::open(path)?;
    let mut recs = Vec::new();
    reader.replay(|r| recs.push(r))?;
    Ok(recs)
}

fn replay_from_bytes(data: &[u8]) -> Result<Vec<WalRecord>, WalError> {
    let mut reader = WalReader::from_reader(Cursor::new(data.to_vec()));
    let mut recs = Vec::new();
    reader.replay(|r| recs.push(r))?;
    Ok(recs)
}

// -------------------- Basic write & replay --------------------

#[test]
fn write_and_replay_put_and_incr() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("wal.log");

    {
        let mut w = WalWriter::create(&path, true).unwrap();
        w.append(&make_put(1, b"20240101FF10Linux", b"Linux")).unwrap();
        w.append(&make_incr(2, b"20240101FF10Linux", b"x86 with 4 cores", 1)).unwrap();
        w.append(&make_incr(3, b"20240101FF10Linux", b"x86 with 4 cores", 2)).unwrap();
    }

    let recs = replay_all(&path).unwrap();
    assert_eq!(
        recs,
        vec![
            make_put(1, b"20240101FF10Linux", b"Linux"),
            make_incr(2, b"20240101FF10Linux", b"x86 with 4 cores", 1),
            make_incr(3, b"20240101FF10Linux", b"x86 with 4 cores", 2),
        ]
    );
    assert_eq!(recs.iter().map(WalRecord::seq).collect::<Vec<_>>(), vec![1, 2, 3]);
}

#[test]
fn append_to_existing_wal() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("wal.log");

    {
        let mut w = WalWriter::create(&path, true).unwrap();
        w.append(&make_incr(1, b"a", b"q", 1)).unwrap();
    }
    {
        let mut w = WalWriter::create(&path, true).unwrap();
        w.append(&make_incr(2, b"b", b"q", 5)).unwrap();
    }

    let recs = replay_all(&path).unwrap();
    assert_eq!(recs, vec![make_incr(1, b"a", b"q", 1), make_incr(2, b"b", b"q", 5)]);
}

// -------------------- Truncated tail tolerance --------------------

#[test]
fn truncated_tail_after_valid_records() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("wal.log");

    {
        let mut w = WalWriter::create(&path, true).unwrap();
        w.append(&make_put(1, b"k1", b"v1")).unwrap();
        w.append(&make_incr(2, b"k2", b"q", 7)).unwrap();
    }

    // record_len header with no body behind it
    let mut data = fs::read(&path).unwrap();
    data.extend_from_slice(&[0x20, 0x00, 0x00, 0x00]);
    fs::write(&path, &data).unwrap();

    let recs = replay_all(&path).unwrap();
    assert_eq!(recs.len(), 2);
    assert_eq!(recs[1], make_incr(2, b"k2", b"q", 7));
}

#[test]
fn truncated_body_after_crc() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("wal.log");

    {
        let mut w = WalWriter::create(&path, true).unwrap();
        w.append(&make_put(1, b"k", b"v")).unwrap();
    }

    let mut data = fs::read(&path).unwrap();
    data.extend_from_slice(&[0x20, 0x00, 0x00, 0x00]);
    data.extend_from_slice(&[0xAA, 0xBB, 0xCC, 0xDD]);
    data.extend_from_slice(&[0x01, 0x02]);
    fs::write(&path, &data).unwrap();

    let recs = replay_all(&path).unwrap();
    assert_eq!(recs, vec![make_put(1, b"k", b"v")]);
}

#[test]
fn torn_final_write_keeps_earlier_records() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("wal.log");

    {
        let mut w = WalWriter::create(&path, true).unwrap();
        w.append(&make_incr(1, b"row", b"q", 1)).unwrap();
        w.append(&make_incr(2, b"row", b"q", 1)).unwrap();
    }

    let data = fs::read(&path).unwrap();
    fs::write(&path, &data[..data.len() - 3]).unwrap();

    let recs = replay_all(&path).unwrap();
    assert_eq!(recs, vec![make_incr(1, b"row", b"q", 1)]);
}

// -------------------- Empty WAL --------------------

#[test]
fn replay_empty_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("wal.log");
    fs::write(&path, b"").unwrap();

    assert!(replay_all(&path).unwrap().is_empty());
}

#[test]
fn replay_empty_in_memory() {
    assert!(replay_from_bytes(b"").unwrap().is_empty());
}

#[test]
fn open_non_existent_file_return_error() {
    let dir = tempdir().unwrap();
    let result = WalReader::open(dir.path().join("missing.log"));
    assert!(matches!(result, Err(WalError::Io(_))));
}

#[test]
fn sync_to_disk_does_not_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("wal.log");

    let mut w = WalWriter::create(&path, false).unwrap();
    w.append(&make_incr(1, b"k", b"q", 1)).unwrap();
    w.sync_to_disk().unwrap();
}

#[test]
fn empty_row_and_value() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("wal.log");

    {
        let mut w = WalWriter::create(&path, true).unwrap();
        w.append(&make_put(1, b"", b"")).unwrap();
    }

    assert_eq!(replay_all(&path).unwrap(), vec![make_put(1, b"", b"")]);
}

// -------------------- Corruption detection --------------------

#[test]
fn corrupt_crc_mismatch() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("wal.log");

    {
        let mut w = WalWriter::create(&path, true).unwrap();
        w.append(&make_put(1, b"k", b"v")).unwrap();
    }

    let mut data = fs::read(&path).unwrap();
    let last = data.len() - 1;
    data[last] ^= 0xFF;
    fs::write(&path, &data).unwrap();

    assert!(matches!(replay_all(&path), Err(WalError::Corrupt)));
}

fn frame(body: &[u8]) -> Vec<u8> {
    let mut hasher = Crc32::new();
    hasher.update(body);
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&((body.len() + 4) as u32).to_le_bytes());
    bytes.extend_from_slice(&hasher.finalize().to_le_bytes());
    bytes.extend_from_slice(body);
    bytes
}

#[test]
fn unknown_op_is_corruption() {
    let mut body = Vec::new();
    body.extend_from_slice(&1u64.to_le_bytes());
    body.push(9);
    for part in [&b"r"[..], &b"f"[..], &b"q"[..]] {
        body.extend_from_slice(&(part.len() as u32).to_le_bytes());
        body.extend_from_slice(part);
    }
    body.extend_from_slice(&1u64.to_le_bytes());

    assert!(matches!(replay_from_bytes(&frame(&body)), Err(WalError::Corrupt)));
}

#[test]
fn length_past_body_is_corruption() {
    let mut body = Vec::new();
    body.extend_from_slice(&1u64.to_le_bytes());
    body.push(OP_INCR);
    body.extend_from_slice(&1000u32.to_le_bytes());
    body.extend_from_slice(b"short");

    assert!(matches!(replay_from_bytes(&frame(&body)), Err(WalError::Corrupt)));
}

#[test]
fn corrupt_record_len_too_small() {
    assert!(matches!(replay_from_bytes(&[0, 0, 0, 0]), Err(WalError::Corrupt)));
    assert!(matches!(replay_from_bytes(&[3, 0, 0, 0]), Err(WalError::Corrupt)));
}

// -------------------- Edge tests --------------------

#[test]
fn binary_row_and_max_delta() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("wal.log");
    let row = vec![0x00u8, 0xFF, 0x80];

    {
        let mut w = WalWriter::create(&path, true).unwrap();
        w.append(&make_incr(u64::MAX, &row, b"q\x02v1", u64::MAX)).unwrap();
    }

    assert_eq!(
        replay_all(&path).unwrap(),
        vec![make_incr(u64::MAX, &row, b"q\x02v1", u64::MAX)]
    );
}

// -------------------- Stress tests --------------------

#[test]
fn many_records_roundtrip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("wal.log");

    let n = 5_000u64;
    {
        let mut w = WalWriter::create(&path, false).unwrap();
        for i in 0..n {
            if i % 4 == 0 {
                w.append(&make_put(i, format!("row{i}").as_bytes(), b"m")).unwrap();
            } else {
                w.append(&make_incr(i, format!("row{i}").as_bytes(), b"q", i)).unwrap();
            }
        }
        w.sync_to_disk().unwrap();
    }

    let recs = replay_all(&path).unwrap();
    assert_eq!(recs.len() as u64, n);
    let puts = recs.iter().filter(|r| matches!(r, WalRecord::Put { .. })).count();
    assert_eq!(puts, 1250);
    for (i, rec) in recs.iter().enumerate() {
        assert_eq!(rec.seq(), i as u64);
    }
}
