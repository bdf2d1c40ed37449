use crate::*;
use anyhow::Result;

fn seeded() -> Result<Table> {
    let table = Table::in_memory("t", &[]);
    for key in ["a1", "a2", "b1", "b2", "c1"] {
        table.increment(key.as_bytes(), "os", "count", 1)?;
    }
    table.put(b"b1", "signature", "name", b"sig")?;
    Ok(table)
}

fn keys(scanner: Scanner<'_>) -> Vec<String> {
    scanner
        .map(|item| String::from_utf8(item.unwrap().0).unwrap())
        .collect()
}

// --------------------- Point reads ---------------------

#[test]
fn get_row_returns_all_families() -> Result<()> {
    let table = seeded()?;
    let row = table.get_row(b"b1")?.unwrap();
    assert_eq!(row.len(), 2);
    assert!(row["signature"].contains_key("name"));
    assert!(table.get_row(b"zz")?.is_none());
    Ok(())
}

#[test]
fn get_missing_cell() -> Result<()> {
    let table = seeded()?;
    assert!(table.get(b"a1", "os", "nope")?.is_none());
    assert!(table.get(b"a1", "nope", "count")?.is_none());
    assert!(table.get(b"nope", "os", "count")?.is_none());
    Ok(())
}

// --------------------- Scans ---------------------

#[test]
fn scan_is_half_open_and_ordered() -> Result<()> {
    let table = seeded()?;
    assert_eq!(keys(table.scan(b"a2", b"c1", &[])?), vec!["a2", "b1", "b2"]);
    Ok(())
}

#[test]
fn scan_open_bounds() -> Result<()> {
    let table = seeded()?;
    assert_eq!(keys(table.scan(b"", b"b", &[])?), vec!["a1", "a2"]);
    assert_eq!(keys(table.scan(b"b2", b"", &[])?), vec!["b2", "c1"]);
    assert_eq!(keys(table.scan(b"", b"", &[])?).len(), 5);
    Ok(())
}

#[test]
fn inverted_scan_is_empty() -> Result<()> {
    let table = seeded()?;
    assert!(keys(table.scan(b"c", b"a", &[])?).is_empty());
    assert!(keys(table.scan(b"b", b"b", &[])?).is_empty());
    Ok(())
}

#[test]
fn scan_projects_families() -> Result<()> {
    let table = seeded()?;
    let rows: Vec<_> = table
        .scan(b"", b"", &["signature".to_string()])?
        .collect::<Result<_, _>>()?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].0, b"b1".to_vec());
    assert!(!rows[0].1.contains_key("os"));
    Ok(())
}

#[test]
fn scanner_is_a_snapshot() -> Result<()> {
    let table = seeded()?;
    let scanner = table.scan(b"", b"", &[])?;
    table.increment(b"d1", "os", "count", 1)?;
    assert_eq!(keys(scanner).len(), 5);
    Ok(())
}

// --------------------- Faults ---------------------

#[test]
fn injected_fault_ends_scan_after_rows() -> Result<()> {
    let table = seeded()?;
    table.faults().fail_scans(1, 2);

    let items: Vec<ScanItem> = table.scan(b"", b"", &[])?.collect();
    assert_eq!(items.len(), 3);
    assert!(items[0].is_ok() && items[1].is_ok());
    assert!(matches!(&items[2], Err(e) if e.is_transient()));

    // armed failures are consumed one per scanner
    assert_eq!(table.faults().pending(), 0);
    assert_eq!(keys(table.scan(b"", b"", &[])?).len(), 5);
    Ok(())
}

#[test]
fn fault_can_be_cleared() -> Result<()> {
    let table = seeded()?;
    table.faults().fail_scans(3, 0);
    table.faults().clear();
    assert_eq!(keys(table.scan(b"", b"", &[])?).len(), 5);
    Ok(())
}
