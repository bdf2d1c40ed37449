use crate::Table;
use std::path::Path;

pub fn points(points: &[&str]) -> Vec<Vec<u8>> {
    points.iter().map(|p| p.as_bytes().to_vec()).collect()
}

pub fn open(dir: &Path) -> Table {
    Table::open("counts", dir.join("counts.wal"), &points(&["4", "8", "c"]), false).unwrap()
}
