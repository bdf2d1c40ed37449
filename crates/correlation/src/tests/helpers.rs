use counter::{ScopeCounts, SignatureScope, FAMILY_OS, FAMILY_SIGNATURE, QUALIFIER_COUNT};

/// Builds a scope row from `(family, qualifier, count)` cells.
pub fn counts(cells: &[(&str, &str, u64)]) -> ScopeCounts {
    let mut counts = ScopeCounts::default();
    for (family, qualifier, n) in cells {
        counts
            .counters
            .entry(family.to_string())
            .or_default()
            .insert(qualifier.to_string(), *n);
    }
    counts
}

pub fn os_row(total: u64, cells: &[(&str, &str, u64)]) -> ScopeCounts {
    let mut row = counts(cells);
    row.counters
        .entry(FAMILY_OS.to_string())
        .or_default()
        .insert(QUALIFIER_COUNT.to_string(), total);
    row
}

pub fn sig_row(total: u64, cells: &[(&str, &str, u64)]) -> ScopeCounts {
    let mut row = counts(cells);
    row.counters
        .entry(FAMILY_SIGNATURE.to_string())
        .or_default()
        .insert(QUALIFIER_COUNT.to_string(), total);
    row
}

pub fn signature(name: &str, total: u64) -> SignatureScope {
    let mut counts = sig_row(total, &[]);
    counts.markers.insert(FAMILY_SIGNATURE.to_string(), name.to_string());
    SignatureScope {
        signature: name.to_string(),
        counts,
    }
}
