/// Region layout: split points → partition boundaries.
use planner::PartitionBoundary;

/// Cuts the key space at `split_points`.
///
/// Points are sorted and deduplicated and empty points are dropped, so the
/// result always tiles the key space: the first region starts at the empty
/// key, the last ends at it, and each region ends where the next begins.
/// Location hints are `<table>/region-<n>`.
pub fn build_regions(table: &str, split_points: &[Vec<u8>]) -> Vec<PartitionBoundary> {
    let mut points: Vec<&[u8]> = split_points
        .iter()
        .map(Vec::as_slice)
        .filter(|p| !p.is_empty())
        .collect();
    points.sort_unstable();
    points.dedup();

    let mut starts: Vec<&[u8]> = Vec::with_capacity(points.len() + 1);
    starts.push(b"");
    starts.extend(points.iter().copied());

    starts
        .iter()
        .enumerate()
        .map(|(i, start)| {
            let end: &[u8] = points.get(i).copied().unwrap_or(b"");
            PartitionBoundary::new(start.to_vec(), end.to_vec(), format!("{table}/region-{i}"))
        })
        .collect()
}
