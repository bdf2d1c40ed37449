use crate::{CounterAggregator, Observation, OsScope};
use rowkey::{DateBucket, RowKeyCodec, SaltingPolicy};
use std::collections::BTreeMap;
use table::Table;

pub fn day() -> DateBucket {
    DateBucket::parse("20240101").unwrap()
}

pub fn scope(os: &str) -> OsScope {
    OsScope::new(day(), "Firefox", "3.6", os)
}

pub fn aggregator(policy: SaltingPolicy) -> CounterAggregator<Table> {
    CounterAggregator::new(
        Table::in_memory("counts", &[b"4".to_vec(), b"8".to_vec(), b"c".to_vec()]),
        RowKeyCodec::new(policy),
    )
}

pub fn observation(arch: &str, modules: &[(&str, &str)], addons: &[(&str, &str)]) -> Observation {
    let pairs = |items: &[(&str, &str)]| -> BTreeMap<String, String> {
        items.iter().map(|(n, v)| (n.to_string(), v.to_string())).collect()
    };
    Observation {
        arch: arch.to_string(),
        modules: pairs(modules),
        addons: pairs(addons),
    }
}
