use crate::*;
use counter::{CounterAggregator, Observation, OsScope};
use rowkey::{DateBucket, RowKeyCodec, SaltingPolicy};
use std::collections::BTreeMap;
use table::Table;

fn service(config: AnalyzerConfig) -> ReportService<Table> {
    let table = Table::in_memory("counts", &[b"8".to_vec()]);
    ReportService::new(CounterAggregator::new(table, RowKeyCodec::new(SaltingPolicy::LengthDerived)), config)
}

fn scope() -> OsScope {
    OsScope::new(DateBucket::parse("20100715").unwrap(), "Firefox", "3.6.6", "Windows NT")
}

fn crash(arch: &str, module: Option<(&str, &str)>) -> Observation {
    Observation {
        arch: arch.to_string(),
        modules: module.map(|(n, v)| (n.to_string(), v.to_string())).into_iter().collect(),
        addons: BTreeMap::new(),
    }
}

#[test]
fn report_for_recorded_signature() {
    let svc = service(AnalyzerConfig::default());
    for _ in 0..4 {
        svc.record(&scope(), "js_Interpret|EXCEPTION_ACCESS_VIOLATION", &crash("x86 with 2 cores", Some(("xul.dll", "1.9.2"))))
            .unwrap();
    }
    for _ in 0..6 {
        svc.record(&scope(), "other", &crash("x86 with 1 cores", None)).unwrap();
    }

    let report = svc.report(&scope(), "js_Interpret|EXCEPTION_ACCESS_VIOLATION").unwrap();
    assert_eq!(report.signature, "js_Interpret");
    assert_eq!(report.crash_reason.as_deref(), Some("EXCEPTION_ACCESS_VIOLATION"));
    assert_eq!((report.signature_count, report.os_count), (4, 10));
    assert_eq!(report.core_counts.len(), 1);
    assert_eq!(report.core_counts[0].counts.os_count, 4);
    assert_eq!(report.interesting_modules.len(), 1);
    assert_eq!(report.interesting_modules[0].counts.os_count, 4);
}

#[test]
fn unknown_signature_is_an_empty_report() {
    let svc = service(AnalyzerConfig::default());
    svc.record(&scope(), "known", &crash("x86 with 2 cores", None)).unwrap();

    let report = svc.report(&scope(), "never_seen").unwrap();
    assert_eq!(report.signature_count, 0);
    assert_eq!(report.os_count, 1);
    assert!(report.core_counts.is_empty());
    assert!(report.interesting_modules.is_empty());

    let blank = svc.report(&scope(), " ").unwrap();
    assert_eq!(blank.signature_count, 0);
}

#[test]
fn top_crashers_from_store() {
    let svc = service(AnalyzerConfig {
        min_sig_count: 1,
        max_reports: 2,
        ..AnalyzerConfig::default()
    });
    for (sig, n) in [("a", 1), ("b", 5), ("c", 3), ("d", 2)] {
        for _ in 0..n {
            svc.record(&scope(), sig, &crash("x86 with 2 cores", None)).unwrap();
        }
    }

    let top = svc.top_crashers(&scope()).unwrap();
    assert_eq!(top.os_count, 11);
    assert_eq!(top.os, "Windows NT");
    let ranked: Vec<(&str, u64)> = top.signatures.iter().map(|t| (t.signature.as_str(), t.count)).collect();
    assert_eq!(ranked, vec![("b", 5), ("c", 3)]);
}

#[test]
fn top_crashers_for_empty_scope() {
    let svc = service(AnalyzerConfig::default());
    let top = svc.top_crashers(&scope()).unwrap();
    assert!(top.signatures.is_empty());
    assert_eq!(top.os_count, 0);
}
