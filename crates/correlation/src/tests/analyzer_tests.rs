use super::helpers::*;
use crate::*;
use counter::{FAMILY_ADDON_WITH_VERSION, FAMILY_ARCH, FAMILY_MODULE_WITH_VERSION};
use proptest::prelude::*;

// -------------------- Ratios & threshold --------------------

#[test]
fn zero_totals_give_zero_ratio() {
    assert_eq!(ratio(0, 0), 0.0);
    assert_eq!(ratio(7, 0), 0.0);
    let c = Counts::new(3, 0, 3, 0);
    assert_eq!((c.sig_percent, c.os_percent), (0, 0));
}

#[test]
fn threshold_is_inclusive() {
    assert!(is_interesting(0.05, 0.0, 0.05));
    assert!(is_interesting(ratio(5, 100), ratio(0, 100), DEFAULT_MIN_BASELINE_DIFF));
    assert!(!is_interesting(0.0499, 0.0, 0.05));
    assert!(!is_interesting(ratio(499, 10_000), 0.0, DEFAULT_MIN_BASELINE_DIFF));
}

#[test]
fn decimal_boundary_survives_float_error() {
    // 0.15 - 0.10 is slightly below 0.05 in binary
    assert!(is_interesting(ratio(15, 100), ratio(10, 100), 0.05));
}

#[test]
fn percent_truncates() {
    let c = Counts::new(2, 3, 1, 3);
    assert_eq!(c.sig_percent, 66);
    assert_eq!(c.os_percent, 33);
}

// -------------------- Analyze --------------------

#[test]
fn core_counts_list_every_arch() {
    let analyzer = CorrelationAnalyzer::default();
    let sig = sig_row(10, &[(FAMILY_ARCH, "x86 with 2 cores", 8), (FAMILY_ARCH, "x86 with 1 cores", 2)]);
    let os = os_row(100, &[(FAMILY_ARCH, "x86 with 2 cores", 50), (FAMILY_ARCH, "x86 with 1 cores", 50)]);

    let analysis = analyzer.analyze(&sig, &os);
    let archs: Vec<(&str, u64, bool)> = analysis
        .core_counts
        .iter()
        .map(|a| (a.arch.as_str(), a.counts.sig_count, a.interesting))
        .collect();
    assert_eq!(archs, vec![("x86 with 2 cores", 8, true), ("x86 with 1 cores", 2, false)]);
    assert_eq!(analysis.core_counts[0].counts.sig_percent, 80);
    assert_eq!(analysis.core_counts[0].counts.os_percent, 50);
}

#[test]
fn missing_baseline_counts_as_zero() {
    let analyzer = CorrelationAnalyzer::default();
    let sig = sig_row(4, &[(FAMILY_ARCH, "arm with 4 cores", 4)]);
    let analysis = analyzer.analyze(&sig, &os_row(0, &[]));
    let arch = &analysis.core_counts[0];
    assert_eq!(arch.counts.os_count, 0);
    assert_eq!(arch.counts.os_ratio, 0.0);
    assert!(arch.interesting);
}

#[test]
fn modules_roll_up_by_name() {
    let analyzer = CorrelationAnalyzer::default();
    let sig = sig_row(
        10,
        &[
            (FAMILY_MODULE_WITH_VERSION, "xul.dll\u{2}1.9", 6),
            (FAMILY_MODULE_WITH_VERSION, "xul.dll\u{2}2.0", 4),
            (FAMILY_MODULE_WITH_VERSION, "ntdll.dll\u{2}5.1", 10),
        ],
    );
    let os = os_row(
        100,
        &[
            (FAMILY_MODULE_WITH_VERSION, "xul.dll\u{2}1.9", 10),
            (FAMILY_MODULE_WITH_VERSION, "xul.dll\u{2}2.0", 20),
            (FAMILY_MODULE_WITH_VERSION, "ntdll.dll\u{2}5.1", 100),
        ],
    );

    let analysis = analyzer.analyze(&sig, &os);
    // ntdll is on every crash of the OS, so it is not interesting
    assert_eq!(analysis.interesting_modules.len(), 1);
    let xul = &analysis.interesting_modules[0];
    assert_eq!(xul.name, "xul.dll");
    assert_eq!((xul.counts.sig_count, xul.counts.os_count), (10, 30));

    let versions: Vec<(&str, u64, u64)> = xul
        .versions
        .iter()
        .map(|v| (v.version.as_str(), v.counts.sig_count, v.counts.os_count))
        .collect();
    assert_eq!(versions, vec![("1.9", 6, 10), ("2.0", 4, 20)]);
    assert_eq!(xul.versions[1].counts.os_percent, 20);
}

#[test]
fn addons_filtered_at_threshold() {
    let analyzer = CorrelationAnalyzer::default();
    let sig = sig_row(
        100,
        &[(FAMILY_ADDON_WITH_VERSION, "{a}\u{2}1", 5), (FAMILY_ADDON_WITH_VERSION, "{b}\u{2}1", 4)],
    );
    let analysis = analyzer.analyze(&sig, &os_row(1000, &[]));
    let names: Vec<&str> = analysis.interesting_addons.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["{a}"]);
    assert!(analysis.interesting_modules.is_empty());
}

#[test]
fn blank_versions_roll_up_under_empty_string() {
    let analyzer = CorrelationAnalyzer::default();
    let sig = sig_row(2, &[(FAMILY_MODULE_WITH_VERSION, "libc.so", 2)]);
    let analysis = analyzer.analyze(&sig, &os_row(2, &[(FAMILY_MODULE_WITH_VERSION, "libc.so", 1)]));
    let m = &analysis.interesting_modules[0];
    assert_eq!(m.versions[0].version, "");
    assert_eq!(m.versions[0].counts.os_count, 1);
}

// -------------------- Top crashers --------------------

#[test]
fn top_crashers_floor_and_cap() {
    let analyzer = CorrelationAnalyzer::default();
    let signatures = (1..=500u64).map(|n| signature(&format!("sig{n}"), n)).collect();
    let ranked = analyzer.top_crashers(signatures, &os_row(0, &[]));

    assert_eq!(ranked.len(), 100);
    assert_eq!(ranked[0].count, 500);
    assert_eq!(ranked[99].count, 401);
    assert!(ranked.windows(2).all(|w| w[0].count >= w[1].count));
}

#[test]
fn top_crashers_floor_is_exclusive() {
    let analyzer = CorrelationAnalyzer::default();
    let signatures = (5..=15u64).map(|n| signature(&format!("s{n}"), n)).collect();
    let counts: Vec<u64> = analyzer
        .top_crashers(signatures, &os_row(0, &[]))
        .iter()
        .map(|t| t.count)
        .collect();
    assert_eq!(counts, vec![15, 14, 13, 12, 11]);
}

#[test]
fn ties_keep_insertion_order() {
    let analyzer = CorrelationAnalyzer::new(AnalyzerConfig {
        min_sig_count: 0,
        ..AnalyzerConfig::default()
    });
    let signatures = vec![signature("b", 20), signature("a", 30), signature("c", 20), signature("d", 20)];
    let names: Vec<String> = analyzer
        .top_crashers(signatures, &os_row(0, &[]))
        .into_iter()
        .map(|t| t.signature)
        .collect();
    assert_eq!(names, vec!["a", "b", "c", "d"]);
}

#[test]
fn top_crasher_detail() {
    let analyzer = CorrelationAnalyzer::default();
    let mut hang = signature("hang|js_GC|timeout", 20);
    for (family, qualifier, n) in [
        (FAMILY_ARCH, "x86 with 2 cores", 12),
        (FAMILY_ARCH, "x86 with 4 cores", 8),
        (FAMILY_MODULE_WITH_VERSION, "npswf32.dll\u{2}10.1", 20),
        (FAMILY_ADDON_WITH_VERSION, "{common}\u{2}1", 20),
    ] {
        hang.counts.counters.entry(family.into()).or_default().insert(qualifier.into(), n);
    }
    let os = os_row(
        100,
        &[
            (FAMILY_ARCH, "x86 with 2 cores", 90),
            (FAMILY_MODULE_WITH_VERSION, "npswf32.dll\u{2}10.1", 10),
            (FAMILY_ADDON_WITH_VERSION, "{common}\u{2}1", 100),
        ],
    );

    let ranked = analyzer.top_crashers(vec![hang], &os);
    let top = &ranked[0];
    assert_eq!(top.signature, "hang | js_GC");
    assert_eq!(top.crash_reason.as_deref(), Some("timeout"));
    let core = top.core_count.as_ref().unwrap();
    assert_eq!(core.arch, "x86 with 2 cores");
    assert!(!core.interesting);
    assert_eq!(top.module.as_ref().map(|m| m.name.as_str()), Some("npswf32.dll"));
    assert!(top.addon.is_none());
}

proptest! {
    #[test]
    fn top_crashers_sorted_bounded(totals in proptest::collection::vec(0u64..50, 0..80), cap in 1usize..20) {
        let analyzer = CorrelationAnalyzer::new(AnalyzerConfig { max_reports: cap, ..AnalyzerConfig::default() });
        let signatures = totals.iter().enumerate().map(|(i, n)| signature(&format!("s{i}"), *n)).collect();
        let ranked = analyzer.top_crashers(signatures, &os_row(0, &[]));

        let eligible = totals.iter().filter(|n| **n > DEFAULT_MIN_SIG_COUNT).count();
        prop_assert_eq!(ranked.len(), eligible.min(cap));
        prop_assert!(ranked.iter().all(|t| t.count > DEFAULT_MIN_SIG_COUNT));
        prop_assert!(ranked.windows(2).all(|w| w[0].count >= w[1].count));
    }
}
