use super::helpers::*;
use crate::*;
use counter::{FAMILY_ARCH, FAMILY_MODULE_WITH_VERSION};
use serde_json::json;

#[test]
fn split_signature_shapes() {
    assert_eq!(split_signature("hang|js_GC|timeout"), ("hang | js_GC".to_string(), Some("timeout".to_string())));
    assert_eq!(split_signature("js_Interpret|EXCEPTION_ACCESS_VIOLATION"), ("js_Interpret".to_string(), Some("EXCEPTION_ACCESS_VIOLATION".to_string())));
    assert_eq!(split_signature("js_Interpret"), ("js_Interpret".to_string(), None));
    assert_eq!(split_signature("a|b|c|d"), ("a|b|c|d".to_string(), None));
}

#[test]
fn split_signature_ignores_trailing_empty_parts() {
    assert_eq!(split_signature("js_Interpret|"), ("js_Interpret|".to_string(), None));
    assert_eq!(split_signature("a|b|"), ("a".to_string(), Some("b".to_string())));
    assert_eq!(split_signature("(no signature)"), ("(no signature)".to_string(), None));
}

#[test]
fn report_json_shape() {
    let analyzer = CorrelationAnalyzer::default();
    let sig = sig_row(
        10,
        &[(FAMILY_ARCH, "x86 with 2 cores", 10), (FAMILY_MODULE_WITH_VERSION, "xul.dll\u{2}1.9", 10)],
    );
    let os = os_row(100, &[(FAMILY_ARCH, "x86 with 2 cores", 40)]);
    let analysis = analyzer.analyze(&sig, &os);
    let report = CorrelationReport {
        product: "Firefox".into(),
        product_version: "3.6".into(),
        os: "Windows NT".into(),
        signature: "js_Interpret".into(),
        crash_reason: None,
        signature_count: analysis.sig_total,
        os_count: analysis.os_total,
        core_counts: analysis.core_counts,
        interesting_modules: analysis.interesting_modules,
        interesting_addons: analysis.interesting_addons,
    };

    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(value["product-version"], "3.6");
    assert_eq!(value["crash-reason"], serde_json::Value::Null);
    assert_eq!(
        value["core-counts"][0],
        json!({"arch": "x86 with 2 cores", "sc": 10, "tsc": 10, "sp": 100, "oc": 40, "toc": 100, "op": 40, "interesting": true})
    );
    assert_eq!(
        value["interesting-modules"][0],
        json!({
            "module": "xul.dll", "sc": 10, "tsc": 10, "sp": 100, "oc": 0, "toc": 100, "op": 0,
            "versions": [{"v": "1.9", "sc": 10, "tsc": 10, "sp": 100, "oc": 0, "toc": 100, "op": 0}]
        })
    );
    assert_eq!(value["interesting-addons"], json!([]));
}

#[test]
fn top_crasher_omits_absent_detail() {
    let crasher = TopCrasher {
        signature: "sig".into(),
        crash_reason: Some("reason".into()),
        count: 11,
        core_count: None,
        module: None,
        addon: None,
    };
    let value = serde_json::to_value(&crasher).unwrap();
    assert_eq!(value, json!({"signature": "sig", "crash-reason": "reason", "count": 11}));
}
