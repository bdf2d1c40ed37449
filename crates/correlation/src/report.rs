//! Report model. Field names follow the JSON the report pages consume.
use counter::DimensionKind;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::analyzer::ratio;

/// Signature-scoped count against the OS-wide baseline.
///
/// Percentages are whole numbers, truncated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Counts {
    #[serde(rename = "sc")]
    pub sig_count: u64,
    #[serde(rename = "tsc")]
    pub sig_total: u64,
    #[serde(rename = "sp")]
    pub sig_percent: u32,
    #[serde(rename = "oc")]
    pub os_count: u64,
    #[serde(rename = "toc")]
    pub os_total: u64,
    #[serde(rename = "op")]
    pub os_percent: u32,
    #[serde(skip)]
    pub sig_ratio: f64,
    #[serde(skip)]
    pub os_ratio: f64,
}

impl Counts {
    pub fn new(sig_count: u64, sig_total: u64, os_count: u64, os_total: u64) -> Self {
        let sig_ratio = ratio(sig_count, sig_total);
        let os_ratio = ratio(os_count, os_total);
        Self {
            sig_count,
            sig_total,
            sig_percent: percent(sig_ratio),
            os_count,
            os_total,
            os_percent: percent(os_ratio),
            sig_ratio,
            os_ratio,
        }
    }

    /// `sig_ratio - os_ratio`.
    pub fn baseline_diff(&self) -> f64 {
        self.sig_ratio - self.os_ratio
    }

    fn serialize_fields<M: SerializeMap>(&self, map: &mut M) -> Result<(), M::Error> {
        map.serialize_entry("sc", &self.sig_count)?;
        map.serialize_entry("tsc", &self.sig_total)?;
        map.serialize_entry("sp", &self.sig_percent)?;
        map.serialize_entry("oc", &self.os_count)?;
        map.serialize_entry("toc", &self.os_total)?;
        map.serialize_entry("op", &self.os_percent)
    }
}

fn percent(ratio: f64) -> u32 {
    (ratio * 100.0) as u32
}

/// One architecture ("x86 with 2 cores") under a signature.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArchStat {
    pub arch: String,
    #[serde(flatten)]
    pub counts: Counts,
    pub interesting: bool,
}

/// One version of a module or add-on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersionStat {
    /// Empty when the version was blank.
    #[serde(rename = "v")]
    pub version: String,
    #[serde(flatten)]
    pub counts: Counts,
}

/// A module or add-on rolled up over its versions.
///
/// Serializes with its name under `"module"` or `"addon"`.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleStat {
    pub kind: DimensionKind,
    pub name: String,
    pub counts: Counts,
    pub versions: Vec<VersionStat>,
}

impl Serialize for ModuleStat {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let label = match self.kind {
            DimensionKind::Addon => "addon",
            DimensionKind::Module | DimensionKind::Arch => "module",
        };
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry(label, &self.name)?;
        self.counts.serialize_fields(&mut map)?;
        map.serialize_entry("versions", &self.versions)?;
        map.end()
    }
}

/// A name with its counts, as shown for a top crasher's module or add-on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedStat {
    pub name: String,
    #[serde(flatten)]
    pub counts: Counts,
}

/// Correlation report for one signature within one OS scope.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct CorrelationReport {
    pub product: String,
    pub product_version: String,
    pub os: String,
    pub signature: String,
    pub crash_reason: Option<String>,
    pub signature_count: u64,
    pub os_count: u64,
    /// Every arch seen with the signature; `interesting` marks the ones over
    /// the threshold.
    pub core_counts: Vec<ArchStat>,
    pub interesting_modules: Vec<ModuleStat>,
    pub interesting_addons: Vec<ModuleStat>,
}

/// One ranked signature.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct TopCrasher {
    pub signature: String,
    pub crash_reason: Option<String>,
    pub count: u64,
    /// Most frequent arch, shown whether or not it is interesting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub core_count: Option<ArchStat>,
    /// Most frequent module, only when interesting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<NamedStat>,
    /// Most frequent add-on, only when interesting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub addon: Option<NamedStat>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct TopCrashersReport {
    pub product: String,
    pub product_version: String,
    pub os: String,
    pub os_count: u64,
    pub signatures: Vec<TopCrasher>,
}

/// Splits stored signature text into display name and crash reason.
///
/// `a|b|c` (hangs and plugin crashes) → (`"a | b"`, `c`); `a|b` → (`a`, `b`);
/// anything else is a bare name. Trailing empty parts are ignored.
pub fn split_signature(signature: &str) -> (String, Option<String>) {
    let mut parts: Vec<&str> = signature.split('|').collect();
    while parts.len() > 1 && parts.last().is_some_and(|p| p.is_empty()) {
        parts.pop();
    }
    match parts.as_slice() {
        [a, b, c] => (format!("{a} | {b}"), Some(c.to_string())),
        [a, b] => (a.to_string(), Some(b.to_string())),
        _ => (signature.to_string(), None),
    }
}
