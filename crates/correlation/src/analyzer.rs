//! Ratio analysis and top-crasher ranking.
use std::cmp::Reverse;
use std::collections::BTreeMap;

use counter::{DimensionKind, ScopeCounts, SignatureScope};

use crate::report::{split_signature, ArchStat, Counts, ModuleStat, NamedStat, TopCrasher, VersionStat};

/// Minimum `sig_ratio - os_ratio` for a dimension to be interesting.
pub const DEFAULT_MIN_BASELINE_DIFF: f64 = 0.05;
/// Top crashers need strictly more crashes than this.
pub const DEFAULT_MIN_SIG_COUNT: u64 = 10;
/// Top crashers are capped at this many signatures.
pub const DEFAULT_MAX_REPORTS: usize = 100;

/// Absorbs float error in `sig_ratio - os_ratio`, so a difference that is
/// exactly the threshold in decimal still compares equal.
const RATIO_EPSILON: f64 = 1e-9;

/// Thresholds for the analyzer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalyzerConfig {
    pub min_baseline_diff: f64,
    pub min_sig_count: u64,
    pub max_reports: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            min_baseline_diff: DEFAULT_MIN_BASELINE_DIFF,
            min_sig_count: DEFAULT_MIN_SIG_COUNT,
            max_reports: DEFAULT_MAX_REPORTS,
        }
    }
}

/// `count / total`, or 0.0 when `total` is 0.
pub fn ratio(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

/// `sig_ratio - os_ratio >= threshold`, inclusive at the boundary.
pub fn is_interesting(sig_ratio: f64, os_ratio: f64, threshold: f64) -> bool {
    sig_ratio - os_ratio + RATIO_EPSILON >= threshold
}

/// Result of comparing one signature scope against its OS scope.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub sig_total: u64,
    pub os_total: u64,
    pub core_counts: Vec<ArchStat>,
    pub interesting_modules: Vec<ModuleStat>,
    pub interesting_addons: Vec<ModuleStat>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CorrelationAnalyzer {
    config: AnalyzerConfig,
}

impl CorrelationAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    fn interesting(&self, counts: &Counts) -> bool {
        is_interesting(counts.sig_ratio, counts.os_ratio, self.config.min_baseline_diff)
    }

    /// Compares `sig` against the baseline `os`.
    ///
    /// Every arch of the signature is listed (marked when interesting);
    /// modules and add-ons are rolled up by name and only interesting ones
    /// are kept. A dimension missing from the baseline has an OS count of 0.
    /// Lists are ordered by signature count descending, then name.
    pub fn analyze(&self, sig: &ScopeCounts, os: &ScopeCounts) -> Analysis {
        let sig_total = sig.signature_total();
        let os_total = os.os_total();

        let core_counts = self.arch_stats(sig, os);
        let interesting_modules = self.module_stats(DimensionKind::Module, sig, os);
        let interesting_addons = self.module_stats(DimensionKind::Addon, sig, os);

        tracing::debug!(
            sig_total,
            os_total,
            archs = core_counts.len(),
            modules = interesting_modules.len(),
            addons = interesting_addons.len(),
            "analyzed signature"
        );
        Analysis {
            sig_total,
            os_total,
            core_counts,
            interesting_modules: interesting_modules.into_iter().filter(|m| self.interesting(&m.counts)).collect(),
            interesting_addons: interesting_addons.into_iter().filter(|m| self.interesting(&m.counts)).collect(),
        }
    }

    fn arch_stats(&self, sig: &ScopeCounts, os: &ScopeCounts) -> Vec<ArchStat> {
        let (sig_total, os_total) = (sig.signature_total(), os.os_total());
        let mut stats: Vec<ArchStat> = sig
            .dimensions()
            .into_iter()
            .filter(|(d, _)| d.kind() == DimensionKind::Arch)
            .map(|(d, count)| {
                let counts = Counts::new(count, sig_total, os.dimension_count(&d), os_total);
                ArchStat {
                    arch: d.name().to_string(),
                    interesting: self.interesting(&counts),
                    counts,
                }
            })
            .collect();
        stats.sort_by(|a, b| b.counts.sig_count.cmp(&a.counts.sig_count).then_with(|| a.arch.cmp(&b.arch)));
        stats
    }

    /// All modules (or add-ons) of `sig`, rolled up by name, sorted.
    fn module_stats(&self, kind: DimensionKind, sig: &ScopeCounts, os: &ScopeCounts) -> Vec<ModuleStat> {
        let (sig_total, os_total) = (sig.signature_total(), os.os_total());
        let os_by_name = roll_up(os, kind);

        let mut stats: Vec<ModuleStat> = roll_up(sig, kind)
            .into_iter()
            .map(|(name, (count, versions))| {
                let os_versions = os_by_name.get(&name);
                let os_count = os_versions.map_or(0, |(total, _)| *total);
                let version_os_count = |version: &str| {
                    os_versions
                        .and_then(|(_, vs)| vs.iter().find(|(v, _)| v == version))
                        .map_or(0, |(_, c)| *c)
                };

                let mut versions: Vec<VersionStat> = versions
                    .iter()
                    .map(|(version, count)| VersionStat {
                        version: version.clone(),
                        counts: Counts::new(*count, sig_total, version_os_count(version), os_total),
                    })
                    .collect();
                versions.sort_by(|a, b| {
                    b.counts.sig_count.cmp(&a.counts.sig_count).then_with(|| a.version.cmp(&b.version))
                });

                ModuleStat {
                    kind,
                    counts: Counts::new(count, sig_total, os_count, os_total),
                    name,
                    versions,
                }
            })
            .collect();
        stats.sort_by(|a, b| b.counts.sig_count.cmp(&a.counts.sig_count).then_with(|| a.name.cmp(&b.name)));
        stats
    }

    /// Ranks signatures of one OS scope.
    ///
    /// Stable sort by count descending (ties keep input order), keep counts
    /// above `min_sig_count`, cap at `max_reports`.
    pub fn top_crashers(&self, mut signatures: Vec<SignatureScope>, os: &ScopeCounts) -> Vec<TopCrasher> {
        signatures.sort_by_key(|s| Reverse(s.counts.signature_total()));
        let ranked: Vec<TopCrasher> = signatures
            .iter()
            .filter(|s| s.counts.signature_total() > self.config.min_sig_count)
            .take(self.config.max_reports)
            .map(|s| self.top_crasher(s, os))
            .collect();
        tracing::debug!(candidates = signatures.len(), ranked = ranked.len(), "ranked top crashers");
        ranked
    }

    fn top_crasher(&self, sig: &SignatureScope, os: &ScopeCounts) -> TopCrasher {
        let (signature, crash_reason) = split_signature(&sig.signature);
        let top_named = |kind| {
            self.module_stats(kind, &sig.counts, os)
                .into_iter()
                .next()
                .filter(|m| self.interesting(&m.counts))
                .map(|m| NamedStat {
                    name: m.name,
                    counts: m.counts,
                })
        };
        TopCrasher {
            signature,
            crash_reason,
            count: sig.counts.signature_total(),
            core_count: self.arch_stats(&sig.counts, os).into_iter().next(),
            module: top_named(DimensionKind::Module),
            addon: top_named(DimensionKind::Addon),
        }
    }
}

/// name → (total over versions, [(version, count)]), from the per-version
/// family. Blank versions appear as `""`.
fn roll_up(counts: &ScopeCounts, kind: DimensionKind) -> BTreeMap<String, (u64, Vec<(String, u64)>)> {
    let mut by_name: BTreeMap<String, (u64, Vec<(String, u64)>)> = BTreeMap::new();
    for (dimension, count) in counts.dimensions() {
        if dimension.kind() != kind {
            continue;
        }
        let entry = by_name.entry(dimension.name().to_string()).or_default();
        entry.0 = entry.0.saturating_add(count);
        entry.1.push((dimension.version().unwrap_or_default().to_string(), count));
    }
    by_name
}
