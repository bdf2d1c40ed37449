//! # Correlation - ratio analysis over crash counters
//!
//! Compares a signature's dimension counts against its OS-wide baseline and
//! keeps the dimensions that are over-represented in the signature.
//!
//! ```text
//! ScopeCounts (signature)   ScopeCounts (OS)
//!            \                 /
//!             v               v
//!        ┌─────────────────────────┐
//!        │  CorrelationAnalyzer    │  ratios, threshold, roll-up
//!        └─────────────────────────┘
//!                    |
//!                    v
//!   CorrelationReport / TopCrashersReport  (serde, built per request)
//! ```
//!
//! | Module       | Purpose                                           |
//! |--------------|---------------------------------------------------|
//! | [`analyzer`] | `AnalyzerConfig`, `CorrelationAnalyzer`, ratios   |
//! | [`report`]   | report model and its JSON shape                   |
//! | [`service`]  | `ReportService`: reads scopes and builds reports  |
mod analyzer;
mod report;
mod service;

pub use analyzer::{
    is_interesting, ratio, Analysis, AnalyzerConfig, CorrelationAnalyzer, DEFAULT_MAX_REPORTS,
    DEFAULT_MIN_BASELINE_DIFF, DEFAULT_MIN_SIG_COUNT,
};
pub use report::{
    split_signature, ArchStat, CorrelationReport, Counts, ModuleStat, NamedStat, TopCrasher,
    TopCrashersReport, VersionStat,
};
pub use service::ReportService;

#[cfg(test)]
mod tests;
