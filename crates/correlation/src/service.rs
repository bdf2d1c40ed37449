//! Report service: the read and write operations behind the HTTP routes and
//! the shell.
use counter::{CounterAggregator, CounterError, Observation, OsScope, RecordOutcome, ScopeCounts};
use table::CellStore;

use crate::analyzer::{AnalyzerConfig, CorrelationAnalyzer};
use crate::report::{split_signature, CorrelationReport, TopCrashersReport};

/// Builds reports from live counters. Nothing is cached or persisted.
#[derive(Debug, Clone)]
pub struct ReportService<S> {
    aggregator: CounterAggregator<S>,
    analyzer: CorrelationAnalyzer,
}

impl<S: CellStore> ReportService<S> {
    pub fn new(aggregator: CounterAggregator<S>, config: AnalyzerConfig) -> Self {
        Self {
            aggregator,
            analyzer: CorrelationAnalyzer::new(config),
        }
    }

    pub fn aggregator(&self) -> &CounterAggregator<S> {
        &self.aggregator
    }

    pub fn analyzer(&self) -> &CorrelationAnalyzer {
        &self.analyzer
    }

    /// Counts one crash under `scope` and `signature`.
    pub fn record(&self, scope: &OsScope, signature: &str, observation: &Observation) -> Result<RecordOutcome, CounterError> {
        self.aggregator.record(scope, signature, observation)
    }

    /// Correlation report for one signature.
    ///
    /// A signature that was never counted (or normalizes to nothing) gives a
    /// report with zero counts and empty lists.
    pub fn report(&self, scope: &OsScope, signature: &str) -> Result<CorrelationReport, CounterError> {
        let os = self.aggregator.read_os(scope)?;
        let sig = match self.aggregator.read_signature(scope, signature) {
            Ok(counts) => counts,
            Err(CounterError::EmptySignature(_)) => ScopeCounts::default(),
            Err(e) => return Err(e),
        };
        if sig.is_empty() {
            tracing::debug!(scope = %scope, signature, "report not found");
        }

        let analysis = self.analyzer.analyze(&sig, &os);
        let stored = sig.signature_name().unwrap_or(signature);
        let (name, crash_reason) = split_signature(stored);
        Ok(CorrelationReport {
            product: scope.product.clone(),
            product_version: scope.version.clone(),
            os: os.marker(counter::FAMILY_OS).unwrap_or(&scope.os).to_string(),
            signature: name,
            crash_reason,
            signature_count: analysis.sig_total,
            os_count: analysis.os_total,
            core_counts: analysis.core_counts,
            interesting_modules: analysis.interesting_modules,
            interesting_addons: analysis.interesting_addons,
        })
    }

    /// Ranked signatures of one OS scope.
    pub fn top_crashers(&self, scope: &OsScope) -> Result<TopCrashersReport, CounterError> {
        let os = self.aggregator.read_os(scope)?;
        let signatures = self.aggregator.signatures_for_os(scope)?;
        let ranked = self.analyzer.top_crashers(signatures, &os);
        Ok(TopCrashersReport {
            product: scope.product.clone(),
            product_version: scope.version.clone(),
            os: os.marker(counter::FAMILY_OS).unwrap_or(&scope.os).to_string(),
            os_count: os.os_total(),
            signatures: ranked,
        })
    }
}
