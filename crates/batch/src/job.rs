//! Backfill: recount every processed crash of a date window from the report
//! table into the counter table.
use counter::{CounterAggregator, CounterError};
use planner::{RegionSplitPlanner, ScanRangePlanner, Split};
use serde::Serialize;
use table::CellStore;

use crate::metrics::RunStats;
use crate::reader::{SplitReadError, SplitReader};
use crate::record::{parse_processed_crash, processed_json, DateWindow, FAMILY_PROCESSED_DATA};
use crate::scheduler::LocalScheduler;
use crate::BatchError;

/// Settings for one backfill run.
#[derive(Debug, Clone, Copy)]
pub struct JobOptions {
    pub window: DateWindow,
    /// Transient-error restarts allowed per split.
    pub max_restarts: usize,
    /// Fraction of splits that must succeed for the job to succeed.
    pub min_split_success: f64,
    /// Worker threads; 0 means one per core.
    pub threads: usize,
}

impl JobOptions {
    pub fn new(window: DateWindow) -> Self {
        Self {
            window,
            max_restarts: 3,
            min_split_success: 0.9,
            threads: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SplitFailure {
    pub index: usize,
    pub location: String,
    pub start_row: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobReport {
    pub splits: usize,
    pub succeeded: usize,
    pub failures: Vec<SplitFailure>,
    pub stats: RunStats,
    pub min_split_success: f64,
}

impl JobReport {
    /// Succeeded over planned splits; 1.0 when nothing was planned.
    pub fn success_fraction(&self) -> f64 {
        if self.splits == 0 {
            1.0
        } else {
            self.succeeded as f64 / self.splits as f64
        }
    }

    pub fn is_success(&self) -> bool {
        self.success_fraction() + 1e-9 >= self.min_split_success
    }
}

/// Outcome of one split.
struct SplitRun {
    stats: RunStats,
    failure: Option<String>,
}

/// Plans splits over the report table and counts every record in them.
///
/// The report table must be keyed with the same salting policy as the
/// aggregator's codec: the plan enumerates that policy's prefixes.
pub struct BackfillJob<'a, R, C> {
    source: &'a R,
    aggregator: &'a CounterAggregator<C>,
    options: JobOptions,
}

impl<'a, R: CellStore, C: CellStore> BackfillJob<'a, R, C> {
    pub fn new(source: &'a R, aggregator: &'a CounterAggregator<C>, options: JobOptions) -> Self {
        Self {
            source,
            aggregator,
            options,
        }
    }

    /// Day × salt scans over the window, cut at the report table's regions.
    pub fn plan(&self) -> Result<Vec<Split>, BatchError> {
        let window = self.options.window;
        let descriptors = ScanRangePlanner::new([FAMILY_PROCESSED_DATA]).plan_for_policy(
            self.aggregator.codec().policy(),
            window.start,
            window.end,
        )?;
        let boundaries = self.source.partition_boundaries()?;
        Ok(RegionSplitPlanner.split(&descriptors, &boundaries)?)
    }

    /// Runs every split. A failed split is recorded, never fatal for the job.
    pub fn run(&self) -> Result<JobReport, BatchError> {
        let splits = self.plan()?;
        let scheduler = LocalScheduler::new(self.options.threads)?;
        tracing::info!(
            start = %self.options.window.start,
            end = %self.options.window.end,
            splits = splits.len(),
            threads = scheduler.threads(),
            "starting backfill"
        );

        let runs = scheduler.run(&splits, |_, split| self.run_split(split));

        let mut report = JobReport {
            splits: splits.len(),
            succeeded: 0,
            failures: Vec::new(),
            stats: RunStats::default(),
            min_split_success: self.options.min_split_success,
        };
        for (index, (split, run)) in splits.iter().zip(runs).enumerate() {
            report.stats = report.stats.merge(run.stats);
            match run.failure {
                None => report.succeeded += 1,
                Some(error) => report.failures.push(SplitFailure {
                    index,
                    location: split.location.clone(),
                    start_row: String::from_utf8_lossy(&split.start_row).into_owned(),
                    error,
                }),
            }
        }

        if report.is_success() {
            tracing::info!(succeeded = report.succeeded, splits = report.splits, stats = %report.stats, "backfill finished");
        } else {
            tracing::warn!(
                succeeded = report.succeeded,
                splits = report.splits,
                required = report.min_split_success,
                "backfill below success threshold"
            );
        }
        Ok(report)
    }

    /// Reads one split and counts its records. Bad records are skipped and
    /// counted. Transient store failures are retried up to `max_restarts`
    /// times per record, and any other store failure ends the split.
    fn run_split(&self, split: &Split) -> SplitRun {
        let window = self.options.window;
        let mut stats = RunStats::default();
        let reader = SplitReader::new(self.source, split, self.options.max_restarts);

        let result = reader.for_each(|key, row| -> Result<(), CounterError> {
            stats.rows_read += 1;
            let record = match processed_json(row).and_then(|json| parse_processed_crash(json, &window)) {
                Ok(record) => record,
                Err(err) => {
                    tracing::debug!(row = %String::from_utf8_lossy(key), error = %err, "skipping record");
                    stats.skip(&err);
                    return Ok(());
                }
            };
            let recorded = self.aggregator.record_with_retries(
                &record.scope,
                &record.signature,
                &record.observation,
                self.options.max_restarts,
            );
            match recorded {
                Ok(outcome) => {
                    stats.records_counted += 1;
                    stats.markers_written += outcome.markers_written as u64;
                    stats.increments += outcome.increments as u64;
                    stats.restarts += outcome.retries as u64;
                    Ok(())
                }
                Err(CounterError::EmptySignature(sig)) => {
                    tracing::debug!(row = %String::from_utf8_lossy(key), signature = %sig, "skipping unsignable record");
                    stats.skipped_malformed += 1;
                    Ok(())
                }
                Err(err @ CounterError::ScopeCollision { .. }) => {
                    tracing::warn!(row = %String::from_utf8_lossy(key), error = %err, "skipping colliding record");
                    stats.skipped_malformed += 1;
                    Ok(())
                }
                Err(err) => Err(err),
            }
        });

        let failure = match result {
            Ok(summary) => {
                stats.restarts += summary.restarts;
                None
            }
            Err(SplitReadError::Store(err)) => Some(format!("store: {err}")),
            Err(SplitReadError::Callback(err)) => Some(format!("counter: {err}")),
        };
        if let Some(error) = &failure {
            tracing::warn!(location = %split.location, error = %error, "split failed");
        } else {
            tracing::debug!(location = %split.location, stats = %stats, "split done");
        }
        SplitRun { stats, failure }
    }
}
