//! Command parsing and execution for the interactive shell.
use std::io::Write;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use batch::{store_processed_crash, BackfillJob, DateWindow, JobOptions, FAMILY_PROCESSED_DATA};
use config::{Config, COUNTS_TABLE, REPORTS_TABLE};
use correlation::{AnalyzerConfig, ReportService};
use counter::{CounterAggregator, Observation, OsScope};
use planner::{RegionSplitPlanner, ScanRangePlanner};
use rowkey::{DateBucket, RowKeyCodec};
use table::{CellStore, Table};

pub const HELP: &str = "\
Commands: INCR date product version os signature {json}
          INGEST crash_id {json}
          REPORT date product version os signature | TOP date product version os
          SCOPE date product version os [signature]
          PLAN start [end] | SPLITS start [end] | BACKFILL start [end]
          REGIONS | STATS | FAULT count [after_rows] | FAULT CLEAR | EXIT";

/// Whether the read loop should go on after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Splits a command line into words. Double quotes group a word that holds
/// spaces (`"Windows NT"`); `rest` hands back the unparsed tail for JSON.
pub struct Args<'a> {
    line: &'a str,
}

impl<'a> Args<'a> {
    pub fn new(line: &'a str) -> Self {
        Self { line }
    }

    pub fn next_word(&mut self) -> Option<String> {
        let line = self.line.trim_start();
        if line.is_empty() {
            self.line = line;
            return None;
        }
        if let Some(quoted) = line.strip_prefix('"') {
            let (word, tail) = match quoted.find('"') {
                Some(end) => (&quoted[..end], &quoted[end + 1..]),
                None => (quoted, ""),
            };
            self.line = tail;
            return Some(word.to_string());
        }
        let end = line.find(char::is_whitespace).unwrap_or(line.len());
        self.line = &line[end..];
        Some(line[..end].to_string())
    }

    fn word(&mut self, name: &str) -> Result<String> {
        self.next_word().ok_or_else(|| anyhow!("missing {name}"))
    }

    pub fn rest(&mut self) -> &'a str {
        let rest = self.line.trim();
        self.line = "";
        rest
    }
}

fn date(raw: &str) -> Result<DateBucket> {
    DateBucket::parse(raw).map_err(|e| anyhow!("{e}"))
}

/// `start [end]`; a missing end means a single day.
fn window(args: &mut Args<'_>) -> Result<DateWindow> {
    let start = date(&args.word("start date")?)?;
    let end = match args.next_word() {
        Some(end) => date(&end)?,
        None => start,
    };
    Ok(DateWindow::new(start, end))
}

fn scope(args: &mut Args<'_>) -> Result<OsScope> {
    let day = date(&args.word("date")?)?;
    Ok(OsScope::new(
        day,
        args.word("product")?,
        args.word("version")?,
        args.word("os")?,
    ))
}

/// Row keys as text, with non-printable bytes escaped.
pub fn printable(key: &[u8]) -> String {
    key.iter().flat_map(|b| std::ascii::escape_default(*b)).map(char::from).collect()
}

fn bound(key: &[u8]) -> String {
    if key.is_empty() {
        "(open)".to_string()
    } else {
        printable(key)
    }
}

pub struct Shell {
    config: Config,
    reports: Arc<Table>,
    service: ReportService<Arc<Table>>,
}

impl Shell {
    /// Opens both tables under `config.data_dir`, replaying their WALs.
    pub fn open(config: Config) -> Result<Self> {
        let counts = Table::open(COUNTS_TABLE, config.counts_wal_path(), &config.split_points, config.wal_sync)
            .with_context(|| format!("opening {}", config.counts_wal_path().display()))?;
        let reports = Table::open(REPORTS_TABLE, config.reports_wal_path(), &config.split_points, config.wal_sync)
            .with_context(|| format!("opening {}", config.reports_wal_path().display()))?;
        Ok(Self::with_tables(config, counts, reports))
    }

    pub fn with_tables(config: Config, counts: Table, reports: Table) -> Self {
        let aggregator = CounterAggregator::new(Arc::new(counts), RowKeyCodec::new(config.salting));
        let analyzer = AnalyzerConfig {
            min_baseline_diff: config.min_baseline_diff,
            min_sig_count: config.min_sig_count,
            max_reports: config.max_reports,
        };
        Self {
            config,
            reports: Arc::new(reports),
            service: ReportService::new(aggregator, analyzer),
        }
    }

    pub fn counts(&self) -> &Table {
        self.service.aggregator().store()
    }

    pub fn reports(&self) -> &Table {
        &self.reports
    }

    /// Runs one command line. Command failures are printed as `ERR ...` and
    /// do not end the session; only a failed write to `out` is an error.
    pub fn execute<W: Write>(&self, line: &str, out: &mut W) -> std::io::Result<Flow> {
        let mut args = Args::new(line);
        let Some(cmd) = args.next_word() else {
            return Ok(Flow::Continue);
        };
        let cmd = cmd.to_uppercase();
        if cmd == "EXIT" || cmd == "QUIT" {
            writeln!(out, "bye")?;
            return Ok(Flow::Exit);
        }

        let result = match cmd.as_str() {
            "INCR" => self.incr(&mut args, out),
            "INGEST" => self.ingest(&mut args, out),
            "REPORT" => self.report(&mut args, out),
            "TOP" => self.top(&mut args, out),
            "SCOPE" => self.scope(&mut args, out),
            "PLAN" => self.plan(&mut args, out),
            "SPLITS" => self.splits(&mut args, out),
            "BACKFILL" => self.backfill(&mut args, out),
            "REGIONS" => self.regions(out),
            "STATS" => self.stats(out),
            "FAULT" => self.fault(&mut args, out),
            "HELP" => writeln!(out, "{HELP}").map_err(Into::into),
            other => {
                writeln!(out, "unknown command: {other}")?;
                return Ok(Flow::Continue);
            }
        };
        if let Err(e) = result {
            tracing::debug!(command = %cmd, error = %e, "command failed");
            writeln!(out, "ERR {}: {:#}", cmd.to_lowercase(), e)?;
        }
        Ok(Flow::Continue)
    }

    // -------------------- Counting --------------------

    fn incr<W: Write>(&self, args: &mut Args<'_>, out: &mut W) -> Result<()> {
        let scope = scope(args)?;
        let signature = args.word("signature")?;
        let observation: Observation = match args.rest() {
            "" => Observation::default(),
            json => serde_json::from_str(json).context("observation")?,
        };
        let outcome = self.service.record(&scope, &signature, &observation)?;
        writeln!(
            out,
            "OK (markers={}, increments={})",
            outcome.markers_written, outcome.increments
        )?;
        Ok(())
    }

    fn ingest<W: Write>(&self, args: &mut Args<'_>, out: &mut W) -> Result<()> {
        let crash_id = args.word("crash id")?;
        let json = args.rest();
        if json.is_empty() {
            bail!("missing processed crash json");
        }
        let codec = self.service.aggregator().codec();
        let key = store_processed_crash(self.reports.as_ref(), &codec, &crash_id, json.as_bytes())?;
        writeln!(out, "OK {}", printable(&key))?;
        Ok(())
    }

    // -------------------- Reading --------------------

    fn report<W: Write>(&self, args: &mut Args<'_>, out: &mut W) -> Result<()> {
        let scope = scope(args)?;
        let signature = args.word("signature")?;
        let report = self.service.report(&scope, &signature)?;
        writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
        Ok(())
    }

    fn top<W: Write>(&self, args: &mut Args<'_>, out: &mut W) -> Result<()> {
        let scope = scope(args)?;
        let report = self.service.top_crashers(&scope)?;
        writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
        Ok(())
    }

    fn scope<W: Write>(&self, args: &mut Args<'_>, out: &mut W) -> Result<()> {
        let scope = scope(args)?;
        let aggregator = self.service.aggregator();
        let (key, counts) = match args.next_word() {
            Some(signature) => (
                aggregator.signature_key(&scope, &signature)?,
                aggregator.read_signature(&scope, &signature)?,
            ),
            None => (aggregator.os_key(&scope), aggregator.read_os(&scope)?),
        };
        writeln!(out, "{}", printable(&key))?;
        if counts.is_empty() {
            writeln!(out, "(empty)")?;
        } else {
            writeln!(out, "{}", serde_json::to_string_pretty(&counts)?)?;
        }
        Ok(())
    }

    // -------------------- Planning & backfill --------------------

    fn plan<W: Write>(&self, args: &mut Args<'_>, out: &mut W) -> Result<()> {
        let window = window(args)?;
        let descriptors = ScanRangePlanner::new([FAMILY_PROCESSED_DATA]).plan_for_policy(
            self.config.salting,
            window.start,
            window.end,
        )?;
        for d in &descriptors {
            writeln!(out, "{} .. {}", bound(&d.start_row), bound(&d.stop_row))?;
        }
        writeln!(out, "({} scans)", descriptors.len())?;
        Ok(())
    }

    fn splits<W: Write>(&self, args: &mut Args<'_>, out: &mut W) -> Result<()> {
        let window = window(args)?;
        let descriptors = ScanRangePlanner::new([FAMILY_PROCESSED_DATA]).plan_for_policy(
            self.config.salting,
            window.start,
            window.end,
        )?;
        let splits = RegionSplitPlanner.split(&descriptors, &self.reports.partition_boundaries()?)?;
        for s in &splits {
            writeln!(out, "{} {} .. {}", s.location, bound(&s.start_row), bound(&s.stop_row))?;
        }
        writeln!(out, "({} splits)", splits.len())?;
        Ok(())
    }

    fn backfill<W: Write>(&self, args: &mut Args<'_>, out: &mut W) -> Result<()> {
        let options = JobOptions {
            max_restarts: self.config.max_restarts,
            min_split_success: self.config.min_split_success,
            ..JobOptions::new(window(args)?)
        };
        let report = BackfillJob::new(self.reports.as_ref(), self.service.aggregator(), options).run()?;
        for failure in &report.failures {
            writeln!(
                out,
                "FAILED split {} at {} ({}): {}",
                failure.index, failure.location, failure.start_row, failure.error
            )?;
        }
        writeln!(out, "{}", report.stats)?;
        let verdict = if report.is_success() { "OK" } else { "FAILED" };
        writeln!(
            out,
            "{} ({}/{} splits, {:.0}% succeeded)",
            verdict,
            report.succeeded,
            report.splits,
            report.success_fraction() * 100.0
        )?;
        Ok(())
    }

    // -------------------- Tables --------------------

    fn regions<W: Write>(&self, out: &mut W) -> Result<()> {
        for table in [self.counts(), self.reports()] {
            for region in table.regions() {
                writeln!(
                    out,
                    "{} [{} .. {})",
                    region.location,
                    bound(&region.start_key),
                    bound(&region.end_key)
                )?;
            }
        }
        Ok(())
    }

    fn stats<W: Write>(&self, out: &mut W) -> Result<()> {
        for table in [self.counts(), self.reports()] {
            writeln!(
                out,
                "{}: rows={} cells={} seq={} regions={}",
                table.name(),
                table.row_count(),
                table.cell_count(),
                table.seq(),
                table.regions().len()
            )?;
        }
        writeln!(
            out,
            "salting={} data_dir={} pending_faults={}",
            self.config.salting,
            self.config.data_dir.display(),
            self.reports.faults().pending()
        )?;
        Ok(())
    }

    fn fault<W: Write>(&self, args: &mut Args<'_>, out: &mut W) -> Result<()> {
        let first = args.word("failure count or CLEAR")?;
        if first.eq_ignore_ascii_case("CLEAR") {
            self.reports.faults().clear();
            writeln!(out, "OK")?;
            return Ok(());
        }
        let failures: usize = first.parse().context("failure count")?;
        let after_rows: usize = match args.next_word() {
            Some(raw) => raw.parse().context("after_rows")?,
            None => 0,
        };
        self.reports.faults().fail_scans(failures, after_rows);
        writeln!(out, "OK ({} scans will fail after {} rows)", failures, after_rows)?;
        Ok(())
    }
}
