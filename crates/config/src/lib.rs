//! # Config - environment-driven settings
//!
//! Every binary reads its settings once at startup from `CRASHCOUNT_*`
//! environment variables, each with a default:
//!
//! ```text
//! CRASHCOUNT_DATA_DIR            table WAL directory          (default: "data")
//! CRASHCOUNT_WAL_SYNC            fsync every WAL append       (default: "true")
//! CRASHCOUNT_SALTING             "length" or "none"           (default: "length")
//! CRASHCOUNT_SPLIT_POINTS        region split points          (default: "4,8,c")
//! CRASHCOUNT_MIN_BASELINE_DIFF   interesting threshold        (default: 0.05)
//! CRASHCOUNT_MIN_SIG_COUNT       top-crasher floor            (default: 10)
//! CRASHCOUNT_MAX_REPORTS         top-crasher cap              (default: 100)
//! CRASHCOUNT_MAX_RESTARTS        restarts per split           (default: 3)
//! CRASHCOUNT_MIN_SPLIT_SUCCESS   job success fraction         (default: 0.9)
//! CRASHCOUNT_HTTP_ADDR           report service address       (default: "127.0.0.1:8080")
//! ```
//!
//! A value that does not parse falls back to its default with a warning.
//! The salting policy is the exception: guessing it would write keys the
//! scan side never visits, so an unknown policy is an error.
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use rowkey::SaltingPolicy;
use thiserror::Error;

pub const ENV_DATA_DIR: &str = "CRASHCOUNT_DATA_DIR";
pub const ENV_WAL_SYNC: &str = "CRASHCOUNT_WAL_SYNC";
pub const ENV_SALTING: &str = "CRASHCOUNT_SALTING";
pub const ENV_SPLIT_POINTS: &str = "CRASHCOUNT_SPLIT_POINTS";
pub const ENV_MIN_BASELINE_DIFF: &str = "CRASHCOUNT_MIN_BASELINE_DIFF";
pub const ENV_MIN_SIG_COUNT: &str = "CRASHCOUNT_MIN_SIG_COUNT";
pub const ENV_MAX_REPORTS: &str = "CRASHCOUNT_MAX_REPORTS";
pub const ENV_MAX_RESTARTS: &str = "CRASHCOUNT_MAX_RESTARTS";
pub const ENV_MIN_SPLIT_SUCCESS: &str = "CRASHCOUNT_MIN_SPLIT_SUCCESS";
pub const ENV_HTTP_ADDR: &str = "CRASHCOUNT_HTTP_ADDR";

/// Name of the counter table.
pub const COUNTS_TABLE: &str = "crash_counts";
/// Name of the raw crash report table backfills read.
pub const REPORTS_TABLE: &str = "crash_reports";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var}: unknown salting policy {value:?} (expected \"length\" or \"none\")")]
    UnknownSalting { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub wal_sync: bool,
    pub salting: SaltingPolicy,
    pub split_points: Vec<Vec<u8>>,
    pub min_baseline_diff: f64,
    pub min_sig_count: u64,
    pub max_reports: usize,
    pub max_restarts: usize,
    pub min_split_success: f64,
    pub http_addr: SocketAddr,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            wal_sync: true,
            salting: SaltingPolicy::LengthDerived,
            split_points: parse_split_points("4,8,c"),
            min_baseline_diff: 0.05,
            min_sig_count: 10,
            max_reports: 100,
            max_restarts: 3,
            min_split_success: 0.9,
            http_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
        }
    }
}

/// `"4,8,c"` → `[b"4", b"8", b"c"]`. Blank entries are dropped.
pub fn parse_split_points(s: &str) -> Vec<Vec<u8>> {
    s.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| p.as_bytes().to_vec())
        .collect()
}

fn parsed_or<T: FromStr + Copy + std::fmt::Display>(var: &'static str, raw: Option<String>, default: T) -> T {
    match raw {
        None => default,
        Some(value) => value.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(var, value = %value, default = %default, "unparseable setting, using default");
            default
        }),
    }
}

impl Config {
    /// Reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any variable lookup; unset variables take their
    /// defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Config::default();

        let salting = match lookup(ENV_SALTING) {
            None => d.salting,
            Some(value) => SaltingPolicy::from_str(&value)
                .map_err(|_| ConfigError::UnknownSalting { var: ENV_SALTING, value })?,
        };

        let mut min_split_success = parsed_or(ENV_MIN_SPLIT_SUCCESS, lookup(ENV_MIN_SPLIT_SUCCESS), d.min_split_success);
        if !(0.0..=1.0).contains(&min_split_success) {
            tracing::warn!(var = ENV_MIN_SPLIT_SUCCESS, value = min_split_success, "outside 0..=1, using default");
            min_split_success = d.min_split_success;
        }
        let mut min_baseline_diff = parsed_or(ENV_MIN_BASELINE_DIFF, lookup(ENV_MIN_BASELINE_DIFF), d.min_baseline_diff);
        if !min_baseline_diff.is_finite() {
            tracing::warn!(var = ENV_MIN_BASELINE_DIFF, "not finite, using default");
            min_baseline_diff = d.min_baseline_diff;
        }

        Ok(Self {
            data_dir: lookup(ENV_DATA_DIR).map(PathBuf::from).unwrap_or(d.data_dir),
            wal_sync: parsed_or(ENV_WAL_SYNC, lookup(ENV_WAL_SYNC), d.wal_sync),
            salting,
            split_points: lookup(ENV_SPLIT_POINTS)
                .map(|s| parse_split_points(&s))
                .unwrap_or(d.split_points),
            min_baseline_diff,
            min_sig_count: parsed_or(ENV_MIN_SIG_COUNT, lookup(ENV_MIN_SIG_COUNT), d.min_sig_count),
            max_reports: parsed_or(ENV_MAX_REPORTS, lookup(ENV_MAX_REPORTS), d.max_reports),
            max_restarts: parsed_or(ENV_MAX_RESTARTS, lookup(ENV_MAX_RESTARTS), d.max_restarts),
            min_split_success,
            http_addr: parsed_or(ENV_HTTP_ADDR, lookup(ENV_HTTP_ADDR), d.http_addr),
        })
    }

    pub fn counts_wal_path(&self) -> PathBuf {
        self.data_dir.join(format!("{COUNTS_TABLE}.wal"))
    }

    pub fn reports_wal_path(&self) -> PathBuf {
        self.data_dir.join(format!("{REPORTS_TABLE}.wal"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.split_points, vec![b"4".to_vec(), b"8".to_vec(), b"c".to_vec()]);
        assert_eq!(cfg.counts_wal_path(), PathBuf::from("data/crash_counts.wal"));
    }

    #[test]
    fn overrides_are_applied() {
        let cfg = Config::from_lookup(lookup(&[
            (ENV_DATA_DIR, "/tmp/cc"),
            (ENV_WAL_SYNC, "false"),
            (ENV_SALTING, "none"),
            (ENV_SPLIT_POINTS, " 2, ,a "),
            (ENV_MAX_REPORTS, "300"),
            (ENV_HTTP_ADDR, "0.0.0.0:9000"),
        ]))
        .unwrap();
        assert_eq!(cfg.data_dir, PathBuf::from("/tmp/cc"));
        assert!(!cfg.wal_sync);
        assert_eq!(cfg.salting, SaltingPolicy::Unsalted);
        assert_eq!(cfg.split_points, vec![b"2".to_vec(), b"a".to_vec()]);
        assert_eq!(cfg.max_reports, 300);
        assert_eq!(cfg.http_addr.port(), 9000);
    }

    #[test]
    fn bad_numbers_fall_back() {
        let cfg = Config::from_lookup(lookup(&[
            (ENV_MIN_SIG_COUNT, "ten"),
            (ENV_MIN_SPLIT_SUCCESS, "1.5"),
            (ENV_MIN_BASELINE_DIFF, "NaN"),
            (ENV_WAL_SYNC, "yes"),
        ]))
        .unwrap();
        assert_eq!(cfg.min_sig_count, 10);
        assert_eq!(cfg.min_split_success, 0.9);
        assert_eq!(cfg.min_baseline_diff, 0.05);
        assert!(cfg.wal_sync);
    }

    #[test]
    fn unknown_salting_is_an_error() {
        let err = Config::from_lookup(lookup(&[(ENV_SALTING, "md5")])).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownSalting { ref value, .. } if value == "md5"));
    }
}
