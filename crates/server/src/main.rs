//! Report service binary. Settings come from `CRASHCOUNT_*` variables (see
//! the `config` crate); log filtering from `RUST_LOG` (default `info`).
use std::sync::Arc;

use anyhow::{Context, Result};
use config::{Config, COUNTS_TABLE};
use correlation::{AnalyzerConfig, ReportService};
use counter::CounterAggregator;
use rowkey::RowKeyCodec;
use server::{create_router, serve, AppState, SharedStore};
use table::Table;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env().context("reading configuration")?;
    let table = Table::open(COUNTS_TABLE, config.counts_wal_path(), &config.split_points, config.wal_sync)
        .with_context(|| format!("opening {}", config.counts_wal_path().display()))?;
    tracing::info!(
        table = COUNTS_TABLE,
        rows = table.row_count(),
        salting = %config.salting,
        "counter table ready"
    );

    let store: SharedStore = Arc::new(table);
    let service = ReportService::new(
        CounterAggregator::new(store, RowKeyCodec::new(config.salting)),
        AnalyzerConfig {
            min_baseline_diff: config.min_baseline_diff,
            min_sig_count: config.min_sig_count,
            max_reports: config.max_reports,
        },
    );

    serve(create_router(AppState::new(service)), config.http_addr).await
}
