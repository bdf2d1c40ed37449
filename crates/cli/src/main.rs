//! # CLI - crash counter shell
//!
//! A REPL over the counter table and the crash report table. Reads commands
//! from stdin, prints results to stdout and logs to stderr. Works both
//! interactively and scripted (pipe commands via stdin).
//!
//! ## Commands
//!
//! ```text
//! INCR date product version os signature {json}   Count one crash
//! INGEST crash_id {json}                          Store a processed crash report
//! REPORT date product version os signature        Correlation report (JSON)
//! TOP date product version os                     Top crashers (JSON)
//! SCOPE date product version os [signature]       Raw counters of one scope
//! PLAN start [end]                                Day × salt scans of a window
//! SPLITS start [end]                              Those scans cut at report regions
//! BACKFILL start [end]                            Recount stored reports of a window
//! REGIONS                                         Region layout of both tables
//! STATS                                           Table sizes and settings
//! FAULT count [after_rows] | FAULT CLEAR          Fail the next report scans
//! EXIT / QUIT                                     Shut down
//! ```
//!
//! Dates are `yyyyMMdd`. Quote words that contain spaces: `"Windows NT"`.
//!
//! ## Configuration
//!
//! `CRASHCOUNT_*` environment variables (see the `config` crate);
//! `RUST_LOG` sets the log filter (default `info`).
//!
//! ## Example
//!
//! ```text
//! $ cargo run -p cli
//! crashcount started (data=data, salting=length, counts=0 rows, reports=0 rows)
//! > INCR 20240101 Firefox 3.6 Linux js_GC {"arch": "amd64 with 2 cores"}
//! OK (markers=7, increments=4)
//! > EXIT
//! bye
//! ```
mod shell;

use anyhow::{Context, Result};
use config::Config;
use shell::{Flow, Shell, HELP};
use std::io::{self, BufRead, Write};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env().context("reading configuration")?;
    let shell = Shell::open(config.clone())?;

    println!(
        "crashcount started (data={}, salting={}, counts={} rows, reports={} rows)",
        config.data_dir.display(),
        config.salting,
        shell.counts().row_count(),
        shell.reports().row_count()
    );
    println!("{HELP}");
    print!("> ");
    io::stdout().flush().ok();

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = line?;
        if shell.execute(&line, &mut stdout)? == Flow::Exit {
            break;
        }
        print!("> ");
        stdout.flush().ok();
    }

    shell.counts().sync()?;
    shell.reports().sync()?;
    Ok(())
}
