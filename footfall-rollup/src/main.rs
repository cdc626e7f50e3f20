//! footfall-rollup - scheduler daemon for the analytics rollup job
//!
//! Opens the analytics database, runs the rollup once at startup, and keeps
//! running it on the configured interval. With `--once` it performs a
//! single run and exits, printing what the run did.
//!
//! Uses XDG Base Directory specification for file locations:
//! - Database: $XDG_DATA_HOME/footfall/analytics.db
//! - Logs: $XDG_STATE_HOME/footfall/footfall.log
//! - Config: $XDG_CONFIG_HOME/footfall/config.toml

use anyhow::{Context, Result};
use clap::Parser;
use footfall_core::db::Database;
use footfall_core::{Config, Scheduler};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "footfall-rollup")]
#[command(about = "Run the analytics rollup job on a schedule")]
#[command(version)]
struct Args {
    /// Run a single rollup and exit
    #[arg(long)]
    once: bool,

    /// Database path (defaults to the XDG data dir)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Override the configured interval between runs, in seconds
    #[arg(long)]
    interval_secs: Option<u64>,

    /// Override the configured raw-event retention, in days
    #[arg(long)]
    retention_days: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    Config::ensure_xdg_env();

    let config = Config::load().context("failed to load configuration")?;

    let _log_guard =
        footfall_core::logging::init(&config.logging).context("failed to initialize logging")?;

    tracing::info!("footfall-rollup starting");

    let db_path = args.db.unwrap_or_else(Config::database_path);
    tracing::info!(path = %db_path.display(), "Opening database");

    let db = Database::open(&db_path).context("failed to open database")?;
    db.migrate().context("failed to run database migrations")?;

    let mut rollup_config = config.rollup.clone();
    if let Some(interval) = args.interval_secs {
        rollup_config.interval_secs = interval;
    }
    if let Some(retention) = args.retention_days {
        rollup_config.retention_days = retention;
    }

    let scheduler = Scheduler::new(Arc::new(db), rollup_config.clone());

    if args.once {
        let summary = scheduler.run_once().await.context("rollup run failed")?;

        println!("Rollup complete:");
        println!("  Events scanned:   {}", summary.events_scanned);
        println!("  Groups loaded:    {}", summary.groups_loaded);
        println!("  Events compacted: {}", summary.events_compacted);
        println!("  Duration:         {}ms", summary.duration_ms);

        tracing::info!(
            events_scanned = summary.events_scanned,
            groups_loaded = summary.groups_loaded,
            "footfall-rollup single run complete"
        );
        return Ok(());
    }

    println!("Database: {}", db_path.display());
    println!(
        "Scheduling rollup every {}s (retention {} days). Ctrl-C to stop.",
        rollup_config.interval_secs, rollup_config.retention_days
    );

    scheduler.run().await;
    Ok(())
}
