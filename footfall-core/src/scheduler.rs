//! Periodic trigger for the rollup job
//!
//! The loop awaits each run before sleeping for the next tick, so
//! invocations can never overlap. The first tick of a tokio interval
//! completes immediately, which gives the eager run at process startup.
//!
//! There is no watchdog: a run that hangs would block all later ticks.
//! The store side is transactional, so killing the process mid-run loses
//! nothing.

use crate::analytics::rollup::{run_rollup, RollupSummary};
use crate::config::RollupConfig;
use crate::db::Database;
use crate::error::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

/// Drives the rollup job on a fixed interval.
pub struct Scheduler {
    db: Arc<Database>,
    config: RollupConfig,
}

impl Scheduler {
    pub fn new(db: Arc<Database>, config: RollupConfig) -> Self {
        Self { db, config }
    }

    /// Run the schedule loop forever.
    ///
    /// A failed run is logged and retried in full on the next tick; the
    /// rollup is idempotent so nothing is lost.
    pub async fn run(&self) {
        let period = Duration::from_secs(self.config.interval_secs.max(1));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            interval_secs = self.config.interval_secs,
            retention_days = self.config.retention_days,
            "Rollup scheduler started"
        );

        loop {
            ticker.tick().await;

            match self.run_once().await {
                Ok(summary) => {
                    tracing::debug!(
                        groups_loaded = summary.groups_loaded,
                        events_compacted = summary.events_compacted,
                        "Scheduled rollup finished"
                    );
                }
                Err(e) => {
                    tracing::error!(error = %e, "Rollup run failed; retrying on next tick");
                }
            }
        }
    }

    /// Run a single rollup on the blocking pool.
    pub async fn run_once(&self) -> Result<RollupSummary> {
        let db = Arc::clone(&self.db);
        let retention_days = self.config.retention_days;

        tokio::task::spawn_blocking(move || run_rollup(&db, retention_days))
            .await
            .map_err(|e| Error::Job(format!("rollup task panicked: {}", e)))?
    }
}
