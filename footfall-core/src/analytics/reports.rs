//! Reporting queries over the rollup table
//!
//! All reads are safe against an empty store: days with no rollup row come
//! back zero-filled rather than missing, so dashboards never need
//! null-handling. The two directory-wide queries are admin-only and fail
//! fast with [`Error::Forbidden`] for lesser access levels.

use crate::db::Database;
use crate::error::{Error, Result};
use crate::types::{AccessLevel, DailyMetric, GlobalDay, LifetimeStats};
use chrono::{Days, NaiveDate, Utc};
use std::collections::HashMap;

/// Read-only query handle over the aggregate store.
pub struct Reports<'a> {
    db: &'a Database,
}

impl<'a> Reports<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Per-day metrics for one business over the last `days` calendar days
    /// ending today, oldest first. Days without a rollup row are synthesized
    /// as all-zero rows.
    pub fn business_timeseries(&self, business_id: &str, days: u32) -> Result<Vec<DailyMetric>> {
        let window = day_window(Utc::now().date_naive(), days);
        let (start, end) = match (window.first(), window.last()) {
            (Some(start), Some(end)) => (*start, *end),
            _ => return Ok(Vec::new()),
        };

        let by_date: HashMap<NaiveDate, DailyMetric> = self
            .db
            .list_business_metrics_between(business_id, start, end)?
            .into_iter()
            .map(|m| (m.date, m))
            .collect();

        Ok(window
            .into_iter()
            .map(|date| {
                by_date
                    .get(&date)
                    .cloned()
                    .unwrap_or_else(|| DailyMetric::zeroed(date, business_id))
            })
            .collect())
    }

    /// Lifetime view/click/share totals for one business across every
    /// rollup row. `unique_visitors` is excluded: daily cardinalities do
    /// not add up.
    pub fn business_lifetime(&self, business_id: &str) -> Result<LifetimeStats> {
        self.db.sum_business_metrics(business_id)
    }

    /// Directory-wide per-day views and clicks for the last `days` days
    /// ending today, zero-filled, oldest first. Admin-only.
    pub fn global_timeseries(&self, access: AccessLevel, days: u32) -> Result<Vec<GlobalDay>> {
        require_admin(access, "global timeseries")?;

        let window = day_window(Utc::now().date_naive(), days);
        let (start, end) = match (window.first(), window.last()) {
            (Some(start), Some(end)) => (*start, *end),
            _ => return Ok(Vec::new()),
        };

        let by_date: HashMap<NaiveDate, GlobalDay> = self
            .db
            .global_daily_totals_between(start, end)?
            .into_iter()
            .map(|d| (d.date, d))
            .collect();

        Ok(window
            .into_iter()
            .map(|date| {
                by_date.get(&date).cloned().unwrap_or(GlobalDay {
                    date,
                    views: 0,
                    clicks: 0,
                })
            })
            .collect())
    }

    /// Listing count per directory category. Admin-only. Not derived from
    /// events; served here because it shares the reporting surface.
    pub fn category_distribution(&self, access: AccessLevel) -> Result<HashMap<String, i64>> {
        require_admin(access, "category distribution")?;
        self.db.count_businesses_by_category()
    }
}

fn require_admin(access: AccessLevel, what: &'static str) -> Result<()> {
    match access {
        AccessLevel::Admin => Ok(()),
        AccessLevel::Member => Err(Error::Forbidden(what)),
    }
}

/// The last `days` consecutive calendar days ending at `end`, oldest first.
fn day_window(end: NaiveDate, days: u32) -> Vec<NaiveDate> {
    (0..days)
        .rev()
        .map(|back| end.checked_sub_days(Days::new(back as u64)).unwrap_or(end))
        .collect()
}
