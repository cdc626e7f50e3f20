//! Daily rollup job (the batch ETL)
//!
//! Each run recomputes the daily_metrics table from scratch out of the raw
//! event store, then compacts events older than the retention window:
//!
//! 1. **Extract**: scan every retained event.
//! 2. **Transform**: group by `(UTC day, business)`, counting per-bucket
//!    events and collecting the set of distinct non-empty actor ids.
//! 3. **Load**: full-replace upsert per group. Counters are overwritten,
//!    never added on top, so running the job N times over the same events
//!    yields identical rows and any drift from the write-through path is
//!    corrected.
//! 4. **Compact**: delete events older than the retention cutoff.
//!
//! All four steps share one transaction on the single serialized
//! connection: a failure anywhere rolls the whole run back, so compaction
//! can never outrun aggregation, and a failed run is simply retried in full
//! on the next tick.

use crate::db::repo::{fmt_day, fmt_ts};
use crate::db::Database;
use crate::error::Result;
use crate::types::{Bucket, Event};
use chrono::{Duration, NaiveDate, Utc};
use std::collections::{BTreeMap, HashSet};
use std::time::Instant;

/// What one rollup run did, for logging and operator display.
#[derive(Debug, Clone, Default)]
pub struct RollupSummary {
    /// Events read from the store
    pub events_scanned: usize,
    /// `(date, business)` groups upserted
    pub groups_loaded: usize,
    /// Events deleted by compaction
    pub events_compacted: usize,
    /// Wall-clock duration of the run
    pub duration_ms: i64,
}

/// Per-group accumulator for the Transform step.
#[derive(Default)]
struct GroupAcc {
    views: i64,
    clicks: i64,
    shares: i64,
    actors: HashSet<String>,
}

/// Run one full aggregation + compaction pass.
pub fn run_rollup(db: &Database, retention_days: u32) -> Result<RollupSummary> {
    let start = Instant::now();
    let now = Utc::now();
    let cutoff = now - Duration::days(retention_days as i64);

    let mut conn = db.connection();
    let tx = conn.transaction()?;

    // Extract
    let events: Vec<Event> = {
        let mut stmt = tx.prepare("SELECT * FROM events ORDER BY ts ASC")?;
        let rows = stmt
            .query_map([], Database::row_to_event)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows
    };

    // Transform: BTreeMap keeps load order deterministic
    let mut groups: BTreeMap<(NaiveDate, String), GroupAcc> = BTreeMap::new();
    for event in &events {
        let acc = groups
            .entry((event.day(), event.business_id.clone()))
            .or_default();

        match event.event_type.bucket() {
            Bucket::View => acc.views += 1,
            Bucket::Click => acc.clicks += 1,
            Bucket::Share => acc.shares += 1,
        }

        if let Some(actor) = &event.actor_id {
            if !actor.is_empty() {
                acc.actors.insert(actor.clone());
            }
        }
    }

    // Load: overwrite all four counters per group
    let groups_loaded = groups.len();
    {
        let mut stmt = tx.prepare(
            r#"
            INSERT INTO daily_metrics (date, business_id, views, clicks, shares, unique_visitors, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(date, business_id) DO UPDATE SET
                views = excluded.views,
                clicks = excluded.clicks,
                shares = excluded.shares,
                unique_visitors = excluded.unique_visitors,
                updated_at = excluded.updated_at
            "#,
        )?;

        for ((date, business_id), acc) in &groups {
            stmt.execute(rusqlite::params![
                fmt_day(*date),
                business_id,
                acc.views,
                acc.clicks,
                acc.shares,
                acc.actors.len() as i64,
                fmt_ts(&now),
            ])?;
        }
    }

    // Compact: must come after load so no un-aggregated event is lost.
    // Rollup rows for compacted days stay behind as the durable history.
    let events_compacted = tx.execute("DELETE FROM events WHERE ts < ?", [fmt_ts(&cutoff)])?;

    tx.commit()?;

    let summary = RollupSummary {
        events_scanned: events.len(),
        groups_loaded,
        events_compacted,
        duration_ms: start.elapsed().as_millis() as i64,
    };

    tracing::info!(
        events_scanned = summary.events_scanned,
        groups_loaded = summary.groups_loaded,
        events_compacted = summary.events_compacted,
        duration_ms = summary.duration_ms,
        "Rollup complete"
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EventType;
    use chrono::{DateTime, Duration};

    fn test_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db
    }

    fn insert(db: &Database, id: &str, business: &str, ty: EventType, ts: DateTime<Utc>, actor: Option<&str>) {
        db.insert_event(&Event {
            id: id.to_string(),
            business_id: business.to_string(),
            event_type: ty,
            ts,
            actor_id: actor.map(String::from),
        })
        .unwrap();
    }

    #[test]
    fn test_rollup_counts_buckets_exactly() {
        let db = test_db();
        let now = Utc::now();

        insert(&db, "e1", "b1", EventType::View, now, Some("u1"));
        insert(&db, "e2", "b1", EventType::View, now, Some("u1"));
        insert(&db, "e3", "b1", EventType::ClickWebsite, now, Some("u2"));
        insert(&db, "e4", "b1", EventType::ClickCall, now, None);
        insert(&db, "e5", "b1", EventType::Share, now, Some("u1"));

        let summary = run_rollup(&db, 7).unwrap();
        assert_eq!(summary.events_scanned, 5);
        assert_eq!(summary.groups_loaded, 1);

        let row = db.get_daily_metric(now.date_naive(), "b1").unwrap().unwrap();
        assert_eq!(row.views, 2);
        assert_eq!(row.clicks, 2);
        assert_eq!(row.shares, 1);
        // u1 and u2: three events from u1 still count once
        assert_eq!(row.unique_visitors, 2);
    }

    #[test]
    fn test_rollup_groups_by_day_and_business() {
        let db = test_db();
        let now = Utc::now();
        let yesterday = now - Duration::days(1);

        insert(&db, "e1", "b1", EventType::View, now, None);
        insert(&db, "e2", "b1", EventType::View, yesterday, None);
        insert(&db, "e3", "b2", EventType::Share, now, None);

        let summary = run_rollup(&db, 7).unwrap();
        assert_eq!(summary.groups_loaded, 3);

        assert_eq!(
            db.get_daily_metric(now.date_naive(), "b1").unwrap().unwrap().views,
            1
        );
        assert_eq!(
            db.get_daily_metric(yesterday.date_naive(), "b1")
                .unwrap()
                .unwrap()
                .views,
            1
        );
        assert_eq!(
            db.get_daily_metric(now.date_naive(), "b2").unwrap().unwrap().shares,
            1
        );
    }

    #[test]
    fn test_rollup_overwrites_drifted_counters() {
        let db = test_db();
        let now = Utc::now();

        insert(&db, "e1", "b1", EventType::View, now, None);
        // Simulate write-through drift: counters way off
        db.bump_daily_metric(now.date_naive(), "b1", Bucket::Click, false)
            .unwrap();
        db.bump_daily_metric(now.date_naive(), "b1", Bucket::Click, false)
            .unwrap();

        run_rollup(&db, 7).unwrap();

        let row = db.get_daily_metric(now.date_naive(), "b1").unwrap().unwrap();
        assert_eq!(row.views, 1);
        assert_eq!(row.clicks, 0, "load must replace, not add on top");
    }

    #[test]
    fn test_rollup_compacts_only_old_events() {
        let db = test_db();
        let now = Utc::now();

        insert(&db, "old", "b1", EventType::View, now - Duration::days(8), None);
        insert(&db, "fresh", "b1", EventType::View, now, None);

        let summary = run_rollup(&db, 7).unwrap();
        assert_eq!(summary.events_compacted, 1);

        let ids: Vec<String> = db.list_events().unwrap().into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["fresh".to_string()]);

        // The old day's rollup row survives compaction
        let old_day = (now - Duration::days(8)).date_naive();
        assert!(db.get_daily_metric(old_day, "b1").unwrap().is_some());
    }

    #[test]
    fn test_rollup_empty_store() {
        let db = test_db();
        let summary = run_rollup(&db, 7).unwrap();
        assert_eq!(summary.events_scanned, 0);
        assert_eq!(summary.groups_loaded, 0);
        assert_eq!(summary.events_compacted, 0);
    }
}
