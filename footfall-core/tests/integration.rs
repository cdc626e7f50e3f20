//! Integration tests for the footfall analytics pipeline
//!
//! These drive the tracker, rollup job, and reporting queries together
//! against an in-memory database to verify the end-to-end contract:
//! write-through counters converge with the batch recomputation, rollups
//! are idempotent, and reads never fail on missing data.

use chrono::{Duration, Utc};
use footfall_core::db::Database;
use footfall_core::{
    run_rollup, AccessLevel, Business, Event, EventSubmission, EventType, Reports, Tracker,
};
use std::sync::Arc;

fn test_db() -> Arc<Database> {
    let db = Arc::new(Database::open_in_memory().unwrap());
    db.migrate().unwrap();
    db
}

fn raw_event(id: &str, business: &str, ty: EventType, ts: chrono::DateTime<Utc>, actor: Option<&str>) -> Event {
    Event {
        id: id.to_string(),
        business_id: business.to_string(),
        event_type: ty,
        ts,
        actor_id: actor.map(String::from),
    }
}

fn submit(business: &str, ty: EventType, actor: Option<&str>) -> EventSubmission {
    EventSubmission {
        business_id: business.to_string(),
        event_type: ty,
        actor_id: actor.map(String::from),
    }
}

// ============================================
// Rollup properties
// ============================================

#[test]
fn test_rollup_is_idempotent() {
    let db = test_db();
    let now = Utc::now();

    db.insert_event(&raw_event("e1", "b1", EventType::View, now, Some("u1"))).unwrap();
    db.insert_event(&raw_event("e2", "b1", EventType::Share, now, Some("u2"))).unwrap();
    db.insert_event(&raw_event("e3", "b2", EventType::ClickCall, now, None)).unwrap();

    run_rollup(&db, 7).unwrap();
    let first_b1 = db.list_business_metrics("b1").unwrap();
    let first_b2 = db.list_business_metrics("b2").unwrap();

    for _ in 0..3 {
        run_rollup(&db, 7).unwrap();
    }

    assert_eq!(db.list_business_metrics("b1").unwrap(), first_b1);
    assert_eq!(db.list_business_metrics("b2").unwrap(), first_b2);
}

#[test]
fn test_rollup_never_duplicates_rows() {
    let db = test_db();
    let now = Utc::now();

    db.insert_event(&raw_event("e1", "b1", EventType::View, now, None)).unwrap();

    run_rollup(&db, 7).unwrap();
    run_rollup(&db, 7).unwrap();

    assert_eq!(db.count_daily_metrics().unwrap(), 1);
}

#[test]
fn test_unique_visitors_is_distinct_count() {
    let db = test_db();
    let now = Utc::now();

    // Three events from u1 plus one from u2 on the same day
    db.insert_event(&raw_event("e1", "b1", EventType::View, now, Some("u1"))).unwrap();
    db.insert_event(&raw_event("e2", "b1", EventType::ClickWebsite, now, Some("u1"))).unwrap();
    db.insert_event(&raw_event("e3", "b1", EventType::Share, now, Some("u1"))).unwrap();
    db.insert_event(&raw_event("e4", "b1", EventType::View, now, Some("u2"))).unwrap();
    // Guests never count toward cardinality
    db.insert_event(&raw_event("e5", "b1", EventType::View, now, None)).unwrap();

    run_rollup(&db, 7).unwrap();

    let row = db.get_daily_metric(now.date_naive(), "b1").unwrap().unwrap();
    assert_eq!(row.unique_visitors, 2, "not 4: repeat actors count once");
    assert_eq!(row.views, 3);
}

#[test]
fn test_compaction_boundary() {
    let db = test_db();
    let now = Utc::now();

    db.insert_event(&raw_event("e1", "b1", EventType::View, now - Duration::days(10), None)).unwrap();
    db.insert_event(&raw_event("e2", "b1", EventType::View, now - Duration::days(8), None)).unwrap();
    db.insert_event(&raw_event("e3", "b1", EventType::View, now - Duration::days(6), None)).unwrap();
    db.insert_event(&raw_event("e4", "b1", EventType::View, now, None)).unwrap();

    let summary = run_rollup(&db, 7).unwrap();
    assert_eq!(summary.events_compacted, 2);

    let cutoff = Utc::now() - Duration::days(7);
    let remaining = db.list_events().unwrap();
    assert_eq!(remaining.len(), 2);
    assert!(remaining.iter().all(|e| e.ts >= cutoff));
}

// ============================================
// Write-through and convergence
// ============================================

#[test]
fn test_write_through_then_correction() {
    let db = test_db();
    let tracker = Tracker::new(Arc::clone(&db));

    let mut day = None;
    for _ in 0..3 {
        let event = tracker.track(submit("b-new", EventType::View, Some("u1"))).unwrap();
        day = Some(event.day());
    }
    let day = day.unwrap();

    // Immediately visible before any batch run
    let row = db.get_daily_metric(day, "b-new").unwrap().unwrap();
    assert_eq!(row.views, 3);

    // The batch recomputation converges to the same count
    run_rollup(&db, 7).unwrap();
    let row = db.get_daily_metric(day, "b-new").unwrap().unwrap();
    assert_eq!(row.views, 3);
    assert_eq!(row.clicks, 0);
    assert_eq!(row.shares, 0);
    assert_eq!(row.unique_visitors, 1);
}

#[test]
fn test_rollup_fixes_stale_unique_visitors() {
    let db = test_db();
    let tracker = Tracker::new(Arc::clone(&db));

    // Two distinct actors; write-through only credits the first
    let event = tracker.track(submit("b1", EventType::View, Some("u1"))).unwrap();
    tracker.track(submit("b1", EventType::View, Some("u2"))).unwrap();

    let row = db.get_daily_metric(event.day(), "b1").unwrap().unwrap();
    assert_eq!(row.unique_visitors, 1, "write-through leaves the field stale");

    run_rollup(&db, 7).unwrap();

    let row = db.get_daily_metric(event.day(), "b1").unwrap().unwrap();
    assert_eq!(row.unique_visitors, 2, "rollup recomputes the exact cardinality");
}

// ============================================
// Reporting
// ============================================

#[test]
fn test_timeseries_zero_fills_unknown_business() {
    let db = test_db();
    let reports = Reports::new(&db);

    let series = reports.business_timeseries("ghost", 7).unwrap();
    assert_eq!(series.len(), 7);

    let today = Utc::now().date_naive();
    for (i, row) in series.iter().enumerate() {
        assert_eq!(row.views, 0);
        assert_eq!(row.clicks, 0);
        assert_eq!(row.shares, 0);
        assert_eq!(row.unique_visitors, 0);
        assert_eq!(row.business_id, "ghost");
        let expected = today - Duration::days((6 - i) as i64);
        assert_eq!(row.date, expected, "dates must be consecutive, ending today");
    }
}

#[test]
fn test_timeseries_mixes_real_and_zero_rows() {
    let db = test_db();
    let now = Utc::now();

    db.insert_event(&raw_event("e1", "b1", EventType::View, now, Some("u1"))).unwrap();
    db.insert_event(&raw_event("e2", "b1", EventType::View, now - Duration::days(2), None)).unwrap();
    run_rollup(&db, 7).unwrap();

    let reports = Reports::new(&db);
    let series = reports.business_timeseries("b1", 7).unwrap();
    assert_eq!(series.len(), 7);

    let total_views: i64 = series.iter().map(|r| r.views).sum();
    assert_eq!(total_views, 2);
    assert_eq!(series.last().unwrap().views, 1, "today is the last row");
}

#[test]
fn test_lifetime_stats_match_full_scan() {
    let db = test_db();
    let now = Utc::now();

    for (i, days_ago) in [0i64, 1, 2, 5].iter().enumerate() {
        db.insert_event(&raw_event(
            &format!("v{}", i),
            "b1",
            EventType::View,
            now - Duration::days(*days_ago),
            None,
        ))
        .unwrap();
    }
    db.insert_event(&raw_event("c1", "b1", EventType::ClickEmail, now, None)).unwrap();
    db.insert_event(&raw_event("s1", "b1", EventType::Share, now - Duration::days(1), None)).unwrap();
    run_rollup(&db, 7).unwrap();

    let reports = Reports::new(&db);
    let lifetime = reports.business_lifetime("b1").unwrap();

    let rows = db.list_business_metrics("b1").unwrap();
    assert_eq!(lifetime.views, rows.iter().map(|r| r.views).sum::<i64>());
    assert_eq!(lifetime.clicks, rows.iter().map(|r| r.clicks).sum::<i64>());
    assert_eq!(lifetime.shares, rows.iter().map(|r| r.shares).sum::<i64>());
    assert_eq!(lifetime.views, 4);
    assert_eq!(lifetime.clicks, 1);
    assert_eq!(lifetime.shares, 1);
}

#[test]
fn test_global_timeseries_sums_across_businesses() {
    let db = test_db();
    let now = Utc::now();

    db.insert_event(&raw_event("e1", "b1", EventType::View, now, None)).unwrap();
    db.insert_event(&raw_event("e2", "b2", EventType::View, now, None)).unwrap();
    db.insert_event(&raw_event("e3", "b2", EventType::ClickWebsite, now, None)).unwrap();
    run_rollup(&db, 7).unwrap();

    let reports = Reports::new(&db);
    let series = reports.global_timeseries(AccessLevel::Admin, 3).unwrap();
    assert_eq!(series.len(), 3);

    let today = series.last().unwrap();
    assert_eq!(today.views, 2);
    assert_eq!(today.clicks, 1);
}

#[test]
fn test_category_distribution_counts_membership() {
    let db = test_db();
    for (id, category) in [
        ("b1", "restaurant"),
        ("b2", "restaurant"),
        ("b3", "salon"),
        ("b4", "gym"),
    ] {
        db.upsert_business(&Business {
            id: id.to_string(),
            name: format!("Business {}", id),
            category: category.to_string(),
            created_at: Utc::now(),
            metadata: serde_json::json!({}),
        })
        .unwrap();
    }

    let reports = Reports::new(&db);
    let dist = reports.category_distribution(AccessLevel::Admin).unwrap();
    assert_eq!(dist.get("restaurant"), Some(&2));
    assert_eq!(dist.get("salon"), Some(&1));
    assert_eq!(dist.get("gym"), Some(&1));

    assert!(reports.category_distribution(AccessLevel::Member).is_err());
}

// ============================================
// On-disk storage
// ============================================

#[test]
fn test_on_disk_database_roundtrip() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("analytics.db");

    {
        let db = Arc::new(Database::open(&path).unwrap());
        db.migrate().unwrap();
        let tracker = Tracker::new(Arc::clone(&db));
        tracker.track(submit("b1", EventType::View, Some("u1"))).unwrap();
        run_rollup(&db, 7).unwrap();
    }

    // Re-open and read back
    let db = Database::open(&path).unwrap();
    db.migrate().unwrap();
    assert_eq!(db.count_events().unwrap(), 1);

    let reports = Reports::new(&db);
    let lifetime = reports.business_lifetime("b1").unwrap();
    assert_eq!(lifetime.views, 1);
}
