//! Database repository layer
//!
//! Provides query and insert operations for the event store, the daily
//! rollup table, and the business reference data.

use crate::error::{Error, Result};
use crate::types::*;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

/// Day-key format used for the daily_metrics composite key.
const DAY_FMT: &str = "%Y-%m-%d";

/// Row counts across the three tables, for operator display.
#[derive(Debug, Clone, Default)]
pub struct StoreStats {
    /// Raw events currently retained
    pub events: i64,
    /// Rollup rows (kept indefinitely)
    pub daily_metrics: i64,
    /// Businesses in the reference table
    pub businesses: i64,
}

/// Database handle with a single serialized connection.
///
/// One connection behind a mutex is the whole concurrency story: the
/// write-through upsert and the rollup's transaction can never interleave
/// on a row because every statement takes the same lock.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open(path: &PathBuf) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            ",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run migrations on this database
    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        super::schema::run_migrations(&conn)
    }

    /// Get the underlying connection (for advanced use)
    ///
    /// The rollup job takes this once per run so extract, load, and compact
    /// share a single transaction.
    pub fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap()
    }

    // ============================================
    // Event operations
    // ============================================

    /// Persist a fully constructed event.
    ///
    /// Id and timestamp assignment happen in the tracker; the repository
    /// stores records exactly as given (tests and backfills rely on that).
    pub fn insert_event(&self, event: &Event) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO events (id, business_id, event_type, ts, actor_id)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                event.id,
                event.business_id,
                event.event_type.as_str(),
                fmt_ts(&event.ts),
                event.actor_id,
            ],
        )?;
        Ok(())
    }

    /// Full scan of the event store, oldest first.
    pub fn list_events(&self) -> Result<Vec<Event>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT * FROM events ORDER BY ts ASC")?;

        let events = stmt
            .query_map([], Self::row_to_event)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(events)
    }

    /// Delete events strictly older than `cutoff`, returning the count removed.
    pub fn delete_events_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let removed = conn.execute("DELETE FROM events WHERE ts < ?", [fmt_ts(&cutoff)])?;
        Ok(removed)
    }

    /// Count retained events
    pub fn count_events(&self) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM events", [], |r| r.get(0))?;
        Ok(count)
    }

    pub(crate) fn row_to_event(row: &Row) -> rusqlite::Result<Event> {
        let type_str: String = row.get("event_type")?;
        let ts_str: String = row.get("ts")?;

        Ok(Event {
            id: row.get("id")?,
            business_id: row.get("business_id")?,
            // Unrecognized subtypes still count as generic clicks downstream
            event_type: type_str.parse().unwrap_or(EventType::ClickWebsite),
            ts: DateTime::parse_from_rfc3339(&ts_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
            actor_id: row.get("actor_id")?,
        })
    }

    // ============================================
    // Daily metric operations
    // ============================================

    /// Write-through bump for today's row (the real-time path).
    ///
    /// A single upsert: inserting a fresh row seeds the matching counter at 1
    /// and `unique_visitors` at 1 or 0; on conflict only the counters are
    /// incremented. `unique_visitors` is never touched after row creation -
    /// incrementing it per arrival would overcount repeat actors, so the
    /// rollup job is the sole authority for that field.
    pub fn bump_daily_metric(
        &self,
        date: NaiveDate,
        business_id: &str,
        bucket: Bucket,
        has_actor: bool,
    ) -> Result<()> {
        let (views, clicks, shares) = match bucket {
            Bucket::View => (1, 0, 0),
            Bucket::Click => (0, 1, 0),
            Bucket::Share => (0, 0, 1),
        };
        let visitors: i64 = if has_actor { 1 } else { 0 };

        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO daily_metrics (date, business_id, views, clicks, shares, unique_visitors, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(date, business_id) DO UPDATE SET
                views = daily_metrics.views + excluded.views,
                clicks = daily_metrics.clicks + excluded.clicks,
                shares = daily_metrics.shares + excluded.shares,
                updated_at = excluded.updated_at
            "#,
            params![
                date.format(DAY_FMT).to_string(),
                business_id,
                views,
                clicks,
                shares,
                visitors,
                fmt_ts(&Utc::now()),
            ],
        )?;
        Ok(())
    }

    /// Get one rollup row by composite key
    pub fn get_daily_metric(
        &self,
        date: NaiveDate,
        business_id: &str,
    ) -> Result<Option<DailyMetric>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT * FROM daily_metrics WHERE date = ?1 AND business_id = ?2",
            params![date.format(DAY_FMT).to_string(), business_id],
            Self::row_to_metric,
        )
        .optional()
        .map_err(Error::from)
    }

    /// All rollup rows for a business, oldest first.
    pub fn list_business_metrics(&self, business_id: &str) -> Result<Vec<DailyMetric>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT * FROM daily_metrics WHERE business_id = ? ORDER BY date ASC")?;

        let metrics = stmt
            .query_map([business_id], Self::row_to_metric)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(metrics)
    }

    /// Rollup rows for a business within an inclusive date window, oldest first.
    pub fn list_business_metrics_between(
        &self,
        business_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyMetric>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM daily_metrics
            WHERE business_id = ?1 AND date >= ?2 AND date <= ?3
            ORDER BY date ASC
            "#,
        )?;

        let metrics = stmt
            .query_map(
                params![
                    business_id,
                    start.format(DAY_FMT).to_string(),
                    end.format(DAY_FMT).to_string(),
                ],
                Self::row_to_metric,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(metrics)
    }

    /// Lifetime view/click/share totals for a business.
    ///
    /// `unique_visitors` is not summed: per-day cardinalities are not
    /// additive across days.
    pub fn sum_business_metrics(&self, business_id: &str) -> Result<LifetimeStats> {
        let conn = self.conn.lock().unwrap();
        let stats = conn.query_row(
            r#"
            SELECT
                COALESCE(SUM(views), 0),
                COALESCE(SUM(clicks), 0),
                COALESCE(SUM(shares), 0)
            FROM daily_metrics
            WHERE business_id = ?
            "#,
            [business_id],
            |row| {
                Ok(LifetimeStats {
                    views: row.get(0)?,
                    clicks: row.get(1)?,
                    shares: row.get(2)?,
                })
            },
        )?;
        Ok(stats)
    }

    /// Per-day views and clicks summed across all businesses, oldest first.
    pub fn global_daily_totals_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<GlobalDay>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            r#"
            SELECT date, SUM(views), SUM(clicks)
            FROM daily_metrics
            WHERE date >= ?1 AND date <= ?2
            GROUP BY date
            ORDER BY date ASC
            "#,
        )?;

        let days = stmt
            .query_map(
                params![
                    start.format(DAY_FMT).to_string(),
                    end.format(DAY_FMT).to_string(),
                ],
                |row| {
                    let date_str: String = row.get(0)?;
                    Ok(GlobalDay {
                        date: parse_day(&date_str),
                        views: row.get(1)?,
                        clicks: row.get(2)?,
                    })
                },
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(days)
    }

    /// Count rollup rows
    pub fn count_daily_metrics(&self) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM daily_metrics", [], |r| r.get(0))?;
        Ok(count)
    }

    fn row_to_metric(row: &Row) -> rusqlite::Result<DailyMetric> {
        let date_str: String = row.get("date")?;

        Ok(DailyMetric {
            date: parse_day(&date_str),
            business_id: row.get("business_id")?,
            views: row.get("views")?,
            clicks: row.get("clicks")?,
            shares: row.get("shares")?,
            unique_visitors: row.get("unique_visitors")?,
        })
    }

    // ============================================
    // Business operations
    // ============================================

    /// Insert or update a business
    pub fn upsert_business(&self, business: &Business) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO businesses (id, name, category, created_at, metadata)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                category = excluded.category,
                metadata = excluded.metadata
            "#,
            params![
                business.id,
                business.name,
                business.category,
                business.created_at.to_rfc3339(),
                business.metadata.to_string(),
            ],
        )?;
        Ok(())
    }

    /// Get a business by ID
    pub fn get_business(&self, id: &str) -> Result<Option<Business>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT * FROM businesses WHERE id = ?", [id], |row| {
            Self::row_to_business(row)
        })
        .optional()
        .map_err(Error::from)
    }

    /// Count businesses per category
    pub fn count_businesses_by_category(&self) -> Result<HashMap<String, i64>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT category, COUNT(*) FROM businesses GROUP BY category")?;

        let counts: HashMap<String, i64> = stmt
            .query_map([], |row| {
                let category: String = row.get(0)?;
                let count: i64 = row.get(1)?;
                Ok((category, count))
            })?
            .collect::<std::result::Result<_, _>>()?;

        Ok(counts)
    }

    fn row_to_business(row: &Row) -> rusqlite::Result<Business> {
        let created_at_str: String = row.get("created_at")?;
        let metadata_str: Option<String> = row.get("metadata")?;

        Ok(Business {
            id: row.get("id")?,
            name: row.get("name")?,
            category: row.get("category")?,
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
            metadata: metadata_str
                .and_then(|s| serde_json::from_str(&s).ok())
                .unwrap_or(serde_json::json!({})),
        })
    }

    // ============================================
    // Statistics
    // ============================================

    /// Row counts across all tables
    pub fn store_stats(&self) -> Result<StoreStats> {
        Ok(StoreStats {
            events: self.count_events()?,
            daily_metrics: self.count_daily_metrics()?,
            businesses: {
                let conn = self.conn.lock().unwrap();
                conn.query_row("SELECT COUNT(*) FROM businesses", [], |r| r.get(0))?
            },
        })
    }
}

/// Event timestamps are stored with fixed millisecond precision so that
/// string comparison in SQL matches chronological order.
pub(crate) fn fmt_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn fmt_day(date: NaiveDate) -> String {
    date.format(DAY_FMT).to_string()
}

pub(crate) fn parse_day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, DAY_FMT).unwrap_or_else(|_| Utc::now().date_naive())
}
