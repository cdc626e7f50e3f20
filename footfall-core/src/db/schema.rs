//! Database schema and migrations
//!
//! Uses SQLite with embedded migrations managed via PRAGMA user_version.

use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 2;

/// SQL migrations, indexed by version number
const MIGRATIONS: &[&str] = &[
    // Version 1: event store + daily rollup table
    r#"
    -- ============================================
    -- Raw interaction events (append-only)
    -- ============================================

    CREATE TABLE IF NOT EXISTS events (
        id               TEXT PRIMARY KEY,   -- UUID v4
        business_id      TEXT NOT NULL,
        event_type       TEXT NOT NULL,      -- 'view', 'share', 'click_*'
        ts               DATETIME NOT NULL,  -- RFC 3339 UTC, millisecond precision
        actor_id         TEXT                -- NULL for guests
    );

    CREATE INDEX IF NOT EXISTS idx_events_ts ON events(ts);
    CREATE INDEX IF NOT EXISTS idx_events_business ON events(business_id);

    -- ============================================
    -- Derived rollups (regenerable from events)
    -- ============================================

    CREATE TABLE IF NOT EXISTS daily_metrics (
        date             TEXT NOT NULL,      -- 'YYYY-MM-DD' (UTC day)
        business_id      TEXT NOT NULL,
        views            INTEGER NOT NULL DEFAULT 0,
        clicks           INTEGER NOT NULL DEFAULT 0,
        shares           INTEGER NOT NULL DEFAULT 0,
        unique_visitors  INTEGER NOT NULL DEFAULT 0,
        updated_at       DATETIME NOT NULL,

        PRIMARY KEY (date, business_id)
    );

    CREATE INDEX IF NOT EXISTS idx_daily_metrics_business ON daily_metrics(business_id);
    "#,
    // Version 2: business reference data for category reports
    r#"
    CREATE TABLE IF NOT EXISTS businesses (
        id               TEXT PRIMARY KEY,
        name             TEXT NOT NULL,
        category         TEXT NOT NULL,
        created_at       DATETIME NOT NULL,
        metadata         JSON
    );

    CREATE INDEX IF NOT EXISTS idx_businesses_category ON businesses(category);
    "#,
];

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> crate::error::Result<()> {
    let current_version: i32 = conn
        .query_row("PRAGMA user_version", [], |r| r.get(0))
        .unwrap_or(0);

    tracing::info!(
        current_version,
        target_version = SCHEMA_VERSION,
        "Checking database migrations"
    );

    for (i, migration) in MIGRATIONS.iter().enumerate() {
        let version = (i + 1) as i32;
        if version > current_version {
            tracing::info!(version, "Running migration");
            conn.execute_batch(migration)?;
            conn.execute(&format!("PRAGMA user_version = {}", version), [])?;
        }
    }

    if current_version < SCHEMA_VERSION {
        tracing::info!(
            from = current_version,
            to = SCHEMA_VERSION,
            "Migrations complete"
        );
    }

    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> crate::error::Result<i32> {
    let version: i32 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        // Run migrations twice - should be idempotent
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let version = get_schema_version(&conn).unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn test_tables_created() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let tables = ["events", "daily_metrics", "businesses"];

        for table in tables {
            let exists: i32 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?",
                    [table],
                    |r| r.get(0),
                )
                .unwrap();
            assert_eq!(exists, 1, "Table {} should exist", table);
        }
    }

    #[test]
    fn test_daily_metrics_composite_key() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        conn.execute(
            "INSERT INTO daily_metrics (date, business_id, views, clicks, shares, unique_visitors, updated_at)
             VALUES ('2025-01-01', 'b1', 1, 0, 0, 0, '2025-01-01T00:00:00.000Z')",
            [],
        )
        .unwrap();

        // Second plain insert for the same (date, business) must violate the key
        let dup = conn.execute(
            "INSERT INTO daily_metrics (date, business_id, views, clicks, shares, unique_visitors, updated_at)
             VALUES ('2025-01-01', 'b1', 2, 0, 0, 0, '2025-01-01T00:00:00.000Z')",
            [],
        );
        assert!(dup.is_err());
    }
}
