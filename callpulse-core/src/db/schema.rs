//! Database schema and migrations
//!
//! Uses SQLite with embedded migrations managed via PRAGMA user_version.

use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 2;

/// SQL migrations, indexed by version number
const MIGRATIONS: &[&str] = &[
    // Version 1: metric definitions and raw records
    r#"
    CREATE TABLE IF NOT EXISTS metrics (
        id                   TEXT PRIMARY KEY,
        label                TEXT NOT NULL,
        unit                 TEXT NOT NULL DEFAULT '',
        target               REAL,
        default_granularity  TEXT NOT NULL,
        aggregation          TEXT NOT NULL,
        direction            TEXT NOT NULL,
        created_at           DATETIME NOT NULL,
        updated_at           DATETIME NOT NULL
    );

    -- Periods are stored exactly as entered. Validation happens when the
    -- engine reads them, so malformed rows stay visible to admins.
    CREATE TABLE IF NOT EXISTS records (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        metric_id        TEXT NOT NULL REFERENCES metrics(id) ON DELETE CASCADE,
        period           TEXT NOT NULL,
        value            REAL NOT NULL,
        recorded_at      DATETIME NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_records_metric ON records(metric_id);
    "#,
    // Version 2: track where a record came from (manual entry, import file)
    r#"
    ALTER TABLE records ADD COLUMN source TEXT;
    CREATE INDEX IF NOT EXISTS idx_records_metric_period ON records(metric_id, period);
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
    fn test_migrations_reach_current_version() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);

        // Re-running is a no-op
        run_migrations(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_tables_exist() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        for table in ["metrics", "records"] {
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
    fn test_records_reference_metrics() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute("PRAGMA foreign_keys = ON", []).unwrap();
        run_migrations(&conn).unwrap();

        let fk_list: Vec<String> = conn
            .prepare("PRAGMA foreign_key_list(records)")
            .unwrap()
            .query_map([], |row| row.get::<_, String>(2))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        assert!(fk_list.iter().any(|table| table == "metrics"));
    }
}
