//! Database repository layer
//!
//! Provides query and insert operations for metric definitions and records.
//! This is the admin-facing side of the record store; the engine reads it
//! through [`RecordStore`] only.

use crate::analytics::metrics_registry;
use crate::error::{Error, Result};
use crate::store::RecordStore;
use crate::types::*;
use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

/// A stored record with its row metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub id: i64,
    pub metric_id: String,
    pub record: RawRecord,
    /// Where the record came from ("manual", an import file name, ...)
    pub source: Option<String>,
}

/// Database handle with connection pooling (single connection for now)
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open(path: &Path) -> Result<Self> {
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
        let conn = self.conn();
        super::schema::run_migrations(&conn)
    }

    // A panic while holding the lock cannot leave SQLite half-written, so a
    // poisoned mutex is still safe to use.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ============================================
    // Metric operations
    // ============================================

    /// Insert or update a metric definition
    pub fn upsert_metric(&self, metric: &MetricDefinition) -> Result<()> {
        let conn = self.conn();
        let now = Utc::now().to_rfc3339();
        conn.execute(
            r#"
            INSERT INTO metrics (id, label, unit, target, default_granularity, aggregation, direction, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
            ON CONFLICT(id) DO UPDATE SET
                label = excluded.label,
                unit = excluded.unit,
                target = excluded.target,
                default_granularity = excluded.default_granularity,
                aggregation = excluded.aggregation,
                direction = excluded.direction,
                updated_at = excluded.updated_at
            "#,
            params![
                metric.id,
                metric.label,
                metric.unit,
                metric.target,
                metric.default_granularity.as_str(),
                metric.aggregation.as_str(),
                metric.direction.as_str(),
                now,
            ],
        )?;
        Ok(())
    }

    /// Insert the built-in call-center metrics, leaving existing ones alone.
    ///
    /// Returns the number of metrics added.
    pub fn seed_default_metrics(&self) -> Result<usize> {
        let conn = self.conn();
        let now = Utc::now().to_rfc3339();
        let mut inserted = 0;
        for metric in metrics_registry::list_metrics() {
            inserted += conn.execute(
                r#"
                INSERT OR IGNORE INTO metrics (id, label, unit, target, default_granularity, aggregation, direction, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
                "#,
                params![
                    metric.id,
                    metric.label,
                    metric.unit,
                    metric.target,
                    metric.default_granularity.as_str(),
                    metric.aggregation.as_str(),
                    metric.direction.as_str(),
                    now,
                ],
            )?;
        }
        tracing::info!(inserted, "Seeded default metrics");
        Ok(inserted)
    }

    /// Get a metric definition by ID
    pub fn get_metric(&self, id: &str) -> Result<Option<MetricDefinition>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, label, unit, target, default_granularity, aggregation, direction
             FROM metrics WHERE id = ?",
            [id],
            Self::row_to_metric,
        )
        .optional()
        .map_err(Error::from)
    }

    /// List all metric definitions ordered by ID
    pub fn list_metrics(&self) -> Result<Vec<MetricDefinition>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, label, unit, target, default_granularity, aggregation, direction
             FROM metrics ORDER BY id",
        )?;
        let metrics = stmt
            .query_map([], Self::row_to_metric)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(metrics)
    }

    fn row_to_metric(row: &Row) -> rusqlite::Result<MetricDefinition> {
        Ok(MetricDefinition {
            id: row.get(0)?,
            label: row.get(1)?,
            unit: row.get(2)?,
            target: row.get(3)?,
            default_granularity: parse_column(row, 4)?,
            aggregation: parse_column(row, 5)?,
            direction: parse_column(row, 6)?,
        })
    }

    // ============================================
    // Record operations
    // ============================================

    /// Append a record to a metric. The period is stored as given.
    pub fn insert_record(
        &self,
        metric_id: &str,
        record: &RawRecord,
        source: Option<&str>,
    ) -> Result<i64> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        write_records(&tx, metric_id, std::slice::from_ref(record), source)?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        tracing::debug!(metric = metric_id, id, "Inserted record");
        Ok(id)
    }

    /// Append several records to a metric in one transaction.
    pub fn insert_records(
        &self,
        metric_id: &str,
        records: &[RawRecord],
        source: Option<&str>,
    ) -> Result<usize> {
        self.insert_record_groups([(metric_id, records)], source)
    }

    /// Append records for several metrics in one transaction.
    ///
    /// Every metric must exist; if any is unknown nothing is written.
    pub fn insert_record_groups<'r, I>(&self, groups: I, source: Option<&str>) -> Result<usize>
    where
        I: IntoIterator<Item = (&'r str, &'r [RawRecord])>,
    {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let mut inserted = 0;
        for (metric_id, records) in groups {
            inserted += write_records(&tx, metric_id, records, source)?;
            tracing::debug!(metric = metric_id, count = records.len(), "Inserted records");
        }
        tx.commit()?;
        Ok(inserted)
    }

    /// All records of a metric with their row metadata, in insertion order
    pub fn get_stored_records(&self, metric_id: &str) -> Result<Vec<StoredRecord>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, metric_id, period, value, source FROM records
             WHERE metric_id = ? ORDER BY id",
        )?;
        let records = stmt
            .query_map([metric_id], |row| {
                Ok(StoredRecord {
                    id: row.get(0)?,
                    metric_id: row.get(1)?,
                    record: RawRecord {
                        period: row.get(2)?,
                        value: row.get(3)?,
                    },
                    source: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    /// All records of a metric, in insertion order
    pub fn get_records(&self, metric_id: &str) -> Result<Vec<RawRecord>> {
        Ok(self
            .get_stored_records(metric_id)?
            .into_iter()
            .map(|r| r.record)
            .collect())
    }

    /// Number of records stored for a metric
    pub fn record_count(&self, metric_id: &str) -> Result<i64> {
        let conn = self.conn();
        let count = conn.query_row(
            "SELECT COUNT(*) FROM records WHERE metric_id = ?",
            [metric_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Delete all records of a metric. Returns the number deleted.
    pub fn delete_records(&self, metric_id: &str) -> Result<usize> {
        let conn = self.conn();
        let deleted = conn.execute("DELETE FROM records WHERE metric_id = ?", [metric_id])?;
        Ok(deleted)
    }
}

/// Insert records for one metric inside an open transaction.
fn write_records(
    tx: &Transaction<'_>,
    metric_id: &str,
    records: &[RawRecord],
    source: Option<&str>,
) -> Result<usize> {
    let exists: bool = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM metrics WHERE id = ?)",
        [metric_id],
        |row| row.get(0),
    )?;
    if !exists {
        return Err(Error::MetricNotFound(metric_id.to_string()));
    }

    let now = Utc::now().to_rfc3339();
    let mut stmt = tx.prepare_cached(
        "INSERT INTO records (metric_id, period, value, recorded_at, source)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for record in records {
        stmt.execute(params![metric_id, record.period, record.value, now, source])?;
    }
    Ok(records.len())
}

/// Read a TEXT column into an enum via `FromStr`.
fn parse_column<T>(row: &Row, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let text: String = row.get(idx)?;
    text.parse().map_err(|e: T::Err| {
        rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.to_string().into())
    })
}

impl RecordStore for Database {
    fn metric(&self, id: &str) -> Result<Option<MetricDefinition>> {
        self.get_metric(id)
    }

    fn metrics(&self) -> Result<Vec<MetricDefinition>> {
        self.list_metrics()
    }

    fn records(&self, metric_id: &str) -> Result<Vec<RawRecord>> {
        self.get_records(metric_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db
    }

    #[test]
    fn test_metric_crud() {
        let db = test_db();
        let mut aht = metrics_registry::get_metric("aht").unwrap();

        db.upsert_metric(&aht).unwrap();
        assert_eq!(db.get_metric("aht").unwrap(), Some(aht.clone()));

        aht.target = None;
        aht.default_granularity = Granularity::HalfYear;
        db.upsert_metric(&aht).unwrap();
        let retrieved = db.get_metric("aht").unwrap().unwrap();
        assert_eq!(retrieved.target, None);
        assert_eq!(retrieved.default_granularity, Granularity::HalfYear);

        assert!(db.get_metric("missing").unwrap().is_none());
    }

    #[test]
    fn test_seed_is_idempotent() {
        let db = test_db();
        let first = db.seed_default_metrics().unwrap();
        assert_eq!(first, metrics_registry::list_metrics().len());
        assert_eq!(db.seed_default_metrics().unwrap(), 0);

        let ids: Vec<String> = db.list_metrics().unwrap().into_iter().map(|m| m.id).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn test_records_keep_duplicates_and_raw_periods() {
        let db = test_db();
        db.seed_default_metrics().unwrap();

        let records = vec![
            RawRecord::new("2024-05", 440.0),
            RawRecord::new("2024-05", 440.0),
            RawRecord::new("2024-q2", 430.0),
            RawRecord::new("bogus", 1.0),
        ];
        assert_eq!(db.insert_records("aht", &records, Some("test.json")).unwrap(), 4);

        assert_eq!(db.get_records("aht").unwrap(), records);
        assert_eq!(db.record_count("aht").unwrap(), 4);
        let stored = db.get_stored_records("aht").unwrap();
        assert_eq!(stored[0].source.as_deref(), Some("test.json"));

        let id = db
            .insert_record("aht", &RawRecord::new("2024-06", 425.0), None)
            .unwrap();
        assert!(id > stored[3].id);

        assert_eq!(db.delete_records("aht").unwrap(), 5);
        assert!(db.get_records("aht").unwrap().is_empty());
    }

    #[test]
    fn test_insert_into_unknown_metric() {
        let db = test_db();
        let err = db
            .insert_record("nope", &RawRecord::new("2024", 1.0), None)
            .unwrap_err();
        assert!(matches!(err, Error::MetricNotFound(id) if id == "nope"));
    }

    #[test]
    fn test_insert_record_returns_its_row_id() {
        let db = test_db();
        db.seed_default_metrics().unwrap();
        let first = db
            .insert_record("aht", &RawRecord::new("2024-01", 400.0), None)
            .unwrap();
        let second = db
            .insert_record("fcr", &RawRecord::new("2024-01", 80.0), Some("manual"))
            .unwrap();
        assert_ne!(first, second);

        let stored = db.get_stored_records("fcr").unwrap();
        assert_eq!(stored[0].id, second);
        assert_eq!(stored[0].source.as_deref(), Some("manual"));
    }

    #[test]
    fn test_record_groups_are_all_or_nothing() {
        let db = test_db();
        db.seed_default_metrics().unwrap();
        let aht = [RawRecord::new("2024-01", 400.0)];
        let typo = [RawRecord::new("2024-01", 1.0)];

        let err = db
            .insert_record_groups([("aht", &aht[..]), ("zzz_typo", &typo[..])], None)
            .unwrap_err();
        assert!(matches!(err, Error::MetricNotFound(id) if id == "zzz_typo"));
        assert_eq!(db.record_count("aht").unwrap(), 0);

        let fcr = [RawRecord::new("2024-01", 80.0), RawRecord::new("2024-02", 82.0)];
        let inserted = db
            .insert_record_groups([("aht", &aht[..]), ("fcr", &fcr[..])], Some("batch.json"))
            .unwrap();
        assert_eq!(inserted, 3);
        assert_eq!(db.record_count("fcr").unwrap(), 2);
    }

    #[test]
    fn test_corrupt_enum_column_is_an_error() {
        let db = test_db();
        db.seed_default_metrics().unwrap();
        db.conn()
            .execute("UPDATE metrics SET direction = 'sideways' WHERE id = 'aht'", [])
            .unwrap();
        assert!(matches!(db.get_metric("aht"), Err(Error::Database(_))));
    }

    #[test]
    fn test_open_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/kpi.db");
        let db = Database::open(&path).unwrap();
        db.migrate().unwrap();
        db.seed_default_metrics().unwrap();
        drop(db);

        let db = Database::open(&path).unwrap();
        db.migrate().unwrap();
        assert!(db.get_metric("fcr").unwrap().is_some());
    }
}
