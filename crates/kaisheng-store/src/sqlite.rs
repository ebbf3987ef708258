//! SQLite-based store implementation

use chrono::{DateTime, Local, NaiveDate};
use kaisheng_util::AppId;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, warn};

use crate::{AuditEvent, AuditEventType, Store, StoreError, StoreResult};

const DAY_FORMAT: &str = "%Y-%m-%d";

/// SQLite-based store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.lock()?;

        conn.execute_batch(
            r#"
            -- Audit log (append-only)
            CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                event_json TEXT NOT NULL
            );

            -- Usage accounting
            CREATE TABLE IF NOT EXISTS usage (
                app_id TEXT NOT NULL,
                day TEXT NOT NULL,
                duration_secs INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (app_id, day)
            );

            -- Indexes
            CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON audit_log(timestamp);
            CREATE INDEX IF NOT EXISTS idx_usage_day ON usage(day);
            "#,
        )?;

        debug!("Store schema initialized");
        Ok(())
    }
}

impl Store for SqliteStore {
    fn append_audit(&self, mut event: AuditEvent) -> StoreResult<()> {
        let conn = self.lock()?;
        let event_json = serde_json::to_string(&event.event)?;

        conn.execute(
            "INSERT INTO audit_log (timestamp, event_json) VALUES (?, ?)",
            params![event.timestamp.to_rfc3339(), event_json],
        )?;

        event.id = conn.last_insert_rowid();
        debug!(event_id = event.id, "Audit event appended");

        Ok(())
    }

    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            "SELECT id, timestamp, event_json FROM audit_log ORDER BY id DESC LIMIT ?",
        )?;

        let rows = stmt.query_map([limit as i64], |row| {
            let id: i64 = row.get(0)?;
            let timestamp_str: String = row.get(1)?;
            let event_json: String = row.get(2)?;
            Ok((id, timestamp_str, event_json))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (id, timestamp_str, event_json) = row?;
            let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
                .map(|dt| dt.with_timezone(&Local))
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            let event: AuditEventType = serde_json::from_str(&event_json)?;

            events.push(AuditEvent {
                id,
                timestamp,
                event,
            });
        }

        Ok(events)
    }

    fn get_usage(&self, app_id: &AppId, day: NaiveDate) -> StoreResult<Duration> {
        let conn = self.lock()?;
        let day_str = day.format(DAY_FORMAT).to_string();

        let secs: Option<i64> = conn
            .query_row(
                "SELECT duration_secs FROM usage WHERE app_id = ? AND day = ?",
                params![app_id.as_str(), day_str],
                |row| row.get(0),
            )
            .optional()?;

        Ok(Duration::from_secs(secs.unwrap_or(0).max(0) as u64))
    }

    fn add_usage(&self, app_id: &AppId, day: NaiveDate, duration: Duration) -> StoreResult<Duration> {
        let conn = self.lock()?;
        let day_str = day.format(DAY_FORMAT).to_string();
        // Totals saturate so a day's usage never goes backwards
        let secs = i64::try_from(duration.as_secs()).unwrap_or(i64::MAX);

        let total: i64 = conn.query_row(
            r#"
            INSERT INTO usage (app_id, day, duration_secs)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(app_id, day)
            DO UPDATE SET duration_secs = CASE
                WHEN duration_secs > ?4 - excluded.duration_secs THEN ?4
                ELSE duration_secs + excluded.duration_secs
            END
            RETURNING duration_secs
            "#,
            params![app_id.as_str(), day_str, secs, i64::MAX],
            |row| row.get(0),
        )?;

        debug!(app_id = %app_id, day = %day_str, added_secs = secs, total_secs = total, "Usage added");
        Ok(Duration::from_secs(total.max(0) as u64))
    }

    fn get_usage_for_day(&self, day: NaiveDate) -> StoreResult<Vec<(AppId, Duration)>> {
        let conn = self.lock()?;
        let day_str = day.format(DAY_FORMAT).to_string();

        let mut stmt = conn.prepare(
            "SELECT app_id, duration_secs FROM usage WHERE day = ? ORDER BY app_id",
        )?;

        let rows = stmt.query_map([day_str], |row| {
            let app_id: String = row.get(0)?;
            let secs: i64 = row.get(1)?;
            Ok((AppId::new(app_id), Duration::from_secs(secs.max(0) as u64)))
        })?;

        let usage = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(usage)
    }

    fn is_healthy(&self) -> bool {
        match self.conn.lock() {
            Ok(conn) => conn.query_row("SELECT 1", [], |_| Ok(())).is_ok(),
            Err(_) => {
                warn!("Store lock poisoned");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kaisheng_util::ScheduleId;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 12, d).unwrap()
    }

    #[test]
    fn test_in_memory_store() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.is_healthy());
    }

    #[test]
    fn test_audit_log() {
        let store = SqliteStore::in_memory().unwrap();

        store.append_audit(AuditEvent::new(AuditEventType::ServiceStarted)).unwrap();
        store
            .append_audit(AuditEvent::new(AuditEventType::DowntimeStarted {
                schedule_id: ScheduleId::new("bedtime"),
                device_wide: true,
            }))
            .unwrap();

        let events = store.get_recent_audits(10).unwrap();
        assert_eq!(events.len(), 2);
        // Newest first
        assert!(matches!(events[0].event, AuditEventType::DowntimeStarted { device_wide: true, .. }));
        assert!(matches!(events[1].event, AuditEventType::ServiceStarted));

        let limited = store.get_recent_audits(1).unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[test]
    fn test_usage_accounting() {
        let store = SqliteStore::in_memory().unwrap();
        let app = AppId::new("social");

        assert_eq!(store.get_usage(&app, day(26)).unwrap(), Duration::ZERO);

        let total = store.add_usage(&app, day(26), Duration::from_secs(300)).unwrap();
        assert_eq!(total, Duration::from_secs(300));

        let total = store.add_usage(&app, day(26), Duration::from_secs(200)).unwrap();
        assert_eq!(total, Duration::from_secs(500));
        assert_eq!(store.get_usage(&app, day(26)).unwrap(), Duration::from_secs(500));

        // A new day starts from zero
        assert_eq!(store.get_usage(&app, day(27)).unwrap(), Duration::ZERO);
    }

    #[test]
    fn test_usage_saturates_instead_of_wrapping() {
        let store = SqliteStore::in_memory().unwrap();
        let app = AppId::new("social");
        let max = Duration::from_secs(i64::MAX as u64);

        store.add_usage(&app, day(26), Duration::from_secs(1800)).unwrap();

        // Larger than the column can hold
        let total = store.add_usage(&app, day(26), Duration::from_secs(1 << 63)).unwrap();
        assert_eq!(total, max);

        // Adding on top of a full counter keeps it readable
        let total = store.add_usage(&app, day(26), Duration::from_secs(10)).unwrap();
        assert_eq!(total, max);
        assert_eq!(store.get_usage(&app, day(26)).unwrap(), max);

        let other = AppId::new("video");
        store.add_usage(&other, day(26), Duration::from_secs(i64::MAX as u64)).unwrap();
        let total = store.add_usage(&other, day(26), Duration::from_secs(10)).unwrap();
        assert_eq!(total, max);
    }

    #[test]
    fn test_usage_for_day() {
        let store = SqliteStore::in_memory().unwrap();
        store.add_usage(&AppId::new("video"), day(26), Duration::from_secs(60)).unwrap();
        store.add_usage(&AppId::new("games"), day(26), Duration::from_secs(120)).unwrap();
        store.add_usage(&AppId::new("games"), day(25), Duration::from_secs(999)).unwrap();

        let usage = store.get_usage_for_day(day(26)).unwrap();
        assert_eq!(
            usage,
            vec![
                (AppId::new("games"), Duration::from_secs(120)),
                (AppId::new("video"), Duration::from_secs(60)),
            ]
        );
    }

    #[test]
    fn test_file_backed_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kaisheng.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.add_usage(&AppId::new("video"), day(26), Duration::from_secs(42)).unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(
            store.get_usage(&AppId::new("video"), day(26)).unwrap(),
            Duration::from_secs(42)
        );
    }
}
