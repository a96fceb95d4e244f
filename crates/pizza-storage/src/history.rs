//! Append-only history log.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use pizza_models::{format_timestamp, parse_timestamp, HistoryRecord, MediaType};
use rusqlite::{params, Connection};
use tracing::debug;

use crate::error::{StorageError, StorageResult};

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS requests (
    timestamp TEXT,
    count INTEGER,
    filetype TEXT,
    result_path TEXT
)";

/// SQLite-backed log of processed uploads.
///
/// Rows are only ever inserted. The table is (re)created on every access
/// so a store whose file was replaced or emptied still reads as empty.
pub struct HistoryStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl HistoryStore {
    /// Open or create the history database at `path`.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute(CREATE_TABLE, [])?;
        debug!(path = %path.display(), "History store opened");

        Ok(Self {
            conn: Mutex::new(conn),
            db_path: path.to_path_buf(),
        })
    }

    /// In-memory store, for tests and throwaway runs.
    pub fn in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute(CREATE_TABLE, [])?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: PathBuf::from(":memory:"),
        })
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Append one record.
    pub fn append(&self, record: &HistoryRecord) -> StorageResult<()> {
        let conn = self.lock()?;
        conn.execute(CREATE_TABLE, [])?;
        conn.execute(
            "INSERT INTO requests (timestamp, count, filetype, result_path)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                format_timestamp(&record.timestamp),
                record.count as i64,
                record.media_type.as_str(),
                record.result_path,
            ],
        )?;

        debug!(
            count = record.count,
            media_type = %record.media_type,
            "History record appended"
        );
        Ok(())
    }

    /// Every record, newest first.
    ///
    /// Equal timestamps fall back to insertion order, latest insert first.
    pub fn list_all(&self) -> StorageResult<Vec<HistoryRecord>> {
        let conn = self.lock()?;
        conn.execute(CREATE_TABLE, [])?;

        let mut stmt = conn.prepare(
            "SELECT timestamp, count, filetype, result_path
             FROM requests
             ORDER BY timestamp DESC, rowid DESC",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (timestamp, count, filetype, result_path) = row?;
            records.push(HistoryRecord {
                timestamp: parse_timestamp(&timestamp)
                    .map_err(|e| StorageError::invalid_record(e.to_string()))?,
                count: u32::try_from(count)
                    .map_err(|_| StorageError::invalid_record(format!("count {}", count)))?,
                media_type: filetype
                    .parse::<MediaType>()
                    .map_err(|e| StorageError::invalid_record(e.to_string()))?,
                result_path,
            });
        }

        Ok(records)
    }

    /// Number of records.
    pub fn count(&self) -> StorageResult<u64> {
        let conn = self.lock()?;
        conn.execute(CREATE_TABLE, [])?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM requests", [], |row| row.get(0))?;
        Ok(n as u64)
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(day: u32, count: u32, media_type: MediaType) -> HistoryRecord {
        HistoryRecord {
            timestamp: NaiveDate::from_ymd_opt(2024, 5, day)
                .unwrap()
                .and_hms_micro_opt(12, 0, 0, 250)
                .unwrap(),
            count,
            media_type,
            result_path: format!("static/result-{}", day),
        }
    }

    #[test]
    fn test_empty_store_lists_nothing() {
        let store = HistoryStore::in_memory().unwrap();
        assert!(store.list_all().unwrap().is_empty());
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_list_is_newest_first() {
        let store = HistoryStore::in_memory().unwrap();
        store.append(&record(2, 1, MediaType::Image)).unwrap();
        store.append(&record(9, 4, MediaType::Video)).unwrap();
        store.append(&record(5, 0, MediaType::Image)).unwrap();

        let days: Vec<_> = store
            .list_all()
            .unwrap()
            .iter()
            .map(|r| r.result_path.clone())
            .collect();
        assert_eq!(days, vec!["static/result-9", "static/result-5", "static/result-2"]);
    }

    #[test]
    fn test_equal_timestamps_latest_insert_first() {
        let store = HistoryStore::in_memory().unwrap();
        let mut first = record(1, 1, MediaType::Image);
        first.result_path = "first".into();
        let mut second = record(1, 2, MediaType::Image);
        second.result_path = "second".into();

        store.append(&first).unwrap();
        store.append(&second).unwrap();

        let listed = store.list_all().unwrap();
        assert_eq!(listed[0].result_path, "second");
        assert_eq!(listed[1].result_path, "first");
    }

    #[test]
    fn test_append_only_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("history.db");

        {
            let store = HistoryStore::open(&path).unwrap();
            store.append(&record(3, 2, MediaType::Video)).unwrap();
        }

        let store = HistoryStore::open(&path).unwrap();
        store.append(&record(4, 1, MediaType::Image)).unwrap();

        let listed = store.list_all().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[1], record(3, 2, MediaType::Video));
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn test_recreates_dropped_table() {
        let store = HistoryStore::in_memory().unwrap();
        store
            .lock()
            .unwrap()
            .execute_batch("DROP TABLE requests;")
            .unwrap();

        assert!(store.list_all().unwrap().is_empty());
        store.append(&record(6, 3, MediaType::Image)).unwrap();
        assert_eq!(store.count().unwrap(), 1);
    }
}
