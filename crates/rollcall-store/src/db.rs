//! Database access via `rusqlite`.
//!
//! Two tables: `faces` (one row per registered identity, embedding stored
//! as a JSON array in a TEXT column) and `attendance` (one row per
//! identity per date, enforced by UNIQUE(id, date)).

use chrono::{NaiveDate, NaiveTime};
use rollcall_core::{AttendanceRecord, DayTimes, Embedding, Identity};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use thiserror::Error;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("embedding could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("stored embedding for identity {id} is not valid JSON: {source}")]
    BadEncoding {
        id: i64,
        source: serde_json::Error,
    },
    #[error("malformed {field} value {value:?} in attendance row")]
    BadTimestamp { field: &'static str, value: String },
    #[error("attendance already recorded for identity {id} on {date}")]
    DuplicateRecord { id: i64, date: NaiveDate },
    #[error("failed to create data directory {path}: {source}")]
    DataDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Handle to the attendance database. One per process; opened at startup
/// and dropped at exit.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (creating if necessary) the database at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir).map_err(|source| StoreError::DataDir {
                    path: dir.to_path_buf(),
                    source,
                })?;
            }
        }

        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        tracing::info!(path = %path.display(), "attendance database opened");
        Ok(Self { conn })
    }

    /// Open a fresh in-memory database. Used by tests and diagnostics.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self { conn })
    }

    fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS faces (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                encoding TEXT NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS attendance (
                id INTEGER NOT NULL,
                name TEXT NOT NULL,
                date TEXT NOT NULL,
                in_time TEXT,
                out_time TEXT,
                UNIQUE(id, date)
            )",
            [],
        )?;
        Ok(())
    }

    /// Insert a new identity and return its assigned id.
    pub fn insert_identity(&self, name: &str, embedding: &Embedding) -> Result<i64, StoreError> {
        let encoding = serde_json::to_string(embedding)?;
        self.conn.execute(
            "INSERT INTO faces (name, encoding) VALUES (?1, ?2)",
            params![name, encoding],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::info!(id, name, dims = embedding.values.len(), "identity registered");
        Ok(id)
    }

    /// Load the full gallery in storage (insertion) order.
    pub fn list_identities(&self) -> Result<Vec<Identity>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, encoding FROM faces ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut identities = Vec::new();
        for row in rows {
            let (id, name, encoding) = row?;
            let embedding: Embedding = serde_json::from_str(&encoding)
                .map_err(|source| StoreError::BadEncoding { id, source })?;
            identities.push(Identity {
                id,
                name,
                embedding,
            });
        }
        Ok(identities)
    }

    /// Registered identities without their embeddings, for listings.
    pub fn list_identity_names(&self) -> Result<Vec<(i64, String)>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT id, name FROM faces ORDER BY id")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn get_name(&self, id: i64) -> Result<Option<String>, StoreError> {
        Ok(self
            .conn
            .query_row("SELECT name FROM faces WHERE id = ?1", params![id], |row| {
                row.get(0)
            })
            .optional()?)
    }

    /// Fetch the day's record for an identity, if one exists.
    pub fn get_record(&self, id: i64, date: NaiveDate) -> Result<Option<DayTimes>, StoreError> {
        let raw = self
            .conn
            .query_row(
                "SELECT in_time, out_time FROM attendance WHERE id = ?1 AND date = ?2",
                params![id, date.format(DATE_FORMAT).to_string()],
                |row| {
                    Ok((
                        row.get::<_, Option<String>>(0)?,
                        row.get::<_, Option<String>>(1)?,
                    ))
                },
            )
            .optional()?;

        match raw {
            None => Ok(None),
            Some((in_raw, out_raw)) => Ok(Some(DayTimes {
                in_time: parse_time("in_time", in_raw)?,
                out_time: parse_time("out_time", out_raw)?,
            })),
        }
    }

    /// Create the day's record with its IN time. Fails if a row already
    /// exists for this identity and date.
    pub fn insert_record(
        &self,
        id: i64,
        name: &str,
        date: NaiveDate,
        in_time: NaiveTime,
    ) -> Result<(), StoreError> {
        let result = self.conn.execute(
            "INSERT INTO attendance (id, name, date, in_time, out_time)
             VALUES (?1, ?2, ?3, ?4, NULL)",
            params![
                id,
                name,
                date.format(DATE_FORMAT).to_string(),
                in_time.format(TIME_FORMAT).to_string()
            ],
        );

        match result {
            Ok(_) => {
                tracing::info!(id, name, %date, "IN recorded");
                Ok(())
            }
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::DuplicateRecord { id, date })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Close the day's record with its OUT time.
    pub fn update_out_time(
        &self,
        id: i64,
        date: NaiveDate,
        out_time: NaiveTime,
    ) -> Result<(), StoreError> {
        let updated = self.conn.execute(
            "UPDATE attendance SET out_time = ?1 WHERE id = ?2 AND date = ?3",
            params![
                out_time.format(TIME_FORMAT).to_string(),
                id,
                date.format(DATE_FORMAT).to_string()
            ],
        )?;
        if updated == 0 {
            tracing::warn!(id, %date, "OUT update matched no row");
        } else {
            tracing::info!(id, %date, "OUT recorded");
        }
        Ok(())
    }

    /// Every attendance row, oldest date first.
    pub fn list_records(&self) -> Result<Vec<AttendanceRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, date, in_time, out_time FROM attendance ORDER BY date, id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Option<String>>(4)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (identity_id, name, date_raw, in_raw, out_raw) = row?;
            let date = NaiveDate::parse_from_str(&date_raw, DATE_FORMAT).map_err(|_| {
                StoreError::BadTimestamp {
                    field: "date",
                    value: date_raw.clone(),
                }
            })?;
            records.push(AttendanceRecord {
                identity_id,
                name,
                date,
                in_time: parse_time("in_time", in_raw)?,
                out_time: parse_time("out_time", out_raw)?,
            });
        }
        Ok(records)
    }

    pub fn count_identities(&self) -> Result<i64, StoreError> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM faces", [], |row| row.get(0))?)
    }

    pub fn count_records_on(&self, date: NaiveDate) -> Result<i64, StoreError> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM attendance WHERE date = ?1",
            params![date.format(DATE_FORMAT).to_string()],
            |row| row.get(0),
        )?)
    }

    /// Delete every identity and every attendance row. Irreversible.
    pub fn clear_all(&self) -> Result<(), StoreError> {
        self.conn.execute("DELETE FROM faces", [])?;
        self.conn.execute("DELETE FROM attendance", [])?;
        tracing::warn!("database cleared");
        Ok(())
    }
}

fn parse_time(
    field: &'static str,
    raw: Option<String>,
) -> Result<Option<NaiveTime>, StoreError> {
    match raw {
        None => Ok(None),
        Some(value) => NaiveTime::parse_from_str(&value, TIME_FORMAT)
            .map(Some)
            .map_err(|_| StoreError::BadTimestamp { field, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_identity_round_trip() {
        let store = Store::open_in_memory().unwrap();
        let embedding = Embedding::new(vec![1.0, 0.0, 0.0]);
        let id = store.insert_identity("alice", &embedding).unwrap();

        let gallery = store.list_identities().unwrap();
        assert_eq!(gallery.len(), 1);
        assert_eq!(gallery[0].id, id);
        assert_eq!(gallery[0].name, "alice");
        assert!((gallery[0].embedding.similarity(&embedding) - 1.0).abs() < 1e-6);

        assert_eq!(store.get_name(id).unwrap().as_deref(), Some("alice"));
        assert_eq!(store.get_name(id + 1).unwrap(), None);
    }

    #[test]
    fn test_gallery_preserves_insertion_order() {
        let store = Store::open_in_memory().unwrap();
        store
            .insert_identity("alice", &Embedding::new(vec![1.0, 0.0]))
            .unwrap();
        store
            .insert_identity("bob", &Embedding::new(vec![0.0, 1.0]))
            .unwrap();
        let names: Vec<String> = store
            .list_identities()
            .unwrap()
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(names, vec!["alice", "bob"]);
    }

    #[test]
    fn test_record_lifecycle() {
        let store = Store::open_in_memory().unwrap();
        let date = d(2024, 3, 1);

        assert_eq!(store.get_record(7, date).unwrap(), None);

        store.insert_record(7, "alice", date, t(9, 0)).unwrap();
        let times = store.get_record(7, date).unwrap().unwrap();
        assert_eq!(times.in_time, Some(t(9, 0)));
        assert_eq!(times.out_time, None);

        store.update_out_time(7, date, t(17, 0)).unwrap();
        let times = store.get_record(7, date).unwrap().unwrap();
        assert_eq!(times.in_time, Some(t(9, 0)));
        assert_eq!(times.out_time, Some(t(17, 0)));
    }

    #[test]
    fn test_one_row_per_identity_and_date() {
        let store = Store::open_in_memory().unwrap();
        let date = d(2024, 3, 1);
        store.insert_record(7, "alice", date, t(9, 0)).unwrap();

        let err = store.insert_record(7, "alice", date, t(9, 5)).unwrap_err();
        assert!(matches!(
            err,
            StoreError::DuplicateRecord { id: 7, .. }
        ));

        // A different date is a different key.
        store.insert_record(7, "alice", d(2024, 3, 2), t(8, 55)).unwrap();
    }

    #[test]
    fn test_list_records_ordered_by_date() {
        let store = Store::open_in_memory().unwrap();
        store.insert_record(2, "bob", d(2024, 3, 2), t(9, 10)).unwrap();
        store.insert_record(1, "alice", d(2024, 3, 1), t(9, 0)).unwrap();

        let records = store.list_records().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "alice");
        assert_eq!(records[0].date, d(2024, 3, 1));
        assert_eq!(records[1].name, "bob");
    }

    #[test]
    fn test_clear_all_empties_both_tables() {
        let store = Store::open_in_memory().unwrap();
        store
            .insert_identity("alice", &Embedding::new(vec![1.0]))
            .unwrap();
        store.insert_record(1, "alice", d(2024, 3, 1), t(9, 0)).unwrap();

        store.clear_all().unwrap();

        assert_eq!(store.count_identities().unwrap(), 0);
        assert!(store.list_identities().unwrap().is_empty());
        assert!(store.list_records().unwrap().is_empty());
    }

    #[test]
    fn test_counts() {
        let store = Store::open_in_memory().unwrap();
        store
            .insert_identity("alice", &Embedding::new(vec![1.0]))
            .unwrap();
        store.insert_record(1, "alice", d(2024, 3, 1), t(9, 0)).unwrap();
        store.insert_record(1, "alice", d(2024, 3, 2), t(9, 0)).unwrap();

        assert_eq!(store.count_identities().unwrap(), 1);
        assert_eq!(store.count_records_on(d(2024, 3, 1)).unwrap(), 1);
        assert_eq!(store.count_records_on(d(2024, 3, 3)).unwrap(), 0);
    }
}
