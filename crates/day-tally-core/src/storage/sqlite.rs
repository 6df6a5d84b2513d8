use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use super::{CountStore, PersistedRow};
use crate::error::Error;
use crate::tally::DailyCount;

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &str) -> rusqlite::Result<Self> {
        let conn = Connection::open(path)?;
        let store = SqliteStore { conn };
        store.configure_pragmas()?;
        store.ensure_schema()?;
        Ok(store)
    }

    pub fn open_in_memory() -> rusqlite::Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = SqliteStore { conn };
        store.configure_pragmas()?;
        store.ensure_schema()?;
        Ok(store)
    }

    fn configure_pragmas(&self) -> rusqlite::Result<()> {
        self.conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        debug!("SQLite pragmas configured");
        Ok(())
    }

    fn ensure_schema(&self) -> rusqlite::Result<()> {
        self.conn.execute_batch(include_str!("schema.sql"))?;
        debug!("SQLite schema ready");
        Ok(())
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn count_for(&self, person: &str, day: NaiveDate) -> rusqlite::Result<Option<i64>> {
        self.conn
            .query_row(
                "SELECT file_count FROM daily_file_counts WHERE person = ?1 AND day = ?2",
                params![person, day],
                |row| row.get(0),
            )
            .optional()
    }
}

impl CountStore for SqliteStore {
    fn upsert_counts(&mut self, rows: &[DailyCount]) -> Result<usize, Error> {
        let now = Utc::now();
        let tx = self.conn.transaction()?;
        let mut written = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO daily_file_counts (person, day, file_count, updated_at) \
                 VALUES (?1, ?2, ?3, ?4) \
                 ON CONFLICT (person, day) DO UPDATE SET \
                   file_count = excluded.file_count, \
                   updated_at = excluded.updated_at",
            )?;
            for row in rows {
                written += stmt.execute(params![row.person, row.day, row.file_count, now])?;
            }
        }
        tx.commit()?;
        debug!("Upserted {} rows into SQLite", written);
        Ok(written)
    }

    fn fetch_counts(&mut self, person: Option<&str>) -> Result<Vec<PersistedRow>, Error> {
        let mut stmt = self.conn.prepare(
            "SELECT person, day, file_count, updated_at FROM daily_file_counts \
             WHERE ?1 IS NULL OR person = ?1 \
             ORDER BY person, day",
        )?;
        let rows = stmt
            .query_map(params![person], |row| {
                Ok(PersistedRow {
                    person: row.get(0)?,
                    day: row.get(1)?,
                    file_count: row.get(2)?,
                    updated_at: row.get::<_, DateTime<Utc>>(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}
