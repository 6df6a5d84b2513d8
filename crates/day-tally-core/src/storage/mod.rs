#[cfg(feature = "postgres")]
pub mod pg;
#[cfg(feature = "postgres")]
pub mod schema;
pub mod sqlite;

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::Error;
use crate::tally::DailyCount;

#[cfg(feature = "postgres")]
pub use pg::PgStore;
pub use sqlite::SqliteStore;

pub const TABLE_NAME: &str = "daily_file_counts";

/// A row as it sits in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedRow {
    pub person: String,
    pub day: NaiveDate,
    pub file_count: i64,
    pub updated_at: DateTime<Utc>,
}

/// Durable (person, day) -> count table.
pub trait CountStore {
    /// Inserts or overwrites every row in one transaction; rows absent from
    /// `rows` are left untouched. Returns the number of rows written.
    fn upsert_counts(&mut self, rows: &[DailyCount]) -> Result<usize, Error>;

    /// Persisted rows ordered by person, then day.
    fn fetch_counts(&mut self, person: Option<&str>) -> Result<Vec<PersistedRow>, Error>;
}

/// Picks a backend from a database URL.
pub fn open_store(url: &str) -> Result<Box<dyn CountStore>, Error> {
    if url.starts_with("postgres://") || url.starts_with("postgresql://") {
        return open_postgres(url);
    }
    if url == ":memory:" {
        return Ok(Box::new(SqliteStore::open_in_memory()?));
    }
    let path = url.strip_prefix("sqlite://").unwrap_or(url);
    Ok(Box::new(SqliteStore::open(path)?))
}

#[cfg(feature = "postgres")]
fn open_postgres(url: &str) -> Result<Box<dyn CountStore>, Error> {
    Ok(Box::new(PgStore::connect(url)?))
}

#[cfg(not(feature = "postgres"))]
fn open_postgres(_url: &str) -> Result<Box<dyn CountStore>, Error> {
    Err(Error::UnsupportedStore(
        "PostgreSQL support is not compiled in; rebuild with --features postgres".to_string(),
    ))
}
