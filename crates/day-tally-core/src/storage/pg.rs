use chrono::{DateTime, NaiveDate, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::upsert::excluded;
use tracing::debug;

use super::schema::daily_file_counts;
use super::{CountStore, PersistedRow};
use crate::error::Error;
use crate::tally::DailyCount;

pub const POSTGRES_MAX_PARAMETERS: usize = 65535;
const DAILY_COUNT_FIELD_COUNT: usize = 4;

const DDL: &str = "CREATE TABLE IF NOT EXISTS daily_file_counts (
  person TEXT NOT NULL,
  day DATE NOT NULL,
  file_count BIGINT NOT NULL,
  updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
  PRIMARY KEY (person, day)
)";

#[derive(Debug, Insertable)]
#[diesel(table_name = daily_file_counts)]
struct NewDailyCount<'a> {
    person: &'a str,
    day: NaiveDate,
    file_count: i64,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Queryable)]
struct DailyCountRow {
    person: String,
    day: NaiveDate,
    file_count: i64,
    updated_at: DateTime<Utc>,
}

pub struct PgStore {
    conn: PgConnection,
}

impl PgStore {
    /// Connects and creates the target table if it is missing.
    pub fn connect(database_url: &str) -> Result<Self, Error> {
        let mut conn = PgConnection::establish(database_url)?;
        diesel::sql_query(DDL).execute(&mut conn)?;
        debug!("PostgreSQL schema ready");
        Ok(Self { conn })
    }
}

impl CountStore for PgStore {
    fn upsert_counts(&mut self, rows: &[DailyCount]) -> Result<usize, Error> {
        let now = Utc::now();
        let records: Vec<NewDailyCount> = rows
            .iter()
            .map(|row| NewDailyCount {
                person: &row.person,
                day: row.day,
                file_count: row.file_count,
                updated_at: now,
            })
            .collect();

        let chunk_size = POSTGRES_MAX_PARAMETERS / DAILY_COUNT_FIELD_COUNT;

        let written = self.conn.transaction::<_, diesel::result::Error, _>(|conn| {
            let mut written = 0;
            for chunk in records.chunks(chunk_size) {
                written += diesel::insert_into(daily_file_counts::table)
                    .values(chunk)
                    .on_conflict((daily_file_counts::person, daily_file_counts::day))
                    .do_update()
                    .set((
                        daily_file_counts::file_count.eq(excluded(daily_file_counts::file_count)),
                        daily_file_counts::updated_at.eq(excluded(daily_file_counts::updated_at)),
                    ))
                    .execute(conn)?;
            }
            Ok(written)
        })?;

        debug!("Upserted {} rows into PostgreSQL", written);
        Ok(written)
    }

    fn fetch_counts(&mut self, person: Option<&str>) -> Result<Vec<PersistedRow>, Error> {
        let mut query = daily_file_counts::table
            .order((daily_file_counts::person.asc(), daily_file_counts::day.asc()))
            .into_boxed();
        if let Some(person) = person {
            query = query.filter(daily_file_counts::person.eq(person));
        }
        let rows: Vec<DailyCountRow> = query.load(&mut self.conn)?;
        Ok(rows
            .into_iter()
            .map(|row| PersistedRow {
                person: row.person,
                day: row.day,
                file_count: row.file_count,
                updated_at: row.updated_at,
            })
            .collect())
    }
}
