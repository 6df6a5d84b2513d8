use chrono::NaiveDate;
use tempfile::tempdir;

use day_tally_core::storage::{open_store, CountStore, SqliteStore};
use day_tally_core::DailyCount;

fn row(person: &str, day: u32, file_count: i64) -> DailyCount {
    DailyCount {
        person: person.to_string(),
        day: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
        file_count,
    }
}

#[test]
fn test_upsert_inserts_new_rows() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    let written = store
        .upsert_counts(&[row("Kelly", 5, 5), row("Kelly", 6, 2), row("Tyler", 5, 1)])
        .unwrap();
    assert_eq!(written, 3);

    let rows = store.fetch_counts(None).unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].person, "Kelly");
    assert_eq!(rows[0].file_count, 5);
    assert_eq!(rows[2].person, "Tyler");
}

#[test]
fn test_upsert_overwrites_and_keeps_absent_keys() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    store
        .upsert_counts(&[row("Kelly", 5, 42), row("Kelly", 6, 3)])
        .unwrap();
    let before = store.fetch_counts(Some("Kelly")).unwrap();

    // Second run only sees March 5, with a smaller count.
    store.upsert_counts(&[row("Kelly", 5, 5)]).unwrap();

    let day5 = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
    let day6 = NaiveDate::from_ymd_opt(2024, 3, 6).unwrap();
    assert_eq!(store.count_for("Kelly", day5).unwrap(), Some(5));
    assert_eq!(store.count_for("Kelly", day6).unwrap(), Some(3));

    let after = store.fetch_counts(Some("Kelly")).unwrap();
    assert_eq!(after.len(), 2);
    assert!(after[0].updated_at >= before[0].updated_at);
    assert_eq!(after[1].updated_at, before[1].updated_at);
}

#[test]
fn test_fetch_filters_by_person_in_order() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    store
        .upsert_counts(&[row("Tyler", 9, 1), row("Kelly", 7, 1), row("Kelly", 2, 4)])
        .unwrap();

    let kelly = store.fetch_counts(Some("Kelly")).unwrap();
    let days: Vec<u32> = kelly.iter().map(|r| chrono::Datelike::day(&r.day)).collect();
    assert_eq!(days, vec![2, 7]);
    assert!(store.fetch_counts(Some("Nobody")).unwrap().is_empty());
}

#[test]
fn test_file_store_persists_across_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tally.db");
    let url = format!("sqlite://{}", path.display());

    {
        let mut store = open_store(&url).unwrap();
        store.upsert_counts(&[row("Kelly", 5, 5)]).unwrap();
    }

    let mut reopened = open_store(path.to_str().unwrap()).unwrap();
    let rows = reopened.fetch_counts(None).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].file_count, 5);
}

#[test]
fn test_open_store_in_memory() {
    let mut store = open_store(":memory:").unwrap();
    assert_eq!(store.upsert_counts(&[]).unwrap(), 0);
    assert!(store.fetch_counts(None).unwrap().is_empty());
}

#[cfg(not(feature = "postgres"))]
#[test]
fn test_postgres_url_without_feature_is_rejected() {
    let result = open_store("postgres://localhost/lab_analytics");
    assert!(matches!(
        result,
        Err(day_tally_core::Error::UnsupportedStore(_))
    ));
}

#[test]
fn test_failed_upsert_rolls_back_the_whole_batch() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    store.upsert_counts(&[row("Kelly", 5, 3)]).unwrap();
    store
        .connection()
        .execute_batch(
            "CREATE TRIGGER reject_tyler BEFORE INSERT ON daily_file_counts \
             WHEN NEW.person = 'Tyler' \
             BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
        )
        .unwrap();

    // Kelly rows sort ahead of Tyler, so they are written before the abort.
    let result = store.upsert_counts(&[row("Kelly", 5, 9), row("Kelly", 6, 1), row("Tyler", 5, 1)]);
    assert!(result.is_err());

    let rows = store.fetch_counts(None).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].person, "Kelly");
    assert_eq!(rows[0].day, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
    assert_eq!(rows[0].file_count, 3);
}
