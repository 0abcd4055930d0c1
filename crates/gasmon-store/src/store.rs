//! Main store implementation.

use std::path::Path;

use rusqlite::types::Type;
use rusqlite::{Connection, Row};
use time::OffsetDateTime;
use tracing::{debug, info};
use uuid::Uuid;

use gasmon_types::{GasStatus, NewReading, Reading};

use crate::error::{Error, Result};
use crate::queries::ReadingQuery;
use crate::schema;

/// Column list matching [`reading_from_row`].
pub(crate) const READING_COLUMNS: &str = "id, gas1, gas2, gas3, gas4, temperature, humidity, \
     distance, gas1_status, gas2_status, gas3_status, gas4_status, alert_flag, created_at";

/// SQLite-based store for classified readings.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| Error::CreateDirectory {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        info!("Opening database at {}", path.display());
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;

        schema::initialize(&conn)?;

        Ok(Self { conn })
    }

    /// Open the default database location.
    pub fn open_default() -> Result<Self> {
        Self::open(crate::default_db_path())
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    /// Append a classified reading.
    ///
    /// The store assigns the identifier and the creation timestamp. The
    /// timestamp is the current time, raised to the newest existing
    /// `created_at` if the clock went backwards, so creation order never
    /// contradicts insertion order.
    pub fn insert_reading(&self, reading: &NewReading) -> Result<Reading> {
        let id = Uuid::new_v4().to_string();
        let now = to_micros(OffsetDateTime::now_utc());

        let created_at = self.conn.query_row(
            "INSERT INTO readings (id, gas1, gas2, gas3, gas4, temperature, humidity, distance,
                gas1_status, gas2_status, gas3_status, gas4_status, alert_flag, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                MAX(?14, COALESCE((SELECT MAX(created_at) FROM readings), ?14)))
             RETURNING created_at",
            rusqlite::params![
                id,
                reading.gas1,
                reading.gas2,
                reading.gas3,
                reading.gas4,
                reading.temperature,
                reading.humidity,
                reading.distance,
                reading.gas1_status.as_str(),
                reading.gas2_status.as_str(),
                reading.gas3_status.as_str(),
                reading.gas4_status.as_str(),
                reading.alert_flag,
                now,
            ],
            |row| timestamp_at(row, 0),
        )?;

        debug!(%id, alert = reading.alert_flag, "Inserted reading");
        Ok(reading.into_reading(id, created_at))
    }

    /// Query readings with filters.
    pub fn query_readings(&self, query: &ReadingQuery) -> Result<Vec<Reading>> {
        let sql = query.build_sql();
        let (_, params) = query.build_where();

        debug!("Executing query: {}", sql);

        let params_ref: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = self.conn.prepare(&sql)?;
        let readings = stmt
            .query_map(params_ref.as_slice(), reading_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(readings)
    }

    /// The most recent `limit` readings, newest first.
    pub fn recent_readings(&self, limit: u32) -> Result<Vec<Reading>> {
        self.query_readings(&ReadingQuery::new().limit(limit))
    }

    /// The most recent reading, if any.
    pub fn latest_reading(&self) -> Result<Option<Reading>> {
        let mut readings = self.recent_readings(1)?;
        Ok(readings.pop())
    }

    /// Total number of stored readings.
    pub fn count_readings(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM readings", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }
}

/// Convert a timestamp to the stored representation (unix microseconds).
pub(crate) fn to_micros(time: OffsetDateTime) -> i64 {
    (time.unix_timestamp_nanos() / 1_000) as i64
}

fn timestamp_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<OffsetDateTime> {
    let micros: i64 = row.get(idx)?;
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(micros) * 1_000)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Integer, Box::new(e)))
}

fn status_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<GasStatus> {
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn reading_from_row(row: &Row<'_>) -> rusqlite::Result<Reading> {
    Ok(Reading {
        id: row.get(0)?,
        gas1: row.get(1)?,
        gas2: row.get(2)?,
        gas3: row.get(3)?,
        gas4: row.get(4)?,
        temperature: row.get(5)?,
        humidity: row.get(6)?,
        distance: row.get(7)?,
        gas1_status: status_at(row, 8)?,
        gas2_status: status_at(row, 9)?,
        gas3_status: status_at(row, 10)?,
        gas4_status: status_at(row, 11)?,
        alert_flag: row.get(12)?,
        created_at: timestamp_at(row, 13)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gasmon_types::{Classifier, SensorPayload};

    fn classified(gas1: f64) -> NewReading {
        Classifier::default().evaluate(&SensorPayload {
            gas1,
            temperature: 21.0,
            humidity: 40.0,
            distance: 120.0,
            ..SensorPayload::default()
        })
    }

    #[test]
    fn test_open_in_memory() {
        let store = Store::open_in_memory().unwrap();
        assert_eq!(store.count_readings().unwrap(), 0);
        assert!(store.latest_reading().unwrap().is_none());
    }

    #[test]
    fn test_insert_assigns_identity() {
        let store = Store::open_in_memory().unwrap();

        let a = store.insert_reading(&classified(500.0)).unwrap();
        let b = store.insert_reading(&classified(500.0)).unwrap();

        assert_ne!(a.id, b.id);
        assert!(Uuid::parse_str(&a.id).is_ok());
        assert!(b.created_at >= a.created_at);
        assert_eq!(a.gas1_status, GasStatus::Danger);
        assert!(a.alert_flag);
        assert_eq!(store.count_readings().unwrap(), 2);
    }

    #[test]
    fn test_round_trip_matches_insert_result() {
        let store = Store::open_in_memory().unwrap();
        let inserted = store.insert_reading(&classified(123.5)).unwrap();

        let latest = store.latest_reading().unwrap().unwrap();
        assert_eq!(latest, inserted);
    }

    #[test]
    fn test_created_at_never_goes_backwards() {
        let store = Store::open_in_memory().unwrap();

        // A row from the future, as if the clock was later stepped back
        let future = to_micros(OffsetDateTime::now_utc()) + 3_600_000_000;
        store
            .conn
            .execute(
                "INSERT INTO readings (id, gas1_status, gas2_status, gas3_status, gas4_status, alert_flag, created_at)
                 VALUES ('future', 'SAFE', 'SAFE', 'SAFE', 'SAFE', 0, ?1)",
                [future],
            )
            .unwrap();

        let next = store.insert_reading(&classified(0.0)).unwrap();
        assert_eq!(to_micros(next.created_at), future);

        // Ties are broken by insertion order
        let newest = store.latest_reading().unwrap().unwrap();
        assert_eq!(newest.id, next.id);
    }

    #[test]
    fn test_recent_readings_newest_first() {
        let store = Store::open_in_memory().unwrap();
        let ids: Vec<String> = [100.0, 200.0, 300.0]
            .into_iter()
            .map(|v| store.insert_reading(&classified(v)).unwrap().id)
            .collect();

        let recent = store.recent_readings(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, ids[2]);
        assert_eq!(recent[1].id, ids[1]);

        let chronological = store
            .query_readings(&ReadingQuery::new().oldest_first())
            .unwrap();
        let order: Vec<&str> = chronological.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(order, vec![ids[0].as_str(), ids[1].as_str(), ids[2].as_str()]);
    }

    #[test]
    fn test_alerts_only_filter() {
        let store = Store::open_in_memory().unwrap();
        store.insert_reading(&classified(10.0)).unwrap();
        let alert = store.insert_reading(&classified(900.0)).unwrap();

        let alerts = store
            .query_readings(&ReadingQuery::new().alerts_only())
            .unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].id, alert.id);
    }

    #[test]
    fn test_open_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("readings.db");

        let id = {
            let store = Store::open(&path).unwrap();
            store.insert_reading(&classified(450.0)).unwrap().id
        };

        let reopened = Store::open(&path).unwrap();
        let latest = reopened.latest_reading().unwrap().unwrap();
        assert_eq!(latest.id, id);
        assert!(latest.alert_flag);
    }
}
