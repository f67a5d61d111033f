/// PostgreSQL-backed series and warning storage
///
/// Series blobs are stored as JSON text keyed by channel store key; warnings
/// are rows keyed by (date_key, time_key). Both writes are upserts, so a
/// repeated key replaces the previous row. Tables are created on connect.
///
/// Connection: `storage.database_url` or `DATABASE_URL` (via .env).

use std::sync::Mutex;

use postgres::{Client, NoTls};

use super::{SeriesStore, WarningLog};
use crate::model::{Series, StoreError};

const SCHEMA: &str = "
    CREATE SCHEMA IF NOT EXISTS aqmon;

    CREATE TABLE IF NOT EXISTS aqmon.series_blobs (
        key         TEXT PRIMARY KEY,
        body        TEXT NOT NULL,
        updated_at  TIMESTAMPTZ NOT NULL DEFAULT now()
    );

    CREATE TABLE IF NOT EXISTS aqmon.warnings (
        date_key    TEXT NOT NULL,
        time_key    TEXT NOT NULL,
        message     TEXT NOT NULL,
        PRIMARY KEY (date_key, time_key)
    );
";

/// One connection shared by all channel threads; `postgres::Client` needs
/// `&mut` for every query, hence the mutex.
pub struct PgStore {
    client: Mutex<Client>,
}

impl PgStore {
    pub fn connect(database_url: &str) -> Result<Self, StoreError> {
        let mut client = Client::connect(database_url, NoTls)?;
        client.batch_execute(SCHEMA)?;
        Ok(Self {
            client: Mutex::new(client),
        })
    }

    fn with_client<T>(
        &self,
        f: impl FnOnce(&mut Client) -> Result<T, postgres::Error>,
    ) -> Result<T, StoreError> {
        let mut client = self
            .client
            .lock()
            .map_err(|_| StoreError::Unavailable("postgres connection lock poisoned".to_string()))?;
        Ok(f(&mut *client)?)
    }
}

impl SeriesStore for PgStore {
    fn load(&self, key: &str) -> Result<Option<Series>, StoreError> {
        let body: Option<String> = self.with_client(|client| {
            let row =
                client.query_opt("SELECT body FROM aqmon.series_blobs WHERE key = $1", &[&key])?;
            Ok(row.map(|r| r.get(0)))
        })?;

        body.map(|body| {
            serde_json::from_str(&body).map_err(|e| StoreError::Corrupt {
                key: key.to_string(),
                message: e.to_string(),
            })
        })
        .transpose()
    }

    fn save(&self, key: &str, series: &Series) -> Result<(), StoreError> {
        let body = serde_json::to_string(series).map_err(|e| StoreError::Corrupt {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        self.with_client(|client| {
            client.execute(
                "INSERT INTO aqmon.series_blobs (key, body, updated_at)
                 VALUES ($1, $2, now())
                 ON CONFLICT (key) DO UPDATE
                 SET body = EXCLUDED.body, updated_at = EXCLUDED.updated_at",
                &[&key, &body],
            )
        })?;
        Ok(())
    }
}

impl WarningLog for PgStore {
    fn record(&self, date_key: &str, time_key: &str, message: &str) -> Result<(), StoreError> {
        self.with_client(|client| {
            client.execute(
                "INSERT INTO aqmon.warnings (date_key, time_key, message)
                 VALUES ($1, $2, $3)
                 ON CONFLICT (date_key, time_key) DO UPDATE
                 SET message = EXCLUDED.message",
                &[&date_key, &time_key, &message],
            )
        })?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Integration Tests
// ---------------------------------------------------------------------------
//
// Require a reachable PostgreSQL with DATABASE_URL set in .env. Marked
// #[ignore] so normal builds don't depend on a database.
//
//   cargo test -- --ignored postgres

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Reading;
    use chrono::DateTime;

    fn connect() -> PgStore {
        dotenv::dotenv().ok();
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        PgStore::connect(&url).expect("Failed to connect to test database")
    }

    #[test]
    #[ignore] // Requires PostgreSQL
    fn test_postgres_series_round_trip_and_upsert() {
        let store = connect();
        let key = "TEST_PM10";
        let series = Series::from_readings(
            "PM10",
            vec![Reading::new(
                DateTime::parse_from_rfc3339("2024-05-01T12:00:00+02:00").unwrap(),
                Some("10"),
            )],
        );

        store.save(key, &series).unwrap();
        assert_eq!(store.load(key).unwrap(), Some(series));

        store.save(key, &Series::empty("PM10")).unwrap();
        assert_eq!(store.load(key).unwrap().unwrap().len(), 0);
    }

    #[test]
    #[ignore] // Requires PostgreSQL
    fn test_postgres_warning_insert_or_replace() {
        let store = connect();
        store.record("TEST-2024-05-01", "13:00:00", "first").unwrap();
        store.record("TEST-2024-05-01", "13:00:00", "second").unwrap();

        let message: String = store
            .with_client(|client| {
                client
                    .query_one(
                        "SELECT message FROM aqmon.warnings WHERE date_key = $1 AND time_key = $2",
                        &[&"TEST-2024-05-01", &"13:00:00"],
                    )
                    .map(|row| row.get(0))
            })
            .unwrap();
        assert_eq!(message, "second");
    }
}
