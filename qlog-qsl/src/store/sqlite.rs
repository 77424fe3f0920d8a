//! SQLite local log store
//!
//! One `contacts` row per logged QSO. Per-service confirmation state lives in
//! `<service>_qsl_rcvd`, `<service>_qslrdate` and `<service>_qslsdate`
//! columns, with `<service>` the [`Service::key`]. `time_on`/`time_off` are
//! Unix seconds so candidate windows are plain range scans; dates are
//! `YYYY-MM-DD` text.

use crate::models::{Confirmations, ContactId, LocalContact, NewContact, Service};
use crate::store::retry::retry_on_lock;
use crate::store::{CandidateQuery, LocalLogStore, StoreError};
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use qlog_common::{callsign, Band, Mode};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use tracing::info;

/// Default upper bound on lock-retry time for writes
pub const DEFAULT_MAX_LOCK_WAIT_MS: u64 = 5000;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Local log store backed by a SQLite database
#[derive(Debug, Clone)]
pub struct SqliteLogStore {
    pool: SqlitePool,
    max_lock_wait_ms: u64,
}

impl SqliteLogStore {
    /// Open (creating if needed) the database at `db_path` and ensure the schema
    pub async fn open(db_path: &Path) -> Result<Self> {
        let newly_created = !db_path.exists();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect(&db_url)
            .await?;

        if newly_created {
            info!("Initialized new log database: {}", db_path.display());
        } else {
            info!("Opened existing log database: {}", db_path.display());
        }

        sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
        // Short busy timeout; longer waits are handled by retry_on_lock
        sqlx::query("PRAGMA busy_timeout = 250").execute(&pool).await?;

        Self::from_pool(pool).await
    }

    /// Wrap an existing pool, creating the schema if needed
    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        create_contacts_table(&pool).await?;
        Ok(Self {
            pool,
            max_lock_wait_ms: DEFAULT_MAX_LOCK_WAIT_MS,
        })
    }

    pub fn with_max_lock_wait_ms(mut self, max_lock_wait_ms: u64) -> Self {
        self.max_lock_wait_ms = max_lock_wait_ms;
        self
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Insert a contact and return its id
    pub async fn insert_contact(&self, contact: &NewContact) -> std::result::Result<ContactId, StoreError> {
        let sql = insert_sql();
        let sql = sql.as_str();
        let pool = &self.pool;

        let result = retry_on_lock("insert contact", self.max_lock_wait_ms, move || {
            let mut query = sqlx::query(sql)
                .bind(contact.callsign.as_str())
                .bind(callsign::match_key(&contact.callsign))
                .bind(contact.band.as_str())
                .bind(contact.mode.as_str())
                .bind(contact.time_on.timestamp())
                .bind(contact.time_off.map(|t| t.timestamp()));
            for service in Service::ALL {
                let state = contact.confirmations.get(service);
                query = query
                    .bind(state.received)
                    .bind(state.received_date.map(format_date))
                    .bind(state.sent_date.map(format_date));
            }
            query.execute(pool)
        })
        .await?;

        Ok(ContactId(result.last_insert_rowid()))
    }

    /// Latest confirmation date recorded for `service`, if any
    pub async fn latest_received_date(
        &self,
        service: Service,
    ) -> std::result::Result<Option<NaiveDate>, StoreError> {
        let sql = format!(
            "SELECT MAX({key}_qslrdate) FROM contacts WHERE {key}_qsl_rcvd = 1",
            key = service.key()
        );
        let value: Option<String> = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
        value.as_deref().map(parse_date).transpose()
    }

    pub async fn count_contacts(&self) -> std::result::Result<i64, StoreError> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM contacts")
            .fetch_one(&self.pool)
            .await?)
    }
}

#[async_trait]
impl LocalLogStore for SqliteLogStore {
    async fn find_candidates(
        &self,
        query: &CandidateQuery,
    ) -> std::result::Result<Vec<LocalContact>, StoreError> {
        let sql = format!(
            "SELECT {} FROM contacts WHERE match_call = ? AND time_on >= ? AND time_on < ?",
            contact_columns()
        );
        let rows = sqlx::query(&sql)
            .bind(&query.match_call)
            .bind(query.window.start.timestamp())
            .bind(query.window.end.timestamp())
            .fetch_all(&self.pool)
            .await?;

        let mut contacts = Vec::with_capacity(rows.len());
        for row in &rows {
            let contact = contact_from_row(row)?;
            // Band and mode compatibility is checked here, not in SQL
            if query.admits(&contact) {
                contacts.push(contact);
            }
        }
        Ok(contacts)
    }

    async fn contact(&self, id: ContactId) -> std::result::Result<Option<LocalContact>, StoreError> {
        let sql = format!("SELECT {} FROM contacts WHERE id = ?", contact_columns());
        let row = sqlx::query(&sql)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(contact_from_row).transpose()
    }

    async fn apply_confirmation(
        &self,
        id: ContactId,
        service: Service,
        date: NaiveDate,
    ) -> std::result::Result<(), StoreError> {
        let sql = format!(
            "UPDATE contacts SET {key}_qsl_rcvd = 1, {key}_qslrdate = ? WHERE id = ?",
            key = service.key()
        );
        let sql = sql.as_str();
        let pool = &self.pool;
        let date_text = format_date(date);
        let date_text = date_text.as_str();

        let result = retry_on_lock("apply confirmation", self.max_lock_wait_ms, move || {
            sqlx::query(sql).bind(date_text).bind(id.0).execute(pool)
        })
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }
}

async fn create_contacts_table(pool: &SqlitePool) -> Result<()> {
    let mut service_columns = String::new();
    for service in Service::ALL {
        let key = service.key();
        service_columns.push_str(&format!(
            ",\n            {key}_qsl_rcvd INTEGER NOT NULL DEFAULT 0,\n            {key}_qslrdate TEXT,\n            {key}_qslsdate TEXT"
        ));
    }

    let sql = format!(
        r#"
        CREATE TABLE IF NOT EXISTS contacts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            callsign TEXT NOT NULL,
            match_call TEXT NOT NULL,
            band TEXT NOT NULL,
            mode TEXT NOT NULL,
            time_on INTEGER NOT NULL,
            time_off INTEGER{service_columns}
        )
        "#
    );
    sqlx::query(&sql).execute(pool).await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_contacts_match ON contacts(match_call, time_on)")
        .execute(pool)
        .await?;

    Ok(())
}

fn contact_columns() -> String {
    let mut columns = vec![
        "id".to_string(),
        "callsign".to_string(),
        "band".to_string(),
        "mode".to_string(),
        "time_on".to_string(),
        "time_off".to_string(),
    ];
    for service in Service::ALL {
        let key = service.key();
        columns.push(format!("{key}_qsl_rcvd"));
        columns.push(format!("{key}_qslrdate"));
        columns.push(format!("{key}_qslsdate"));
    }
    columns.join(", ")
}

fn insert_sql() -> String {
    let mut columns = vec!["callsign", "match_call", "band", "mode", "time_on", "time_off"]
        .into_iter()
        .map(String::from)
        .collect::<Vec<_>>();
    for service in Service::ALL {
        let key = service.key();
        columns.push(format!("{key}_qsl_rcvd"));
        columns.push(format!("{key}_qslrdate"));
        columns.push(format!("{key}_qslsdate"));
    }
    let placeholders = vec!["?"; columns.len()].join(", ");
    format!(
        "INSERT INTO contacts ({}) VALUES ({})",
        columns.join(", "),
        placeholders
    )
}

fn contact_from_row(row: &SqliteRow) -> std::result::Result<LocalContact, StoreError> {
    let band: String = row.try_get("band")?;
    let mode: String = row.try_get("mode")?;
    let time_off: Option<i64> = row.try_get("time_off")?;

    let mut confirmations = Confirmations::default();
    for service in Service::ALL {
        let key = service.key();
        let received: i64 = row.try_get(format!("{key}_qsl_rcvd").as_str())?;
        let received_date: Option<String> = row.try_get(format!("{key}_qslrdate").as_str())?;
        let sent_date: Option<String> = row.try_get(format!("{key}_qslsdate").as_str())?;

        let state = confirmations.get_mut(service);
        state.received = received != 0;
        state.received_date = received_date.as_deref().map(parse_date).transpose()?;
        state.sent_date = sent_date.as_deref().map(parse_date).transpose()?;
    }

    Ok(LocalContact {
        id: ContactId(row.try_get("id")?),
        callsign: row.try_get("callsign")?,
        band: Band::parse_lenient(&band),
        mode: mode.parse().unwrap_or(Mode::Unknown),
        time_on: from_unix(row.try_get("time_on")?)?,
        time_off: time_off.map(from_unix).transpose()?,
        confirmations,
    })
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn parse_date(value: &str) -> std::result::Result<NaiveDate, StoreError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|e| StoreError::Backend(format!("corrupt date '{}': {}", value, e)))
}

fn from_unix(secs: i64) -> std::result::Result<DateTime<Utc>, StoreError> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| StoreError::Backend(format!("corrupt timestamp {}", secs)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ModeMatch, TimeWindow};
    use qlog_common::time::adif_datetime;

    async fn memory_store() -> SqliteLogStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        SqliteLogStore::from_pool(pool).await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_read_back() {
        let store = memory_store().await;
        let mut contact = NewContact::new(
            "ok1abc/p",
            Band::M20,
            Mode::Ssb,
            adif_datetime("20240101", "1000").unwrap(),
        );
        contact.confirmations.eqsl.sent_date = NaiveDate::from_ymd_opt(2024, 1, 2);

        let id = store.insert_contact(&contact).await.unwrap();
        let loaded = store.contact(id).await.unwrap().unwrap();

        assert_eq!(loaded.callsign, "OK1ABC/P");
        assert_eq!(loaded.band, Band::M20);
        assert_eq!(loaded.mode, Mode::Ssb);
        assert_eq!(loaded.time_on, contact.time_on);
        assert_eq!(loaded.confirmations.eqsl.sent_date, NaiveDate::from_ymd_opt(2024, 1, 2));
        assert!(!loaded.confirmations.lotw.received);
        assert_eq!(store.count_contacts().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_find_candidates_uses_match_key_and_window() {
        let store = memory_store().await;
        let t = adif_datetime("20240101", "1000").unwrap();
        let id = store
            .insert_contact(&NewContact::new("OK1ABC/P", Band::M20, Mode::Ssb, t))
            .await
            .unwrap();
        store
            .insert_contact(&NewContact::new("OK1ABC", Band::M40, Mode::Ssb, t))
            .await
            .unwrap();

        let query = CandidateQuery {
            match_call: "OK1ABC".to_string(),
            band: Band::M20,
            mode: Mode::Ssb,
            mode_match: ModeMatch::Exact,
            window: TimeWindow::new(t - chrono::Duration::seconds(300), t + chrono::Duration::seconds(301)),
        };
        let found = store.find_candidates(&query).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, id);
    }

    #[tokio::test]
    async fn test_apply_confirmation_and_latest_date() {
        let store = memory_store().await;
        let t = adif_datetime("20240101", "1000").unwrap();
        let id = store
            .insert_contact(&NewContact::new("OK1ABC", Band::M20, Mode::Ssb, t))
            .await
            .unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();

        assert_eq!(store.latest_received_date(Service::Lotw).await.unwrap(), None);
        store.apply_confirmation(id, Service::Lotw, date).await.unwrap();

        let loaded = store.contact(id).await.unwrap().unwrap();
        assert!(loaded.confirmations.lotw.received);
        assert_eq!(loaded.confirmations.lotw.received_date, Some(date));
        assert_eq!(store.latest_received_date(Service::Lotw).await.unwrap(), Some(date));
    }

    #[tokio::test]
    async fn test_apply_to_missing_row_is_not_found() {
        let store = memory_store().await;
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let result = store.apply_confirmation(ContactId(42), Service::Qrz, date).await;
        assert_eq!(result, Err(StoreError::NotFound(ContactId(42))));
    }
}
