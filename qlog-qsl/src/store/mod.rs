//! Local log store capability
//!
//! The reconciliation engine reads candidates and requests confirmation
//! writes through [`LocalLogStore`]. Two implementations ship with the
//! crate: [`InMemoryLogStore`] and the sqlx-backed [`SqliteLogStore`].
//!
//! Stores make no ordering promise for `find_candidates`; ranking and
//! tie-breaking belong to the match resolver. Single-writer discipline is
//! enforced by the engine, not by the store.

pub mod memory;
pub mod retry;
pub mod sqlite;

pub use memory::InMemoryLogStore;
pub use sqlite::SqliteLogStore;

use crate::models::{ContactId, LocalContact, Service};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use qlog_common::{Band, Mode};
use thiserror::Error;

/// Store errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Contact no longer exists
    #[error("contact {0} not found")]
    NotFound(ContactId),

    /// Contact was modified or locked concurrently
    #[error("conflict: {0}")]
    Conflict(String),

    /// Backend failure (I/O, SQL, corrupt row)
    #[error("store backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// Half-open interval `[start, end)` of contact start times
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts < self.end
    }
}

/// How strictly modes must agree for a contact to be a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeMatch {
    /// Same mode (LoTW group pseudo-modes still match their whole group)
    Exact,
    /// Same mode group; for services that collapse submodes
    Group,
}

/// Candidate lookup parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateQuery {
    /// Callsign match key (see `qlog_common::callsign::match_key`)
    pub match_call: String,
    /// `Band::Unknown` matches every band
    pub band: Band,
    /// `Mode::Unknown` matches every mode
    pub mode: Mode,
    pub mode_match: ModeMatch,
    pub window: TimeWindow,
}

impl CandidateQuery {
    /// Whether `contact` satisfies every criterion of the query
    pub fn admits(&self, contact: &LocalContact) -> bool {
        contact.match_call() == self.match_call
            && bands_compatible(self.band, contact.band)
            && modes_compatible(self.mode, contact.mode, self.mode_match)
            && self.window.contains(contact.time_on)
    }
}

fn bands_compatible(wanted: Band, logged: Band) -> bool {
    wanted.is_unknown() || logged.is_unknown() || wanted == logged
}

fn modes_compatible(wanted: Mode, logged: Mode, policy: ModeMatch) -> bool {
    if wanted.is_unknown() || logged.is_unknown() {
        return true;
    }
    if wanted.is_group() || logged.is_group() {
        return wanted.group() == logged.group();
    }
    match policy {
        ModeMatch::Exact => wanted == logged,
        ModeMatch::Group => wanted.group() == logged.group(),
    }
}

/// Local log store capability consumed by the match resolver and the engine
#[async_trait]
pub trait LocalLogStore: Send + Sync {
    /// Contacts satisfying `query`, in no particular order
    async fn find_candidates(&self, query: &CandidateQuery) -> Result<Vec<LocalContact>, StoreError>;

    /// Fresh read of one contact
    async fn contact(&self, id: ContactId) -> Result<Option<LocalContact>, StoreError>;

    /// Mark `id` as confirmed by `service` on `date`
    async fn apply_confirmation(
        &self,
        id: ContactId,
        service: Service,
        date: NaiveDate,
    ) -> Result<(), StoreError>;
}
