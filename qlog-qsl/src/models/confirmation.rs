//! Raw and canonical confirmation records

use crate::models::Service;
use crate::store::TimeWindow;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use qlog_common::{time, Band, Mode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const SECONDS_PER_DAY: i64 = 86_400;

/// One record as delivered by a service adapter: an ADIF-style field map
///
/// Field names are stored uppercase. Values are kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    fields: BTreeMap<String, String>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(name, value)` pairs; names are uppercased
    pub fn from_fields<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut record = Self::new();
        for (name, value) in fields {
            record.insert(name.as_ref(), value);
        }
        record
    }

    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.fields.insert(name.to_ascii_uppercase(), value.into());
    }

    /// Trimmed value of a field, `None` when absent or blank
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .get(&name.to_ascii_uppercase())
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// First non-blank value among `names`, with the field name that held it
    pub fn first_of<'a>(&'a self, names: &[&'a str]) -> Option<(&'a str, &'a str)> {
        names
            .iter()
            .find_map(|name| self.get(name).map(|value| (*name, value)))
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn into_fields(self) -> BTreeMap<String, String> {
        self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Contact time as reported by a service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "precision", content = "value", rename_all = "snake_case")]
pub enum QsoTime {
    /// Full timestamp
    Exact(DateTime<Utc>),
    /// Only the UTC date is known
    DateOnly(NaiveDate),
}

impl QsoTime {
    pub fn date(&self) -> NaiveDate {
        match self {
            QsoTime::Exact(ts) => ts.date_naive(),
            QsoTime::DateOnly(date) => *date,
        }
    }

    pub fn is_date_only(&self) -> bool {
        matches!(self, QsoTime::DateOnly(_))
    }

    /// Absolute distance to a logged `time_on`, in seconds
    ///
    /// Date-only values compare at day granularity: same UTC day is 0,
    /// adjacent days are 86 400, and so on.
    pub fn delta_seconds(&self, time_on: DateTime<Utc>) -> i64 {
        match self {
            QsoTime::Exact(ts) => (*ts - time_on).num_seconds().abs(),
            QsoTime::DateOnly(date) => {
                (*date - time_on.date_naive()).num_days().abs() * SECONDS_PER_DAY
            }
        }
    }

    /// Smallest window of `time_on` values whose delta is within `tolerance_secs`
    pub fn window(&self, tolerance_secs: i64) -> TimeWindow {
        let tolerance = Duration::seconds(tolerance_secs.max(0));
        match self {
            QsoTime::Exact(ts) => TimeWindow::new(*ts - tolerance, *ts + tolerance + Duration::seconds(1)),
            QsoTime::DateOnly(date) => {
                // Whole days only: a partial day of tolerance admits nothing extra
                let days = Duration::days(tolerance_secs.max(0) / SECONDS_PER_DAY);
                let start = time::start_of_day(*date);
                TimeWindow::new(start - days, start + Duration::days(1) + days)
            }
        }
    }
}

/// Canonical confirmation record, produced by the normalizer
///
/// Immutable once created; the engine only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmationRecord {
    pub service: Service,
    /// Service-scoped identifier, when the service provides one
    pub remote_id: Option<String>,
    /// Canonical callsign as reported (suffixes retained)
    pub callsign: String,
    /// Callsign key used for matching (condition suffixes stripped)
    pub match_call: String,
    pub band: Band,
    pub mode: Mode,
    pub qso_time: QsoTime,
    /// When the service granted the confirmation
    pub confirmed_at: DateTime<Utc>,
    /// Every field the service delivered, unmodified
    pub raw_fields: BTreeMap<String, String>,
}

impl ConfirmationRecord {
    /// Confirmation date as stored on the local contact
    pub fn confirmed_on(&self) -> NaiveDate {
        self.confirmed_at.date_naive()
    }
}
