//! Sync report
//!
//! Created when a run starts, appended to once per processed record (or
//! failed service fetch), and handed to the caller when the run ends.
//!
//! Counters tally outcomes, not store mutations: an `AlreadyCurrent` entry
//! only increments `downloaded`. Service-level failures carry no record and
//! increment `errors` without touching `downloaded`.

use crate::models::{ConfirmationRecord, QsoTime, RawRecord, Service, SyncOutcome};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Outcome counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncCounts {
    pub downloaded: usize,
    pub updated: usize,
    pub already_current: usize,
    pub unmatched: usize,
    pub ambiguous: usize,
    pub errors: usize,
}

impl SyncCounts {
    fn tally(&mut self, entry: &ReportEntry) {
        if entry.record.is_some() {
            self.downloaded += 1;
        }
        match entry.outcome {
            SyncOutcome::Updated { .. } => self.updated += 1,
            SyncOutcome::AlreadyCurrent { .. } => self.already_current += 1,
            SyncOutcome::Unmatched => self.unmatched += 1,
            SyncOutcome::Ambiguous { .. } => self.ambiguous += 1,
            SyncOutcome::Error { .. } => self.errors += 1,
        }
    }

    pub fn display_string(&self) -> String {
        format!(
            "{} downloaded / {} updated / {} unmatched / {} ambiguous / {} errors",
            self.downloaded, self.updated, self.unmatched, self.ambiguous, self.errors
        )
    }
}

/// Identifying fields of a processed record, for operator review
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSummary {
    pub callsign: String,
    pub band: String,
    pub mode: String,
    /// `YYYY-MM-DD`
    pub qso_date: String,
    /// `HH:MM:SS`, absent for date-only records
    pub time_on: Option<String>,
    pub remote_id: Option<String>,
}

impl RecordSummary {
    pub fn from_record(record: &ConfirmationRecord) -> Self {
        let raw = |name: &str| record.raw_fields.get(name).map(|v| v.trim().to_string());
        let band = if record.band.is_unknown() {
            raw("BAND").unwrap_or_default()
        } else {
            record.band.as_str().to_string()
        };
        let mode = if record.mode.is_unknown() {
            raw("MODE").unwrap_or_default()
        } else {
            record.mode.as_str().to_string()
        };
        let time_on = match record.qso_time {
            QsoTime::Exact(ts) => Some(ts.format("%H:%M:%S").to_string()),
            QsoTime::DateOnly(_) => None,
        };

        Self {
            callsign: record.callsign.clone(),
            band,
            mode,
            qso_date: record.qso_time.date().format("%Y-%m-%d").to_string(),
            time_on,
            remote_id: record.remote_id.clone(),
        }
    }

    /// Best-effort summary of a record that failed normalization
    pub fn from_raw(raw: &RawRecord) -> Self {
        let field = |name: &str| raw.get(name).unwrap_or("").to_string();
        Self {
            callsign: field("CALL"),
            band: field("BAND"),
            mode: field("MODE"),
            qso_date: field("QSO_DATE"),
            time_on: raw.get("TIME_ON").map(str::to_string),
            remote_id: raw
                .first_of(&["APP_CLUBLOG_ID", "APP_QRZLOG_LOGID"])
                .map(|(_, v)| v.to_string()),
        }
    }
}

impl fmt::Display for RecordSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} {}", self.callsign, self.band, self.mode, self.qso_date)?;
        if let Some(time_on) = &self.time_on {
            write!(f, " {}", time_on)?;
        }
        Ok(())
    }
}

/// One line of the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub service: Service,
    /// `None` for service-level failures
    pub record: Option<RecordSummary>,
    pub outcome: SyncOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Running,
    Completed,
    Cancelled,
}

/// Result of one reconciliation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReport {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    status: SyncStatus,
    counts: SyncCounts,
    per_service: BTreeMap<Service, SyncCounts>,
    entries: Vec<ReportEntry>,
}

impl SyncReport {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            status: SyncStatus::Running,
            counts: SyncCounts::default(),
            per_service: BTreeMap::new(),
            entries: Vec::new(),
        }
    }

    /// Append an entry and update the counters
    pub fn record(&mut self, entry: ReportEntry) {
        self.counts.tally(&entry);
        self.per_service.entry(entry.service).or_default().tally(&entry);
        self.entries.push(entry);
    }

    pub(crate) fn finish(&mut self, status: SyncStatus) {
        self.status = status;
        self.finished_at = Some(Utc::now());
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    pub fn status(&self) -> SyncStatus {
        self.status
    }

    pub fn counts(&self) -> SyncCounts {
        self.counts
    }

    /// Counters for one service (zero when it produced no entries)
    pub fn service_counts(&self, service: Service) -> SyncCounts {
        self.per_service.get(&service).copied().unwrap_or_default()
    }

    /// Entries in processing order
    pub fn details(&self) -> &[ReportEntry] {
        &self.entries
    }

    /// Entries needing operator attention
    pub fn unresolved(&self) -> impl Iterator<Item = &ReportEntry> {
        self.entries.iter().filter(|e| e.outcome.is_unresolved())
    }

    pub fn summary_line(&self) -> String {
        self.counts.display_string()
    }
}

impl Default for SyncReport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::ContactId;

    fn summary(call: &str) -> Option<RecordSummary> {
        Some(RecordSummary {
            callsign: call.to_string(),
            band: "20m".to_string(),
            mode: "SSB".to_string(),
            qso_date: "2024-01-01".to_string(),
            time_on: Some("10:00:30".to_string()),
            remote_id: None,
        })
    }

    #[test]
    fn test_counts_tally_outcomes() {
        let mut report = SyncReport::new();
        report.record(ReportEntry {
            service: Service::Lotw,
            record: summary("OK1ABC"),
            outcome: SyncOutcome::Updated { contact_id: ContactId(1) },
        });
        report.record(ReportEntry {
            service: Service::Lotw,
            record: summary("OK1ABD"),
            outcome: SyncOutcome::AlreadyCurrent { contact_id: ContactId(2) },
        });
        report.record(ReportEntry {
            service: Service::Eqsl,
            record: summary("OK1ABE"),
            outcome: SyncOutcome::Ambiguous {
                candidate_ids: vec![ContactId(3), ContactId(4)],
            },
        });
        report.record(ReportEntry {
            service: Service::Qrz,
            record: None,
            outcome: SyncOutcome::error(ErrorKind::AuthError, "invalid api key"),
        });

        let counts = report.counts();
        assert_eq!(counts.downloaded, 3);
        assert_eq!(counts.updated, 1);
        assert_eq!(counts.already_current, 1);
        assert_eq!(counts.ambiguous, 1);
        assert_eq!(counts.errors, 1);
        assert_eq!(report.service_counts(Service::Lotw).downloaded, 2);
        assert_eq!(report.service_counts(Service::Clublog), SyncCounts::default());
        assert_eq!(report.unresolved().count(), 2);
        assert_eq!(
            report.summary_line(),
            "3 downloaded / 1 updated / 0 unmatched / 1 ambiguous / 1 errors"
        );
    }

    #[test]
    fn test_finish_sets_status() {
        let mut report = SyncReport::new();
        assert_eq!(report.status(), SyncStatus::Running);
        report.finish(SyncStatus::Cancelled);
        assert_eq!(report.status(), SyncStatus::Cancelled);
        assert!(report.finished_at().is_some());
    }

    #[test]
    fn test_report_serializes() {
        let mut report = SyncReport::new();
        report.record(ReportEntry {
            service: Service::Clublog,
            record: summary("W1AW"),
            outcome: SyncOutcome::Unmatched,
        });
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "running");
        assert_eq!(json["entries"][0]["service"], "clublog");
        assert_eq!(json["entries"][0]["outcome"]["outcome"], "Unmatched");
        assert_eq!(json["counts"]["unmatched"], 1);
    }

    #[test]
    fn test_summary_display() {
        let text = summary("OK1ABC").unwrap().to_string();
        assert_eq!(text, "OK1ABC 20m SSB 2024-01-01 10:00:30");
    }
}
