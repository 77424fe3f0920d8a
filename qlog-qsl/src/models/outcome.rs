//! Match results and per-record sync outcomes

use crate::error::ErrorKind;
use crate::models::ContactId;
use serde::{Deserialize, Serialize};

/// Local contact considered as a match, with its distance to the record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub contact_id: ContactId,
    pub time_delta_seconds: i64,
}

/// Result of resolving one confirmation against the local log
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchResult {
    /// Same time, band and mode
    MatchedExact(ContactId),
    /// Unique best candidate within tolerance
    MatchedFuzzy(ContactId),
    /// Several candidates share the best distance
    Ambiguous(Vec<ContactId>),
    NoMatch,
}

impl MatchResult {
    pub fn matched_contact(&self) -> Option<ContactId> {
        match self {
            MatchResult::MatchedExact(id) | MatchResult::MatchedFuzzy(id) => Some(*id),
            _ => None,
        }
    }
}

/// Outcome of processing one confirmation record (or one failed service fetch)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome")]
pub enum SyncOutcome {
    Updated { contact_id: ContactId },
    AlreadyCurrent { contact_id: ContactId },
    Unmatched,
    Ambiguous { candidate_ids: Vec<ContactId> },
    Error { kind: ErrorKind, detail: String },
}

impl SyncOutcome {
    pub fn error(kind: ErrorKind, detail: impl Into<String>) -> Self {
        SyncOutcome::Error {
            kind,
            detail: detail.into(),
        }
    }

    /// Needs operator attention (unmatched, ambiguous or failed)
    pub fn is_unresolved(&self) -> bool {
        matches!(
            self,
            SyncOutcome::Unmatched | SyncOutcome::Ambiguous { .. } | SyncOutcome::Error { .. }
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            SyncOutcome::Updated { .. } => "updated",
            SyncOutcome::AlreadyCurrent { .. } => "already current",
            SyncOutcome::Unmatched => "unmatched",
            SyncOutcome::Ambiguous { .. } => "ambiguous",
            SyncOutcome::Error { .. } => "error",
        }
    }
}
