//! Single writer: decides and applies confirmations
//!
//! The write decision is taken against a fresh read of the matched contact,
//! so two records of one run that resolve to the same contact see each
//! other's effect. A `Conflict` from the store is retried once after a
//! re-read. A contact that vanished is re-resolved once.

use super::{ReportEntry, RecordSummary, SyncCounts, SyncReport, WorkItem};
use crate::error::ErrorKind;
use crate::models::{ConfirmationRecord, ContactId, MatchResult, SyncOutcome, WriteDecision};
use crate::services::match_resolver::MatchResolver;
use crate::store::{LocalLogStore, StoreError};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub(crate) struct Writer<'a> {
    pub store: &'a dyn LocalLogStore,
    pub resolver: &'a MatchResolver,
    pub progress: Option<&'a (dyn Fn(&SyncCounts) + Send + Sync)>,
}

/// Result of one write attempt against a specific contact
enum WriteAttempt {
    Done(SyncOutcome),
    Vanished,
}

impl Writer<'_> {
    /// Consume work until the channel closes or `cancel` fires
    ///
    /// Returns true when stopped by cancellation.
    pub(crate) async fn run(
        &self,
        mut rx: mpsc::Receiver<WorkItem>,
        report: &mut SyncReport,
        cancel: &CancellationToken,
    ) -> bool {
        loop {
            let item = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!(processed = report.details().len(), "Sync cancelled");
                    return true;
                }
                item = rx.recv() => item,
            };
            let Some(item) = item else {
                return cancel.is_cancelled();
            };

            let entry = self.process(item).await;
            report.record(entry);

            if let Some(progress) = self.progress {
                progress(&report.counts());
            }
        }
    }

    async fn process(&self, item: WorkItem) -> ReportEntry {
        match item {
            WorkItem::Failed {
                service,
                record,
                kind,
                detail,
            } => ReportEntry {
                service,
                record,
                outcome: SyncOutcome::error(kind, detail),
            },
            WorkItem::Resolved { record, result } => {
                let outcome = match result {
                    MatchResult::NoMatch => SyncOutcome::Unmatched,
                    MatchResult::Ambiguous(candidate_ids) => SyncOutcome::Ambiguous { candidate_ids },
                    MatchResult::MatchedExact(id) | MatchResult::MatchedFuzzy(id) => {
                        self.apply_matched(&record, id).await
                    }
                };
                tracing::debug!(
                    service = %record.service,
                    callsign = %record.callsign,
                    outcome = outcome.label(),
                    "Record processed"
                );
                ReportEntry {
                    service: record.service,
                    record: Some(RecordSummary::from_record(&record)),
                    outcome,
                }
            }
        }
    }

    async fn apply_matched(&self, record: &ConfirmationRecord, id: ContactId) -> SyncOutcome {
        match self.write(record, id).await {
            WriteAttempt::Done(outcome) => return outcome,
            WriteAttempt::Vanished => {
                tracing::warn!(service = %record.service, contact_id = %id, "Matched contact vanished, re-resolving");
            }
        }

        let result = match self.resolver.resolve(record, self.store).await {
            Ok(result) => result,
            Err(err) => return SyncOutcome::error(ErrorKind::StoreError, err.to_string()),
        };
        match result.matched_contact() {
            Some(new_id) if new_id != id => match self.write(record, new_id).await {
                WriteAttempt::Done(outcome) => outcome,
                WriteAttempt::Vanished => SyncOutcome::error(
                    ErrorKind::NotFound,
                    format!("contacts {} and {} vanished before the write", id, new_id),
                ),
            },
            _ => SyncOutcome::Unmatched,
        }
    }

    /// Fresh read, decide, apply; one retry after `Conflict`
    async fn write(&self, record: &ConfirmationRecord, id: ContactId) -> WriteAttempt {
        let mut retried = false;

        loop {
            let contact = match self.store.contact(id).await {
                Ok(Some(contact)) => contact,
                Ok(None) => return WriteAttempt::Vanished,
                Err(err) => return WriteAttempt::Done(store_failure(err)),
            };

            let date = match contact.confirmations.get(record.service).decide(record.confirmed_on()) {
                WriteDecision::AlreadyCurrent => {
                    return WriteAttempt::Done(SyncOutcome::AlreadyCurrent { contact_id: id })
                }
                WriteDecision::Apply(date) => date,
            };

            match self.store.apply_confirmation(id, record.service, date).await {
                Ok(()) => {
                    tracing::debug!(service = %record.service, contact_id = %id, date = %date, "Confirmation applied");
                    return WriteAttempt::Done(SyncOutcome::Updated { contact_id: id });
                }
                Err(StoreError::NotFound(_)) => return WriteAttempt::Vanished,
                Err(StoreError::Conflict(detail)) if !retried => {
                    tracing::warn!(service = %record.service, contact_id = %id, detail = %detail, "Write conflict, retrying once");
                    retried = true;
                }
                Err(err) => return WriteAttempt::Done(store_failure(err)),
            }
        }
    }
}

fn store_failure(err: StoreError) -> SyncOutcome {
    let kind = match err {
        StoreError::NotFound(_) => ErrorKind::NotFound,
        StoreError::Conflict(_) => ErrorKind::Conflict,
        StoreError::Backend(_) => ErrorKind::StoreError,
    };
    tracing::warn!(error = %err, "Store write failed");
    SyncOutcome::error(kind, err.to_string())
}
