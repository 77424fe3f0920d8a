//! Reconciliation engine
//!
//! Orchestrates one sync run across any number of service adapters.
//!
//! Each adapter gets its own tokio task that fetches, normalizes and resolves
//! records (see [`fetch`]). Resolved work flows through a bounded channel to
//! a single writer loop (see [`apply`]) which is the only place the store is
//! mutated, so at most one `apply_confirmation` is ever in flight.
//!
//! Per record: Fetched → Normalized → Resolved → Applied | Skipped. Every
//! record ends up in the [`SyncReport`], failures included; `run()` itself
//! never fails.
//!
//! Cancellation is checked between records. The writer finishes the record
//! in hand, stops consuming, and the report comes back `Cancelled`. Work
//! still queued in the channel is dropped unapplied.

pub mod apply;
pub mod fetch;
pub mod report;

pub use report::{RecordSummary, ReportEntry, SyncCounts, SyncReport, SyncStatus};

use crate::adapters::{OperatorIdentity, ServiceAdapter};
use crate::error::ErrorKind;
use crate::models::{ConfirmationRecord, MatchResult, Service, SyncOutcome};
use crate::services::match_resolver::{MatchPolicies, MatchResolver};
use crate::store::LocalLogStore;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Engine tuning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Bound on every adapter call and on each pull from a record stream
    pub fetch_timeout: Duration,
    /// Attempts for `fetch_since` on retryable errors (at least 1)
    pub max_fetch_attempts: u32,
    /// First retry delay; doubles per attempt
    pub initial_backoff: Duration,
    /// Capacity of the producer → writer channel
    pub channel_capacity: usize,
    pub policies: MatchPolicies,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(60),
            max_fetch_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            channel_capacity: 64,
            policies: MatchPolicies::default(),
        }
    }
}

/// Progress callback, invoked on the writer after every processed record
pub type ProgressCallback = Arc<dyn Fn(&SyncCounts) + Send + Sync>;

/// Unit of work handed from a producer to the writer
#[derive(Debug)]
pub(crate) enum WorkItem {
    /// Normalized and resolved; the writer decides and applies
    Resolved {
        record: ConfirmationRecord,
        result: MatchResult,
    },
    /// Failed before reaching the writer (fetch, parse or lookup)
    Failed {
        service: Service,
        record: Option<RecordSummary>,
        kind: ErrorKind,
        detail: String,
    },
}

/// Runs reconciliation batches against one local log store
pub struct ReconciliationEngine {
    store: Arc<dyn LocalLogStore>,
    identity: OperatorIdentity,
    config: EngineConfig,
    resolver: Arc<MatchResolver>,
    progress: Option<ProgressCallback>,
}

impl ReconciliationEngine {
    pub fn new(store: Arc<dyn LocalLogStore>, identity: OperatorIdentity, config: EngineConfig) -> Self {
        let resolver = Arc::new(MatchResolver::new(config.policies));
        Self {
            store,
            identity,
            config,
            resolver,
            progress: None,
        }
    }

    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(&SyncCounts) + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(callback));
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Reconcile confirmations granted since `since` from every adapter
    pub async fn run(
        &self,
        adapters: Vec<Arc<dyn ServiceAdapter>>,
        since: DateTime<Utc>,
        cancel: CancellationToken,
    ) -> SyncReport {
        let mut report = SyncReport::new();
        let services: Vec<String> = adapters.iter().map(|a| a.service().to_string()).collect();

        tracing::info!(
            run_id = %report.run_id(),
            since = %since,
            services = %services.join(", "),
            "Starting confirmation sync"
        );

        if cancel.is_cancelled() {
            report.finish(SyncStatus::Cancelled);
            return report;
        }

        let (tx, rx) = mpsc::channel(self.config.channel_capacity.max(1));
        let producer_cancel = cancel.child_token();
        let mut producers = JoinSet::new();

        for adapter in adapters {
            let service = adapter.service();
            let producer = fetch::Producer {
                adapter,
                identity: self.identity.clone(),
                since,
                config: self.config.clone(),
                resolver: Arc::clone(&self.resolver),
                store: Arc::clone(&self.store),
                tx: tx.clone(),
                cancel: producer_cancel.clone(),
            };
            producers.spawn(async move {
                let outcome = AssertUnwindSafe(producer.run()).catch_unwind().await;
                (service, outcome.err().map(panic_message))
            });
        }
        // Channel closes once every producer has finished
        drop(tx);

        let writer = apply::Writer {
            store: self.store.as_ref(),
            resolver: &self.resolver,
            progress: self.progress.as_deref(),
        };
        let cancelled = writer.run(rx, &mut report, &cancel).await;

        if cancelled {
            producer_cancel.cancel();
            producers.abort_all();
        }
        while let Some(joined) = producers.join_next().await {
            match joined {
                Ok((_, None)) => {}
                Ok((service, Some(message))) => {
                    // The service stopped without reporting; its sub-run failed outright
                    tracing::error!(service = %service, panic = %message, "Service producer panicked");
                    report.record(ReportEntry {
                        service,
                        record: None,
                        outcome: SyncOutcome::error(
                            ErrorKind::ProtocolError,
                            format!("{} sync aborted: {}", service, message),
                        ),
                    });
                }
                Err(e) if e.is_cancelled() => {}
                Err(e) => tracing::error!(error = %e, "Service producer task failed"),
            }
        }

        report.finish(if cancelled {
            SyncStatus::Cancelled
        } else {
            SyncStatus::Completed
        });

        tracing::info!(
            run_id = %report.run_id(),
            status = ?report.status(),
            summary = %report.summary_line(),
            "Confirmation sync finished"
        );
        report
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
