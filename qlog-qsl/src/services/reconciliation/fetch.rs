//! Per-service producer: fetch → normalize → resolve
//!
//! One producer task runs per adapter. Records are processed in delivery
//! order and forwarded to the writer; nothing here touches store state
//! beyond candidate lookups.

use super::{EngineConfig, RecordSummary, WorkItem};
use crate::adapters::{AdapterError, OperatorIdentity, RawRecordStream, ServiceAdapter};
use crate::error::ErrorKind;
use crate::models::{RawRecord, Service};
use crate::services::match_resolver::MatchResolver;
use crate::services::normalizer;
use crate::store::LocalLogStore;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const MAX_FETCH_BACKOFF: Duration = Duration::from_secs(30);

pub(crate) struct Producer {
    pub adapter: Arc<dyn ServiceAdapter>,
    pub identity: OperatorIdentity,
    pub since: DateTime<Utc>,
    pub config: EngineConfig,
    pub resolver: Arc<MatchResolver>,
    pub store: Arc<dyn LocalLogStore>,
    pub tx: mpsc::Sender<WorkItem>,
    pub cancel: CancellationToken,
}

impl Producer {
    pub(crate) async fn run(self) {
        let service = self.adapter.service();

        let mut stream = match self.open_stream(service).await {
            Ok(Some(stream)) => stream,
            Ok(None) => return,
            Err(err) => {
                tracing::error!(service = %service, error = %err, "Service fetch failed");
                self.send(service_failure(service, err.kind(), err.to_string())).await;
                return;
            }
        };

        let timeout = self.config.fetch_timeout;
        let mut delivered = 0usize;

        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                next = tokio::time::timeout(timeout, stream.next()) => next,
            };

            let item = match next {
                Ok(None) => break,
                Ok(Some(Ok(raw))) => {
                    delivered += 1;
                    self.process(service, raw).await
                }
                Ok(Some(Err(err))) => {
                    // A failed stream is not restartable
                    tracing::error!(service = %service, delivered, error = %err, "Record stream failed");
                    self.send(service_failure(service, err.kind(), err.to_string())).await;
                    break;
                }
                Err(_) => {
                    let err = AdapterError::Timeout(timeout);
                    tracing::error!(service = %service, delivered, "Timed out waiting for next record");
                    self.send(service_failure(service, err.kind(), err.to_string())).await;
                    break;
                }
            };

            if !self.send(item).await {
                break;
            }
        }

        tracing::info!(service = %service, delivered, "Service fetch finished");
    }

    /// `fetch_since` with timeout and bounded retry; `Ok(None)` when cancelled
    async fn open_stream(&self, service: Service) -> Result<Option<RawRecordStream>, AdapterError> {
        let timeout = self.config.fetch_timeout;
        let max_attempts = self.config.max_fetch_attempts.max(1);
        let mut backoff = self.config.initial_backoff;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            tracing::debug!(service = %service, attempt, "Fetching confirmations");

            let fetch = tokio::time::timeout(
                timeout,
                self.adapter.fetch_since(&self.identity, self.since, timeout),
            );
            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Ok(None),
                result = fetch => result,
            };

            let err = match result {
                Ok(Ok(stream)) => return Ok(Some(stream)),
                Ok(Err(err)) => err,
                Err(_) => AdapterError::Timeout(timeout),
            };

            if !err.is_retryable() {
                return Err(err);
            }
            if attempt >= max_attempts {
                return Err(AdapterError::Network(format!(
                    "{} (gave up after {} attempts)",
                    err, attempt
                )));
            }

            tracing::warn!(
                service = %service,
                attempt,
                backoff_ms = backoff.as_millis() as u64,
                error = %err,
                "Fetch failed, will retry after backoff"
            );
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Ok(None),
                _ = tokio::time::sleep(backoff) => {}
            }
            backoff = (backoff * 2).min(MAX_FETCH_BACKOFF);
        }
    }

    async fn process(&self, service: Service, raw: RawRecord) -> WorkItem {
        let record = match normalizer::normalize(service, &raw) {
            Ok(record) => record,
            Err(err) => {
                tracing::warn!(service = %service, call = raw.get("CALL").unwrap_or(""), error = %err, "Skipping unparseable record");
                return WorkItem::Failed {
                    service,
                    record: Some(RecordSummary::from_raw(&raw)),
                    kind: ErrorKind::ParseError,
                    detail: err.to_string(),
                };
            }
        };

        match self.resolver.resolve(&record, self.store.as_ref()).await {
            Ok(result) => WorkItem::Resolved { record, result },
            Err(err) => {
                tracing::warn!(service = %service, callsign = %record.callsign, error = %err, "Candidate lookup failed");
                WorkItem::Failed {
                    service,
                    record: Some(RecordSummary::from_record(&record)),
                    kind: ErrorKind::StoreError,
                    detail: err.to_string(),
                }
            }
        }
    }

    /// Forward to the writer; false once the writer has stopped
    async fn send(&self, item: WorkItem) -> bool {
        self.tx.send(item).await.is_ok()
    }
}

fn service_failure(service: Service, kind: ErrorKind, detail: String) -> WorkItem {
    WorkItem::Failed {
        service,
        record: None,
        kind,
        detail,
    }
}
