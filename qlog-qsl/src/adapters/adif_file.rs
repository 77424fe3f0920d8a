//! ADIF file adapter
//!
//! Reads confirmations from an `.adi` file exported by a service (a TQSL
//! download, a Club Log export, a saved eQSL inbox). The file stands in for
//! the service, so records are tagged with whichever [`Service`] the adapter
//! was created for.

use crate::adapters::{is_unconfirmed, AdapterError, OperatorIdentity, RawRecordStream, ServiceAdapter};
use crate::adif;
use crate::models::{RawRecord, Service};
use crate::services::normalizer::confirmation_date;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use qlog_common::callsign;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AdifFileAdapter {
    service: Service,
    path: PathBuf,
}

impl AdifFileAdapter {
    pub fn new(service: Service, path: impl Into<PathBuf>) -> Self {
        Self {
            service,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ServiceAdapter for AdifFileAdapter {
    fn service(&self) -> Service {
        self.service
    }

    async fn fetch_since(
        &self,
        identity: &OperatorIdentity,
        since: DateTime<Utc>,
        timeout: Duration,
    ) -> Result<RawRecordStream, AdapterError> {
        let text = tokio::time::timeout(timeout, tokio::fs::read_to_string(&self.path))
            .await
            .map_err(|_| AdapterError::Timeout(timeout))?
            .map_err(|e| {
                AdapterError::Protocol(format!("cannot read {}: {}", self.path.display(), e))
            })?;

        let document = adif::parse(&text)?;
        tracing::debug!(
            service = %self.service,
            path = %self.path.display(),
            records = document.records.len(),
            "Read ADIF file"
        );

        let service = self.service;
        let own_call = callsign::match_key(&identity.callsign);
        let since_date = since.date_naive();

        let stream = async_stream::stream! {
            for record in document.records {
                if !station_matches(&record, &own_call) {
                    tracing::debug!(service = %service, "Skipping record for another station");
                    continue;
                }
                if is_unconfirmed(service, &record) {
                    continue;
                }
                if matches!(confirmation_date(service, &record), Some(date) if date < since_date) {
                    continue;
                }
                yield Ok::<_, AdapterError>(record);
            }
        };
        Ok(stream.boxed())
    }
}

/// Records naming a different station callsign belong to another log
fn station_matches(record: &RawRecord, own_call: &str) -> bool {
    if own_call.is_empty() {
        return true;
    }
    match record.first_of(&["STATION_CALLSIGN", "OWNER_CALLSIGN"]) {
        Some((_, station)) => callsign::match_key(station) == own_call,
        None => true,
    }
}
