//! Scripted confirmation service

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use qlog_qsl::adapters::{AdapterError, OperatorIdentity, RawRecordStream, ServiceAdapter};
use qlog_qsl::models::{RawRecord, Service};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Replays records, optionally failing `fetch_since` or the stream first
pub struct ScriptedAdapter {
    service: Service,
    records: Vec<RawRecord>,
    /// Returned by successive `fetch_since` calls before records are served
    fetch_failures: Mutex<VecDeque<AdapterError>>,
    /// Ends the stream with this error after `n` records
    stream_failure: Option<(usize, AdapterError)>,
    /// Pause before each record is yielded
    record_delay: Option<Duration>,
    /// `fetch_since` panics instead of returning
    panic_on_fetch: bool,
    fetch_calls: AtomicU32,
}

impl ScriptedAdapter {
    pub fn new(service: Service, records: Vec<RawRecord>) -> Self {
        Self {
            service,
            records,
            fetch_failures: Mutex::new(VecDeque::new()),
            stream_failure: None,
            record_delay: None,
            panic_on_fetch: false,
            fetch_calls: AtomicU32::new(0),
        }
    }

    /// Adapter whose every fetch fails with `error`
    pub fn failing(service: Service, error: AdapterError) -> Self {
        Self::new(service, Vec::new()).fail_fetch(error, 100)
    }

    /// Adapter with a bug: `fetch_since` panics
    pub fn panicking(service: Service) -> Self {
        Self {
            panic_on_fetch: true,
            ..Self::new(service, Vec::new())
        }
    }

    pub fn fail_fetch(self, error: AdapterError, times: usize) -> Self {
        {
            let mut failures = self.fetch_failures.lock().unwrap();
            failures.extend(std::iter::repeat(error).take(times));
        }
        self
    }

    pub fn fail_stream_after(mut self, delivered: usize, error: AdapterError) -> Self {
        self.stream_failure = Some((delivered, error));
        self
    }

    pub fn with_record_delay(mut self, delay: Duration) -> Self {
        self.record_delay = Some(delay);
        self
    }

    pub fn fetch_calls(&self) -> u32 {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ServiceAdapter for ScriptedAdapter {
    fn service(&self) -> Service {
        self.service
    }

    async fn fetch_since(
        &self,
        _identity: &OperatorIdentity,
        _since: DateTime<Utc>,
        _timeout: Duration,
    ) -> Result<RawRecordStream, AdapterError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.panic_on_fetch {
            panic!("{} adapter bug", self.service);
        }
        if let Some(err) = self.fetch_failures.lock().unwrap().pop_front() {
            return Err(err);
        }

        let records = self.records.clone();
        let failure = self.stream_failure.clone();
        let delay = self.record_delay;

        let stream = async_stream::stream! {
            let total = records.len();
            for (index, record) in records.into_iter().enumerate() {
                if let Some((after, err)) = &failure {
                    if index == *after {
                        yield Err(err.clone());
                        return;
                    }
                }
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                yield Ok(record);
            }
            if let Some((after, err)) = failure {
                if after >= total {
                    yield Err(err);
                }
            }
        };
        Ok(stream.boxed())
    }
}
