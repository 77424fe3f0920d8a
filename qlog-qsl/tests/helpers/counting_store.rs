//! Store wrapper that counts writes and injects failures

use async_trait::async_trait;
use chrono::NaiveDate;
use qlog_qsl::models::{ContactId, LocalContact, Service};
use qlog_qsl::store::{CandidateQuery, InMemoryLogStore, LocalLogStore, StoreError};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub struct CountingStore {
    pub inner: Arc<InMemoryLogStore>,
    apply_calls: AtomicUsize,
    /// Next `n` writes fail with `Conflict`
    conflicts: AtomicUsize,
    /// Contacts deleted at their next fresh read
    vanish_on_read: Mutex<HashSet<ContactId>>,
    /// Writes to these contacts fail with `Backend`
    broken: Mutex<HashSet<ContactId>>,
}

impl CountingStore {
    pub fn new(inner: Arc<InMemoryLogStore>) -> Self {
        Self {
            inner,
            apply_calls: AtomicUsize::new(0),
            conflicts: AtomicUsize::new(0),
            vanish_on_read: Mutex::new(HashSet::new()),
            broken: Mutex::new(HashSet::new()),
        }
    }

    pub fn apply_calls(&self) -> usize {
        self.apply_calls.load(Ordering::SeqCst)
    }

    pub fn conflict_next(&self, times: usize) {
        self.conflicts.store(times, Ordering::SeqCst);
    }

    pub fn vanish_on_read(&self, id: ContactId) {
        self.vanish_on_read.lock().unwrap().insert(id);
    }

    pub fn break_contact(&self, id: ContactId) {
        self.broken.lock().unwrap().insert(id);
    }
}

#[async_trait]
impl LocalLogStore for CountingStore {
    async fn find_candidates(&self, query: &CandidateQuery) -> Result<Vec<LocalContact>, StoreError> {
        self.inner.find_candidates(query).await
    }

    async fn contact(&self, id: ContactId) -> Result<Option<LocalContact>, StoreError> {
        let vanish = self.vanish_on_read.lock().unwrap().remove(&id);
        if vanish {
            self.inner.remove(id).await;
        }
        self.inner.contact(id).await
    }

    async fn apply_confirmation(
        &self,
        id: ContactId,
        service: Service,
        date: NaiveDate,
    ) -> Result<(), StoreError> {
        self.apply_calls.fetch_add(1, Ordering::SeqCst);

        let conflict = self
            .conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if conflict {
            return Err(StoreError::Conflict(format!("contact {} is being edited", id)));
        }
        let broken = self.broken.lock().unwrap().contains(&id);
        if broken {
            return Err(StoreError::Backend("disk I/O error".to_string()));
        }
        self.inner.apply_confirmation(id, service, date).await
    }
}
