//! In-memory local log store
//!
//! Used by tests and by callers that keep the log in memory themselves.

use crate::models::{ContactId, LocalContact, NewContact, Service};
use crate::store::{CandidateQuery, LocalLogStore, StoreError};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Inner {
    contacts: BTreeMap<ContactId, LocalContact>,
    next_id: i64,
}

/// Local log store held in a `BTreeMap` behind a tokio `RwLock`
#[derive(Debug, Default)]
pub struct InMemoryLogStore {
    inner: RwLock<Inner>,
}

impl InMemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a contact, returning its assigned id (ids start at 1)
    pub async fn insert(&self, contact: NewContact) -> ContactId {
        let mut inner = self.inner.write().await;
        inner.next_id += 1;
        let id = ContactId(inner.next_id);
        inner.contacts.insert(
            id,
            LocalContact {
                id,
                callsign: contact.callsign,
                band: contact.band,
                mode: contact.mode,
                time_on: contact.time_on,
                time_off: contact.time_off,
                confirmations: contact.confirmations,
            },
        );
        id
    }

    pub async fn remove(&self, id: ContactId) -> Option<LocalContact> {
        self.inner.write().await.contacts.remove(&id)
    }

    pub async fn get(&self, id: ContactId) -> Option<LocalContact> {
        self.inner.read().await.contacts.get(&id).cloned()
    }

    /// All contacts in id order
    pub async fn snapshot(&self) -> Vec<LocalContact> {
        self.inner.read().await.contacts.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.contacts.len()
    }
}

#[async_trait]
impl LocalLogStore for InMemoryLogStore {
    async fn find_candidates(&self, query: &CandidateQuery) -> Result<Vec<LocalContact>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .contacts
            .values()
            .filter(|c| query.admits(c))
            .cloned()
            .collect())
    }

    async fn contact(&self, id: ContactId) -> Result<Option<LocalContact>, StoreError> {
        Ok(self.get(id).await)
    }

    async fn apply_confirmation(
        &self,
        id: ContactId,
        service: Service,
        date: NaiveDate,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let contact = inner.contacts.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        let state = contact.confirmations.get_mut(service);
        state.received = true;
        state.received_date = Some(date);
        Ok(())
    }
}
