//! Data models for qlog-qsl
//!
//! - Confirmation services and raw/canonical confirmation records
//! - Local contacts and their per-service confirmation state
//! - Match results and per-record sync outcomes

pub mod confirmation;
pub mod contact;
pub mod outcome;
pub mod service;

pub use confirmation::{ConfirmationRecord, QsoTime, RawRecord};
pub use contact::{Confirmations, ContactId, LocalContact, NewContact, ServiceConfirmation, WriteDecision};
pub use outcome::{MatchCandidate, MatchResult, SyncOutcome};
pub use service::Service;
