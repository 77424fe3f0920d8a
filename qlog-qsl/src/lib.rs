//! # qlog-qsl
//!
//! QSL confirmation reconciliation for the QLog contact log.
//!
//! Confirmations downloaded from LoTW, eQSL, Club Log and QRZ.com are
//! normalized into one canonical record, matched against logged contacts
//! and applied through a [`store::LocalLogStore`], producing a
//! [`services::SyncReport`] per run.

pub mod adapters;
pub mod adif;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod store;

pub use error::{Error, ErrorKind, Result};
