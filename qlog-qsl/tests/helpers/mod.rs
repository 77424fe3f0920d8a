//! Shared fixtures for qlog-qsl integration tests
//!
//! - ScriptedAdapter: a confirmation service that replays canned records
//!   and failures
//! - CountingStore: wraps the in-memory log store, counts writes and injects
//!   store failures
//! - record builders for the ADIF fields each service delivers

#![allow(dead_code)]

pub mod counting_store;
pub mod scripted_adapter;

pub use counting_store::CountingStore;
pub use scripted_adapter::ScriptedAdapter;

use chrono::{DateTime, Utc};
use qlog_common::time::adif_datetime;
use qlog_common::{Band, Mode};
use qlog_qsl::models::{NewContact, RawRecord};

/// `YYYYMMDD`, `HHMM[SS]` to a UTC timestamp
pub fn at(date: &str, time: &str) -> DateTime<Utc> {
    adif_datetime(date, time).unwrap()
}

pub fn contact(call: &str, band: Band, mode: Mode, date: &str, time: &str) -> NewContact {
    NewContact::new(call, band, mode, at(date, time))
}

/// LoTW confirmation as returned by the lotwreport.adi download
pub fn lotw_record(call: &str, band: &str, mode: &str, date: &str, time: &str, qslrdate: &str) -> RawRecord {
    RawRecord::from_fields([
        ("CALL", call),
        ("BAND", band),
        ("MODE", mode),
        ("QSO_DATE", date),
        ("TIME_ON", time),
        ("QSL_RCVD", "Y"),
        ("QSLRDATE", qslrdate),
    ])
}

/// eQSL inbox record (only the QSO date is trusted)
pub fn eqsl_record(call: &str, band: &str, mode: &str, date: &str, rcvd: &str) -> RawRecord {
    RawRecord::from_fields([
        ("CALL", call),
        ("BAND", band),
        ("MODE", mode),
        ("QSO_DATE", date),
        ("TIME_ON", "1200"),
        ("EQSL_QSLRDATE", rcvd),
    ])
}

/// Club Log export record
pub fn clublog_record(call: &str, band: &str, mode: &str, date: &str, time: &str, upload: &str) -> RawRecord {
    RawRecord::from_fields([
        ("CALL", call),
        ("BAND", band),
        ("MODE", mode),
        ("QSO_DATE", date),
        ("TIME_ON", time),
        ("CLUBLOG_QSO_UPLOAD_DATE", upload),
    ])
}

/// Since-date that admits every fixture record
pub fn epoch() -> DateTime<Utc> {
    at("19700101", "0000")
}
