//! Local contacts and per-service confirmation state
//!
//! Contacts are owned by the local log store. The engine reads them and asks
//! the store for mutations; it never edits a `LocalContact` in place.

use crate::error::ParseError;
use crate::models::{RawRecord, Service};
use chrono::{DateTime, NaiveDate, Utc};
use qlog_common::{callsign, time, Band, Mode};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Store-assigned contact identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContactId(pub i64);

impl fmt::Display for ContactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Confirmation state of one contact for one service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfirmation {
    pub received: bool,
    pub received_date: Option<NaiveDate>,
    /// Upload date, kept so callers can tell whether a re-upload is due
    pub sent_date: Option<NaiveDate>,
}

/// What the writer should do with a matched confirmation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteDecision {
    /// Write this date (never older than what is stored)
    Apply(NaiveDate),
    /// Stored date is the same or later; nothing to do
    AlreadyCurrent,
}

impl ServiceConfirmation {
    /// Decide whether a confirmation dated `confirmed_on` changes this state
    ///
    /// Recorded dates only move forward. A confirmed state with a missing
    /// date is filled in.
    pub fn decide(&self, confirmed_on: NaiveDate) -> WriteDecision {
        match (self.received, self.received_date) {
            (true, Some(existing)) if existing >= confirmed_on => WriteDecision::AlreadyCurrent,
            (_, Some(existing)) => WriteDecision::Apply(existing.max(confirmed_on)),
            (_, None) => WriteDecision::Apply(confirmed_on),
        }
    }
}

/// Confirmation state for all four services
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmations {
    pub lotw: ServiceConfirmation,
    pub eqsl: ServiceConfirmation,
    pub clublog: ServiceConfirmation,
    pub qrz: ServiceConfirmation,
}

impl Confirmations {
    pub fn get(&self, service: Service) -> &ServiceConfirmation {
        match service {
            Service::Lotw => &self.lotw,
            Service::Eqsl => &self.eqsl,
            Service::Clublog => &self.clublog,
            Service::Qrz => &self.qrz,
        }
    }

    pub fn get_mut(&mut self, service: Service) -> &mut ServiceConfirmation {
        match service {
            Service::Lotw => &mut self.lotw,
            Service::Eqsl => &mut self.eqsl,
            Service::Clublog => &mut self.clublog,
            Service::Qrz => &mut self.qrz,
        }
    }
}

/// Logged contact as seen through the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalContact {
    pub id: ContactId,
    pub callsign: String,
    pub band: Band,
    pub mode: Mode,
    pub time_on: DateTime<Utc>,
    pub time_off: Option<DateTime<Utc>>,
    pub confirmations: Confirmations,
}

impl LocalContact {
    pub fn match_call(&self) -> String {
        callsign::match_key(&self.callsign)
    }
}

/// Contact to be inserted into a store (id assigned by the store)
#[derive(Debug, Clone, PartialEq)]
pub struct NewContact {
    pub callsign: String,
    pub band: Band,
    pub mode: Mode,
    pub time_on: DateTime<Utc>,
    pub time_off: Option<DateTime<Utc>>,
    pub confirmations: Confirmations,
}

impl NewContact {
    pub fn new(callsign: &str, band: Band, mode: Mode, time_on: DateTime<Utc>) -> Self {
        Self {
            callsign: callsign::canonicalize(callsign),
            band,
            mode,
            time_on,
            time_off: None,
            confirmations: Confirmations::default(),
        }
    }

    /// Build from a local-log ADIF record
    ///
    /// Reads CALL, BAND (or FREQ), MODE/SUBMODE, QSO_DATE/TIME_ON,
    /// QSO_DATE_OFF/TIME_OFF and the ADIF LoTW/eQSL/Club Log/QRZ status fields.
    pub fn from_adif(raw: &RawRecord) -> Result<Self, ParseError> {
        let call = raw
            .get("CALL")
            .filter(|c| !callsign::match_key(c).is_empty())
            .ok_or_else(|| ParseError::new("missing CALL"))?;
        let date = raw
            .get("QSO_DATE")
            .ok_or_else(|| ParseError::new("missing QSO_DATE"))?;
        let time_on = time::adif_datetime(date, raw.get("TIME_ON").unwrap_or("0000"))
            .map_err(|e| ParseError::new(e.to_string()))?;

        let band = match raw.get("BAND") {
            Some(value) => Band::parse_lenient(value),
            None => raw
                .get("FREQ")
                .and_then(|f| f.parse::<f64>().ok())
                .and_then(Band::from_frequency_mhz)
                .unwrap_or(Band::Unknown),
        };
        let mode = Mode::from_adif(raw.get("MODE").unwrap_or(""), raw.get("SUBMODE"));

        let time_off = raw.get("TIME_OFF").and_then(|t| {
            time::adif_datetime(raw.get("QSO_DATE_OFF").unwrap_or(date), t).ok()
        });

        let mut contact = NewContact::new(call, band, mode, time_on);
        contact.time_off = time_off;
        contact.confirmations.lotw = adif_state(raw, "LOTW_QSL_RCVD", "LOTW_QSLRDATE", "LOTW_QSLSDATE");
        contact.confirmations.eqsl = adif_state(raw, "EQSL_QSL_RCVD", "EQSL_QSLRDATE", "EQSL_QSLSDATE");
        contact.confirmations.clublog = adif_state(raw, "", "", "CLUBLOG_QSO_UPLOAD_DATE");
        contact.confirmations.qrz = adif_state(raw, "", "", "QRZCOM_QSO_UPLOAD_DATE");
        Ok(contact)
    }
}

fn adif_state(raw: &RawRecord, rcvd: &str, rdate: &str, sdate: &str) -> ServiceConfirmation {
    let date = |name: &str| {
        if name.is_empty() {
            return None;
        }
        raw.get(name).and_then(|d| time::parse_adif_date(d).ok())
    };
    let received = !rcvd.is_empty()
        && matches!(raw.get(rcvd).map(|v| v.to_ascii_uppercase()).as_deref(), Some("Y" | "V"));
    ServiceConfirmation {
        received,
        received_date: if received { date(rdate) } else { None },
        sent_date: date(sdate),
    }
}
