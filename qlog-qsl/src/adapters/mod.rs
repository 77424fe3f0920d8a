//! Confirmation service adapters
//!
//! Each adapter fetches raw confirmation records for one [`Service`] and
//! hands them to the engine as a single-pass stream of [`RawRecord`]s.
//! Transport and authentication details stay inside the adapter; the engine
//! only sees [`AdapterError`].

pub mod adif_file;
pub mod eqsl;
pub mod lotw;
pub mod qrz;

pub use adif_file::AdifFileAdapter;
pub use eqsl::EqslAdapter;
pub use lotw::LotwAdapter;
pub use qrz::QrzAdapter;

use crate::adif::AdifError;
use crate::error::ErrorKind;
use crate::models::{RawRecord, Service};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, BoxStream, StreamExt};
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("qlog-qsl/", env!("CARGO_PKG_VERSION"));

/// Finite, single-pass stream of raw records from one service
pub type RawRecordStream = BoxStream<'static, Result<RawRecord, AdapterError>>;

/// Service adapter errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AdapterError {
    #[error("authentication rejected: {0}")]
    Auth(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("protocol error: {0}")]
    Protocol(String),
}

impl AdapterError {
    /// Network failures and timeouts may succeed on a later attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, AdapterError::Network(_) | AdapterError::Timeout(_))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AdapterError::Auth(_) => ErrorKind::AuthError,
            AdapterError::Network(_) | AdapterError::Timeout(_) => ErrorKind::NetworkError,
            AdapterError::Protocol(_) => ErrorKind::ProtocolError,
        }
    }

    /// Map a reqwest failure; timeouts keep the configured bound
    pub fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            AdapterError::Timeout(timeout)
        } else if err.is_decode() {
            AdapterError::Protocol(err.to_string())
        } else {
            AdapterError::Network(err.to_string())
        }
    }
}

impl From<AdifError> for AdapterError {
    fn from(err: AdifError) -> Self {
        AdapterError::Protocol(format!("malformed ADIF: {}", err))
    }
}

/// Whose confirmations to fetch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperatorIdentity {
    /// Station callsign (canonical form)
    pub callsign: String,
    /// QTH profile / location nickname, where the service supports several
    pub qth_profile: Option<String>,
}

impl OperatorIdentity {
    pub fn new(callsign: &str) -> Self {
        Self {
            callsign: qlog_common::callsign::canonicalize(callsign),
            qth_profile: None,
        }
    }
}

/// Capability shared by every confirmation service
#[async_trait]
pub trait ServiceAdapter: Send + Sync {
    fn service(&self) -> Service;

    /// Fetch confirmations granted on or after `since`
    ///
    /// Every network request made before the stream is returned is bounded
    /// by `timeout`. The stream itself must not be polled again after it
    /// yields an error.
    async fn fetch_since(
        &self,
        identity: &OperatorIdentity,
        since: DateTime<Utc>,
        timeout: Duration,
    ) -> Result<RawRecordStream, AdapterError>;
}

/// Shared HTTP client configuration for the service adapters
pub fn http_client() -> Result<reqwest::Client, AdapterError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| AdapterError::Network(e.to_string()))
}

/// Send a request and return the body, mapping HTTP failures to adapter errors
pub(crate) async fn fetch_text(
    request: reqwest::RequestBuilder,
    timeout: Duration,
) -> Result<String, AdapterError> {
    let response = request
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| AdapterError::from_reqwest(e, timeout))?;

    let status = response.status();
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(AdapterError::Auth(format!("HTTP {}", status.as_u16())));
    }
    if status.is_server_error() {
        return Err(AdapterError::Network(format!("HTTP {}", status.as_u16())));
    }
    if !status.is_success() {
        return Err(AdapterError::Protocol(format!("HTTP {}", status.as_u16())));
    }

    response
        .text()
        .await
        .map_err(|e| AdapterError::from_reqwest(e, timeout))
}

/// Whether the record says outright that it is not (yet) confirmed
///
/// Full log exports mix confirmed and unconfirmed QSOs. Records that carry
/// no status at all are kept.
pub fn is_unconfirmed(service: Service, record: &RawRecord) -> bool {
    let flag = match service {
        Service::Lotw => record.get("QSL_RCVD"),
        Service::Eqsl => record.first_of(&["EQSL_QSL_RCVD", "QSL_RCVD"]).map(|(_, v)| v),
        Service::Qrz => {
            return record
                .get("APP_QRZLOG_STATUS")
                .map(|status| !status.eq_ignore_ascii_case("C"))
                .unwrap_or(false)
        }
        Service::Clublog => None,
    };
    matches!(flag.map(|v| v.to_ascii_uppercase()).as_deref(), Some(v) if v != "Y" && v != "V")
}

/// Drop records the service marks as unconfirmed
pub fn retain_confirmed(service: Service, records: &mut Vec<RawRecord>) {
    let total = records.len();
    records.retain(|r| !is_unconfirmed(service, r));
    if records.len() < total {
        tracing::debug!(service = %service, total, confirmed = records.len(), "Dropped unconfirmed records");
    }
}

/// Stream over records already held in memory
pub fn records_stream(records: Vec<RawRecord>) -> RawRecordStream {
    stream::iter(records.into_iter().map(Ok)).boxed()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert_eq!(AdapterError::Auth("x".into()).kind(), ErrorKind::AuthError);
        assert_eq!(
            AdapterError::Timeout(Duration::from_secs(5)).kind(),
            ErrorKind::NetworkError
        );
        assert!(AdapterError::Network("reset".into()).is_retryable());
        assert!(!AdapterError::Protocol("garbage".into()).is_retryable());
        assert!(!AdapterError::Auth("bad password".into()).is_retryable());
    }

    #[test]
    fn test_identity_is_canonical() {
        assert_eq!(OperatorIdentity::new(" ok1xyz ").callsign, "OK1XYZ");
    }

    #[test]
    fn test_unconfirmed_status_flags() {
        let lotw = |flag: &str| RawRecord::from_fields([("CALL", "OK1ABC"), ("QSL_RCVD", flag)]);
        assert!(is_unconfirmed(Service::Lotw, &lotw("N")));
        assert!(!is_unconfirmed(Service::Lotw, &lotw("y")));
        assert!(!is_unconfirmed(Service::Lotw, &lotw("V")));
        assert!(!is_unconfirmed(Service::Lotw, &RawRecord::from_fields([("CALL", "OK1ABC")])));

        let eqsl = RawRecord::from_fields([("CALL", "OK1ABC"), ("EQSL_QSL_RCVD", "R")]);
        assert!(is_unconfirmed(Service::Eqsl, &eqsl));

        let qrz = |status: &str| RawRecord::from_fields([("CALL", "OK1ABC"), ("APP_QRZLOG_STATUS", status)]);
        assert!(is_unconfirmed(Service::Qrz, &qrz("N")));
        assert!(!is_unconfirmed(Service::Qrz, &qrz("C")));

        assert!(!is_unconfirmed(Service::Clublog, &lotw("N")));
    }

    #[test]
    fn test_retain_confirmed_keeps_order() {
        let mut records = vec![
            RawRecord::from_fields([("CALL", "OK1ABC"), ("QSL_RCVD", "Y")]),
            RawRecord::from_fields([("CALL", "OK2DEF"), ("QSL_RCVD", "N")]),
            RawRecord::from_fields([("CALL", "OK3GHI")]),
        ];
        retain_confirmed(Service::Lotw, &mut records);
        let calls: Vec<_> = records.iter().filter_map(|r| r.get("CALL")).collect();
        assert_eq!(calls, vec!["OK1ABC", "OK3GHI"]);
    }

    #[test]
    fn test_http_client_builds() {
        assert!(http_client().is_ok());
    }
}
