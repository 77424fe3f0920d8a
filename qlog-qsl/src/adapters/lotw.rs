//! ARRL Logbook of the World adapter
//!
//! Downloads `lotwreport.adi`. By default only confirmations received since
//! the given date are requested (`qso_qsl=yes`, `qso_qslsince`). In
//! "QSOs since" mode the report lists every QSO uploaded since that date and
//! unconfirmed entries are dropped here.

use crate::adapters::{
    fetch_text, http_client, records_stream, retain_confirmed, AdapterError, OperatorIdentity,
    RawRecordStream, ServiceAdapter,
};
use crate::adif;
use crate::models::{RawRecord, Service};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use qlog_common::time::format_iso_date;
use std::time::Duration;

pub const LOTW_REPORT_URL: &str = "https://lotw.arrl.org/lotwuser/lotwreport.adi";

pub struct LotwAdapter {
    client: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
    own_callsign: Option<String>,
    qsos_since: bool,
}

impl LotwAdapter {
    pub fn new(username: &str, password: &str) -> Result<Self, AdapterError> {
        Ok(Self {
            client: http_client()?,
            base_url: LOTW_REPORT_URL.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            own_callsign: None,
            qsos_since: false,
        })
    }

    /// Restrict the report to one of several callsigns on the account
    pub fn with_own_callsign(mut self, callsign: Option<String>) -> Self {
        self.own_callsign = callsign.filter(|c| !c.trim().is_empty());
        self
    }

    pub fn with_qsos_since(mut self, qsos_since: bool) -> Self {
        self.qsos_since = qsos_since;
        self
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    fn query_params(&self, identity: &OperatorIdentity, since: DateTime<Utc>) -> Vec<(&'static str, String)> {
        let since = format_iso_date(&since);
        let mut params = vec![
            ("login", self.username.clone()),
            ("password", self.password.clone()),
            ("qso_query", "1".to_string()),
            ("qso_qsldetail", "yes".to_string()),
            ("qso_mydetail", "yes".to_string()),
        ];
        if self.qsos_since {
            params.push(("qso_qsl", "no".to_string()));
            params.push(("qso_qsorxsince", since));
        } else {
            params.push(("qso_qsl", "yes".to_string()));
            params.push(("qso_qslsince", since));
        }

        let own_call = self
            .own_callsign
            .clone()
            .or_else(|| Some(identity.callsign.clone()).filter(|c| !c.is_empty()));
        if let Some(call) = own_call {
            params.push(("qso_owncall", call));
        }
        params
    }
}

#[async_trait]
impl ServiceAdapter for LotwAdapter {
    fn service(&self) -> Service {
        Service::Lotw
    }

    async fn fetch_since(
        &self,
        identity: &OperatorIdentity,
        since: DateTime<Utc>,
        timeout: Duration,
    ) -> Result<RawRecordStream, AdapterError> {
        let params = self.query_params(identity, since);
        tracing::info!(since = %format_iso_date(&since), qsos_since = self.qsos_since, "Requesting LoTW report");

        let body = fetch_text(self.client.get(&self.base_url).query(&params), timeout).await?;
        let mut records = parse_lotw_response(&body)?;

        if self.qsos_since {
            let total = records.len();
            records.retain(is_confirmed);
            tracing::debug!(total, confirmed = records.len(), "Dropped unconfirmed LoTW QSOs");
        } else {
            retain_confirmed(Service::Lotw, &mut records);
        }

        Ok(records_stream(records))
    }
}

/// Parse a `lotwreport.adi` body
///
/// LoTW answers rejected credentials with an HTML page rather than an HTTP
/// error, so anything without an ADIF header is inspected for that case.
pub fn parse_lotw_response(body: &str) -> Result<Vec<RawRecord>, AdapterError> {
    if !adif::has_header(body) {
        let lower = body.to_ascii_lowercase();
        if lower.contains("password") || lower.contains("incorrect") {
            return Err(AdapterError::Auth(
                "LoTW rejected the username or password".to_string(),
            ));
        }
        return Err(AdapterError::Protocol(
            "LoTW response is not an ADIF report".to_string(),
        ));
    }

    let document = adif::parse(body)?;
    if let Some(last) = document.header.get("APP_LOTW_LASTQSL") {
        tracing::debug!(last_qsl = %last, records = document.records.len(), "Parsed LoTW report");
    }
    Ok(document.records)
}

fn is_confirmed(record: &RawRecord) -> bool {
    record
        .get("QSL_RCVD")
        .map(|v| v.eq_ignore_ascii_case("Y"))
        .unwrap_or(false)
}
