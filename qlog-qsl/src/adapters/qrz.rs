//! QRZ.com logbook adapter
//!
//! Uses the logbook API `FETCH` action. The response is a `KEY=value&...`
//! string whose trailing `ADIF` value carries HTML-entity-encoded ADIF.

use crate::adapters::{
    fetch_text, http_client, records_stream, retain_confirmed, AdapterError, OperatorIdentity,
    RawRecordStream, ServiceAdapter,
};
use crate::adif;
use crate::models::{RawRecord, Service};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use qlog_common::time::format_iso_date;
use std::collections::HashMap;
use std::time::Duration;

pub const QRZ_API_URL: &str = "https://logbook.qrz.com/api";

pub struct QrzAdapter {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl QrzAdapter {
    pub fn new(api_key: &str) -> Result<Self, AdapterError> {
        Ok(Self {
            client: http_client()?,
            api_url: QRZ_API_URL.to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn with_api_url(mut self, url: &str) -> Self {
        self.api_url = url.to_string();
        self
    }
}

#[async_trait]
impl ServiceAdapter for QrzAdapter {
    fn service(&self) -> Service {
        Service::Qrz
    }

    async fn fetch_since(
        &self,
        _identity: &OperatorIdentity,
        since: DateTime<Utc>,
        timeout: Duration,
    ) -> Result<RawRecordStream, AdapterError> {
        let option = format!("STATUS:CONFIRMED,MODSINCE:{},TYPE:ADIF", format_iso_date(&since));
        let form = [
            ("KEY", self.api_key.as_str()),
            ("ACTION", "FETCH"),
            ("OPTION", option.as_str()),
        ];

        tracing::info!(since = %format_iso_date(&since), "Requesting QRZ.com logbook");
        let body = fetch_text(self.client.post(&self.api_url).form(&form), timeout).await?;
        let mut records = parse_qrz_fetch_response(&body)?;
        retain_confirmed(Service::Qrz, &mut records);
        Ok(records_stream(records))
    }
}

/// Parse a logbook API `FETCH` answer into ADIF records
pub fn parse_qrz_fetch_response(body: &str) -> Result<Vec<RawRecord>, AdapterError> {
    // ADIF is the last parameter and its decoded text contains '&', so it is
    // cut off before splitting the rest
    let (params, adif_text) = match body.find("ADIF=") {
        Some(pos) => (&body[..pos], Some(&body[pos + "ADIF=".len()..])),
        None => (body, None),
    };

    let fields: HashMap<String, String> = params
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.trim().to_ascii_uppercase(), v.trim().to_string()))
        .collect();

    let result = fields.get("RESULT").map(String::as_str).unwrap_or("");
    let reason = fields.get("REASON").cloned().unwrap_or_default();

    match result {
        "OK" => {}
        "AUTH" => return Err(AdapterError::Auth(format!("QRZ.com: {}", reason))),
        "FAIL" => {
            let lower = reason.to_ascii_lowercase();
            if lower.contains("invalid api key") || lower.contains("access denied") {
                return Err(AdapterError::Auth(format!("QRZ.com: {}", reason)));
            }
            if fields.get("COUNT").map(String::as_str) == Some("0") {
                return Ok(Vec::new());
            }
            return Err(AdapterError::Protocol(format!("QRZ.com fetch failed: {}", reason)));
        }
        other => {
            return Err(AdapterError::Protocol(format!(
                "unexpected QRZ.com RESULT '{}'",
                other
            )))
        }
    }

    match adif_text {
        Some(text) if !text.trim().is_empty() => Ok(adif::parse(&decode_entities(text))?.records),
        _ => Ok(Vec::new()),
    }
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
