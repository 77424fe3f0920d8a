//! eQSL.cc inbox adapter
//!
//! Two requests: `DownloadInBox.cfm` prepares an `.adi` file and answers
//! with an HTML page linking to it, then the file itself is downloaded.

use crate::adapters::{
    fetch_text, http_client, records_stream, retain_confirmed, AdapterError, OperatorIdentity,
    RawRecordStream, ServiceAdapter,
};
use crate::adif;
use crate::models::Service;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Url;
use std::time::Duration;

pub const EQSL_INBOX_URL: &str = "https://www.eqsl.cc/qslcard/DownloadInBox.cfm";

pub struct EqslAdapter {
    client: reqwest::Client,
    inbox_url: String,
    username: String,
    password: String,
    qth_nickname: Option<String>,
}

impl EqslAdapter {
    pub fn new(username: &str, password: &str) -> Result<Self, AdapterError> {
        Ok(Self {
            client: http_client()?,
            inbox_url: EQSL_INBOX_URL.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            qth_nickname: None,
        })
    }

    pub fn with_qth_nickname(mut self, nickname: Option<String>) -> Self {
        self.qth_nickname = nickname.filter(|n| !n.trim().is_empty());
        self
    }

    pub fn with_inbox_url(mut self, url: &str) -> Self {
        self.inbox_url = url.to_string();
        self
    }
}

#[async_trait]
impl ServiceAdapter for EqslAdapter {
    fn service(&self) -> Service {
        Service::Eqsl
    }

    async fn fetch_since(
        &self,
        identity: &OperatorIdentity,
        since: DateTime<Utc>,
        timeout: Duration,
    ) -> Result<RawRecordStream, AdapterError> {
        let mut params = vec![
            ("UserName", self.username.clone()),
            ("Password", self.password.clone()),
            ("RcvdSince", since.format("%Y%m%d").to_string()),
        ];
        let nickname = self.qth_nickname.clone().or_else(|| identity.qth_profile.clone());
        if let Some(nickname) = nickname {
            params.push(("QTHNickname", nickname));
        }

        tracing::info!(since = %since.format("%Y-%m-%d"), "Requesting eQSL inbox");
        let page = fetch_text(self.client.get(&self.inbox_url).query(&params), timeout).await?;

        let link = match parse_inbox_page(&page)? {
            Some(link) => link,
            None => {
                tracing::info!("eQSL inbox is empty");
                return Ok(records_stream(Vec::new()));
            }
        };

        let base = Url::parse(&self.inbox_url)
            .map_err(|e| AdapterError::Protocol(format!("invalid eQSL URL: {}", e)))?;
        let file_url = base
            .join(&link)
            .map_err(|e| AdapterError::Protocol(format!("invalid eQSL file link '{}': {}", link, e)))?;

        tracing::debug!(url = %file_url, "Downloading eQSL ADIF file");
        let body = fetch_text(self.client.get(file_url), timeout).await?;
        let mut records = adif::parse(&body)?.records;
        retain_confirmed(Service::Eqsl, &mut records);
        Ok(records_stream(records))
    }
}

/// Interpret the inbox page: the `.adi` link, `None` for an empty inbox
fn parse_inbox_page(page: &str) -> Result<Option<String>, AdapterError> {
    if page.contains("No such Username/Password") {
        return Err(AdapterError::Auth(
            "eQSL rejected the username or password".to_string(),
        ));
    }
    if page.contains("You have no log entries") {
        return Ok(None);
    }
    extract_adif_link(page)
        .map(Some)
        .ok_or_else(|| AdapterError::Protocol("ADIF file not found in eQSL response".to_string()))
}

/// First `href` in the page pointing at a `.adi` file
pub fn extract_adif_link(page: &str) -> Option<String> {
    // ASCII lowercasing keeps byte offsets aligned with `page`
    let lower = page.to_ascii_lowercase();
    let mut search_from = 0;

    while let Some(found) = lower[search_from..].find("href=") {
        let value_start = search_from + found + "href=".len();
        search_from = value_start;

        let rest = &page[value_start..];
        let (quote, body) = match rest.chars().next() {
            Some(q @ ('"' | '\'')) => (Some(q), &rest[1..]),
            _ => (None, rest),
        };
        let end = match quote {
            Some(q) => body.find(q),
            None => body.find(|c: char| c.is_whitespace() || c == '>'),
        }
        .unwrap_or(body.len());

        let href = body[..end].trim();
        if href.to_ascii_lowercase().ends_with(".adi") {
            return Some(href.to_string());
        }
    }
    None
}
