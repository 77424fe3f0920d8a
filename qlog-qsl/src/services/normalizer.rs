//! Record normalizer
//!
//! Turns one service's raw ADIF-style record into a [`ConfirmationRecord`].
//! Unrecognized band or mode values are not fatal: the typed value becomes
//! `Unknown` and the raw text stays in `raw_fields`. Only a missing callsign,
//! a missing or malformed QSO date, or malformed time fields fail a record.

pub use crate::error::ParseError;

use crate::models::{ConfirmationRecord, QsoTime, RawRecord, Service};
use chrono::NaiveDate;
use qlog_common::{callsign, time, Band, Mode};

/// Fields holding the confirmation date, in order of preference
fn confirmation_fields(service: Service) -> &'static [&'static str] {
    match service {
        Service::Lotw => &["QSLRDATE", "APP_LOTW_RXQSL"],
        Service::Eqsl => &["EQSL_QSLRDATE", "QSLRDATE", "RCVD_DATE"],
        Service::Clublog => &["CLUBLOG_QSO_UPLOAD_DATE", "QSLRDATE"],
        Service::Qrz => &["APP_QRZLOG_QSLDATE", "QSLRDATE"],
    }
}

fn remote_id_field(service: Service) -> Option<&'static str> {
    match service {
        Service::Clublog => Some("APP_CLUBLOG_ID"),
        Service::Qrz => Some("APP_QRZLOG_LOGID"),
        Service::Lotw | Service::Eqsl => None,
    }
}

/// Services that only report the QSO date reliably
fn is_date_only(service: Service) -> bool {
    matches!(service, Service::Eqsl)
}

/// Confirmation date of a raw record, if it carries a readable one
pub fn confirmation_date(service: Service, raw: &RawRecord) -> Option<NaiveDate> {
    raw.first_of(confirmation_fields(service))
        .and_then(|(_, value)| time::parse_timestamp(value).ok())
        .map(|ts| ts.date_naive())
}

/// Normalize one raw record delivered by `service`
pub fn normalize(service: Service, raw: &RawRecord) -> Result<ConfirmationRecord, ParseError> {
    let raw_call = raw.get("CALL").ok_or_else(|| ParseError::new("missing CALL"))?;
    let canonical_call = callsign::canonicalize(raw_call);
    let match_call = callsign::match_key(&canonical_call);
    if match_call.is_empty() {
        return Err(ParseError::new("missing CALL"));
    }

    let date_text = raw
        .get("QSO_DATE")
        .ok_or_else(|| ParseError::new("missing QSO_DATE"))?;
    let qso_date = time::parse_adif_date(date_text).map_err(|e| ParseError::new(e.to_string()))?;

    let qso_time = match raw.get("TIME_ON") {
        _ if is_date_only(service) => QsoTime::DateOnly(qso_date),
        Some(time_on) => {
            let ts = time::adif_datetime(date_text, time_on).map_err(|e| ParseError::new(e.to_string()))?;
            QsoTime::Exact(ts)
        }
        None => QsoTime::DateOnly(qso_date),
    };

    let band = match raw.get("BAND") {
        Some(value) => Band::parse_lenient(value),
        None => raw
            .get("FREQ")
            .and_then(|f| f.parse::<f64>().ok())
            .and_then(Band::from_frequency_mhz)
            .unwrap_or(Band::Unknown),
    };
    let mode = Mode::from_adif(raw.get("MODE").unwrap_or(""), raw.get("SUBMODE"));

    let confirmed_at = match raw.first_of(confirmation_fields(service)) {
        Some((field, value)) => time::parse_timestamp(value)
            .map_err(|_| ParseError::new(format!("malformed {} '{}'", field, value)))?,
        None => time::start_of_day(qso_date),
    };

    let remote_id = remote_id_field(service)
        .and_then(|field| raw.get(field))
        .map(str::to_string);

    if band.is_unknown() || mode.is_unknown() {
        tracing::debug!(
            service = %service,
            callsign = %canonical_call,
            band = raw.get("BAND").unwrap_or(""),
            mode = raw.get("MODE").unwrap_or(""),
            "Unrecognized band or mode, matching with wildcard"
        );
    }

    Ok(ConfirmationRecord {
        service,
        remote_id,
        match_call,
        callsign: canonical_call,
        band,
        mode,
        qso_time,
        confirmed_at,
        raw_fields: raw.fields().clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use qlog_common::time::adif_datetime;

    fn lotw_record() -> RawRecord {
        RawRecord::from_fields([
            ("CALL", "ok1abc/p"),
            ("BAND", "20M"),
            ("MODE", "SSB"),
            ("QSO_DATE", "20240101"),
            ("TIME_ON", "100030"),
            ("QSL_RCVD", "Y"),
            ("QSLRDATE", "20240105"),
        ])
    }

    #[test]
    fn test_lotw_record() {
        let record = normalize(Service::Lotw, &lotw_record()).unwrap();
        assert_eq!(record.callsign, "OK1ABC/P");
        assert_eq!(record.match_call, "OK1ABC");
        assert_eq!(record.band, Band::M20);
        assert_eq!(record.mode, Mode::Ssb);
        assert_eq!(record.qso_time, QsoTime::Exact(adif_datetime("20240101", "100030").unwrap()));
        assert_eq!(record.confirmed_on(), NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(record.raw_fields.get("CALL").map(String::as_str), Some("ok1abc/p"));
        assert_eq!(record.remote_id, None);
    }

    #[test]
    fn test_lotw_rxqsl_timestamp_fallback() {
        let mut raw = lotw_record();
        raw.insert("QSLRDATE", "");
        raw.insert("APP_LOTW_RXQSL", "2024-01-06 08:15:00");
        let record = normalize(Service::Lotw, &raw).unwrap();
        assert_eq!(record.confirmed_on(), NaiveDate::from_ymd_opt(2024, 1, 6).unwrap());
    }

    #[test]
    fn test_eqsl_is_date_only() {
        let raw = RawRecord::from_fields([
            ("CALL", "OK1ABC"),
            ("BAND", "20M"),
            ("MODE", "SSB"),
            ("QSO_DATE", "20240101"),
            ("TIME_ON", "1000"),
            ("RCVD_DATE", "20240103"),
        ]);
        let record = normalize(Service::Eqsl, &raw).unwrap();
        assert_eq!(record.qso_time, QsoTime::DateOnly(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()));
        assert_eq!(record.confirmed_on(), NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
    }

    #[test]
    fn test_clublog_unknown_mode_and_remote_id() {
        let raw = RawRecord::from_fields([
            ("CALL", "W1AW"),
            ("FREQ", "7.030"),
            ("MODE", "VARA-HF"),
            ("QSO_DATE", "20240101"),
            ("TIME_ON", "1200"),
            ("APP_CLUBLOG_ID", "998877"),
        ]);
        let record = normalize(Service::Clublog, &raw).unwrap();
        assert_eq!(record.mode, Mode::Unknown);
        assert_eq!(record.band, Band::M40);
        assert_eq!(record.remote_id.as_deref(), Some("998877"));
        assert_eq!(record.raw_fields.get("MODE").map(String::as_str), Some("VARA-HF"));
        // No confirmation date: falls back to the QSO date
        assert_eq!(record.confirmed_on(), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    }

    #[test]
    fn test_missing_time_degrades_to_date_only() {
        let mut raw = lotw_record();
        raw.insert("TIME_ON", "");
        let record = normalize(Service::Lotw, &raw).unwrap();
        assert!(record.qso_time.is_date_only());
    }

    #[test]
    fn test_status_flags_are_not_structural() {
        // Unconfirmed QSOs are dropped by the adapters; a well-formed record always normalizes
        let mut raw = lotw_record();
        raw.insert("QSL_RCVD", "N");
        assert!(normalize(Service::Lotw, &raw).is_ok());
    }

    #[test]
    fn test_parse_errors() {
        let mut raw = lotw_record();
        raw.insert("CALL", "");
        assert_eq!(normalize(Service::Lotw, &raw), Err(ParseError::new("missing CALL")));

        for call in ["/", "//", " / "] {
            let mut raw = lotw_record();
            raw.insert("CALL", call);
            assert_eq!(normalize(Service::Lotw, &raw), Err(ParseError::new("missing CALL")), "{:?}", call);
        }

        let mut raw = lotw_record();
        raw.insert("QSO_DATE", "2024-13-45");
        assert!(normalize(Service::Lotw, &raw).is_err());

        let mut raw = lotw_record();
        raw.insert("TIME_ON", "25");
        assert!(normalize(Service::Lotw, &raw).is_err());

        let mut raw = lotw_record();
        raw.insert("QSLRDATE", "soon");
        assert!(normalize(Service::Lotw, &raw).is_err());
    }

    #[test]
    fn test_confirmation_date_helper() {
        assert_eq!(
            confirmation_date(Service::Lotw, &lotw_record()),
            NaiveDate::from_ymd_opt(2024, 1, 5)
        );
        assert_eq!(confirmation_date(Service::Qrz, &lotw_record()), NaiveDate::from_ymd_opt(2024, 1, 5));
        assert_eq!(confirmation_date(Service::Clublog, &RawRecord::new()), None);
    }
}
