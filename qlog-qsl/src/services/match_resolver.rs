//! Match resolver
//!
//! Pairs a canonical confirmation with the local contact it confirms.
//!
//! 1. Ask the store for contacts with the same callsign match key, a
//!    compatible band and mode, and `time_on` inside the tolerance window.
//! 2. Re-check every returned contact against the query and measure its
//!    time distance (day granularity for date-only records).
//! 3. Drop candidates beyond the service tolerance.
//! 4. The unique closest candidate wins; a shared minimum is ambiguous.

use crate::models::{ConfirmationRecord, ContactId, LocalContact, MatchCandidate, MatchResult, Service};
use crate::store::{CandidateQuery, LocalLogStore, ModeMatch, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default tolerance for services reporting full timestamps
pub const DEFAULT_EXACT_TOLERANCE_SECS: i64 = 300;
/// Default tolerance for services reporting only the QSO date
pub const DEFAULT_DATE_ONLY_TOLERANCE_SECS: i64 = 86_400;

/// Matching rules for one service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchPolicy {
    pub tolerance_secs: i64,
    pub mode_match: ModeMatch,
}

/// Matching rules for every service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchPolicies {
    pub lotw: MatchPolicy,
    pub eqsl: MatchPolicy,
    pub clublog: MatchPolicy,
    pub qrz: MatchPolicy,
}

impl MatchPolicies {
    pub fn with_tolerances(exact_secs: i64, date_only_secs: i64) -> Self {
        Self {
            lotw: MatchPolicy {
                tolerance_secs: exact_secs,
                mode_match: ModeMatch::Exact,
            },
            eqsl: MatchPolicy {
                tolerance_secs: date_only_secs,
                mode_match: ModeMatch::Group,
            },
            clublog: MatchPolicy {
                tolerance_secs: exact_secs,
                mode_match: ModeMatch::Exact,
            },
            qrz: MatchPolicy {
                tolerance_secs: exact_secs,
                mode_match: ModeMatch::Group,
            },
        }
    }

    pub fn get(&self, service: Service) -> MatchPolicy {
        match service {
            Service::Lotw => self.lotw,
            Service::Eqsl => self.eqsl,
            Service::Clublog => self.clublog,
            Service::Qrz => self.qrz,
        }
    }
}

impl Default for MatchPolicies {
    fn default() -> Self {
        Self::with_tolerances(DEFAULT_EXACT_TOLERANCE_SECS, DEFAULT_DATE_ONLY_TOLERANCE_SECS)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MatchResolver {
    policies: MatchPolicies,
}

impl MatchResolver {
    pub fn new(policies: MatchPolicies) -> Self {
        Self { policies }
    }

    pub fn policies(&self) -> &MatchPolicies {
        &self.policies
    }

    /// Store query covering every contact that could match `record`
    pub fn query_for(&self, record: &ConfirmationRecord) -> CandidateQuery {
        let policy = self.policies.get(record.service);
        CandidateQuery {
            match_call: record.match_call.clone(),
            band: record.band,
            mode: record.mode,
            mode_match: policy.mode_match,
            window: record.qso_time.window(policy.tolerance_secs),
        }
    }

    /// Resolve `record` against the store
    pub async fn resolve(
        &self,
        record: &ConfirmationRecord,
        store: &dyn LocalLogStore,
    ) -> Result<MatchResult, StoreError> {
        let query = self.query_for(record);
        let contacts = store.find_candidates(&query).await?;
        let tolerance = self.policies.get(record.service).tolerance_secs;
        let result = rank_candidates(record, &query, &contacts, tolerance);

        tracing::debug!(
            service = %record.service,
            callsign = %record.callsign,
            candidates = contacts.len(),
            result = ?result,
            "Resolved confirmation"
        );
        Ok(result)
    }
}

/// Pick the best candidate among `contacts`
///
/// Contacts the query does not admit are ignored, as are duplicates.
/// Ambiguous ids are returned in ascending order.
pub fn rank_candidates(
    record: &ConfirmationRecord,
    query: &CandidateQuery,
    contacts: &[LocalContact],
    tolerance_secs: i64,
) -> MatchResult {
    let candidates: BTreeMap<ContactId, (MatchCandidate, &LocalContact)> = contacts
        .iter()
        .filter(|contact| query.admits(contact))
        .map(|contact| {
            let candidate = MatchCandidate {
                contact_id: contact.id,
                time_delta_seconds: record.qso_time.delta_seconds(contact.time_on),
            };
            (contact.id, (candidate, contact))
        })
        .filter(|(_, (candidate, _))| candidate.time_delta_seconds <= tolerance_secs)
        .collect();

    let best_delta = match candidates.values().map(|(c, _)| c.time_delta_seconds).min() {
        Some(delta) => delta,
        None => return MatchResult::NoMatch,
    };

    let best: Vec<(MatchCandidate, &LocalContact)> = candidates
        .into_values()
        .filter(|(c, _)| c.time_delta_seconds == best_delta)
        .collect();

    match best.as_slice() {
        [(candidate, contact)] => {
            if is_exact(record, contact, candidate.time_delta_seconds) {
                MatchResult::MatchedExact(candidate.contact_id)
            } else {
                MatchResult::MatchedFuzzy(candidate.contact_id)
            }
        }
        _ => MatchResult::Ambiguous(best.iter().map(|(c, _)| c.contact_id).collect()),
    }
}

fn is_exact(record: &ConfirmationRecord, contact: &LocalContact, delta: i64) -> bool {
    delta == 0
        && !record.qso_time.is_date_only()
        && !record.band.is_unknown()
        && !record.mode.is_unknown()
        && record.band == contact.band
        && record.mode == contact.mode
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Confirmations, QsoTime};
    use chrono::{DateTime, NaiveDate, Utc};
    use qlog_common::time::adif_datetime;
    use qlog_common::{Band, Mode};

    fn ts(date: &str, time: &str) -> DateTime<Utc> {
        adif_datetime(date, time).unwrap()
    }

    fn contact(id: i64, band: Band, mode: Mode, time_on: DateTime<Utc>) -> LocalContact {
        LocalContact {
            id: ContactId(id),
            callsign: "OK1ABC".to_string(),
            band,
            mode,
            time_on,
            time_off: None,
            confirmations: Confirmations::default(),
        }
    }

    fn record(service: Service, mode: Mode, qso_time: QsoTime) -> ConfirmationRecord {
        ConfirmationRecord {
            service,
            remote_id: None,
            callsign: "OK1ABC".to_string(),
            match_call: "OK1ABC".to_string(),
            band: Band::M20,
            mode,
            qso_time,
            confirmed_at: ts("20240105", "0000"),
            raw_fields: Default::default(),
        }
    }

    fn rank(record: &ConfirmationRecord, contacts: &[LocalContact]) -> MatchResult {
        let resolver = MatchResolver::default();
        let query = resolver.query_for(record);
        let tolerance = resolver.policies().get(record.service).tolerance_secs;
        rank_candidates(record, &query, contacts, tolerance)
    }

    #[test]
    fn test_close_timestamp_is_fuzzy_match() {
        let rec = record(Service::Lotw, Mode::Ssb, QsoTime::Exact(ts("20240101", "100030")));
        let contacts = [contact(1, Band::M20, Mode::Ssb, ts("20240101", "1000"))];
        assert_eq!(rank(&rec, &contacts), MatchResult::MatchedFuzzy(ContactId(1)));
    }

    #[test]
    fn test_identical_timestamp_is_exact_match() {
        let rec = record(Service::Lotw, Mode::Ssb, QsoTime::Exact(ts("20240101", "1000")));
        let contacts = [contact(1, Band::M20, Mode::Ssb, ts("20240101", "1000"))];
        assert_eq!(rank(&rec, &contacts), MatchResult::MatchedExact(ContactId(1)));
    }

    #[test]
    fn test_closest_candidate_wins() {
        let rec = record(Service::Lotw, Mode::Ssb, QsoTime::Exact(ts("20240101", "1001")));
        let contacts = [
            contact(1, Band::M20, Mode::Ssb, ts("20240101", "1000")),
            contact(2, Band::M20, Mode::Ssb, ts("20240101", "1004")),
        ];
        assert_eq!(rank(&rec, &contacts), MatchResult::MatchedFuzzy(ContactId(1)));
    }

    #[test]
    fn test_equal_distance_is_ambiguous() {
        let rec = record(Service::Lotw, Mode::Ssb, QsoTime::Exact(ts("20240101", "1002")));
        let contacts = [
            contact(2, Band::M20, Mode::Ssb, ts("20240101", "1004")),
            contact(1, Band::M20, Mode::Ssb, ts("20240101", "1000")),
        ];
        assert_eq!(
            rank(&rec, &contacts),
            MatchResult::Ambiguous(vec![ContactId(1), ContactId(2)])
        );
    }

    #[test]
    fn test_date_only_same_day_pair_is_ambiguous() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let rec = record(Service::Eqsl, Mode::Ssb, QsoTime::DateOnly(day));
        let contacts = [
            contact(1, Band::M20, Mode::Ssb, ts("20240101", "1000")),
            contact(2, Band::M20, Mode::Ssb, ts("20240101", "1010")),
        ];
        assert_eq!(
            rank(&rec, &contacts),
            MatchResult::Ambiguous(vec![ContactId(1), ContactId(2)])
        );
    }

    #[test]
    fn test_date_only_prefers_same_day_over_adjacent() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let rec = record(Service::Eqsl, Mode::Ssb, QsoTime::DateOnly(day));
        let contacts = [
            contact(1, Band::M20, Mode::Ssb, ts("20231231", "2350")),
            contact(2, Band::M20, Mode::Ssb, ts("20240101", "1010")),
        ];
        assert_eq!(rank(&rec, &contacts), MatchResult::MatchedFuzzy(ContactId(2)));
    }

    #[test]
    fn test_outside_tolerance_and_wrong_band_are_ignored() {
        let rec = record(Service::Lotw, Mode::Ssb, QsoTime::Exact(ts("20240101", "1000")));
        let contacts = [
            contact(1, Band::M20, Mode::Ssb, ts("20240101", "1006")),
            contact(2, Band::M40, Mode::Ssb, ts("20240101", "1000")),
        ];
        assert_eq!(rank(&rec, &contacts), MatchResult::NoMatch);
    }

    #[test]
    fn test_unknown_mode_matches_within_tolerance() {
        let rec = record(Service::Clublog, Mode::Unknown, QsoTime::Exact(ts("20240101", "1200")));
        let contacts = [contact(1, Band::M20, Mode::Cw, ts("20240101", "1201"))];
        assert_eq!(rank(&rec, &contacts), MatchResult::MatchedFuzzy(ContactId(1)));
    }

    #[test]
    fn test_group_policy_accepts_sibling_mode() {
        let rec = record(Service::Qrz, Mode::Fm, QsoTime::Exact(ts("20240101", "1000")));
        let contacts = [contact(1, Band::M20, Mode::Ssb, ts("20240101", "1000"))];
        assert_eq!(rank(&rec, &contacts), MatchResult::MatchedFuzzy(ContactId(1)));

        let rec = record(Service::Lotw, Mode::Fm, QsoTime::Exact(ts("20240101", "1000")));
        assert_eq!(rank(&rec, &contacts), MatchResult::NoMatch);
    }
}
