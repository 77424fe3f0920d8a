//! Callsign canonicalization
//!
//! Two forms are used: the canonical callsign (trimmed, uppercase, no
//! embedded whitespace) that is displayed and stored, and the match key
//! used when pairing confirmations with logged contacts. The match key drops
//! operating-condition suffixes so `OK1ABC/P` pairs with `OK1ABC`. Location
//! prefixes (`DL/OK1ABC`) are kept, they identify a different entity.

/// Suffix tokens that only describe operating conditions
const CONDITION_SUFFIXES: &[&str] = &["P", "M", "MM", "AM", "QRP", "A", "B", "LH"];

/// Canonical display form: trimmed, uppercase, whitespace removed
pub fn canonicalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(|c| c.to_uppercase())
        .collect()
}

/// Key used for matching, with condition suffixes stripped
///
/// Single-digit call-area suffixes (`W1AW/4`) are stripped as well.
pub fn match_key(raw: &str) -> String {
    let canonical = canonicalize(raw);
    let mut parts: Vec<&str> = canonical.split('/').filter(|p| !p.is_empty()).collect();

    while parts.len() > 1 {
        let last = parts[parts.len() - 1];
        if is_condition_suffix(last) {
            parts.pop();
        } else {
            break;
        }
    }

    parts.join("/")
}

fn is_condition_suffix(token: &str) -> bool {
    CONDITION_SUFFIXES.contains(&token)
        || (token.len() == 1 && token.chars().all(|c| c.is_ascii_digit()))
}
