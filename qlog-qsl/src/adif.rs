//! ADIF (`.adi`) reader
//!
//! Turns ADIF text into header fields plus one [`RawRecord`] per `<EOR>`.
//! Only the tagged text format is handled; ADX (XML) is not used by any of
//! the confirmation services.
//!
//! Field lengths are counted in characters, not bytes, so non-ASCII text in
//! free-form fields (comments, QTH) cannot split a UTF-8 sequence.

use crate::models::RawRecord;
use std::collections::BTreeMap;
use thiserror::Error;

/// ADIF parse errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AdifError {
    #[error("unterminated tag at offset {0}")]
    UnterminatedTag(usize),

    #[error("invalid length in tag '<{tag}>'")]
    InvalidLength { tag: String },

    #[error("field '{field}' declares {declared} characters but only {available} remain")]
    TruncatedValue {
        field: String,
        declared: usize,
        available: usize,
    },
}

/// Parsed ADIF document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdifDocument {
    /// Header fields (uppercase names), empty when the file has no header
    pub header: BTreeMap<String, String>,
    pub records: Vec<RawRecord>,
}

/// Parse ADIF text
///
/// A file whose first character is `<` has no header (per ADIF). Fields
/// after the last `<EOR>` are dropped as an incomplete record.
pub fn parse(text: &str) -> Result<AdifDocument, AdifError> {
    let mut doc = AdifDocument::default();
    let mut in_header = !text.trim_start().starts_with('<');
    let mut current = RawRecord::new();
    let mut pos = 0;

    while let Some(offset) = text[pos..].find('<') {
        let tag_start = pos + offset;
        let tag_end = text[tag_start..]
            .find('>')
            .map(|i| tag_start + i)
            .ok_or(AdifError::UnterminatedTag(tag_start))?;
        let tag = &text[tag_start + 1..tag_end];
        pos = tag_end + 1;

        let mut parts = tag.split(':');
        let name = parts.next().unwrap_or("").trim().to_ascii_uppercase();
        let length = parts.next();

        match (name.as_str(), length) {
            ("EOH", _) => {
                in_header = false;
            }
            ("EOR", _) => {
                if !current.is_empty() {
                    doc.records.push(std::mem::take(&mut current));
                }
            }
            (_, Some(len)) => {
                let declared: usize = len.trim().parse().map_err(|_| AdifError::InvalidLength {
                    tag: tag.to_string(),
                })?;
                let value: String = text[pos..].chars().take(declared).collect();
                let available = value.chars().count();
                if available < declared {
                    return Err(AdifError::TruncatedValue {
                        field: name,
                        declared,
                        available,
                    });
                }
                pos += value.len();

                if in_header {
                    doc.header.insert(name, value);
                } else {
                    current.insert(&name, value);
                }
            }
            // Bare tags other than EOH/EOR carry no data
            (_, None) => {}
        }
    }

    Ok(doc)
}

/// True when the text contains an ADIF end-of-header marker
pub fn has_header(text: &str) -> bool {
    text.to_ascii_lowercase().contains("<eoh>")
}
