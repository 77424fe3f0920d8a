//! Amateur band vocabulary
//!
//! Bands use the ADIF enumeration names so local log rows and service
//! records compare directly. Anything outside the table maps to
//! [`Band::Unknown`] instead of failing.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Amateur radio band (ADIF band enumeration)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Band {
    #[serde(rename = "2190m")]
    M2190,
    #[serde(rename = "630m")]
    M630,
    #[serde(rename = "560m")]
    M560,
    #[serde(rename = "160m")]
    M160,
    #[serde(rename = "80m")]
    M80,
    #[serde(rename = "60m")]
    M60,
    #[serde(rename = "40m")]
    M40,
    #[serde(rename = "30m")]
    M30,
    #[serde(rename = "20m")]
    M20,
    #[serde(rename = "17m")]
    M17,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "12m")]
    M12,
    #[serde(rename = "10m")]
    M10,
    #[serde(rename = "6m")]
    M6,
    #[serde(rename = "4m")]
    M4,
    #[serde(rename = "2m")]
    M2,
    #[serde(rename = "1.25m")]
    M1_25,
    #[serde(rename = "70cm")]
    Cm70,
    #[serde(rename = "33cm")]
    Cm33,
    #[serde(rename = "23cm")]
    Cm23,
    #[serde(rename = "13cm")]
    Cm13,
    #[serde(rename = "9cm")]
    Cm9,
    #[serde(rename = "6cm")]
    Cm6,
    #[serde(rename = "3cm")]
    Cm3,
    /// Band value not recognized (raw value kept by the caller)
    #[serde(rename = "unknown")]
    Unknown,
}

/// (band, lower edge MHz, upper edge MHz)
const BAND_PLAN: &[(Band, f64, f64)] = &[
    (Band::M2190, 0.1357, 0.1378),
    (Band::M630, 0.472, 0.479),
    (Band::M560, 0.501, 0.504),
    (Band::M160, 1.8, 2.0),
    (Band::M80, 3.5, 4.0),
    (Band::M60, 5.06, 5.45),
    (Band::M40, 7.0, 7.3),
    (Band::M30, 10.1, 10.15),
    (Band::M20, 14.0, 14.35),
    (Band::M17, 18.068, 18.168),
    (Band::M15, 21.0, 21.45),
    (Band::M12, 24.89, 24.99),
    (Band::M10, 28.0, 29.7),
    (Band::M6, 50.0, 54.0),
    (Band::M4, 70.0, 71.0),
    (Band::M2, 144.0, 148.0),
    (Band::M1_25, 222.0, 225.0),
    (Band::Cm70, 420.0, 450.0),
    (Band::Cm33, 902.0, 928.0),
    (Band::Cm23, 1240.0, 1300.0),
    (Band::Cm13, 2300.0, 2450.0),
    (Band::Cm9, 3300.0, 3500.0),
    (Band::Cm6, 5650.0, 5925.0),
    (Band::Cm3, 10000.0, 10500.0),
];

impl Band {
    /// ADIF name of the band (lowercase, e.g. `"20m"`)
    pub fn as_str(&self) -> &'static str {
        match self {
            Band::M2190 => "2190m",
            Band::M630 => "630m",
            Band::M560 => "560m",
            Band::M160 => "160m",
            Band::M80 => "80m",
            Band::M60 => "60m",
            Band::M40 => "40m",
            Band::M30 => "30m",
            Band::M20 => "20m",
            Band::M17 => "17m",
            Band::M15 => "15m",
            Band::M12 => "12m",
            Band::M10 => "10m",
            Band::M6 => "6m",
            Band::M4 => "4m",
            Band::M2 => "2m",
            Band::M1_25 => "1.25m",
            Band::Cm70 => "70cm",
            Band::Cm33 => "33cm",
            Band::Cm23 => "23cm",
            Band::Cm13 => "13cm",
            Band::Cm9 => "9cm",
            Band::Cm6 => "6cm",
            Band::Cm3 => "3cm",
            Band::Unknown => "unknown",
        }
    }

    /// Parse an ADIF band string, returning `Unknown` for anything unrecognized
    pub fn parse_lenient(value: &str) -> Band {
        value.parse().unwrap_or(Band::Unknown)
    }

    /// Band containing the given frequency (MHz), if any
    pub fn from_frequency_mhz(freq: f64) -> Option<Band> {
        BAND_PLAN
            .iter()
            .find(|(_, low, high)| freq >= *low && freq <= *high)
            .map(|(band, _, _)| *band)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Band::Unknown)
    }
}

impl FromStr for Band {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        BAND_PLAN
            .iter()
            .map(|(band, _, _)| *band)
            .find(|band| band.as_str() == needle)
            .ok_or_else(|| crate::Error::InvalidInput(format!("unrecognized band '{}'", s)))
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
