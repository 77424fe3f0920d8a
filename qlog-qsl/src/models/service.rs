//! Confirmation services

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// External confirmation service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Service {
    /// ARRL Logbook of the World
    Lotw,
    /// eQSL.cc
    Eqsl,
    /// Club Log
    Clublog,
    /// QRZ.com logbook
    Qrz,
}

impl Service {
    pub const ALL: [Service; 4] = [Service::Lotw, Service::Eqsl, Service::Clublog, Service::Qrz];

    /// Short machine name, also used as the column prefix in the SQLite store
    pub fn key(&self) -> &'static str {
        match self {
            Service::Lotw => "lotw",
            Service::Eqsl => "eqsl",
            Service::Clublog => "clublog",
            Service::Qrz => "qrz",
        }
    }

    /// Name as shown to operators
    pub fn display_name(&self) -> &'static str {
        match self {
            Service::Lotw => "LoTW",
            Service::Eqsl => "eQSL",
            Service::Clublog => "Clublog",
            Service::Qrz => "QRZ.com",
        }
    }
}

impl FromStr for Service {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lotw" => Ok(Service::Lotw),
            "eqsl" => Ok(Service::Eqsl),
            "clublog" => Ok(Service::Clublog),
            "qrz" | "qrz.com" | "qrzcom" => Ok(Service::Qrz),
            other => Err(format!(
                "unknown service '{}' (expected lotw, eqsl, clublog or qrz)",
                other
            )),
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_service_names() {
        assert_eq!("LoTW".parse::<Service>().unwrap(), Service::Lotw);
        assert_eq!("qrz.com".parse::<Service>().unwrap(), Service::Qrz);
        assert!("hrdlog".parse::<Service>().is_err());
    }

    #[test]
    fn test_keys_are_distinct() {
        let keys: std::collections::HashSet<_> = Service::ALL.iter().map(|s| s.key()).collect();
        assert_eq!(keys.len(), 4);
    }
}
