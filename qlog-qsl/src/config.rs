//! qlog-qsl configuration
//!
//! Loaded from `qsl-sync.toml` (see `qlog_common::config` for location
//! rules). Resolution priority for every setting: CLI argument, then
//! environment variable, then TOML file, then compiled default. Service
//! secrets may be kept out of the file with `QLOG_LOTW_PASSWORD`,
//! `QLOG_EQSL_PASSWORD` and `QLOG_QRZ_API_KEY`.

use crate::services::match_resolver::{
    MatchPolicies, DEFAULT_DATE_ONLY_TOLERANCE_SECS, DEFAULT_EXACT_TOLERANCE_SECS,
};
use crate::services::reconciliation::EngineConfig;
use crate::Result;
use qlog_common::config::{default_data_dir, load_toml_or_default, resolve_config_path, LoggingConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE_NAME: &str = "qsl-sync.toml";
pub const CONFIG_ENV_VAR: &str = "QLOG_CONFIG";
pub const DEFAULT_DATABASE_FILE: &str = "qlog.db";

pub const LOTW_PASSWORD_ENV: &str = "QLOG_LOTW_PASSWORD";
pub const EQSL_PASSWORD_ENV: &str = "QLOG_EQSL_PASSWORD";
pub const QRZ_API_KEY_ENV: &str = "QLOG_QRZ_API_KEY";

/// Contents of `qsl-sync.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Local log database (default: `<data_dir>/qlog/qlog.db`)
    pub database_path: Option<PathBuf>,
    /// Station callsign whose confirmations are fetched
    pub station_callsign: Option<String>,
    /// Location / QTH profile name at services that support several
    pub qth_profile: Option<String>,
    pub logging: LoggingConfig,
    pub engine: EngineSection,
    pub matching: MatchingSection,
    pub lotw: Option<LotwSection>,
    pub eqsl: Option<EqslSection>,
    pub qrz: Option<QrzSection>,
    pub clublog: Option<ClublogSection>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    pub fetch_timeout_secs: u64,
    pub max_fetch_attempts: u32,
    pub initial_backoff_ms: u64,
    pub channel_capacity: usize,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: 60,
            max_fetch_attempts: 3,
            initial_backoff_ms: 500,
            channel_capacity: 64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingSection {
    pub exact_tolerance_secs: i64,
    pub date_only_tolerance_secs: i64,
}

impl Default for MatchingSection {
    fn default() -> Self {
        Self {
            exact_tolerance_secs: DEFAULT_EXACT_TOLERANCE_SECS,
            date_only_tolerance_secs: DEFAULT_DATE_ONLY_TOLERANCE_SECS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LotwSection {
    pub username: String,
    pub password: Option<String>,
    pub own_callsign: Option<String>,
    /// Request QSOs uploaded since the date instead of QSLs received since
    pub qsos_since: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EqslSection {
    pub username: String,
    pub password: Option<String>,
    pub qth_nickname: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QrzSection {
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClublogSection {
    /// Club Log ADIF export to reconcile from
    pub adif_file: Option<PathBuf>,
}

impl SyncConfig {
    /// Load from the resolved config file and apply secret overrides from the environment
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        let path = resolve_config_path(cli_path, CONFIG_ENV_VAR, CONFIG_FILE_NAME);
        let mut config: SyncConfig = load_toml_or_default(path.as_deref())?;
        config.apply_env_secrets();
        Ok(config)
    }

    /// Environment secrets take precedence over values in the file
    pub fn apply_env_secrets(&mut self) {
        if let Some(password) = env_value(LOTW_PASSWORD_ENV) {
            self.lotw.get_or_insert_with(Default::default).password = Some(password);
        }
        if let Some(password) = env_value(EQSL_PASSWORD_ENV) {
            self.eqsl.get_or_insert_with(Default::default).password = Some(password);
        }
        if let Some(key) = env_value(QRZ_API_KEY_ENV) {
            self.qrz.get_or_insert_with(Default::default).api_key = Some(key);
        }
    }

    /// Database path: CLI (or `QLOG_DATABASE`, via clap), then TOML, then default
    pub fn database_path(&self, cli_path: Option<&Path>) -> PathBuf {
        cli_path
            .map(Path::to_path_buf)
            .or_else(|| self.database_path.clone())
            .unwrap_or_else(|| default_data_dir().join(DEFAULT_DATABASE_FILE))
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            fetch_timeout: Duration::from_secs(self.engine.fetch_timeout_secs.max(1)),
            max_fetch_attempts: self.engine.max_fetch_attempts.max(1),
            initial_backoff: Duration::from_millis(self.engine.initial_backoff_ms),
            channel_capacity: self.engine.channel_capacity.max(1),
            policies: MatchPolicies::with_tolerances(
                self.matching.exact_tolerance_secs,
                self.matching.date_only_tolerance_secs,
            ),
        }
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
