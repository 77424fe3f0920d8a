//! qlog-qsl - QSL confirmation sync for the QLog contact log
//!
//! `sync` downloads confirmations from the configured services and applies
//! them to the local log database. `import-log` seeds that database from an
//! ADIF log export.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use qlog_common::logging::init_logging;
use qlog_common::time::{parse_timestamp, start_of_day};
use qlog_qsl::adapters::{
    AdifFileAdapter, EqslAdapter, LotwAdapter, OperatorIdentity, QrzAdapter, ServiceAdapter,
};
use qlog_qsl::adif;
use qlog_qsl::config::SyncConfig;
use qlog_qsl::models::{NewContact, Service, SyncOutcome};
use qlog_qsl::services::{ReconciliationEngine, SyncReport};
use qlog_qsl::store::SqliteLogStore;

/// Command-line arguments for qlog-qsl
#[derive(Parser, Debug)]
#[command(name = "qlog-qsl")]
#[command(about = "Reconcile QSL confirmations with the QLog contact log")]
#[command(version)]
struct Cli {
    /// Config file (default: <config_dir>/qlog/qsl-sync.toml)
    #[arg(long, global = true, env = "QLOG_CONFIG")]
    config: Option<PathBuf>,

    /// Local log database
    #[arg(long, global = true, env = "QLOG_DATABASE")]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download confirmations and apply them to the local log
    Sync(SyncArgs),
    /// Import contacts from an ADIF log into the local log database
    ImportLog {
        /// ADIF (.adi) file
        path: PathBuf,
    },
}

#[derive(Args, Debug)]
struct SyncArgs {
    /// Only confirmations granted on or after this date (YYYY-MM-DD)
    #[arg(long)]
    since: Option<String>,

    /// Services to sync (repeatable; default: every configured service)
    #[arg(long = "service", value_name = "SERVICE")]
    services: Vec<Service>,

    /// Read a service's confirmations from an ADIF file instead of the network
    #[arg(long = "adif", value_name = "SERVICE=PATH", value_parser = parse_adif_arg)]
    adif_files: Vec<(Service, PathBuf)>,

    /// Station callsign (overrides station_callsign from the config file)
    #[arg(long)]
    callsign: Option<String>,

    /// Print the full report as JSON
    #[arg(long)]
    json: bool,
}

fn parse_adif_arg(value: &str) -> std::result::Result<(Service, PathBuf), String> {
    let (service, path) = value
        .split_once('=')
        .ok_or_else(|| format!("expected SERVICE=PATH, got '{}'", value))?;
    Ok((service.parse()?, PathBuf::from(path)))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = SyncConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    init_logging(&config.logging).context("Failed to initialize logging")?;

    let db_path = config.database_path(cli.database.as_deref());
    info!("Local log database: {}", db_path.display());

    match cli.command {
        Command::Sync(args) => run_sync(&config, &db_path, args).await,
        Command::ImportLog { path } => run_import(&db_path, &path).await,
    }
}

async fn run_sync(config: &SyncConfig, db_path: &Path, args: SyncArgs) -> Result<()> {
    let store = Arc::new(
        SqliteLogStore::open(db_path)
            .await
            .context("Failed to open local log database")?,
    );

    let identity = OperatorIdentity {
        callsign: args
            .callsign
            .as_deref()
            .or(config.station_callsign.as_deref())
            .map(qlog_common::callsign::canonicalize)
            .unwrap_or_default(),
        qth_profile: config.qth_profile.clone(),
    };
    if identity.callsign.is_empty() {
        warn!("No station callsign configured, confirmations are not filtered by station");
    }

    let adapters = build_adapters(config, &args)?;
    let services: Vec<Service> = adapters.iter().map(|a| a.service()).collect();

    let since = match &args.since {
        Some(value) => parse_timestamp(value).with_context(|| format!("Invalid --since '{}'", value))?,
        None => default_since(&store, &services).await?,
    };

    let cancel = CancellationToken::new();
    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, cancelling sync");
            ctrl_c_token.cancel();
        }
    });

    let engine = ReconciliationEngine::new(store, identity, config.engine_config())
        .with_progress(|counts| tracing::debug!(progress = %counts.display_string(), "Sync progress"));
    let report = engine.run(adapters, since, cancel).await;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize report")?
        );
    } else {
        print_report(&report);
    }
    Ok(())
}

/// Adapters for the selected services
///
/// Explicitly requested services must be usable; otherwise every service
/// with an `--adif` file or credentials in the config is synced.
fn build_adapters(config: &SyncConfig, args: &SyncArgs) -> Result<Vec<Arc<dyn ServiceAdapter>>> {
    let explicit = !args.services.is_empty();
    let selected: Vec<Service> = if explicit {
        args.services.clone()
    } else {
        Service::ALL.to_vec()
    };

    let mut adapters: Vec<Arc<dyn ServiceAdapter>> = Vec::new();
    for service in selected {
        if adapters.iter().any(|a| a.service() == service) {
            continue;
        }
        if let Some((_, path)) = args.adif_files.iter().find(|(s, _)| *s == service) {
            adapters.push(Arc::new(AdifFileAdapter::new(service, path.clone())));
            continue;
        }

        match network_adapter(config, service)? {
            Some(adapter) => adapters.push(adapter),
            None if explicit => bail!(
                "{} selected but not configured (add it to qsl-sync.toml or pass --adif {}=PATH)",
                service,
                service.key()
            ),
            None => {}
        }
    }

    if adapters.is_empty() {
        bail!("No confirmation services configured; see --service, --adif or qsl-sync.toml");
    }
    Ok(adapters)
}

fn network_adapter(config: &SyncConfig, service: Service) -> Result<Option<Arc<dyn ServiceAdapter>>> {
    let adapter: Option<Arc<dyn ServiceAdapter>> = match service {
        Service::Lotw => match &config.lotw {
            Some(lotw) if !lotw.username.is_empty() => {
                let password = lotw.password.as_deref().unwrap_or_default();
                Some(Arc::new(
                    LotwAdapter::new(&lotw.username, password)?
                        .with_own_callsign(lotw.own_callsign.clone())
                        .with_qsos_since(lotw.qsos_since),
                ))
            }
            _ => None,
        },
        Service::Eqsl => match &config.eqsl {
            Some(eqsl) if !eqsl.username.is_empty() => {
                let password = eqsl.password.as_deref().unwrap_or_default();
                Some(Arc::new(
                    EqslAdapter::new(&eqsl.username, password)?
                        .with_qth_nickname(eqsl.qth_nickname.clone()),
                ))
            }
            _ => None,
        },
        Service::Qrz => match config.qrz.as_ref().and_then(|q| q.api_key.as_deref()) {
            Some(key) => Some(Arc::new(QrzAdapter::new(key)?)),
            None => None,
        },
        Service::Clublog => config
            .clublog
            .as_ref()
            .and_then(|c| c.adif_file.clone())
            .map(|path| Arc::new(AdifFileAdapter::new(Service::Clublog, path)) as Arc<dyn ServiceAdapter>),
    };
    Ok(adapter)
}

/// Earliest of the per-service latest confirmation dates already recorded
///
/// A service with nothing recorded yet forces a full download.
async fn default_since(store: &SqliteLogStore, services: &[Service]) -> Result<DateTime<Utc>> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).context("Invalid epoch date")?;
    let mut since: Option<NaiveDate> = None;

    for service in services {
        let latest = store
            .latest_received_date(*service)
            .await
            .with_context(|| format!("Failed to read latest {} confirmation", service))?;
        let date = latest.unwrap_or(epoch);
        since = Some(since.map_or(date, |s| s.min(date)));
    }

    Ok(start_of_day(since.unwrap_or(epoch)))
}

fn print_report(report: &SyncReport) {
    println!("Sync {:?}: {}", report.status(), report.summary_line());

    for service in Service::ALL {
        let counts = report.service_counts(service);
        if counts != Default::default() {
            println!("  {:<8} {}", service.display_name(), counts.display_string());
        }
    }

    let unresolved: Vec<_> = report.unresolved().collect();
    if unresolved.is_empty() {
        return;
    }
    println!();
    println!("Needs review:");
    for entry in unresolved {
        let record = entry
            .record
            .as_ref()
            .map(|r| r.to_string())
            .unwrap_or_else(|| "(service)".to_string());
        let detail = match &entry.outcome {
            SyncOutcome::Ambiguous { candidate_ids } => format!(
                "ambiguous between {}",
                candidate_ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(", ")
            ),
            SyncOutcome::Error { kind, detail } => format!("{}: {}", kind, detail),
            other => other.label().to_string(),
        };
        println!("  [{}] {} - {}", entry.service.display_name(), record, detail);
    }
}

async fn run_import(db_path: &Path, path: &Path) -> Result<()> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let document = adif::parse(&text).with_context(|| format!("Malformed ADIF in {}", path.display()))?;

    let store = SqliteLogStore::open(db_path)
        .await
        .context("Failed to open local log database")?;

    let mut imported = 0usize;
    let mut skipped = 0usize;
    for (index, raw) in document.records.iter().enumerate() {
        let contact = match NewContact::from_adif(raw) {
            Ok(contact) => contact,
            Err(reason) => {
                warn!(record = index + 1, reason = %reason, "Skipping log record");
                skipped += 1;
                continue;
            }
        };
        store
            .insert_contact(&contact)
            .await
            .with_context(|| format!("Failed to store record {}", index + 1))?;
        imported += 1;
    }

    info!(imported, skipped, "Log import finished");
    println!("Imported {} contacts ({} skipped)", imported, skipped);
    Ok(())
}
