//! Tally settle-up runner.
//!
//! Results are printed to stdout as JSON; logs go to stderr. Run
//! `tally --help` for the available commands.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use sea_orm_migration::MigratorTrait;
use tally_core::balance::BalanceScope;
use tally_core::ledger::LedgerSnapshot;
use tally_core::settlement::SettlementResolver;
use tally_db::migration::Migrator;
use tally_db::{RecordedSettlement, RepositoryError, SettlementRepository, connect_with};
use tally_shared::config::LoggingConfig;
use tally_shared::types::GroupId;
use tally_shared::{AppConfig, AppError};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const MAX_RECORD_ATTEMPTS: u32 = 3;

#[derive(Parser, Debug)]
#[command(name = "tally")]
#[command(about = "Compute and record settle-up transfers for shared-expense groups")]
struct Cli {
    /// Database connection string, overriding `database.url` from configuration.
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Plan settlements for a JSON ledger snapshot file.
    Snapshot {
        /// Path to the snapshot file.
        path: PathBuf,
    },
    /// Plan settlements for a stored group.
    Plan {
        /// The group to settle.
        group_id: GroupId,
    },
    /// Plan and record settlements for a stored group.
    Record {
        /// The group to settle.
        group_id: GroupId,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = AppConfig::load().context("Failed to load configuration")?;
    if let Some(url) = cli.database_url {
        config.database.url = url;
    }
    init_tracing(&config.logging);

    match cli.command {
        Command::Snapshot { path } => snapshot(&config, &path),
        Command::Plan { group_id } => plan(&config, group_id).await,
        Command::Record { group_id } => record(&config, group_id).await,
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| logging.filter.clone().into());

    tracing_subscriber::registry()
        .with(filter)
        .with(
            logging
                .json
                .then(|| fmt::layer().json().with_writer(std::io::stderr)),
        )
        .with((!logging.json).then(|| fmt::layer().with_writer(std::io::stderr)))
        .init();
}

fn snapshot(config: &AppConfig, path: &Path) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let snapshot: LedgerSnapshot = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid ledger snapshot in {}", path.display()))?;

    let transactions = snapshot.resolve().map_err(AppError::from)?;
    let resolver = SettlementResolver::with_tolerance(config.settlement.imbalance_tolerance());
    let plan = resolver
        .plan(&transactions, &BalanceScope::all())
        .map_err(AppError::from)?;

    info!(
        transactions = transactions.len(),
        transfers = plan.transfers.len(),
        "Snapshot planned"
    );
    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}

async fn repository(config: &AppConfig) -> anyhow::Result<SettlementRepository> {
    let db = connect_with(&config.database).await?;
    if config.database.url.starts_with("sqlite:") {
        Migrator::up(&db, None).await?;
    }
    info!("Connected to database");

    Ok(SettlementRepository::from_config(db, &config.settlement))
}

async fn plan(config: &AppConfig, group_id: GroupId) -> anyhow::Result<()> {
    let settlements = repository(config).await?;
    let planned = settlements.plan(group_id).await.map_err(AppError::from)?;

    println!("{}", serde_json::to_string_pretty(&planned)?);
    Ok(())
}

async fn record(config: &AppConfig, group_id: GroupId) -> anyhow::Result<()> {
    let settlements = repository(config).await?;
    let recorded = record_with_retry(&settlements, group_id)
        .await
        .map_err(AppError::from)?;

    println!("{}", serde_json::to_string_pretty(&recorded)?);
    Ok(())
}

/// Plans and records, re-planning when another writer moved the ledger.
async fn record_with_retry(
    settlements: &SettlementRepository,
    group_id: GroupId,
) -> Result<Vec<RecordedSettlement>, RepositoryError> {
    let mut attempt = 1;
    loop {
        let planned = settlements.plan(group_id).await?;
        match settlements
            .record(
                group_id,
                planned.ledger_version,
                &planned.plan.transfers,
                Utc::now(),
            )
            .await
        {
            Err(err) if err.is_retryable() && attempt < MAX_RECORD_ATTEMPTS => {
                warn!(%group_id, attempt, error = %err, "Retrying settlement");
                tokio::time::sleep(Duration::from_millis(50 * u64::from(attempt))).await;
                attempt += 1;
            }
            result => return result,
        }
    }
}
