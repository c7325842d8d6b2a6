//! Database layer with `SeaORM` entities and repositories.
//!
//! This crate provides:
//! - `SeaORM` entity definitions
//! - Repository abstractions for data access
//! - Database migrations
//!
//! Amounts are stored as integer cents so the same schema runs on PostgreSQL
//! and on in-memory SQLite.

pub mod entities;
pub mod migration;
pub mod repositories;

pub use repositories::{
    GroupLedger, GroupRepository, LedgerRepository, NewPayment, RecordedSettlement,
    RepositoryError, SettlementRepository, VersionedPlan,
};

use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use tally_shared::config::DatabaseConfig;

/// Establishes a connection to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    Database::connect(database_url).await
}

/// Establishes a pooled connection using the configured pool bounds.
///
/// In-memory SQLite databases are limited to a single connection.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect_with(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let in_memory = config.url.contains(":memory:") || config.url.contains("mode=memory");
    let max_connections = if in_memory { 1 } else { config.max_connections };

    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(max_connections)
        .min_connections(config.min_connections.min(max_connections))
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    Database::connect(options).await
}
