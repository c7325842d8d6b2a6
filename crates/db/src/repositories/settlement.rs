//! Settlement repository: planning and recording settle-up transfers.
//!
//! Recording runs as one database transaction:
//! 1. Reject transfers whose idempotency key is already stored
//! 2. Reject if the ledger version moved since the plan was computed
//! 3. Re-resolve the current ledger and require every transfer in it
//! 4. Write one settlement transaction, payment, split and record per transfer
//! 5. Bump the ledger version with a compare-and-set
//!
//! Any failure rolls the whole batch back.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, SqlErr,
    TransactionTrait,
};
use serde::Serialize;
use tally_core::balance::BalanceScope;
use tally_core::settlement::{
    IdempotencyKey, SettlementEntry, SettlementPlan, SettlementResolver, SettlementTransfer,
};
use tally_shared::config::SettlementConfig;
use tally_shared::types::{GroupId, SettlementId, TransactionId};
use tracing::{info, warn};

use super::error::RepositoryError;
use super::group::{bump_version, current_version};
use super::ledger::{insert_transaction, load_transactions};
use crate::entities::settlement_records;

/// A settlement plan together with the ledger version it was computed from.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionedPlan {
    /// Ledger version the plan belongs to.
    pub ledger_version: i64,
    /// The plan.
    pub plan: SettlementPlan,
}

/// A transfer that was written to the ledger.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedSettlement {
    /// The settlement record ID.
    pub id: SettlementId,
    /// The ledger transaction written for the transfer.
    pub transaction_id: TransactionId,
    /// The recorded transfer.
    pub transfer: SettlementTransfer,
    /// Key that rejects resubmission inside the idempotency window.
    pub idempotency_key: IdempotencyKey,
}

/// Settlement repository.
#[derive(Debug, Clone)]
pub struct SettlementRepository {
    db: DatabaseConnection,
    resolver: SettlementResolver,
    idempotency_window_secs: u64,
}

impl SettlementRepository {
    /// Creates a new settlement repository.
    #[must_use]
    pub const fn new(
        db: DatabaseConnection,
        resolver: SettlementResolver,
        idempotency_window_secs: u64,
    ) -> Self {
        Self {
            db,
            resolver,
            idempotency_window_secs,
        }
    }

    /// Creates a settlement repository from configuration.
    #[must_use]
    pub fn from_config(db: DatabaseConnection, config: &SettlementConfig) -> Self {
        Self::new(
            db,
            SettlementResolver::with_tolerance(config.imbalance_tolerance()),
            config.idempotency_window_secs,
        )
    }

    /// Computes the settlement plan of a group at its current ledger version.
    ///
    /// # Errors
    ///
    /// Returns `GroupNotFound`, or `Ledger(..)` if the stored ledger is
    /// inconsistent or imbalanced.
    pub async fn plan(&self, group_id: GroupId) -> Result<VersionedPlan, RepositoryError> {
        let txn = self.db.begin().await?;
        let ledger_version = current_version(&txn, group_id).await?;
        let transactions = load_transactions(&txn, group_id).await?;
        txn.commit().await?;

        let plan = self
            .resolver
            .plan(&transactions, &BalanceScope::group(group_id))?;

        info!(
            %group_id,
            ledger_version,
            transfers = plan.transfers.len(),
            total = %plan.total_transferred(),
            "Settlement plan computed"
        );
        Ok(VersionedPlan {
            ledger_version,
            plan,
        })
    }

    /// Records `transfers` computed at `expected_version`.
    ///
    /// # Errors
    ///
    /// Returns `Duplicate` if a transfer was already recorded inside the
    /// idempotency window, `ConcurrencyConflict` if the ledger moved or a
    /// transfer is no longer part of the current plan, and `Ledger(..)` for
    /// malformed transfers.
    pub async fn record(
        &self,
        group_id: GroupId,
        expected_version: i64,
        transfers: &[SettlementTransfer],
        now: DateTime<Utc>,
    ) -> Result<Vec<RecordedSettlement>, RepositoryError> {
        if transfers.is_empty() {
            return Ok(Vec::new());
        }

        let keys: Vec<IdempotencyKey> = transfers
            .iter()
            .map(|t| IdempotencyKey::derive(group_id, t, now, self.idempotency_window_secs))
            .collect();
        let mut unique = HashSet::with_capacity(keys.len());
        if let Some(repeated) = keys.iter().find(|key| !unique.insert(*key)) {
            return Err(RepositoryError::Duplicate(repeated.to_string()));
        }

        let txn = self.db.begin().await?;

        let existing = settlement_records::Entity::find()
            .filter(
                settlement_records::Column::IdempotencyKey
                    .is_in(keys.iter().map(|k| k.as_str().to_string())),
            )
            .one(&txn)
            .await?;
        if let Some(record) = existing {
            warn!(%group_id, key = %record.idempotency_key, "Duplicate settlement submission");
            return Err(RepositoryError::Duplicate(record.idempotency_key));
        }

        let version = current_version(&txn, group_id).await?;
        if version != expected_version {
            warn!(%group_id, expected_version, version, "Settlement computed on a stale ledger");
            return Err(RepositoryError::ConcurrencyConflict {
                group_id,
                expected: expected_version,
            });
        }

        let transactions = load_transactions(&txn, group_id).await?;
        let fresh = self
            .resolver
            .plan(&transactions, &BalanceScope::group(group_id))?;
        if let Some(stale) = transfers.iter().find(|t| !fresh.contains(t)) {
            warn!(
                %group_id,
                from = %stale.from,
                to = %stale.to,
                amount = %stale.amount,
                "Transfer is not part of the current plan"
            );
            return Err(RepositoryError::ConcurrencyConflict {
                group_id,
                expected: expected_version,
            });
        }

        let date = now.date_naive();
        let mut recorded = Vec::with_capacity(transfers.len());
        for (transfer, key) in transfers.iter().zip(keys) {
            let entry = SettlementEntry::from_transfer(group_id, transfer, date)?;
            insert_transaction(&txn, group_id, &entry).await?;

            let id = SettlementId::new();
            settlement_records::ActiveModel {
                id: Set(id.into_inner()),
                group_id: Set(group_id.into_inner()),
                transaction_id: Set(entry.id.into_inner()),
                from_member_id: Set(transfer.from.into_inner()),
                to_member_id: Set(transfer.to.into_inner()),
                amount_cents: Set(transfer.amount.minor_units()),
                idempotency_key: Set(key.as_str().to_string()),
                created_at: Set(now),
            }
            .insert(&txn)
            .await
            .map_err(|err| match err.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => {
                    RepositoryError::Duplicate(key.to_string())
                }
                _ => RepositoryError::Database(err),
            })?;

            recorded.push(RecordedSettlement {
                id,
                transaction_id: entry.id,
                transfer: *transfer,
                idempotency_key: key,
            });
        }

        bump_version(&txn, group_id, expected_version).await?;
        txn.commit().await?;

        info!(
            %group_id,
            ledger_version = expected_version + 1,
            transfers = recorded.len(),
            "Settlement recorded"
        );
        Ok(recorded)
    }
}
