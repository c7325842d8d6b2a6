//! Ledger repository for transactions, splits and payments.
//!
//! Split amounts are always produced by the `SplitAllocator` before they are
//! written; rows are never patched in place.

use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use tally_core::ledger::{
    LedgerError, LedgerTransaction, Payment, PaymentMethod, Split, SplitType, TransactionInput,
    TransactionType,
};
use tally_core::split::{SplitAllocator, SplitRequest};
use tally_shared::types::{
    ActivityId, GroupId, MemberId, Money, PaymentId, SplitId, TransactionId,
};
use tracing::{debug, info};
use uuid::Uuid;

use super::error::RepositoryError;
use super::group::{bump_version, current_version};
use crate::entities::{ledger_transactions, members, payments, splits};

/// A group's transactions read together with the ledger version they belong to.
#[derive(Debug, Clone)]
pub struct GroupLedger {
    /// Version of the ledger at read time.
    pub ledger_version: i64,
    /// All transactions of the group.
    pub transactions: Vec<LedgerTransaction>,
}

/// A payment to add to an existing transaction.
#[derive(Debug, Clone)]
pub struct NewPayment {
    /// The paying member.
    pub payer_id: MemberId,
    /// Amount paid.
    pub amount: Money,
    /// Payment method.
    pub method: PaymentMethod,
    /// Optional note.
    pub note: Option<String>,
}

/// Ledger repository for transaction operations.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    db: DatabaseConnection,
}

impl LedgerRepository {
    /// Creates a new ledger repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Reads a group's ledger version and transactions in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `GroupNotFound` if the group does not exist.
    pub async fn load_group_ledger(&self, group_id: GroupId) -> Result<GroupLedger, RepositoryError> {
        let txn = self.db.begin().await?;
        let ledger_version = current_version(&txn, group_id).await?;
        let transactions = load_transactions(&txn, group_id).await?;
        txn.commit().await?;

        debug!(%group_id, ledger_version, count = transactions.len(), "Ledger loaded");
        Ok(GroupLedger {
            ledger_version,
            transactions,
        })
    }

    /// Allocates and stores a new transaction with its splits and payments.
    ///
    /// The input's group is replaced by `group_id`. Nothing is written if any
    /// validation fails.
    ///
    /// # Errors
    ///
    /// Returns `Ledger(..)` for validation errors, `MemberNotFound` if a split
    /// or payment names a member outside the group, and `ConcurrencyConflict`
    /// if the ledger moved during the write.
    pub async fn create_transaction(
        &self,
        group_id: GroupId,
        input: &TransactionInput,
    ) -> Result<LedgerTransaction, RepositoryError> {
        let mut transaction = input.resolve()?;
        transaction.group_id = Some(group_id);

        let txn = self.db.begin().await?;
        let version = current_version(&txn, group_id).await?;

        let referenced = transaction
            .splits
            .iter()
            .map(|s| s.member_id)
            .chain(transaction.payments.iter().map(|p| p.payer_id));
        ensure_members(&txn, group_id, referenced).await?;

        insert_transaction(&txn, group_id, &transaction).await?;
        bump_version(&txn, group_id, version).await?;
        txn.commit().await?;

        info!(
            %group_id,
            transaction_id = %transaction.id,
            amount = %transaction.amount,
            "Transaction created"
        );
        Ok(transaction)
    }

    /// Replaces every split of a transaction with a fresh allocation.
    ///
    /// # Errors
    ///
    /// Returns `TransactionNotFound`, `Ledger(..)` for validation errors,
    /// `MemberNotFound`, or `ConcurrencyConflict`.
    pub async fn resplit_transaction(
        &self,
        transaction_id: TransactionId,
        policy: SplitType,
        requests: &[SplitRequest],
    ) -> Result<Vec<Split>, RepositoryError> {
        let txn = self.db.begin().await?;
        let header = find_header(&txn, transaction_id).await?;
        let group_id = GroupId::from_uuid(header.group_id);
        let version = current_version(&txn, group_id).await?;

        let replacement = SplitAllocator::resplit(
            transaction_id,
            Money::from_minor(header.amount_cents),
            policy,
            requests,
        )?;
        ensure_members(&txn, group_id, replacement.iter().map(|s| s.member_id)).await?;

        splits::Entity::delete_many()
            .filter(splits::Column::TransactionId.eq(transaction_id.into_inner()))
            .exec(&txn)
            .await?;
        insert_splits(&txn, &replacement).await?;

        bump_version(&txn, group_id, version).await?;
        txn.commit().await?;

        info!(%group_id, %transaction_id, policy = %policy, "Transaction re-split");
        Ok(replacement)
    }

    /// Records a payment against an existing transaction.
    ///
    /// # Errors
    ///
    /// Returns `Ledger(NonPositivePayment)` for a zero or negative amount,
    /// `TransactionNotFound`, `MemberNotFound`, or `ConcurrencyConflict`.
    pub async fn add_payment(
        &self,
        transaction_id: TransactionId,
        payment: NewPayment,
    ) -> Result<Payment, RepositoryError> {
        if !payment.amount.is_positive() {
            return Err(LedgerError::NonPositivePayment {
                payer_id: payment.payer_id,
                amount: payment.amount,
            }
            .into());
        }

        let txn = self.db.begin().await?;
        let header = find_header(&txn, transaction_id).await?;
        let group_id = GroupId::from_uuid(header.group_id);
        let version = current_version(&txn, group_id).await?;
        ensure_members(&txn, group_id, std::iter::once(payment.payer_id)).await?;

        let payment = Payment {
            transaction_id,
            payer_id: payment.payer_id,
            amount: payment.amount,
            method: payment.method,
            note: payment.note,
        };
        insert_payment(&txn, &payment).await?;

        bump_version(&txn, group_id, version).await?;
        txn.commit().await?;

        info!(%group_id, %transaction_id, amount = %payment.amount, "Payment added");
        Ok(payment)
    }
}

/// Loads every transaction of a group with its splits and payments.
///
/// Transactions come back by date, then creation time; splits keep their
/// stored order.
pub(crate) async fn load_transactions<C: ConnectionTrait>(
    conn: &C,
    group_id: GroupId,
) -> Result<Vec<LedgerTransaction>, RepositoryError> {
    let headers = ledger_transactions::Entity::find()
        .filter(ledger_transactions::Column::GroupId.eq(group_id.into_inner()))
        .order_by_asc(ledger_transactions::Column::TransactionDate)
        .order_by_asc(ledger_transactions::Column::CreatedAt)
        .order_by_asc(ledger_transactions::Column::Id)
        .all(conn)
        .await?;

    if headers.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<Uuid> = headers.iter().map(|h| h.id).collect();

    let mut splits_by_tx: HashMap<Uuid, Vec<Split>> = HashMap::new();
    let split_rows = splits::Entity::find()
        .filter(splits::Column::TransactionId.is_in(ids.clone()))
        .order_by_asc(splits::Column::TransactionId)
        .order_by_asc(splits::Column::Position)
        .all(conn)
        .await?;
    for row in split_rows {
        splits_by_tx
            .entry(row.transaction_id)
            .or_default()
            .push(split_from_row(row)?);
    }

    let mut payments_by_tx: HashMap<Uuid, Vec<Payment>> = HashMap::new();
    let payment_rows = payments::Entity::find()
        .filter(payments::Column::TransactionId.is_in(ids))
        .order_by_asc(payments::Column::CreatedAt)
        .order_by_asc(payments::Column::Id)
        .all(conn)
        .await?;
    for row in payment_rows {
        payments_by_tx
            .entry(row.transaction_id)
            .or_default()
            .push(payment_from_row(row)?);
    }

    headers
        .into_iter()
        .map(|header| {
            let splits = splits_by_tx.remove(&header.id).unwrap_or_default();
            let payments = payments_by_tx.remove(&header.id).unwrap_or_default();
            transaction_from_row(header, splits, payments)
        })
        .collect()
}

/// Inserts a transaction header with its splits and payments.
pub(crate) async fn insert_transaction<C: ConnectionTrait>(
    conn: &C,
    group_id: GroupId,
    transaction: &LedgerTransaction,
) -> Result<(), RepositoryError> {
    ledger_transactions::ActiveModel {
        id: Set(transaction.id.into_inner()),
        group_id: Set(group_id.into_inner()),
        activity_id: Set(transaction.activity_id.map(ActivityId::into_inner)),
        transaction_type: Set(transaction.transaction_type.as_str().to_string()),
        amount_cents: Set(transaction.amount.minor_units()),
        transaction_date: Set(transaction.date),
        description: Set(transaction.description.clone()),
        is_settlement: Set(transaction.is_settlement),
        created_at: Set(Utc::now()),
    }
    .insert(conn)
    .await?;

    insert_splits(conn, &transaction.splits).await?;
    for payment in &transaction.payments {
        insert_payment(conn, payment).await?;
    }
    Ok(())
}

async fn insert_splits<C: ConnectionTrait>(conn: &C, rows: &[Split]) -> Result<(), RepositoryError> {
    for (position, split) in (0i32..).zip(rows) {
        splits::ActiveModel {
            id: Set(SplitId::new().into_inner()),
            transaction_id: Set(split.transaction_id.into_inner()),
            member_id: Set(split.member_id.into_inner()),
            position: Set(position),
            split_type: Set(split.split_type.as_str().to_string()),
            split_value: Set(split.split_value.map(|v| v.to_string())),
            resolved_cents: Set(split.resolved_amount.minor_units()),
            is_included: Set(split.is_included),
        }
        .insert(conn)
        .await?;
    }
    Ok(())
}

async fn insert_payment<C: ConnectionTrait>(conn: &C, payment: &Payment) -> Result<(), RepositoryError> {
    payments::ActiveModel {
        id: Set(PaymentId::new().into_inner()),
        transaction_id: Set(payment.transaction_id.into_inner()),
        payer_id: Set(payment.payer_id.into_inner()),
        amount_cents: Set(payment.amount.minor_units()),
        method: Set(payment.method.as_str().to_string()),
        note: Set(payment.note.clone()),
        created_at: Set(Utc::now()),
    }
    .insert(conn)
    .await?;
    Ok(())
}

async fn find_header<C: ConnectionTrait>(
    conn: &C,
    transaction_id: TransactionId,
) -> Result<ledger_transactions::Model, RepositoryError> {
    ledger_transactions::Entity::find_by_id(transaction_id.into_inner())
        .one(conn)
        .await?
        .ok_or(RepositoryError::TransactionNotFound(transaction_id))
}

/// Checks that every referenced member belongs to the group.
async fn ensure_members<C: ConnectionTrait>(
    conn: &C,
    group_id: GroupId,
    referenced: impl Iterator<Item = MemberId>,
) -> Result<(), RepositoryError> {
    let referenced: Vec<MemberId> = referenced.collect::<HashSet<_>>().into_iter().collect();
    if referenced.is_empty() {
        return Ok(());
    }

    let known: HashSet<Uuid> = members::Entity::find()
        .filter(members::Column::GroupId.eq(group_id.into_inner()))
        .filter(members::Column::Id.is_in(referenced.iter().map(|m| m.into_inner())))
        .all(conn)
        .await?
        .into_iter()
        .map(|m| m.id)
        .collect();

    match referenced.into_iter().find(|m| !known.contains(&m.into_inner())) {
        Some(missing) => Err(RepositoryError::MemberNotFound(missing)),
        None => Ok(()),
    }
}

fn transaction_from_row(
    row: ledger_transactions::Model,
    splits: Vec<Split>,
    payments: Vec<Payment>,
) -> Result<LedgerTransaction, RepositoryError> {
    Ok(LedgerTransaction {
        id: TransactionId::from_uuid(row.id),
        group_id: Some(GroupId::from_uuid(row.group_id)),
        activity_id: row.activity_id.map(ActivityId::from_uuid),
        transaction_type: TransactionType::from_str(&row.transaction_type)
            .map_err(RepositoryError::Corrupted)?,
        amount: Money::from_minor(row.amount_cents),
        date: row.transaction_date,
        description: row.description,
        is_settlement: row.is_settlement,
        splits,
        payments,
    })
}

fn split_from_row(row: splits::Model) -> Result<Split, RepositoryError> {
    let split_value = row
        .split_value
        .as_deref()
        .map(Decimal::from_str)
        .transpose()
        .map_err(|e| RepositoryError::Corrupted(format!("split {}: {e}", row.id)))?;

    Ok(Split {
        transaction_id: TransactionId::from_uuid(row.transaction_id),
        member_id: MemberId::from_uuid(row.member_id),
        split_type: SplitType::from_str(&row.split_type).map_err(RepositoryError::Corrupted)?,
        split_value,
        resolved_amount: Money::from_minor(row.resolved_cents),
        is_included: row.is_included,
    })
}

fn payment_from_row(row: payments::Model) -> Result<Payment, RepositoryError> {
    Ok(Payment {
        transaction_id: TransactionId::from_uuid(row.transaction_id),
        payer_id: MemberId::from_uuid(row.payer_id),
        amount: Money::from_minor(row.amount_cents),
        method: PaymentMethod::from_str(&row.method).map_err(RepositoryError::Corrupted)?,
        note: row.note,
    })
}
