//! Recording settlement transfers as ledger entries.
//!
//! A recorded transfer becomes an ordinary transaction: the debtor pays the
//! full amount and the creditor owes it through a single FIXED split, so the
//! entry moves both balances toward zero on the next aggregation.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tally_shared::types::{GroupId, TransactionId};

use super::types::SettlementTransfer;
use crate::ledger::{
    LedgerError, LedgerTransaction, Payment, PaymentMethod, Split, SplitType, TransactionType,
};

/// Builds settlement transactions.
pub struct SettlementEntry;

impl SettlementEntry {
    /// Build the ledger transaction recording `transfer` in `group_id`.
    ///
    /// # Errors
    ///
    /// Returns `SelfTransfer` if `from` and `to` are the same member and
    /// `NonPositiveAmount` if the amount is not positive.
    pub fn from_transfer(
        group_id: GroupId,
        transfer: &SettlementTransfer,
        date: NaiveDate,
    ) -> Result<LedgerTransaction, LedgerError> {
        if transfer.from == transfer.to {
            return Err(LedgerError::SelfTransfer(transfer.from));
        }
        if !transfer.amount.is_positive() {
            return Err(LedgerError::NonPositiveAmount(transfer.amount));
        }

        let id = TransactionId::new();
        Ok(LedgerTransaction {
            id,
            group_id: Some(group_id),
            activity_id: None,
            transaction_type: TransactionType::Expense,
            amount: transfer.amount,
            date,
            description: format!("Settlement from {} to {}", transfer.from, transfer.to),
            is_settlement: true,
            splits: vec![Split {
                transaction_id: id,
                member_id: transfer.to,
                split_type: SplitType::Fixed,
                split_value: Some(transfer.amount.to_decimal()),
                resolved_amount: transfer.amount,
                is_included: true,
            }],
            payments: vec![Payment {
                transaction_id: id,
                payer_id: transfer.from,
                amount: transfer.amount,
                method: PaymentMethod::Settlement,
                note: None,
            }],
        })
    }
}

/// Append settlement entries for `transfers` to a copy of `transactions`.
///
/// # Errors
///
/// Same as [`SettlementEntry::from_transfer`]. Nothing is returned on error.
pub fn apply_transfers(
    transactions: &[LedgerTransaction],
    group_id: GroupId,
    transfers: &[SettlementTransfer],
    date: NaiveDate,
) -> Result<Vec<LedgerTransaction>, LedgerError> {
    let mut ledger = Vec::with_capacity(transactions.len() + transfers.len());
    ledger.extend_from_slice(transactions);
    for transfer in transfers {
        ledger.push(SettlementEntry::from_transfer(group_id, transfer, date)?);
    }
    Ok(ledger)
}

/// Token identifying a settlement submission.
///
/// Two submissions of the same transfer for the same group inside one time
/// window share a key, so the second one can be rejected as a duplicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Derive the key for `transfer` submitted at `at`.
    ///
    /// The key is the hex SHA-256 of `group|from|to|amount_cents|bucket`,
    /// where `bucket` is the unix time divided by `window_secs`. A zero
    /// window is treated as one second.
    #[must_use]
    pub fn derive(
        group_id: GroupId,
        transfer: &SettlementTransfer,
        at: DateTime<Utc>,
        window_secs: u64,
    ) -> Self {
        let window = i64::try_from(window_secs.max(1)).unwrap_or(i64::MAX);
        let bucket = at.timestamp().div_euclid(window);

        let mut hasher = Sha256::new();
        hasher.update(
            format!(
                "{group_id}|{}|{}|{}|{bucket}",
                transfer.from,
                transfer.to,
                transfer.amount.minor_units()
            )
            .as_bytes(),
        );
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Wraps a stored key.
    #[must_use]
    pub const fn from_stored(key: String) -> Self {
        Self(key)
    }

    /// The hex digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
