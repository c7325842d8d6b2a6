//! Serde form of a group's ledger.
//!
//! A snapshot is the read-only view the surrounding application hands to the
//! engine. Split amounts are never trusted from the input: every transaction
//! is re-allocated through the [`SplitAllocator`].

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::{ActivityId, GroupId, MemberId, Money, TransactionId};

use super::error::LedgerError;
use super::types::{LedgerTransaction, Payment, PaymentMethod, SplitType, TransactionType};
use crate::split::{SplitAllocator, SplitRequest};

/// A group's ledger as supplied by the persistence layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSnapshot {
    /// The transactions, in any order.
    pub transactions: Vec<TransactionInput>,
}

/// A transaction in snapshot form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionInput {
    /// The transaction ID.
    pub id: TransactionId,
    /// Authoritative total.
    pub amount: Money,
    /// The owning group, if any.
    #[serde(default)]
    pub group_id: Option<GroupId>,
    /// The activity, if any.
    #[serde(default)]
    pub activity_id: Option<ActivityId>,
    /// Expense or income.
    #[serde(default, rename = "type")]
    pub transaction_type: TransactionType,
    /// Transaction date; the epoch date when absent.
    #[serde(default)]
    pub date: Option<NaiveDate>,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Requested split rows.
    pub splits: Vec<SplitInput>,
    /// Payments against the transaction.
    #[serde(default)]
    pub payments: Vec<PaymentInput>,
}

/// A split row in snapshot form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitInput {
    /// The member.
    pub member_id: MemberId,
    /// The split policy.
    pub split_type: SplitType,
    /// Percentage or fixed amount.
    #[serde(default)]
    pub split_value: Option<Decimal>,
    /// Whether the member takes part.
    #[serde(default = "default_included")]
    pub is_included: bool,
}

const fn default_included() -> bool {
    true
}

/// A payment in snapshot form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInput {
    /// The paying member.
    pub payer_id: MemberId,
    /// Amount paid.
    pub amount: Money,
    /// Payment method.
    #[serde(default)]
    pub method: PaymentMethod,
    /// Optional note.
    #[serde(default)]
    pub note: Option<String>,
}

impl LedgerSnapshot {
    /// Validate and allocate every transaction.
    ///
    /// # Errors
    ///
    /// Returns the first validation error encountered.
    pub fn resolve(&self) -> Result<Vec<LedgerTransaction>, LedgerError> {
        self.transactions.iter().map(TransactionInput::resolve).collect()
    }
}

impl TransactionInput {
    /// Allocate the splits and validate the payments of this transaction.
    ///
    /// # Errors
    ///
    /// Returns `MixedSplitTypes` if included splits disagree on the policy,
    /// `NonPositivePayment` for a zero or negative payment, and any error of
    /// [`SplitAllocator::resplit`].
    pub fn resolve(&self) -> Result<LedgerTransaction, LedgerError> {
        let policy = self.policy()?;

        let requests: Vec<SplitRequest> = self
            .splits
            .iter()
            .map(|s| SplitRequest {
                member_id: s.member_id,
                split_value: s.split_value,
                is_included: s.is_included,
            })
            .collect();
        let splits = SplitAllocator::resplit(self.id, self.amount, policy, &requests)?;

        let payments = self
            .payments
            .iter()
            .map(|p| {
                if !p.amount.is_positive() {
                    return Err(LedgerError::NonPositivePayment {
                        payer_id: p.payer_id,
                        amount: p.amount,
                    });
                }
                Ok(Payment {
                    transaction_id: self.id,
                    payer_id: p.payer_id,
                    amount: p.amount,
                    method: p.method,
                    note: p.note.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(LedgerTransaction {
            id: self.id,
            group_id: self.group_id,
            activity_id: self.activity_id,
            transaction_type: self.transaction_type,
            amount: self.amount,
            date: self.date.unwrap_or_default(),
            description: self.description.clone(),
            is_settlement: false,
            splits,
            payments,
        })
    }

    // Without included rows the policy is irrelevant: allocation rejects the
    // empty participant list.
    fn policy(&self) -> Result<SplitType, LedgerError> {
        let mut included = self.splits.iter().filter(|s| s.is_included);
        let Some(first) = included.next() else {
            return Ok(SplitType::Equal);
        };
        if included.any(|s| s.split_type != first.split_type) {
            return Err(LedgerError::MixedSplitTypes(self.id));
        }
        Ok(first.split_type)
    }
}
