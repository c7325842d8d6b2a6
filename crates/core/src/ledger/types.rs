//! Ledger domain types.
//!
//! A group's ledger is a set of transactions. Each transaction carries the
//! splits that attribute its amount to members and the payments that record
//! who actually paid.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::{ActivityId, GroupId, MemberId, Money, TransactionId, UserId};

use super::error::LedgerError;

/// Transaction type classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    /// Money spent on behalf of the group.
    #[default]
    Expense,
    /// Money received on behalf of the group.
    Income,
}

impl TransactionType {
    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Expense => "EXPENSE",
            Self::Income => "INCOME",
        }
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "EXPENSE" => Ok(Self::Expense),
            "INCOME" => Ok(Self::Income),
            _ => Err(format!("Unknown transaction type: {s}")),
        }
    }
}

/// Split policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SplitType {
    /// Even division across included members.
    Equal,
    /// Each member pays a percentage of the amount.
    Percentage,
    /// Each member pays an explicit amount.
    Fixed,
}

impl SplitType {
    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Equal => "EQUAL",
            Self::Percentage => "PERCENTAGE",
            Self::Fixed => "FIXED",
        }
    }
}

impl std::fmt::Display for SplitType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SplitType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "EQUAL" => Ok(Self::Equal),
            "PERCENTAGE" => Ok(Self::Percentage),
            "FIXED" => Ok(Self::Fixed),
            _ => Err(format!("Unknown split type: {s}")),
        }
    }
}

/// How a payment was made.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    /// Cash.
    #[default]
    Cash,
    /// Bank transfer.
    BankTransfer,
    /// Card payment.
    Card,
    /// Anything else.
    Other,
    /// A recorded settlement transfer.
    Settlement,
}

impl PaymentMethod {
    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "CASH",
            Self::BankTransfer => "BANK_TRANSFER",
            Self::Card => "CARD",
            Self::Other => "OTHER",
            Self::Settlement => "SETTLEMENT",
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "CASH" => Ok(Self::Cash),
            "BANK_TRANSFER" => Ok(Self::BankTransfer),
            "CARD" => Ok(Self::Card),
            "OTHER" => Ok(Self::Other),
            "SETTLEMENT" => Ok(Self::Settlement),
            _ => Err(format!("Unknown payment method: {s}")),
        }
    }
}

/// A member of a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    /// The member ID.
    pub id: MemberId,
    /// The owning group.
    pub group_id: GroupId,
    /// Display name.
    pub name: String,
    /// Optional link to a system user account.
    pub user_id: Option<UserId>,
}

/// One member's share of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Split {
    /// The transaction this split belongs to.
    pub transaction_id: TransactionId,
    /// The member the share is assigned to.
    pub member_id: MemberId,
    /// The policy that produced the share.
    pub split_type: SplitType,
    /// Percentage or fixed amount, depending on `split_type`.
    pub split_value: Option<Decimal>,
    /// The allocated share.
    pub resolved_amount: Money,
    /// Whether the member participates in the split.
    pub is_included: bool,
}

/// An actual payment discharging part of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    /// The transaction being paid.
    pub transaction_id: TransactionId,
    /// The member who paid.
    pub payer_id: MemberId,
    /// Amount paid.
    pub amount: Money,
    /// Payment method.
    pub method: PaymentMethod,
    /// Optional note.
    pub note: Option<String>,
}

/// A ledger transaction with its splits and payments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerTransaction {
    /// The transaction ID.
    pub id: TransactionId,
    /// The owning group, if any.
    pub group_id: Option<GroupId>,
    /// The activity this transaction belongs to, if any.
    pub activity_id: Option<ActivityId>,
    /// Expense or income.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// Authoritative total that included splits must sum to.
    pub amount: Money,
    /// Transaction date.
    pub date: NaiveDate,
    /// Free-form description.
    pub description: String,
    /// True if this transaction records a settlement transfer.
    pub is_settlement: bool,
    /// Member shares.
    pub splits: Vec<Split>,
    /// Payments made against the transaction.
    pub payments: Vec<Payment>,
}

impl LedgerTransaction {
    /// Iterates over the included splits.
    pub fn included_splits(&self) -> impl Iterator<Item = &Split> {
        self.splits.iter().filter(|s| s.is_included)
    }

    /// Sum of the included resolved amounts.
    #[must_use]
    pub fn total_allocated(&self) -> Money {
        self.included_splits().map(|s| s.resolved_amount).sum()
    }

    /// Sum of all payments.
    #[must_use]
    pub fn total_paid(&self) -> Money {
        self.payments.iter().map(|p| p.amount).sum()
    }

    /// Returns true if any split or payment references the member.
    #[must_use]
    pub fn references_member(&self, member_id: MemberId) -> bool {
        self.splits.iter().any(|s| s.member_id == member_id)
            || self.payments.iter().any(|p| p.payer_id == member_id)
    }

    /// Checks that the included splits sum exactly to the amount.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::UnbalancedSplits` if they do not, or
    /// `LedgerError::InvalidAmount` if their sum overflows.
    pub fn check_splits(&self) -> Result<(), LedgerError> {
        let actual = Money::try_sum(self.included_splits().map(|s| s.resolved_amount))?;
        if actual != self.amount {
            return Err(LedgerError::UnbalancedSplits {
                transaction_id: self.id,
                expected: self.amount,
                actual,
            });
        }
        Ok(())
    }
}
