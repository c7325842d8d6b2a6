//! Ledger error types for validation and consistency errors.
//!
//! Validation errors are raised before anything is persisted and are never
//! partially applied. Consistency errors (`UnbalancedSplits`, `Imbalance`)
//! indicate corrupted input and are surfaced as hard failures.

use rust_decimal::Decimal;
use tally_shared::AppError;
use tally_shared::types::{MemberId, Money, MoneyError, TransactionId};
use thiserror::Error;

use super::types::SplitType;

/// Errors that can occur in the ledger engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// No included participant to split over.
    #[error("Split must have at least one included participant")]
    NoParticipants,

    /// Transaction amount must be strictly positive.
    #[error("Transaction amount must be positive, got {0}")]
    NonPositiveAmount(Money),

    /// Payment amount must be strictly positive.
    #[error("Payment by member {payer_id} must be positive, got {amount}")]
    NonPositivePayment {
        /// The paying member.
        payer_id: MemberId,
        /// The offending amount.
        amount: Money,
    },

    /// The same member appears more than once in a split.
    #[error("Member {0} appears more than once in the split")]
    DuplicateParticipant(MemberId),

    /// A percentage or fixed split is missing its value.
    #[error("Member {member_id} has no split value for a {split_type} split")]
    MissingSplitValue {
        /// The member without a value.
        member_id: MemberId,
        /// The policy that requires the value.
        split_type: SplitType,
    },

    /// Split values must not be negative.
    #[error("Member {member_id} has a negative split value {value}")]
    NegativeSplitValue {
        /// The member with the negative value.
        member_id: MemberId,
        /// The offending value.
        value: Decimal,
    },

    /// Percentages do not add up to 100.
    #[error("Percentages must sum to 100, got {total}")]
    PercentagesNotHundred {
        /// Sum of the supplied percentages.
        total: Decimal,
    },

    /// Fixed amounts do not add up to the transaction amount.
    #[error("Fixed amounts sum to {actual}, expected {expected}")]
    FixedAmountsMismatch {
        /// The transaction amount.
        expected: Money,
        /// Sum of the supplied fixed amounts.
        actual: Money,
    },

    /// An amount could not be represented in minor units.
    #[error("Invalid amount: {0}")]
    InvalidAmount(#[from] MoneyError),

    /// Included splits of one transaction use different policies.
    #[error("Transaction {0} mixes split types across included splits")]
    MixedSplitTypes(TransactionId),

    /// A settlement transfer must move money between two distinct members.
    #[error("Settlement transfer must be between two distinct members")]
    SelfTransfer(MemberId),

    /// A member cannot be removed while ledger rows reference it.
    #[error("Member {member_id} is referenced by {transactions} transaction(s)")]
    MemberReferenced {
        /// The member that was to be removed.
        member_id: MemberId,
        /// Number of transactions referencing the member.
        transactions: usize,
    },

    // ========== Consistency Errors ==========
    /// A stored transaction's included splits do not sum to its amount.
    #[error("Splits of transaction {transaction_id} sum to {actual}, expected {expected}")]
    UnbalancedSplits {
        /// The inconsistent transaction.
        transaction_id: TransactionId,
        /// The transaction amount.
        expected: Money,
        /// Sum of the included resolved amounts.
        actual: Money,
    },

    /// Total debt does not equal total credit.
    #[error("Ledger is not balanced. Debt: {total_debt}, Credit: {total_credit}")]
    Imbalance {
        /// Sum of `|net|` over debtors.
        total_debt: Money,
        /// Sum of `net` over creditors.
        total_credit: Money,
    },
}

impl LedgerError {
    /// Returns true for errors in the validation family.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        !self.is_imbalance()
    }

    /// Returns true for errors that indicate inconsistent ledger data.
    #[must_use]
    pub const fn is_imbalance(&self) -> bool {
        matches!(self, Self::UnbalancedSplits { .. } | Self::Imbalance { .. })
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        if err.is_imbalance() {
            Self::Imbalance(err.to_string())
        } else {
            Self::Validation(err.to_string())
        }
    }
}
