//! Shared-expense ledger.
//!
//! This module holds the ledger's domain model:
//! - Transactions with their splits and payments
//! - Error types for ledger operations
//! - The serde snapshot form of a group's ledger
//! - Member removal guard

pub mod error;
pub mod member;
pub mod snapshot;
pub mod types;

pub use error::LedgerError;
pub use member::ensure_member_removable;
pub use snapshot::{LedgerSnapshot, PaymentInput, SplitInput, TransactionInput};
pub use types::{
    LedgerTransaction, Member, Payment, PaymentMethod, Split, SplitType, TransactionType,
};
