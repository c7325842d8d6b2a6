//! `SeaORM` entity definitions.
//!
//! Amounts are stored as integer cents (`*_cents BIGINT`); enums are stored
//! as their upper-case string form.

pub mod groups;
pub mod ledger_transactions;
pub mod members;
pub mod payments;
pub mod settlement_records;
pub mod splits;
