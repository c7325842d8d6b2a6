//! Core ledger engine for Tally.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Every function operates on already-fetched data and performs no I/O.
//!
//! # Modules
//!
//! - `ledger` - Transactions, splits, payments and their validation
//! - `split` - Allocating a transaction amount across members
//! - `balance` - Aggregating per-member owed/paid/net balances
//! - `settlement` - Resolving balances into transfers and recording them

pub mod balance;
pub mod ledger;
pub mod settlement;
pub mod split;
