//! Per-member balances.
//!
//! Balances are derived on demand from a transaction set and never stored.

pub mod aggregator;
pub mod types;

#[cfg(test)]
mod aggregator_props;

pub use aggregator::BalanceAggregator;
pub use types::{Balance, BalanceScope, GroupBalances};
