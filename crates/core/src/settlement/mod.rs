//! Settle-up: turning net balances into transfers and recording them.

pub mod entry;
pub mod resolver;
pub mod types;

#[cfg(test)]
mod resolver_props;

pub use entry::{IdempotencyKey, SettlementEntry, apply_transfers};
pub use resolver::SettlementResolver;
pub use types::{SettlementPlan, SettlementTransfer};
