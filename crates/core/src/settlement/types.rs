//! Settlement types.

use serde::{Deserialize, Serialize};
use tally_shared::types::{MemberId, Money};

use crate::balance::GroupBalances;

/// A payment from a debtor to a creditor that cancels part of both balances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementTransfer {
    /// The paying debtor.
    pub from: MemberId,
    /// The receiving creditor.
    pub to: MemberId,
    /// Amount transferred, always positive.
    pub amount: Money,
}

/// Balances and the transfers that settle them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementPlan {
    /// Balances the plan was resolved from.
    pub balances: GroupBalances,
    /// Transfers in resolution order.
    pub transfers: Vec<SettlementTransfer>,
}

impl SettlementPlan {
    /// Sum of all transfer amounts.
    #[must_use]
    pub fn total_transferred(&self) -> Money {
        self.transfers.iter().map(|t| t.amount).sum()
    }

    /// Returns true if nothing needs to be transferred.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.transfers.is_empty()
    }

    /// Returns true if the plan contains this exact transfer.
    #[must_use]
    pub fn contains(&self, transfer: &SettlementTransfer) -> bool {
        self.transfers.contains(transfer)
    }
}
