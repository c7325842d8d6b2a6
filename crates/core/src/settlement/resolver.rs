//! Greedy settlement resolution.
//!
//! Debtors are visited from the largest debt down, creditors from the
//! largest credit down, ties broken by member id. Each debtor drains the
//! current creditor until one side reaches zero, then the exhausted side
//! advances. The order is fixed so the same balances always produce the
//! same transfer list.

use tally_shared::types::{MemberId, Money};
use tracing::{debug, warn};

use super::types::{SettlementPlan, SettlementTransfer};
use crate::balance::{BalanceAggregator, BalanceScope, GroupBalances};
use crate::ledger::{LedgerError, LedgerTransaction};

/// Resolves net balances into peer-to-peer transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlementResolver {
    tolerance: Money,
}

impl Default for SettlementResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SettlementResolver {
    /// Creates a resolver that requires debt and credit to match exactly.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            tolerance: Money::ZERO,
        }
    }

    /// Creates a resolver accepting a debt/credit mismatch up to `tolerance`.
    ///
    /// Whatever is left inside the tolerance stays unsettled.
    #[must_use]
    pub const fn with_tolerance(tolerance: Money) -> Self {
        Self {
            tolerance: tolerance.abs(),
        }
    }

    /// The accepted debt/credit mismatch.
    #[must_use]
    pub const fn tolerance(&self) -> Money {
        self.tolerance
    }

    /// Resolve balances into an ordered transfer list.
    ///
    /// Members with a zero net are skipped. Every transfer is positive and
    /// goes from a debtor to a different creditor.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Imbalance` if total debt and total credit differ
    /// by more than the tolerance, or `LedgerError::InvalidAmount` if either
    /// total overflows.
    pub fn resolve(&self, balances: &GroupBalances) -> Result<Vec<SettlementTransfer>, LedgerError> {
        let mut debtors: Vec<(MemberId, Money)> =
            balances.debtors().map(|b| (b.member_id, -b.net())).collect();
        let mut creditors: Vec<(MemberId, Money)> =
            balances.creditors().map(|b| (b.member_id, b.net())).collect();

        let total_debt = Money::try_sum(debtors.iter().map(|(_, debt)| *debt))?;
        let total_credit = Money::try_sum(creditors.iter().map(|(_, credit)| *credit))?;

        if (total_credit - total_debt).abs() > self.tolerance {
            warn!(
                %total_debt,
                %total_credit,
                tolerance = %self.tolerance,
                "Refusing to resolve an imbalanced ledger"
            );
            return Err(LedgerError::Imbalance {
                total_debt,
                total_credit,
            });
        }

        // Largest debt first (most negative net), then member id.
        debtors.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        // Largest credit first, then member id.
        creditors.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        let mut transfers = Vec::with_capacity(debtors.len() + creditors.len());
        let mut current = 0;

        for (debtor, mut remaining_debt) in debtors {
            while remaining_debt.is_positive() {
                let Some((creditor, remaining_credit)) = creditors.get_mut(current) else {
                    break;
                };

                let amount = remaining_debt.min(*remaining_credit);
                transfers.push(SettlementTransfer {
                    from: debtor,
                    to: *creditor,
                    amount,
                });
                remaining_debt -= amount;
                *remaining_credit -= amount;

                if remaining_credit.is_zero() {
                    current += 1;
                }
            }
        }

        debug!(
            members = balances.len(),
            transfers = transfers.len(),
            %total_debt,
            "Resolved settlement transfers"
        );

        Ok(transfers)
    }

    /// Aggregate `transactions` in `scope` and resolve the result.
    ///
    /// Every transaction's splits are checked before aggregation.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::UnbalancedSplits` for inconsistent transactions
    /// and `LedgerError::Imbalance` if balances do not net to zero.
    pub fn plan(
        &self,
        transactions: &[LedgerTransaction],
        scope: &BalanceScope,
    ) -> Result<SettlementPlan, LedgerError> {
        let balances = BalanceAggregator::aggregate_checked(transactions, scope)?;
        let transfers = self.resolve(&balances)?;
        Ok(SettlementPlan {
            balances,
            transfers,
        })
    }
}
