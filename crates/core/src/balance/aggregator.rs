//! Balance aggregation over a transaction set.

use std::collections::BTreeMap;

use tally_shared::types::ActivityId;
use tracing::debug;

use super::types::{BalanceScope, GroupBalances};
use crate::ledger::{LedgerError, LedgerTransaction};

/// Stateless balance aggregator.
///
/// Summation happens in integer cents, so the result does not depend on the
/// order of `transactions`. Income and expense transactions contribute the
/// same way: splits add to owed, payments add to paid.
pub struct BalanceAggregator;

impl BalanceAggregator {
    /// Sum owed and paid amounts per member over the transactions in `scope`.
    ///
    /// Only members appearing in at least one included split or payment get
    /// an entry. Excluded splits are ignored.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidAmount` if a member's total leaves the
    /// minor-unit range.
    pub fn aggregate(
        transactions: &[LedgerTransaction],
        scope: &BalanceScope,
    ) -> Result<GroupBalances, LedgerError> {
        let mut balances = GroupBalances::default();
        let mut count = 0;
        for tx in transactions.iter().filter(|tx| scope.matches(tx)) {
            Self::accumulate(&mut balances, tx)?;
            count += 1;
        }

        debug!(transactions = count, members = balances.len(), "Balances aggregated");
        Ok(balances)
    }

    /// Like [`BalanceAggregator::aggregate`], but first checks that every
    /// transaction in scope has splits summing to its amount.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::UnbalancedSplits` for the first inconsistent
    /// transaction, or `LedgerError::InvalidAmount` on overflow.
    pub fn aggregate_checked(
        transactions: &[LedgerTransaction],
        scope: &BalanceScope,
    ) -> Result<GroupBalances, LedgerError> {
        let mut balances = GroupBalances::default();
        let mut count = 0;
        for tx in transactions.iter().filter(|tx| scope.matches(tx)) {
            tx.check_splits()?;
            Self::accumulate(&mut balances, tx)?;
            count += 1;
        }

        debug!(
            transactions = count,
            members = balances.len(),
            "Balances aggregated with split checks"
        );
        Ok(balances)
    }

    /// Aggregate separately per activity.
    ///
    /// Transactions without an activity are grouped under `None`.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidAmount` on overflow.
    pub fn aggregate_by_activity(
        transactions: &[LedgerTransaction],
        scope: &BalanceScope,
    ) -> Result<BTreeMap<Option<ActivityId>, GroupBalances>, LedgerError> {
        let mut grouped: BTreeMap<Option<ActivityId>, GroupBalances> = BTreeMap::new();
        for tx in transactions.iter().filter(|tx| scope.matches(tx)) {
            Self::accumulate(grouped.entry(tx.activity_id).or_default(), tx)?;
        }

        debug!(activities = grouped.len(), "Balances aggregated per activity");
        Ok(grouped)
    }

    fn accumulate(balances: &mut GroupBalances, tx: &LedgerTransaction) -> Result<(), LedgerError> {
        for split in tx.included_splits() {
            let balance = balances.entry(split.member_id);
            balance.total_owed = balance.total_owed.try_add(split.resolved_amount)?;
        }
        for payment in &tx.payments {
            let balance = balances.entry(payment.payer_id);
            balance.total_paid = balance.total_paid.try_add(payment.amount)?;
        }
        Ok(())
    }
}
