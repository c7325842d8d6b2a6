//! Property-based tests for settlement resolution.
//!
//! Properties: transfers conserve the total debt, are positive, never pay
//! oneself, are deterministic, and settle every balance when recorded.

use chrono::NaiveDate;
use proptest::prelude::*;
use tally_shared::types::{GroupId, MemberId, Money};
use uuid::Uuid;

use super::entry::apply_transfers;
use super::resolver::SettlementResolver;
use crate::balance::{Balance, BalanceAggregator, BalanceScope, GroupBalances};

/// Strategy to generate nets in cents that sum to zero.
///
/// The last member absorbs the negated sum of the others.
fn zero_sum_nets() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(-500_000i64..500_000i64, 1..12).prop_map(|mut nets| {
        let sum: i64 = nets.iter().sum();
        nets.push(-sum);
        nets
    })
}

fn balances_from(nets: &[i64]) -> GroupBalances {
    nets.iter()
        .enumerate()
        .map(|(n, &net)| {
            let mut balance = Balance::new(MemberId::from_uuid(Uuid::from_u128(n as u128 + 1)));
            if net >= 0 {
                balance.total_paid = Money::from_minor(net);
            } else {
                balance.total_owed = Money::from_minor(-net);
            }
            balance
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Sum of transfers equals total debt and total credit.
    #[test]
    fn prop_resolver_conserves_debt(nets in zero_sum_nets()) {
        let balances = balances_from(&nets);
        let transfers = SettlementResolver::new().resolve(&balances).unwrap();

        let transferred: Money = transfers.iter().map(|t| t.amount).sum();
        let debt: Money = balances.debtors().map(|b| -b.net()).sum();
        let credit: Money = balances.creditors().map(Balance::net).sum();

        prop_assert_eq!(transferred, debt);
        prop_assert_eq!(transferred, credit);
    }

    /// Every transfer is positive and goes from a debtor to a creditor.
    #[test]
    fn prop_transfers_well_formed(nets in zero_sum_nets()) {
        let balances = balances_from(&nets);
        let transfers = SettlementResolver::new().resolve(&balances).unwrap();

        for transfer in &transfers {
            prop_assert!(transfer.amount.is_positive());
            prop_assert_ne!(transfer.from, transfer.to);
            prop_assert!(balances.get(&transfer.from).is_some_and(Balance::is_debtor));
            prop_assert!(balances.get(&transfer.to).is_some_and(Balance::is_creditor));
        }
    }

    /// Resolving twice yields the identical list.
    #[test]
    fn prop_resolver_deterministic(nets in zero_sum_nets()) {
        let balances = balances_from(&nets);
        let resolver = SettlementResolver::new();
        prop_assert_eq!(
            resolver.resolve(&balances).unwrap(),
            resolver.resolve(&balances.clone()).unwrap()
        );
    }

    /// Recording the resolved transfers brings every net to zero.
    #[test]
    fn prop_recording_settles_everyone(nets in zero_sum_nets()) {
        let balances = balances_from(&nets);
        let transfers = SettlementResolver::new().resolve(&balances).unwrap();

        let date = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let entries = apply_transfers(&[], GroupId::new(), &transfers, date).unwrap();
        let movement = BalanceAggregator::aggregate(&entries, &BalanceScope::all()).unwrap();

        for balance in balances.iter() {
            prop_assert_eq!(balance.net() + movement.net_of(&balance.member_id), Money::ZERO);
        }
    }

    /// A non-zero total is always rejected by an exact resolver.
    #[test]
    fn prop_imbalance_rejected(nets in zero_sum_nets(), skew in prop_oneof![-1_000i64..0, 1i64..1_000]) {
        let mut nets = nets;
        nets.push(skew);
        let balances = balances_from(&nets);
        prop_assert!(SettlementResolver::new().resolve(&balances).is_err());
    }
}
