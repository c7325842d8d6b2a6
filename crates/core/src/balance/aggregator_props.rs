//! Property-based tests for balance aggregation.
//!
//! Property: in a closed group (every transaction fully paid), nets sum to
//! zero, and the result does not depend on transaction order.

use chrono::NaiveDate;
use proptest::prelude::*;
use tally_shared::types::{MemberId, Money, TransactionId};
use uuid::Uuid;

use super::aggregator::BalanceAggregator;
use super::types::BalanceScope;
use crate::ledger::{LedgerTransaction, Payment, PaymentMethod, SplitType, TransactionType};
use crate::split::{SplitAllocator, SplitRequest};

const GROUP_SIZE: u128 = 6;

fn member(n: u128) -> MemberId {
    MemberId::from_uuid(Uuid::from_u128(n + 1))
}

/// Strategy for one fully paid EQUAL transaction:
/// (amount in cents, included member mask, payer).
fn closed_transaction() -> impl Strategy<Value = (i64, Vec<bool>, u128)> {
    (
        1i64..1_000_000i64,
        prop::collection::vec(any::<bool>(), GROUP_SIZE as usize),
        0..GROUP_SIZE,
    )
        .prop_filter("at least one included member", |(_, mask, _)| mask.iter().any(|b| *b))
}

fn build(amount: i64, mask: &[bool], payer: u128) -> LedgerTransaction {
    let id = TransactionId::new();
    let amount = Money::from_minor(amount);
    let requests: Vec<SplitRequest> = mask
        .iter()
        .enumerate()
        .map(|(n, included)| SplitRequest {
            member_id: member(n as u128),
            split_value: None,
            is_included: *included,
        })
        .collect();

    LedgerTransaction {
        id,
        group_id: None,
        activity_id: None,
        transaction_type: TransactionType::Expense,
        amount,
        date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        description: String::new(),
        is_settlement: false,
        splits: SplitAllocator::resplit(id, amount, SplitType::Equal, &requests).unwrap(),
        payments: vec![Payment {
            transaction_id: id,
            payer_id: member(payer),
            amount,
            method: PaymentMethod::Cash,
            note: None,
        }],
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Nets of a closed group sum to zero, and each net is paid minus owed.
    #[test]
    fn prop_closed_group_nets_sum_to_zero(
        cases in prop::collection::vec(closed_transaction(), 1..15),
    ) {
        let ledger: Vec<LedgerTransaction> =
            cases.iter().map(|(a, m, p)| build(*a, m, *p)).collect();

        let balances = BalanceAggregator::aggregate_checked(&ledger, &BalanceScope::all()).unwrap();

        prop_assert_eq!(balances.total_net(), Money::ZERO);
        for balance in balances.iter() {
            prop_assert_eq!(balance.net(), balance.total_paid - balance.total_owed);
        }

        let owed: Money = balances.iter().map(|b| b.total_owed).sum();
        let billed: Money = ledger.iter().map(|tx| tx.amount).sum();
        prop_assert_eq!(owed, billed);
    }

    /// Aggregation is independent of transaction order.
    #[test]
    fn prop_order_independent(
        cases in prop::collection::vec(closed_transaction(), 1..15),
    ) {
        let ledger: Vec<LedgerTransaction> =
            cases.iter().map(|(a, m, p)| build(*a, m, *p)).collect();
        let mut reversed = ledger.clone();
        reversed.reverse();

        let forward = BalanceAggregator::aggregate(&ledger, &BalanceScope::all()).unwrap();
        let backward = BalanceAggregator::aggregate(&reversed, &BalanceScope::all()).unwrap();
        prop_assert_eq!(forward, backward);
    }
}
