//! Property-based tests for split allocation.
//!
//! Property: for every amount and policy, the included shares sum EXACTLY
//! to the transaction amount, and no share is negative.

use proptest::prelude::*;
use rust_decimal::Decimal;
use tally_shared::types::{MemberId, Money};
use uuid::Uuid;

use super::allocator::{Participant, SplitAllocator};
use crate::ledger::{LedgerError, SplitType};

/// Strategy to generate a valid positive amount in cents (0.01 to 1,000,000.00).
fn positive_cents() -> impl Strategy<Value = i64> {
    1i64..100_000_000i64
}

fn members(count: usize) -> Vec<MemberId> {
    (1..=count as u128)
        .map(|n| MemberId::from_uuid(Uuid::from_u128(n)))
        .collect()
}

/// Strategy to generate basis-point weights (hundredths of a percent) summing to 10_000.
fn basis_points(max_members: usize) -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(0i64..10_000, 1..max_members).prop_map(|cuts| {
        let mut cuts = cuts;
        cuts.sort_unstable();
        let mut weights = Vec::with_capacity(cuts.len() + 1);
        let mut previous = 0;
        for cut in cuts {
            weights.push(cut - previous);
            previous = cut;
        }
        weights.push(10_000 - previous);
        weights
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// EQUAL: shares sum to the amount and differ by at most one cent.
    #[test]
    fn prop_equal_conserves_amount(cents in positive_cents(), count in 1usize..40) {
        let participants: Vec<Participant> =
            members(count).into_iter().map(Participant::equal).collect();

        let result = SplitAllocator::allocate(
            Money::from_minor(cents),
            SplitType::Equal,
            &participants,
        )
        .unwrap();

        let shares: Vec<i64> = result.iter().map(|a| a.resolved_amount.minor_units()).collect();
        prop_assert_eq!(shares.iter().sum::<i64>(), cents);
        prop_assert!(shares.iter().all(|s| *s >= 0));

        let max = shares.iter().max().copied().unwrap_or(0);
        let min = shares.iter().min().copied().unwrap_or(0);
        prop_assert!(max - min <= 1, "shares spread more than a cent: {:?}", shares);
    }

    /// PERCENTAGE: shares sum to the amount whenever percentages sum to 100.
    #[test]
    fn prop_percentage_conserves_amount(cents in positive_cents(), weights in basis_points(12)) {
        let ids = members(weights.len());
        let participants: Vec<Participant> = ids
            .into_iter()
            .zip(&weights)
            .map(|(id, bp)| Participant::with_value(id, Decimal::new(*bp, 2)))
            .collect();

        let result = SplitAllocator::allocate(
            Money::from_minor(cents),
            SplitType::Percentage,
            &participants,
        )
        .unwrap();

        let total: Money = result.iter().map(|a| a.resolved_amount).sum();
        prop_assert_eq!(total, Money::from_minor(cents));
        prop_assert!(result.iter().all(|a| !a.resolved_amount.is_negative()));
    }

    /// FIXED: values that sum to the amount are returned verbatim.
    #[test]
    fn prop_fixed_verbatim(parts in prop::collection::vec(0i64..1_000_000, 1..10)) {
        let cents: i64 = parts.iter().sum();
        prop_assume!(cents > 0);

        let participants: Vec<Participant> = members(parts.len())
            .into_iter()
            .zip(&parts)
            .map(|(id, part)| Participant::with_value(id, Decimal::new(*part, 2)))
            .collect();

        let result = SplitAllocator::allocate(
            Money::from_minor(cents),
            SplitType::Fixed,
            &participants,
        )
        .unwrap();

        let shares: Vec<i64> = result.iter().map(|a| a.resolved_amount.minor_units()).collect();
        prop_assert_eq!(shares, parts);
    }

    /// FIXED: any mismatch between parts and amount is rejected.
    #[test]
    fn prop_fixed_mismatch_rejected(
        parts in prop::collection::vec(0i64..1_000_000, 1..10),
        delta in prop_oneof![-1_000i64..0, 1i64..1_000],
    ) {
        let cents = parts.iter().sum::<i64>() + delta;
        prop_assume!(cents > 0);

        let participants: Vec<Participant> = members(parts.len())
            .into_iter()
            .zip(&parts)
            .map(|(id, part)| Participant::with_value(id, Decimal::new(*part, 2)))
            .collect();

        let result = SplitAllocator::allocate(
            Money::from_minor(cents),
            SplitType::Fixed,
            &participants,
        );
        prop_assert!(
            matches!(result, Err(LedgerError::FixedAmountsMismatch { .. })),
            "expected mismatch, got: {:?}",
            result
        );
    }

    /// Allocation is deterministic for identical input.
    #[test]
    fn prop_allocation_deterministic(cents in positive_cents(), count in 1usize..20) {
        let participants: Vec<Participant> =
            members(count).into_iter().map(Participant::equal).collect();
        let amount = Money::from_minor(cents);

        let first = SplitAllocator::allocate(amount, SplitType::Equal, &participants).unwrap();
        let second = SplitAllocator::allocate(amount, SplitType::Equal, &participants).unwrap();
        prop_assert_eq!(first, second);
    }
}
