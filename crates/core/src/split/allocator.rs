//! Split allocation with exact cent conservation.
//!
//! Every policy returns shares whose sum EXACTLY equals the transaction
//! amount. Shares are computed in integer minor units:
//!
//! 1. Compute each member's exact share and round it half-up to the cent
//! 2. Compute the residual (amount - sum of rounded shares)
//! 3. Let the last participant absorb the residual, walking backwards one
//!    cent per participant when the residual is larger than one cent
//!
//! FIXED splits are never adjusted: a mismatch is a validation error.

use std::collections::HashSet;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tally_shared::types::{MemberId, Money, MoneyError, TransactionId};

use crate::ledger::{LedgerError, Split, SplitType};

/// Percentages may miss 100 by at most this much before rounding.
const PERCENTAGE_EPSILON: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// An included member taking part in an allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    /// The member.
    pub member_id: MemberId,
    /// Percentage (PERCENTAGE) or amount (FIXED); ignored for EQUAL.
    pub split_value: Option<Decimal>,
}

impl Participant {
    /// Creates a participant without a split value (EQUAL splits).
    #[must_use]
    pub const fn equal(member_id: MemberId) -> Self {
        Self {
            member_id,
            split_value: None,
        }
    }

    /// Creates a participant with a split value.
    #[must_use]
    pub const fn with_value(member_id: MemberId, split_value: Decimal) -> Self {
        Self {
            member_id,
            split_value: Some(split_value),
        }
    }
}

/// One member's resolved share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    /// The member.
    pub member_id: MemberId,
    /// The resolved amount owed.
    pub resolved_amount: Money,
}

/// A requested split row, included or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitRequest {
    /// The member.
    pub member_id: MemberId,
    /// Percentage or fixed amount, depending on the policy.
    pub split_value: Option<Decimal>,
    /// Whether the member takes part in the split.
    pub is_included: bool,
}

/// Stateless split allocator.
pub struct SplitAllocator;

impl SplitAllocator {
    /// Allocate `amount` across `participants` under `policy`.
    ///
    /// Participants are the included members, in a stable order; the last
    /// one absorbs any rounding residual. Pure function: callers persist the
    /// result as Split rows.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the amount is not positive, the
    /// participant list is empty or has duplicates, percentages do not sum
    /// to 100, or fixed amounts do not sum to `amount`.
    pub fn allocate(
        amount: Money,
        policy: SplitType,
        participants: &[Participant],
    ) -> Result<Vec<Allocation>, LedgerError> {
        if !amount.is_positive() {
            return Err(LedgerError::NonPositiveAmount(amount));
        }
        if participants.is_empty() {
            return Err(LedgerError::NoParticipants);
        }

        let mut seen = HashSet::with_capacity(participants.len());
        for participant in participants {
            if !seen.insert(participant.member_id) {
                return Err(LedgerError::DuplicateParticipant(participant.member_id));
            }
        }

        let shares = match policy {
            SplitType::Equal => Self::allocate_equal(amount, participants.len())?,
            SplitType::Percentage => Self::allocate_by_percentages(amount, participants)?,
            SplitType::Fixed => Self::allocate_fixed(amount, participants)?,
        };

        Ok(participants
            .iter()
            .zip(shares)
            .map(|(participant, resolved_amount)| Allocation {
                member_id: participant.member_id,
                resolved_amount,
            })
            .collect())
    }

    /// Re-split a transaction from the full list of requested rows.
    ///
    /// Included rows are allocated in request order; excluded rows are kept
    /// with a zero amount. The result replaces the transaction's splits
    /// wholesale.
    ///
    /// # Errors
    ///
    /// Same as [`SplitAllocator::allocate`]; duplicate members are rejected
    /// even when excluded.
    pub fn resplit(
        transaction_id: TransactionId,
        amount: Money,
        policy: SplitType,
        requests: &[SplitRequest],
    ) -> Result<Vec<Split>, LedgerError> {
        let mut seen = HashSet::with_capacity(requests.len());
        for request in requests {
            if !seen.insert(request.member_id) {
                return Err(LedgerError::DuplicateParticipant(request.member_id));
            }
        }

        let participants: Vec<Participant> = requests
            .iter()
            .filter(|r| r.is_included)
            .map(|r| Participant {
                member_id: r.member_id,
                split_value: r.split_value,
            })
            .collect();

        let allocations = Self::allocate(amount, policy, &participants)?;
        let mut allocated = allocations.into_iter();

        Ok(requests
            .iter()
            .map(|request| {
                let resolved_amount = if request.is_included {
                    allocated
                        .next()
                        .map_or(Money::ZERO, |allocation| allocation.resolved_amount)
                } else {
                    Money::ZERO
                };

                Split {
                    transaction_id,
                    member_id: request.member_id,
                    split_type: policy,
                    split_value: request.split_value,
                    resolved_amount,
                    is_included: request.is_included,
                }
            })
            .collect())
    }

    fn allocate_equal(amount: Money, count: usize) -> Result<Vec<Money>, LedgerError> {
        let total = Decimal::from(amount.minor_units());
        let count_dec = Decimal::from(count as u64);
        let base = round_to_minor(total / count_dec)?;

        let mut shares = vec![base; count];
        absorb_residual(amount.minor_units(), &mut shares, &vec![true; count])?;
        Ok(shares.into_iter().map(Money::from_minor).collect())
    }

    fn allocate_by_percentages(
        amount: Money,
        participants: &[Participant],
    ) -> Result<Vec<Money>, LedgerError> {
        let percentages = participants
            .iter()
            .map(|p| required_value(p, SplitType::Percentage))
            .collect::<Result<Vec<_>, _>>()?;

        let total_percent = percentages
            .iter()
            .try_fold(Decimal::ZERO, |acc, percent| acc.checked_add(*percent))
            .ok_or(LedgerError::InvalidAmount(MoneyError::OutOfRange(Decimal::MAX)))?;
        if (total_percent - HUNDRED).abs() > PERCENTAGE_EPSILON {
            return Err(LedgerError::PercentagesNotHundred {
                total: total_percent,
            });
        }

        let total = Decimal::from(amount.minor_units());
        let mut shares = percentages
            .iter()
            .map(|percent| round_to_minor(total * *percent / HUNDRED))
            .collect::<Result<Vec<_>, _>>()?;

        let eligible: Vec<bool> = percentages.iter().map(|p| !p.is_zero()).collect();
        absorb_residual(amount.minor_units(), &mut shares, &eligible)?;
        Ok(shares.into_iter().map(Money::from_minor).collect())
    }

    fn allocate_fixed(
        amount: Money,
        participants: &[Participant],
    ) -> Result<Vec<Money>, LedgerError> {
        let shares = participants
            .iter()
            .map(|p| Ok(Money::from_decimal(required_value(p, SplitType::Fixed)?)?))
            .collect::<Result<Vec<_>, LedgerError>>()?;

        let actual = Money::try_sum(shares.iter().copied())?;
        if actual != amount {
            return Err(LedgerError::FixedAmountsMismatch {
                expected: amount,
                actual,
            });
        }
        Ok(shares)
    }
}

/// Returns the participant's split value, rejecting missing or negative values.
fn required_value(participant: &Participant, split_type: SplitType) -> Result<Decimal, LedgerError> {
    let value = participant
        .split_value
        .ok_or(LedgerError::MissingSplitValue {
            member_id: participant.member_id,
            split_type,
        })?;
    if value.is_sign_negative() && !value.is_zero() {
        return Err(LedgerError::NegativeSplitValue {
            member_id: participant.member_id,
            value,
        });
    }
    Ok(value)
}

/// Rounds a value expressed in minor units half-up to a whole minor unit.
fn round_to_minor(value: Decimal) -> Result<i64, LedgerError> {
    let rounded = value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    rounded
        .to_i64()
        .ok_or(LedgerError::InvalidAmount(MoneyError::OutOfRange(rounded)))
}

/// Folds the rounding residual into the shares so they sum to `total`.
///
/// The last eligible share moves first; larger residuals continue backwards
/// one minor unit per share. Shares never drop below zero. The residual is
/// tracked in `i128` because the rounded shares may sum past `i64::MAX`.
fn absorb_residual(total: i64, shares: &mut [i64], eligible: &[bool]) -> Result<(), LedgerError> {
    let rounded_sum: i128 = shares.iter().map(|&share| i128::from(share)).sum();
    let mut residual = i128::from(total) - rounded_sum;
    let step: i64 = if residual < 0 { -1 } else { 1 };
    let overflow = || LedgerError::InvalidAmount(MoneyError::OutOfRange(Decimal::from(total)));

    while residual != 0 {
        let before = residual;
        for (share, &ok) in shares.iter_mut().zip(eligible).rev() {
            if residual == 0 {
                break;
            }
            if !ok || (step < 0 && *share == 0) {
                continue;
            }
            *share = share.checked_add(step).ok_or_else(overflow)?;
            residual -= i128::from(step);
        }
        // Only reachable if no share is eligible, which validation rules out.
        if residual == before {
            if let Some(last) = shares.last_mut() {
                let adjustment = i64::try_from(residual).map_err(|_| overflow())?;
                *last = last.checked_add(adjustment).ok_or_else(overflow)?;
            }
            break;
        }
    }
    Ok(())
}
