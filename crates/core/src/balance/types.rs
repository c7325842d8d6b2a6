//! Balance types.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tally_shared::types::{ActivityId, GroupId, MemberId, Money};

use crate::ledger::LedgerTransaction;

/// A member's derived balance. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    /// The member.
    pub member_id: MemberId,
    /// Sum of the member's included split amounts.
    pub total_owed: Money,
    /// Sum of payments where the member is the payer.
    pub total_paid: Money,
}

impl Balance {
    /// Creates an empty balance for a member.
    #[must_use]
    pub const fn new(member_id: MemberId) -> Self {
        Self {
            member_id,
            total_owed: Money::ZERO,
            total_paid: Money::ZERO,
        }
    }

    /// Net balance: `total_paid - total_owed`.
    ///
    /// Positive means the member is owed money (creditor), negative means
    /// the member owes money (debtor).
    #[must_use]
    pub fn net(&self) -> Money {
        self.total_paid - self.total_owed
    }

    /// Returns true if the member is owed money.
    #[must_use]
    pub fn is_creditor(&self) -> bool {
        self.net().is_positive()
    }

    /// Returns true if the member owes money.
    #[must_use]
    pub fn is_debtor(&self) -> bool {
        self.net().is_negative()
    }

    /// Returns true if the member's net is exactly zero.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.net().is_zero()
    }
}

/// Balances of every member involved in a transaction set, ordered by member id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupBalances(BTreeMap<MemberId, Balance>);

impl GroupBalances {
    /// Returns the balance of a member, if the member was involved.
    #[must_use]
    pub fn get(&self, member_id: &MemberId) -> Option<&Balance> {
        self.0.get(member_id)
    }

    /// Returns the net balance of a member, zero if never involved.
    #[must_use]
    pub fn net_of(&self, member_id: &MemberId) -> Money {
        self.0.get(member_id).map_or(Money::ZERO, Balance::net)
    }

    /// Iterates over balances in member-id order.
    pub fn iter(&self) -> impl Iterator<Item = &Balance> {
        self.0.values()
    }

    /// Number of members involved.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no member was involved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum of all nets; zero for a closed, fully paid group.
    #[must_use]
    pub fn total_net(&self) -> Money {
        self.iter().map(Balance::net).sum()
    }

    /// Members with a negative net.
    pub fn debtors(&self) -> impl Iterator<Item = &Balance> {
        self.iter().filter(|b| b.is_debtor())
    }

    /// Members with a positive net.
    pub fn creditors(&self) -> impl Iterator<Item = &Balance> {
        self.iter().filter(|b| b.is_creditor())
    }

    /// Returns true if every member's net is zero.
    #[must_use]
    pub fn is_all_settled(&self) -> bool {
        self.iter().all(Balance::is_settled)
    }

    pub(crate) fn entry(&mut self, member_id: MemberId) -> &mut Balance {
        self.0
            .entry(member_id)
            .or_insert_with(|| Balance::new(member_id))
    }
}

impl FromIterator<Balance> for GroupBalances {
    fn from_iter<I: IntoIterator<Item = Balance>>(iter: I) -> Self {
        Self(iter.into_iter().map(|b| (b.member_id, b)).collect())
    }
}

impl IntoIterator for GroupBalances {
    type Item = Balance;
    type IntoIter = std::collections::btree_map::IntoValues<MemberId, Balance>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_values()
    }
}

/// Restricts which transactions take part in an aggregation.
///
/// Every field is optional; an empty scope matches everything. The date
/// range is inclusive on both ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceScope {
    /// Only transactions of this group.
    pub group_id: Option<GroupId>,
    /// Only transactions of this activity.
    pub activity_id: Option<ActivityId>,
    /// Only transactions on or after this date.
    pub date_from: Option<NaiveDate>,
    /// Only transactions on or before this date.
    pub date_to: Option<NaiveDate>,
}

impl BalanceScope {
    /// A scope matching every transaction.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            group_id: None,
            activity_id: None,
            date_from: None,
            date_to: None,
        }
    }

    /// A scope matching one group.
    #[must_use]
    pub const fn group(group_id: GroupId) -> Self {
        Self {
            group_id: Some(group_id),
            ..Self::all()
        }
    }

    /// Restricts the scope to one activity.
    #[must_use]
    pub const fn with_activity(mut self, activity_id: ActivityId) -> Self {
        self.activity_id = Some(activity_id);
        self
    }

    /// Restricts the scope to an inclusive date range.
    #[must_use]
    pub const fn between(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.date_from = from;
        self.date_to = to;
        self
    }

    /// Returns true if the transaction falls inside the scope.
    #[must_use]
    pub fn matches(&self, transaction: &LedgerTransaction) -> bool {
        if self.group_id.is_some() && transaction.group_id != self.group_id {
            return false;
        }
        if self.activity_id.is_some() && transaction.activity_id != self.activity_id {
            return false;
        }
        if self.date_from.is_some_and(|from| transaction.date < from) {
            return false;
        }
        if self.date_to.is_some_and(|to| transaction.date > to) {
            return false;
        }
        true
    }
}
