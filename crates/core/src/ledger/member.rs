//! Member lifecycle rules.

use tally_shared::types::MemberId;

use super::error::LedgerError;
use super::types::LedgerTransaction;

/// Check that a member can be removed from its group.
///
/// Historical splits and payments reference members by id, so a member that
/// appears in any of them must stay.
///
/// # Errors
///
/// Returns `LedgerError::MemberReferenced` with the number of referencing
/// transactions.
pub fn ensure_member_removable(
    member_id: MemberId,
    transactions: &[LedgerTransaction],
) -> Result<(), LedgerError> {
    let referencing = transactions
        .iter()
        .filter(|tx| tx.references_member(member_id))
        .count();

    if referencing > 0 {
        return Err(LedgerError::MemberReferenced {
            member_id,
            transactions: referencing,
        });
    }
    Ok(())
}
