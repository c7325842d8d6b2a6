//! Repository error type.

use sea_orm::DbErr;
use tally_core::ledger::LedgerError;
use tally_shared::AppError;
use tally_shared::types::{GroupId, MemberId, TransactionId};

/// Error types for repository operations.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Group not found.
    #[error("Group not found: {0}")]
    GroupNotFound(GroupId),

    /// Member not found in the group.
    #[error("Member not found: {0}")]
    MemberNotFound(MemberId),

    /// Transaction not found.
    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    /// The group's ledger changed since it was read.
    #[error("Ledger of group {group_id} changed since version {expected}, please retry")]
    ConcurrencyConflict {
        /// The group whose ledger moved.
        group_id: GroupId,
        /// The version the caller computed against.
        expected: i64,
    },

    /// The settlement was already recorded.
    #[error("Settlement already recorded: {0}")]
    Duplicate(String),

    /// Input rejected by the ledger engine.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// A stored row could not be mapped back to the domain.
    #[error("Corrupted row: {0}")]
    Corrupted(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl RepositoryError {
    /// Returns true if the caller should re-read the ledger and try again.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict { .. })
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::GroupNotFound(_)
            | RepositoryError::MemberNotFound(_)
            | RepositoryError::TransactionNotFound(_) => Self::NotFound(err.to_string()),
            RepositoryError::ConcurrencyConflict { .. } => Self::ConcurrencyConflict(err.to_string()),
            RepositoryError::Duplicate(_) => Self::Duplicate(err.to_string()),
            RepositoryError::Ledger(inner) => inner.into(),
            RepositoryError::Corrupted(_) => Self::Internal(err.to_string()),
            RepositoryError::Database(_) => Self::Database(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_mapping() {
        let group_id = GroupId::new();

        let conflict = RepositoryError::ConcurrencyConflict {
            group_id,
            expected: 3,
        };
        assert!(conflict.is_retryable());
        let app: AppError = conflict.into();
        assert_eq!(app.error_code(), "CONCURRENCY_CONFLICT");
        assert!(app.is_retryable());

        let app: AppError = RepositoryError::Duplicate("abc".to_string()).into();
        assert_eq!(app.error_code(), "DUPLICATE_SUBMISSION");

        let app: AppError = RepositoryError::GroupNotFound(group_id).into();
        assert_eq!(app.error_code(), "NOT_FOUND");

        let app: AppError = RepositoryError::Ledger(LedgerError::NoParticipants).into();
        assert_eq!(app.error_code(), "VALIDATION_ERROR");
        assert!(!RepositoryError::Ledger(LedgerError::NoParticipants).is_retryable());
    }
}
