//! Application-wide error types.

use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// Input rejected before anything was persisted.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Total debt does not equal total credit.
    #[error("Ledger imbalance: {0}")]
    Imbalance(String),

    /// A write lost a race with another write to the same ledger.
    #[error("Concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    /// The same submission was already recorded.
    #[error("Duplicate submission: {0}")]
    Duplicate(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the stable error code for reporting.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Imbalance(_) => "LEDGER_IMBALANCE",
            Self::ConcurrencyConflict(_) => "CONCURRENCY_CONFLICT",
            Self::Duplicate(_) => "DUPLICATE_SUBMISSION",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns true if the operation should be retried after re-reading state.
    ///
    /// Only concurrency conflicts qualify; the retry must recompute balances
    /// rather than resubmit the stale amounts.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict(_))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(AppError::Validation(String::new()), "VALIDATION_ERROR")]
    #[case(AppError::Imbalance(String::new()), "LEDGER_IMBALANCE")]
    #[case(AppError::ConcurrencyConflict(String::new()), "CONCURRENCY_CONFLICT")]
    #[case(AppError::Duplicate(String::new()), "DUPLICATE_SUBMISSION")]
    #[case(AppError::NotFound(String::new()), "NOT_FOUND")]
    #[case(AppError::Database(String::new()), "DATABASE_ERROR")]
    #[case(AppError::Configuration(String::new()), "CONFIGURATION_ERROR")]
    #[case(AppError::Internal(String::new()), "INTERNAL_ERROR")]
    fn test_error_codes(#[case] error: AppError, #[case] code: &str) {
        assert_eq!(error.error_code(), code);
    }

    #[test]
    fn test_only_conflicts_are_retryable() {
        assert!(AppError::ConcurrencyConflict("stale".into()).is_retryable());
        assert!(!AppError::Duplicate("again".into()).is_retryable());
        assert!(!AppError::Imbalance("off by 1".into()).is_retryable());
        assert!(!AppError::Validation("empty".into()).is_retryable());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            AppError::Validation("msg".into()).to_string(),
            "Validation error: msg"
        );
        assert_eq!(
            AppError::Imbalance("msg".into()).to_string(),
            "Ledger imbalance: msg"
        );
        assert_eq!(
            AppError::ConcurrencyConflict("msg".into()).to_string(),
            "Concurrency conflict: msg"
        );
        assert_eq!(
            AppError::Duplicate("msg".into()).to_string(),
            "Duplicate submission: msg"
        );
    }
}
