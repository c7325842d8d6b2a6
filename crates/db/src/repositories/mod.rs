//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.

pub mod error;
pub mod group;
pub mod ledger;
pub mod settlement;

pub use error::RepositoryError;
pub use group::GroupRepository;
pub use ledger::{GroupLedger, LedgerRepository, NewPayment};
pub use settlement::{RecordedSettlement, SettlementRepository, VersionedPlan};
