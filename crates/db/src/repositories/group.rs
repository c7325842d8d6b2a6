//! Group repository: groups, members and the ledger version counter.
//!
//! Every write to a group's ledger bumps `groups.ledger_version` with a
//! compare-and-set inside the writing transaction. A writer that read a
//! version another writer already bumped updates zero rows and fails with
//! `ConcurrencyConflict`.

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tally_core::ledger::{Member, ensure_member_removable};
use tally_shared::types::{GroupId, MemberId, UserId};
use tracing::info;

use super::error::RepositoryError;
use super::ledger::load_transactions;
use crate::entities::{groups, members};

/// Group repository for group and member management.
#[derive(Debug, Clone)]
pub struct GroupRepository {
    db: DatabaseConnection,
}

impl GroupRepository {
    /// Creates a new group repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a group with an empty ledger at version 0.
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails.
    pub async fn create_group(&self, name: &str) -> Result<groups::Model, RepositoryError> {
        let group = groups::ActiveModel {
            id: Set(GroupId::new().into_inner()),
            name: Set(name.to_string()),
            ledger_version: Set(0),
            created_at: Set(Utc::now()),
        };

        let group = group.insert(&self.db).await?;
        info!(group_id = %group.id, "Group created");
        Ok(group)
    }

    /// Reads the current ledger version of a group.
    ///
    /// # Errors
    ///
    /// Returns `GroupNotFound` if the group does not exist.
    pub async fn ledger_version(&self, group_id: GroupId) -> Result<i64, RepositoryError> {
        current_version(&self.db, group_id).await
    }

    /// Adds a member to a group.
    ///
    /// # Errors
    ///
    /// Returns `GroupNotFound` if the group does not exist, or
    /// `ConcurrencyConflict` if the ledger moved during the write.
    pub async fn add_member(
        &self,
        group_id: GroupId,
        name: &str,
        user_id: Option<UserId>,
    ) -> Result<Member, RepositoryError> {
        let txn = self.db.begin().await?;
        let version = current_version(&txn, group_id).await?;

        let member_id = MemberId::new();
        members::ActiveModel {
            id: Set(member_id.into_inner()),
            group_id: Set(group_id.into_inner()),
            name: Set(name.to_string()),
            user_id: Set(user_id.map(UserId::into_inner)),
            created_at: Set(Utc::now()),
        }
        .insert(&txn)
        .await?;

        bump_version(&txn, group_id, version).await?;
        txn.commit().await?;

        Ok(Member {
            id: member_id,
            group_id,
            name: name.to_string(),
            user_id,
        })
    }

    /// Lists the members of a group in creation order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_members(&self, group_id: GroupId) -> Result<Vec<Member>, RepositoryError> {
        let rows = members::Entity::find()
            .filter(members::Column::GroupId.eq(group_id.into_inner()))
            .order_by_asc(members::Column::CreatedAt)
            .order_by_asc(members::Column::Id)
            .all(&self.db)
            .await?;

        Ok(rows.into_iter().map(member_from_row).collect())
    }

    /// Removes a member that no split or payment references.
    ///
    /// # Errors
    ///
    /// Returns `MemberNotFound` if the member is not in the group and
    /// `Ledger(MemberReferenced)` if ledger rows still reference it.
    pub async fn remove_member(
        &self,
        group_id: GroupId,
        member_id: MemberId,
    ) -> Result<(), RepositoryError> {
        let txn = self.db.begin().await?;
        let version = current_version(&txn, group_id).await?;

        let member = members::Entity::find_by_id(member_id.into_inner())
            .filter(members::Column::GroupId.eq(group_id.into_inner()))
            .one(&txn)
            .await?
            .ok_or(RepositoryError::MemberNotFound(member_id))?;

        let transactions = load_transactions(&txn, group_id).await?;
        ensure_member_removable(member_id, &transactions)?;

        member.delete(&txn).await?;
        bump_version(&txn, group_id, version).await?;
        txn.commit().await?;

        info!(%group_id, %member_id, "Member removed");
        Ok(())
    }
}

/// Reads a group's ledger version on `conn`.
pub(crate) async fn current_version<C: ConnectionTrait>(
    conn: &C,
    group_id: GroupId,
) -> Result<i64, RepositoryError> {
    let group = groups::Entity::find_by_id(group_id.into_inner())
        .one(conn)
        .await?
        .ok_or(RepositoryError::GroupNotFound(group_id))?;
    Ok(group.ledger_version)
}

/// Advances a group's ledger version from `expected` to `expected + 1`.
///
/// Updates zero rows, and fails, if the version is no longer `expected`.
pub(crate) async fn bump_version<C: ConnectionTrait>(
    conn: &C,
    group_id: GroupId,
    expected: i64,
) -> Result<i64, RepositoryError> {
    let next = expected + 1;
    let result = groups::Entity::update_many()
        .col_expr(groups::Column::LedgerVersion, Expr::value(next))
        .filter(groups::Column::Id.eq(group_id.into_inner()))
        .filter(groups::Column::LedgerVersion.eq(expected))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Err(RepositoryError::ConcurrencyConflict { group_id, expected });
    }
    Ok(next)
}

pub(crate) fn member_from_row(row: members::Model) -> Member {
    Member {
        id: MemberId::from_uuid(row.id),
        group_id: GroupId::from_uuid(row.group_id),
        name: row.name,
        user_id: row.user_id.map(UserId::from_uuid),
    }
}
