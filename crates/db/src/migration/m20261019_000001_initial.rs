//! Initial database migration.
//!
//! Creates the group, member, ledger and settlement tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ============================================================
        // PART 1: GROUPS & MEMBERS
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(Groups::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Groups::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Groups::Name).string().not_null())
                    .col(
                        ColumnDef::new(Groups::LedgerVersion)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Groups::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Members::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Members::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Members::GroupId).uuid().not_null())
                    .col(ColumnDef::new(Members::Name).string().not_null())
                    .col(ColumnDef::new(Members::UserId).uuid().null())
                    .col(
                        ColumnDef::new(Members::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_members_group")
                            .from(Members::Table, Members::GroupId)
                            .to(Groups::Table, Groups::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // PART 2: LEDGER
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(LedgerTransactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LedgerTransactions::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(LedgerTransactions::GroupId).uuid().not_null())
                    .col(ColumnDef::new(LedgerTransactions::ActivityId).uuid().null())
                    .col(
                        ColumnDef::new(LedgerTransactions::TransactionType)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LedgerTransactions::AmountCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LedgerTransactions::TransactionDate)
                            .date()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LedgerTransactions::Description)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LedgerTransactions::IsSettlement)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(LedgerTransactions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ledger_transactions_group")
                            .from(LedgerTransactions::Table, LedgerTransactions::GroupId)
                            .to(Groups::Table, Groups::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Splits::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Splits::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Splits::TransactionId).uuid().not_null())
                    .col(ColumnDef::new(Splits::MemberId).uuid().not_null())
                    .col(ColumnDef::new(Splits::Position).integer().not_null())
                    .col(ColumnDef::new(Splits::SplitType).string_len(16).not_null())
                    .col(ColumnDef::new(Splits::SplitValue).string_len(40).null())
                    .col(ColumnDef::new(Splits::ResolvedCents).big_integer().not_null())
                    .col(ColumnDef::new(Splits::IsIncluded).boolean().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_splits_transaction")
                            .from(Splits::Table, Splits::TransactionId)
                            .to(LedgerTransactions::Table, LedgerTransactions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_splits_member")
                            .from(Splits::Table, Splits::MemberId)
                            .to(Members::Table, Members::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Payments::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Payments::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Payments::TransactionId).uuid().not_null())
                    .col(ColumnDef::new(Payments::PayerId).uuid().not_null())
                    .col(ColumnDef::new(Payments::AmountCents).big_integer().not_null())
                    .col(ColumnDef::new(Payments::Method).string_len(16).not_null())
                    .col(ColumnDef::new(Payments::Note).text().null())
                    .col(
                        ColumnDef::new(Payments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payments_transaction")
                            .from(Payments::Table, Payments::TransactionId)
                            .to(LedgerTransactions::Table, LedgerTransactions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payments_payer")
                            .from(Payments::Table, Payments::PayerId)
                            .to(Members::Table, Members::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // PART 3: SETTLEMENTS
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(SettlementRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SettlementRecords::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SettlementRecords::GroupId).uuid().not_null())
                    .col(
                        ColumnDef::new(SettlementRecords::TransactionId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SettlementRecords::FromMemberId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SettlementRecords::ToMemberId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SettlementRecords::AmountCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SettlementRecords::IdempotencyKey)
                            .string_len(64)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(SettlementRecords::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_settlement_records_group")
                            .from(SettlementRecords::Table, SettlementRecords::GroupId)
                            .to(Groups::Table, Groups::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_settlement_records_transaction")
                            .from(SettlementRecords::Table, SettlementRecords::TransactionId)
                            .to(LedgerTransactions::Table, LedgerTransactions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // PART 4: INDEXES
        // ============================================================
        manager
            .create_index(
                Index::create()
                    .name("idx_members_group")
                    .table(Members::Table)
                    .col(Members::GroupId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_ledger_transactions_group_date")
                    .table(LedgerTransactions::Table)
                    .col(LedgerTransactions::GroupId)
                    .col(LedgerTransactions::TransactionDate)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_splits_transaction")
                    .table(Splits::Table)
                    .col(Splits::TransactionId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_payments_transaction")
                    .table(Payments::Table)
                    .col(Payments::TransactionId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SettlementRecords::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Payments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Splits::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(LedgerTransactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Members::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Groups::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Groups {
    Table,
    Id,
    Name,
    LedgerVersion,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Members {
    Table,
    Id,
    GroupId,
    Name,
    UserId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum LedgerTransactions {
    Table,
    Id,
    GroupId,
    ActivityId,
    TransactionType,
    AmountCents,
    TransactionDate,
    Description,
    IsSettlement,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Splits {
    Table,
    Id,
    TransactionId,
    MemberId,
    Position,
    SplitType,
    SplitValue,
    ResolvedCents,
    IsIncluded,
}

#[derive(DeriveIden)]
enum Payments {
    Table,
    Id,
    TransactionId,
    PayerId,
    AmountCents,
    Method,
    Note,
    CreatedAt,
}

#[derive(DeriveIden)]
enum SettlementRecords {
    Table,
    Id,
    GroupId,
    TransactionId,
    FromMemberId,
    ToMemberId,
    AmountCents,
    IdempotencyKey,
    CreatedAt,
}
