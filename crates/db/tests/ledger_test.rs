//! Integration tests for the group and ledger repositories.
//!
//! Runs against an in-memory `SQLite` database migrated from scratch for
//! every test.

#![allow(clippy::similar_names)]

use chrono::NaiveDate;
use rust_decimal_macros::dec;
use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait};
use tally_core::ledger::{
    LedgerError, PaymentInput, PaymentMethod, SplitInput, SplitType, TransactionInput,
    TransactionType,
};
use tally_core::split::SplitRequest;
use tally_db::entities::{ledger_transactions, splits};
use tally_db::migration::{Migrator, MigratorTrait};
use tally_db::{GroupRepository, LedgerRepository, NewPayment, RepositoryError};
use tally_shared::config::DatabaseConfig;
use tally_shared::types::{GroupId, MemberId, Money, TransactionId};

struct TestGroup {
    db: DatabaseConnection,
    group_id: GroupId,
    alice: MemberId,
    bob: MemberId,
    carol: MemberId,
}

async fn setup_db() -> DatabaseConnection {
    let config = DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        min_connections: 1,
    };
    let db = tally_db::connect_with(&config)
        .await
        .expect("Failed to connect to database");
    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    db
}

async fn setup_group() -> TestGroup {
    let db = setup_db().await;
    let groups = GroupRepository::new(db.clone());

    let group = groups
        .create_group("Weekend trip")
        .await
        .expect("Failed to create group");
    let group_id = GroupId::from_uuid(group.id);

    let mut ids = Vec::new();
    for name in ["Alice", "Bob", "Carol"] {
        let member = groups
            .add_member(group_id, name, None)
            .await
            .expect("Failed to add member");
        ids.push(member.id);
    }

    TestGroup {
        db,
        group_id,
        alice: ids[0],
        bob: ids[1],
        carol: ids[2],
    }
}

fn equal_split(member_id: MemberId) -> SplitInput {
    SplitInput {
        member_id,
        split_type: SplitType::Equal,
        split_value: None,
        is_included: true,
    }
}

fn expense(amount: Money, splits: Vec<SplitInput>, payments: Vec<PaymentInput>) -> TransactionInput {
    TransactionInput {
        id: TransactionId::new(),
        amount,
        group_id: None,
        activity_id: None,
        transaction_type: TransactionType::Expense,
        date: NaiveDate::from_ymd_opt(2026, 10, 17),
        description: "Dinner".to_string(),
        splits,
        payments,
    }
}

fn paid_by(payer_id: MemberId, amount: Money) -> PaymentInput {
    PaymentInput {
        payer_id,
        amount,
        method: PaymentMethod::Card,
        note: None,
    }
}

#[tokio::test]
async fn test_new_group_starts_at_version_zero() {
    let db = setup_db().await;
    let groups = GroupRepository::new(db);

    let group = groups.create_group("Flat").await.expect("create group");
    let version = groups
        .ledger_version(GroupId::from_uuid(group.id))
        .await
        .expect("read version");
    assert_eq!(version, 0);
}

#[tokio::test]
async fn test_unknown_group_is_not_found() {
    let db = setup_db().await;
    let ledger = LedgerRepository::new(db);

    let result = ledger.load_group_ledger(GroupId::new()).await;
    assert!(matches!(result, Err(RepositoryError::GroupNotFound(_))));
}

#[tokio::test]
async fn test_members_listed_in_creation_order() {
    let t = setup_group().await;
    let groups = GroupRepository::new(t.db.clone());

    let members = groups.list_members(t.group_id).await.expect("list members");
    let ids: Vec<MemberId> = members.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![t.alice, t.bob, t.carol]);
    assert_eq!(members[0].name, "Alice");

    // Three member additions, three version bumps.
    assert_eq!(groups.ledger_version(t.group_id).await.expect("version"), 3);
}

#[tokio::test]
async fn test_create_and_load_transaction() {
    let t = setup_group().await;
    let ledger = LedgerRepository::new(t.db.clone());

    let input = expense(
        Money::from_minor(1000),
        vec![equal_split(t.alice), equal_split(t.bob), equal_split(t.carol)],
        vec![paid_by(t.alice, Money::from_minor(1000))],
    );
    let created = ledger
        .create_transaction(t.group_id, &input)
        .await
        .expect("create transaction");
    assert_eq!(created.group_id, Some(t.group_id));
    assert_eq!(created.total_allocated(), Money::from_minor(1000));

    let loaded = ledger
        .load_group_ledger(t.group_id)
        .await
        .expect("load ledger");
    assert_eq!(loaded.ledger_version, 4);
    assert_eq!(loaded.transactions.len(), 1);

    let stored = &loaded.transactions[0];
    assert_eq!(stored, &created);
    let members: Vec<MemberId> = stored.splits.iter().map(|s| s.member_id).collect();
    assert_eq!(members, vec![t.alice, t.bob, t.carol]);
    assert_eq!(stored.payments[0].method, PaymentMethod::Card);
}

#[tokio::test]
async fn test_percentage_split_values_survive_storage() {
    let t = setup_group().await;
    let ledger = LedgerRepository::new(t.db.clone());

    let split = |member_id, value| SplitInput {
        member_id,
        split_type: SplitType::Percentage,
        split_value: Some(value),
        is_included: true,
    };
    let input = expense(
        Money::from_minor(10_000),
        vec![split(t.alice, dec!(50)), split(t.bob, dec!(33.33)), split(t.carol, dec!(16.67))],
        vec![paid_by(t.bob, Money::from_minor(10_000))],
    );
    ledger
        .create_transaction(t.group_id, &input)
        .await
        .expect("create transaction");

    let loaded = ledger.load_group_ledger(t.group_id).await.expect("load");
    let stored = &loaded.transactions[0];
    assert_eq!(stored.splits[1].split_value, Some(dec!(33.33)));
    assert_eq!(stored.splits[0].resolved_amount, Money::from_minor(5000));
    assert!(stored.check_splits().is_ok());
}

#[tokio::test]
async fn test_rejected_transaction_writes_nothing() {
    let t = setup_group().await;
    let ledger = LedgerRepository::new(t.db.clone());

    let fixed = |member_id, value| SplitInput {
        member_id,
        split_type: SplitType::Fixed,
        split_value: Some(value),
        is_included: true,
    };
    let input = expense(
        Money::from_minor(5000),
        vec![fixed(t.alice, dec!(20.00)), fixed(t.bob, dec!(20.00))],
        vec![paid_by(t.alice, Money::from_minor(5000))],
    );

    let result = ledger.create_transaction(t.group_id, &input).await;
    assert!(matches!(
        result,
        Err(RepositoryError::Ledger(LedgerError::FixedAmountsMismatch { .. }))
    ));

    let count = ledger_transactions::Entity::find()
        .count(&t.db)
        .await
        .expect("count transactions");
    assert_eq!(count, 0);
    let loaded = ledger.load_group_ledger(t.group_id).await.expect("load");
    assert_eq!(loaded.ledger_version, 3);
}

#[tokio::test]
async fn test_foreign_member_is_rejected() {
    let t = setup_group().await;
    let ledger = LedgerRepository::new(t.db.clone());
    let stranger = MemberId::new();

    let input = expense(
        Money::from_minor(1000),
        vec![equal_split(t.alice), equal_split(stranger)],
        vec![paid_by(t.alice, Money::from_minor(1000))],
    );

    let result = ledger.create_transaction(t.group_id, &input).await;
    assert!(matches!(result, Err(RepositoryError::MemberNotFound(id)) if id == stranger));

    let count = splits::Entity::find().count(&t.db).await.expect("count");
    assert_eq!(count, 0);
}

#[tokio::test]
async fn test_resplit_excluding_member() {
    let t = setup_group().await;
    let ledger = LedgerRepository::new(t.db.clone());

    let input = expense(
        Money::from_minor(3000),
        vec![equal_split(t.alice), equal_split(t.bob), equal_split(t.carol)],
        vec![paid_by(t.alice, Money::from_minor(3000))],
    );
    let created = ledger
        .create_transaction(t.group_id, &input)
        .await
        .expect("create transaction");

    let request = |member_id, is_included| SplitRequest {
        member_id,
        split_value: None,
        is_included,
    };
    let replaced = ledger
        .resplit_transaction(
            created.id,
            SplitType::Equal,
            &[request(t.alice, true), request(t.bob, true), request(t.carol, false)],
        )
        .await
        .expect("resplit");
    assert_eq!(replaced[0].resolved_amount, Money::from_minor(1500));
    assert_eq!(replaced[1].resolved_amount, Money::from_minor(1500));
    assert_eq!(replaced[2].resolved_amount, Money::ZERO);

    let loaded = ledger.load_group_ledger(t.group_id).await.expect("load");
    let stored = &loaded.transactions[0];
    assert_eq!(stored.splits, replaced);
    assert!(!stored.splits[2].is_included);
    assert!(stored.check_splits().is_ok());
    assert_eq!(loaded.ledger_version, 5);
}

#[tokio::test]
async fn test_resplit_unknown_transaction() {
    let t = setup_group().await;
    let ledger = LedgerRepository::new(t.db.clone());

    let result = ledger
        .resplit_transaction(TransactionId::new(), SplitType::Equal, &[])
        .await;
    assert!(matches!(result, Err(RepositoryError::TransactionNotFound(_))));
}

#[tokio::test]
async fn test_add_payment() {
    let t = setup_group().await;
    let ledger = LedgerRepository::new(t.db.clone());

    let input = expense(
        Money::from_minor(2000),
        vec![equal_split(t.alice), equal_split(t.bob)],
        vec![paid_by(t.alice, Money::from_minor(1200))],
    );
    let created = ledger
        .create_transaction(t.group_id, &input)
        .await
        .expect("create transaction");

    let payment = ledger
        .add_payment(
            created.id,
            NewPayment {
                payer_id: t.bob,
                amount: Money::from_minor(800),
                method: PaymentMethod::BankTransfer,
                note: Some("rest of the bill".to_string()),
            },
        )
        .await
        .expect("add payment");
    assert_eq!(payment.transaction_id, created.id);

    let loaded = ledger.load_group_ledger(t.group_id).await.expect("load");
    let stored = &loaded.transactions[0];
    assert_eq!(stored.payments.len(), 2);
    assert_eq!(stored.total_paid(), Money::from_minor(2000));
}

#[tokio::test]
async fn test_add_payment_rejects_zero_amount() {
    let t = setup_group().await;
    let ledger = LedgerRepository::new(t.db.clone());

    let input = expense(
        Money::from_minor(2000),
        vec![equal_split(t.alice), equal_split(t.bob)],
        vec![],
    );
    let created = ledger
        .create_transaction(t.group_id, &input)
        .await
        .expect("create transaction");

    let result = ledger
        .add_payment(
            created.id,
            NewPayment {
                payer_id: t.bob,
                amount: Money::ZERO,
                method: PaymentMethod::Cash,
                note: None,
            },
        )
        .await;
    assert!(matches!(
        result,
        Err(RepositoryError::Ledger(LedgerError::NonPositivePayment { .. }))
    ));
}

#[tokio::test]
async fn test_remove_member_guard() {
    let t = setup_group().await;
    let groups = GroupRepository::new(t.db.clone());
    let ledger = LedgerRepository::new(t.db.clone());

    let input = expense(
        Money::from_minor(1000),
        vec![equal_split(t.alice), equal_split(t.bob)],
        vec![paid_by(t.alice, Money::from_minor(1000))],
    );
    ledger
        .create_transaction(t.group_id, &input)
        .await
        .expect("create transaction");

    let result = groups.remove_member(t.group_id, t.bob).await;
    assert!(matches!(
        result,
        Err(RepositoryError::Ledger(LedgerError::MemberReferenced { transactions: 1, .. }))
    ));

    groups
        .remove_member(t.group_id, t.carol)
        .await
        .expect("unreferenced member is removable");
    let members = groups.list_members(t.group_id).await.expect("list");
    assert_eq!(members.len(), 2);

    let result = groups.remove_member(t.group_id, t.carol).await;
    assert!(matches!(result, Err(RepositoryError::MemberNotFound(_))));
}
