use super::*;
use std::str::FromStr;
use uuid::Uuid;

#[test]
fn test_typed_id_creation() {
    let id = MemberId::new();
    assert!(!id.to_string().is_empty());
}

#[test]
fn test_typed_id_from_uuid() {
    let uuid = Uuid::new_v4();
    let id = MemberId::from_uuid(uuid);
    assert_eq!(id.into_inner(), uuid);
    assert_eq!(MemberId::from(uuid), id);
}

#[test]
fn test_typed_id_display() {
    let uuid = Uuid::new_v4();
    let id = GroupId::from_uuid(uuid);
    assert_eq!(format!("{id}"), uuid.to_string());
}

#[test]
fn test_typed_id_from_str() {
    let uuid = Uuid::new_v4();
    let id = TransactionId::from_str(&uuid.to_string()).unwrap();
    assert_eq!(id.into_inner(), uuid);
}

#[test]
fn test_typed_id_from_str_error() {
    assert!(MemberId::from_str("invalid").is_err());
    assert!(MemberId::from_str("").is_err());
}

#[test]
fn test_typed_id_ordering_follows_uuid() {
    let low = MemberId::from_uuid(Uuid::from_u128(1));
    let high = MemberId::from_uuid(Uuid::from_u128(2));
    assert!(low < high);

    let mut ids = vec![high, low];
    ids.sort();
    assert_eq!(ids, vec![low, high]);
}

#[test]
fn test_typed_id_serde_transparent() {
    let uuid = Uuid::from_u128(42);
    let id = ActivityId::from_uuid(uuid);
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, format!("\"{uuid}\""));

    let parsed: ActivityId = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, id);
}
