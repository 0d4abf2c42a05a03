use std::sync::Arc;

use tempfile::tempdir;
use vault_core::{
    decode_snapshot, InMemoryRecordRepository, JsonFileRepository, Record, RecordRepository,
    RecordStore, RepositoryError, StoreSnapshot,
};

fn bond(id: &str, issuer: &str) -> Record {
    [("id", id), ("issuer_name", issuer)].into_iter().collect()
}

#[test]
fn legacy_bare_list_loads_as_bonds() {
    let snapshot = decode_snapshot(br#"[{"id":"1","issuer_name":"Alpha"}]"#).expect("decode");
    assert_eq!(snapshot.bonds.len(), 1);
    assert!(snapshot.messages.is_empty());
    assert_eq!(snapshot.bonds[0].get("issuer_name"), Some("Alpha"));
}

#[test]
fn structured_shape_loads_both_collections() {
    let snapshot = decode_snapshot(
        br#"{"bonds":[{"id":"1"}],"messages":[{"id":"m1","timestamp":"2024-01-01T00:00:00Z"}]}"#,
    )
    .expect("decode");
    assert_eq!(snapshot.bonds.len(), 1);
    assert_eq!(snapshot.messages.len(), 1);
}

#[test]
fn structured_shape_without_messages_key() {
    let snapshot = decode_snapshot(br#"{"bonds":[{"id":"1"}]}"#).expect("decode");
    assert_eq!(snapshot.bonds.len(), 1);
    assert!(snapshot.messages.is_empty());
}

#[test]
fn garbage_is_reported_as_corrupt() {
    let err = decode_snapshot(b"{not json").expect_err("corrupt");
    assert!(matches!(err, RepositoryError::Corrupt(_)));
}

#[test]
fn json_file_roundtrip() {
    let dir = tempdir().expect("tempdir");
    let repo = JsonFileRepository::new(dir.path().join("nested").join("bond_data.json"));
    let snapshot = StoreSnapshot {
        bonds: vec![bond("1", "Alpha"), bond("2", "Beta Corp")],
        messages: Vec::new(),
    };
    repo.save_snapshot(&snapshot).expect("save");
    let loaded = repo.load_snapshot().expect("load");
    assert_eq!(loaded, snapshot);

    let raw = std::fs::read_to_string(repo.path()).expect("read");
    let value: serde_json::Value = serde_json::from_str(&raw).expect("json");
    assert!(value.get("bonds").is_some());
    assert!(value.get("messages").is_some());
}

#[test]
fn save_leaves_no_temp_files_behind() {
    let dir = tempdir().expect("tempdir");
    let repo = JsonFileRepository::new(dir.path().join("bond_data.json"));
    repo.save_snapshot(&StoreSnapshot::default()).expect("first save");
    repo.save_snapshot(&StoreSnapshot {
        bonds: vec![bond("1", "Alpha")],
        messages: Vec::new(),
    })
    .expect("second save");
    let entries: Vec<_> = std::fs::read_dir(dir.path())
        .expect("read dir")
        .filter_map(Result::ok)
        .collect();
    assert_eq!(entries.len(), 1);
}

#[test]
fn missing_file_reports_missing() {
    let dir = tempdir().expect("tempdir");
    let repo = JsonFileRepository::new(dir.path().join("absent.json"));
    assert!(matches!(repo.load_snapshot(), Err(RepositoryError::Missing)));
}

#[test]
fn store_recovers_from_corrupt_file() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("bond_data.json");
    std::fs::write(&path, b"\x00\x01 definitely not json").expect("write");
    let store = RecordStore::open(Arc::new(JsonFileRepository::new(&path)));
    assert_eq!(store.len(vault_core::Collection::Bonds), 0);
    assert_eq!(store.len(vault_core::Collection::Messages), 0);
}

#[test]
fn store_recovers_from_missing_file() {
    let dir = tempdir().expect("tempdir");
    let store = RecordStore::open(Arc::new(JsonFileRepository::new(dir.path().join("x.json"))));
    assert!(store.list(vault_core::Collection::Bonds).is_empty());
    assert!(store.list(vault_core::Collection::Messages).is_empty());
}

#[test]
fn store_loads_legacy_file() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("bond_data.json");
    std::fs::write(&path, br#"[{"id":"1","issuer_name":"Alpha","coupon_rate":7.5}]"#)
        .expect("write");
    let store = RecordStore::open(Arc::new(JsonFileRepository::new(&path)));
    let bonds = store.list(vault_core::Collection::Bonds);
    assert_eq!(bonds.len(), 1);
    assert_eq!(bonds[0].get("coupon_rate"), Some("7.5"));
}

#[test]
fn in_memory_repository_starts_missing() {
    let repo = InMemoryRecordRepository::empty();
    assert!(matches!(repo.load_snapshot(), Err(RepositoryError::Missing)));
    repo.save_snapshot(&StoreSnapshot::default()).expect("save");
    assert!(repo.saved().is_some());
}
