use super::*;
use crate::net::types::Role;

fn alice() -> User {
    User {
        id: "u1".into(),
        name: "Alice".into(),
        email: Some("alice@example.com".into()),
        avatar_url: None,
        role: Role::User,
    }
}

// =============================================================================
// FileSessionStorage
// =============================================================================

#[test]
fn file_missing_reads_as_absent() {
    let dir = tempfile::tempdir().unwrap();
    let storage = FileSessionStorage::new(dir.path().join("session.json"));
    assert_eq!(storage.load_user().unwrap(), None);
}

#[test]
fn file_save_then_load() {
    let dir = tempfile::tempdir().unwrap();
    let storage = FileSessionStorage::new(dir.path().join("nested").join("session.json"));
    storage.save_user(&alice()).unwrap();
    assert_eq!(storage.load_user().unwrap(), Some(alice()));
}

#[test]
fn file_empty_reads_as_absent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    std::fs::write(&path, "  \n").unwrap();
    let storage = FileSessionStorage::new(path);
    assert_eq!(storage.load_user().unwrap(), None);
}

#[test]
fn file_corrupt_is_an_error_but_lenient_read_is_absent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    std::fs::write(&path, "{\"id\": 12").unwrap();
    let storage = FileSessionStorage::new(path);
    assert!(matches!(storage.load_user(), Err(StorageError::Corrupt(_))));
    assert_eq!(storage.get_stored_user(), None);
}

#[test]
fn file_clear_removes_record_and_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let storage = FileSessionStorage::new(dir.path().join("session.json"));
    storage.save_user(&alice()).unwrap();
    storage.clear().unwrap();
    assert!(!storage.path().exists());
    storage.clear().unwrap();
}

// =============================================================================
// MemorySessionStorage
// =============================================================================

#[test]
fn memory_round_trip_and_clear() {
    let storage = MemorySessionStorage::new();
    assert_eq!(storage.get_stored_user(), None);
    storage.save_user(&alice()).unwrap();
    assert_eq!(storage.get_stored_user(), Some(alice()));
    storage.clear().unwrap();
    assert_eq!(storage.get_stored_user(), None);
}

#[test]
fn memory_with_user_is_preloaded() {
    let storage = MemorySessionStorage::with_user(alice());
    assert_eq!(storage.load_user().unwrap().map(|u| u.id), Some("u1".to_owned()));
}
