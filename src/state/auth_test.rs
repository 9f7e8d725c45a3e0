use super::*;
use crate::net::types::Role;
use crate::services::storage::{MemorySessionStorage, StorageError};

fn user(id: &str, role: Role) -> User {
    User { id: id.into(), name: format!("user-{id}"), email: None, avatar_url: None, role }
}

struct BrokenStorage;

impl SessionStorage for BrokenStorage {
    fn load_user(&self) -> Result<Option<User>, StorageError> {
        Err(StorageError::Io(std::io::Error::other("disk on fire")))
    }

    fn save_user(&self, _user: &User) -> Result<(), StorageError> {
        Err(StorageError::Io(std::io::Error::other("disk on fire")))
    }

    fn clear(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

// =============================================================================
// snapshot / set_state
// =============================================================================

#[test]
fn new_store_starts_loading_without_user() {
    let store = AuthStore::new();
    let session = store.snapshot();
    assert!(session.loading);
    assert!(session.user.is_none());
    assert!(!session.is_authenticated());
}

#[test]
fn snapshot_is_pointer_stable_without_changes() {
    let store = AuthStore::new();
    let a = store.snapshot();
    let b = store.snapshot();
    assert!(Arc::ptr_eq(&a, &b));
}

#[test]
fn set_state_swaps_snapshot_and_merges_shallowly() {
    let store = AuthStore::new();
    let before = store.snapshot();
    store.set_state(SessionPatch { user: None, loading: Some(false) });
    let after = store.snapshot();
    assert!(!Arc::ptr_eq(&before, &after));
    assert!(!after.loading);
    assert!(after.user.is_none());

    store.set_state(SessionPatch::user(Some(user("1", Role::User))));
    let latest = store.snapshot();
    assert!(!latest.loading, "loading untouched by a user-only patch");
    assert_eq!(latest.user.as_ref().map(|u| u.id.as_str()), Some("1"));
    // Earlier snapshots are immutable.
    assert!(after.user.is_none());
}

#[test]
fn loading_never_reverts_to_true() {
    let store = AuthStore::new();
    store.set_state(SessionPatch::loaded(None));
    store.set_state(SessionPatch { user: Some(Some(user("1", Role::User))), loading: Some(true) });
    let session = store.snapshot();
    assert!(!session.loading);
    assert!(session.user.is_some(), "the rest of the patch still applies");
}

// =============================================================================
// subscribe
// =============================================================================

#[test]
fn subscribe_does_not_invoke_immediately() {
    let store = AuthStore::new();
    let calls = Arc::new(AtomicU64::new(0));
    let counter = Arc::clone(&calls);
    let _sub = store.subscribe(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    store.set_state(SessionPatch::loaded(None));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn listeners_fire_in_registration_order_with_new_snapshot() {
    let store = AuthStore::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let subs: Vec<Subscription> = (0..3)
        .map(|i| {
            let log = Arc::clone(&log);
            store.subscribe(move |session| log.lock().unwrap().push((i, session.loading)))
        })
        .collect();
    store.set_state(SessionPatch::loaded(None));
    assert_eq!(*log.lock().unwrap(), vec![(0, false), (1, false), (2, false)]);
    drop(subs);
}

#[test]
fn unsubscribe_and_drop_remove_listener() {
    let store = AuthStore::new();
    let calls = Arc::new(AtomicU64::new(0));
    let c1 = Arc::clone(&calls);
    let c2 = Arc::clone(&calls);
    let sub1 = store.subscribe(move |_| {
        c1.fetch_add(1, Ordering::SeqCst);
    });
    let sub2 = store.subscribe(move |_| {
        c2.fetch_add(1, Ordering::SeqCst);
    });
    assert_eq!(store.listener_count(), 2);

    sub1.unsubscribe();
    drop(sub2);
    assert_eq!(store.listener_count(), 0);

    store.set_state(SessionPatch::loaded(None));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn listener_may_read_store_reentrantly() {
    let store = AuthStore::new();
    let seen = Arc::new(Mutex::new(None));
    let reader = store.clone();
    let slot = Arc::clone(&seen);
    let _sub = store.subscribe(move |session| {
        let current = reader.snapshot();
        *slot.lock().unwrap() = Some(Arc::ptr_eq(session, &current));
    });
    store.set_state(SessionPatch::loaded(None));
    assert_eq!(*seen.lock().unwrap(), Some(true));
}

#[test]
fn subscription_outliving_store_drops_cleanly() {
    let store = AuthStore::new();
    let sub = store.subscribe(|_| {});
    drop(store);
    drop(sub);
}

// =============================================================================
// bootstrap
// =============================================================================

#[test]
fn bootstrap_restores_persisted_user() {
    let store = AuthStore::new();
    let storage = MemorySessionStorage::with_user(user("9", Role::Admin));
    assert!(store.bootstrap(&storage));
    let session = store.snapshot();
    assert!(!session.loading);
    assert_eq!(session.user.as_ref().map(|u| u.role), Some(Role::Admin));
}

#[test]
fn bootstrap_without_stored_user_finishes_logged_out() {
    let store = AuthStore::new();
    assert!(store.bootstrap(&MemorySessionStorage::new()));
    let session = store.snapshot();
    assert!(!session.loading);
    assert!(session.user.is_none());
}

#[test]
fn bootstrap_storage_failure_fails_open_to_logged_out() {
    let store = AuthStore::new();
    assert!(store.bootstrap(&BrokenStorage));
    let session = store.snapshot();
    assert!(!session.loading);
    assert!(session.user.is_none());
}

#[test]
fn bootstrap_flips_loading_exactly_once_for_all_subscribers() {
    let store = AuthStore::new();
    let storage = MemorySessionStorage::with_user(user("1", Role::User));
    let transitions = Arc::new(AtomicU64::new(0));
    let finals = Arc::new(Mutex::new(Vec::new()));

    let subs: Vec<Subscription> = (0..5)
        .map(|_| {
            let transitions = Arc::clone(&transitions);
            let finals = Arc::clone(&finals);
            let was_loading_cell = Mutex::new(true);
            store.subscribe(move |session| {
                let mut prev = was_loading_cell.lock().unwrap();
                if *prev && !session.loading {
                    transitions.fetch_add(1, Ordering::SeqCst);
                }
                *prev = session.loading;
                finals.lock().unwrap().push(session.user.as_ref().map(|u| u.id.clone()));
            })
        })
        .collect();

    assert!(store.bootstrap(&storage));
    assert!(!store.bootstrap(&storage), "second bootstrap is a no-op");
    assert!(store.is_bootstrapped());

    assert_eq!(transitions.load(Ordering::SeqCst), 5);
    assert_eq!(*finals.lock().unwrap(), vec![Some("1".to_owned()); 5]);
    drop(subs);
}

// =============================================================================
// concurrent writers
// =============================================================================

#[test]
fn concurrent_writers_notify_in_commit_order() {
    let store = AuthStore::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);
    let _sub = store.subscribe(move |session| {
        log.lock().unwrap().push(Arc::clone(session));
    });

    let writers: Vec<_> = (0..8)
        .map(|t| {
            let store = store.clone();
            std::thread::spawn(move || {
                for i in 0..50 {
                    store.set_state(SessionPatch::user(Some(user(&format!("{t}-{i}"), Role::User))));
                }
            })
        })
        .collect();
    for writer in writers {
        writer.join().unwrap();
    }

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 8 * 50);
    let last = seen.last().unwrap();
    assert!(Arc::ptr_eq(last, &store.snapshot()), "last notification is the current snapshot");
    let distinct: std::collections::HashSet<*const Session> = seen.iter().map(Arc::as_ptr).collect();
    assert_eq!(distinct.len(), seen.len(), "each commit is delivered exactly once");
}
