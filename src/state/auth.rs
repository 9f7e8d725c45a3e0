//! Auth-session state for the current client user.
//!
//! SYSTEM CONTEXT
//! ==============
//! Used by route guards and user-aware consumers to coordinate login
//! redirects and identity-dependent rendering. The `AuthStore` is the single
//! source of truth; everything else reads snapshots.
//!
//! DESIGN
//! ======
//! External-store semantics: `subscribe` / `snapshot` / `set_state`. Each
//! `set_state` swaps an `Arc<Session>`, so an unchanged store hands out the
//! same pointer and consumers can compare with `Arc::ptr_eq` to skip work.
//! Listeners run synchronously in registration order after the state lock is
//! released, so a listener may read the store or subscribe again.
//!
//! Concurrent writers are serialized by a dispatch lock held across the swap
//! and the notification pass, so every listener observes updates in commit
//! order and the last snapshot it sees is the current one. A listener must
//! not call `set_state` itself; that would block on the dispatch lock.
//!
//! The store is an injected handle rather than a global; each test builds a
//! fresh one.

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, warn};

use crate::net::types::User;
use crate::services::storage::SessionStorage;

/// Authentication state tracking the current user and loading status.
#[derive(Clone, Debug, PartialEq)]
pub struct Session {
    pub user: Option<User>,
    /// `true` until the one-time bootstrap read completes; never set again.
    pub loading: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self { user: None, loading: true }
    }
}

impl Session {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

/// Shallow patch applied by [`AuthStore::set_state`]. `None` leaves a field unchanged.
#[derive(Clone, Debug, Default)]
pub struct SessionPatch {
    pub user: Option<Option<User>>,
    pub loading: Option<bool>,
}

impl SessionPatch {
    #[must_use]
    pub fn user(user: Option<User>) -> Self {
        Self { user: Some(user), loading: None }
    }

    #[must_use]
    pub fn loaded(user: Option<User>) -> Self {
        Self { user: Some(user), loading: Some(false) }
    }
}

type Listener = Arc<dyn Fn(&Arc<Session>) + Send + Sync>;

struct StoreInner {
    /// Held for a whole `set_state`, swap plus notification.
    dispatch: Mutex<()>,
    session: Mutex<Arc<Session>>,
    listeners: Mutex<Vec<(u64, Listener)>>,
    next_listener_id: AtomicU64,
    bootstrapped: AtomicBool,
}

/// Process-wide session store. Clone is cheap; all clones share state.
#[derive(Clone)]
pub struct AuthStore {
    inner: Arc<StoreInner>,
}

impl AuthStore {
    /// A fresh store in the initial `{ user: None, loading: true }` state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(StoreInner {
                dispatch: Mutex::new(()),
                session: Mutex::new(Arc::new(Session::default())),
                listeners: Mutex::new(Vec::new()),
                next_listener_id: AtomicU64::new(0),
                bootstrapped: AtomicBool::new(false),
            }),
        }
    }

    /// Current session. Pointer-stable until the next `set_state`.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Session> {
        Arc::clone(&self.inner.session.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Register `listener` for every later change. It is not called now.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Arc<Session>) + Send + Sync + 'static,
    {
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(listener)));
        Subscription { store: Arc::downgrade(&self.inner), id: Some(id) }
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Merge `patch` into the session and notify listeners in order.
    ///
    /// `loading` only ever goes from `true` to `false`; a patch that would
    /// set it back is ignored for that field.
    pub fn set_state(&self, patch: SessionPatch) {
        let _dispatch = self.inner.dispatch.lock().unwrap_or_else(PoisonError::into_inner);
        let next = {
            let mut session = self.inner.session.lock().unwrap_or_else(PoisonError::into_inner);
            let mut merged = Session::clone(&session);
            if let Some(user) = patch.user {
                merged.user = user;
            }
            match patch.loading {
                Some(true) if !session.loading => {
                    warn!("ignoring attempt to re-enter loading state");
                }
                Some(loading) => merged.loading = loading,
                None => {}
            }
            let next = Arc::new(merged);
            *session = Arc::clone(&next);
            next
        };

        let listeners: Vec<Listener> = self
            .inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        debug!(
            authenticated = next.is_authenticated(),
            loading = next.loading,
            listeners = listeners.len(),
            "session updated"
        );
        for listener in listeners {
            listener(&next);
        }
    }

    /// One-time startup read of the persisted user.
    ///
    /// Returns `false` if bootstrap already ran. Storage failures are treated
    /// as "no stored user"; this never fails.
    pub fn bootstrap(&self, storage: &dyn SessionStorage) -> bool {
        if self.inner.bootstrapped.swap(true, Ordering::AcqRel) {
            return false;
        }
        match storage.get_stored_user() {
            Some(user) => {
                info!(user_id = %user.id, "restored persisted session");
                self.set_state(SessionPatch::loaded(Some(user)));
            }
            None => {
                self.set_state(SessionPatch { user: None, loading: Some(false) });
            }
        }
        true
    }

    #[must_use]
    pub fn is_bootstrapped(&self) -> bool {
        self.inner.bootstrapped.load(Ordering::Acquire)
    }
}

impl Default for AuthStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle returned by [`AuthStore::subscribe`]. Dropping it unsubscribes.
#[must_use = "dropping a Subscription immediately unsubscribes the listener"]
pub struct Subscription {
    store: std::sync::Weak<StoreInner>,
    id: Option<u64>,
}

impl Subscription {
    /// Remove the listener now.
    pub fn unsubscribe(mut self) {
        self.remove();
    }

    fn remove(&mut self) {
        let Some(id) = self.id.take() else {
            return;
        };
        if let Some(store) = self.store.upgrade() {
            store
                .listeners
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .retain(|(listener_id, _)| *listener_id != id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.remove();
    }
}
