//! Auth context: the session store plus its login/logout transitions.
//!
//! ARCHITECTURE
//! ============
//! `AuthContext` bundles the `AuthStore` with its collaborators (durable
//! storage, remote auth API, analytics). It is installed for a subtree of
//! work with `AuthProvider::scope` and looked up with `use_auth()`, which
//! reports a missing provider as `AuthContextError` instead of falling back
//! to defaults.
//!
//! TRADE-OFFS
//! ==========
//! `logout()` always clears local state, even when the server call fails.
//! The remote failure is logged and counted but never surfaced; a user who
//! clicked "sign out" is signed out on this device regardless.

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{info, warn};

use crate::net::api::{ApiError, AuthApi};
use crate::net::types::{AuthMethod, User};
use crate::services::analytics::Analytics;
use crate::services::storage::SessionStorage;
use crate::state::auth::{AuthStore, Session, SessionPatch};
use crate::util::auth::post_login_redirect;

// =============================================================================
// ERRORS
// =============================================================================

/// Errors returned by interactive sign-in.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Form input rejected before any request was made.
    #[error("{0}")]
    InvalidInput(&'static str),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl AuthError {
    /// Inline text for the login form.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidInput(message) => (*message).to_owned(),
            Self::Api(ApiError::Unauthorized) => "Invalid email or password.".to_owned(),
            Self::Api(ApiError::ApiRequest(_)) => "Could not reach the server. Try again.".to_owned(),
            Self::Api(_) => "Sign-in failed. Try again later.".to_owned(),
        }
    }
}

/// Misuse of the auth context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthContextError {
    #[error("use_auth() called outside of an AuthProvider scope")]
    OutsideProvider,
}

// =============================================================================
// VALUE
// =============================================================================

/// Derived view handed to consumers.
#[derive(Clone, Debug, PartialEq)]
pub struct AuthValue {
    pub user: Option<User>,
    pub loading: bool,
    pub is_authenticated: bool,
}

impl AuthValue {
    #[must_use]
    pub fn from_session(session: &Session) -> Self {
        Self { user: session.user.clone(), loading: session.loading, is_authenticated: session.is_authenticated() }
    }
}

/// Result of a successful interactive sign-in.
#[derive(Clone, Debug, PartialEq)]
pub struct LoginOutcome {
    pub user: User,
    /// Where the caller should navigate next.
    pub redirect_to: String,
}

/// Trim and check login form input.
///
/// # Errors
///
/// Returns the inline message to show when a field is missing or malformed.
pub fn validate_credentials(email: &str, password: &str) -> Result<(String, String), &'static str> {
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
        return Err("Enter both email and password.");
    }
    if !email.contains('@') {
        return Err("Enter a valid email address.");
    }
    Ok((email.to_owned(), password.to_owned()))
}

// =============================================================================
// CONTEXT
// =============================================================================

struct ContextInner {
    store: AuthStore,
    storage: Arc<dyn SessionStorage>,
    api: Arc<dyn AuthApi>,
    analytics: Arc<dyn Analytics>,
    /// Last snapshot seen by `value()` and the value derived from it.
    value_cache: Mutex<Option<(Arc<Session>, Arc<AuthValue>)>>,
    logout_failures: AtomicU64,
}

/// Session store plus auth transitions. Clone is cheap; clones share state.
#[derive(Clone)]
pub struct AuthContext {
    inner: Arc<ContextInner>,
}

impl AuthContext {
    #[must_use]
    pub fn new(
        store: AuthStore,
        storage: Arc<dyn SessionStorage>,
        api: Arc<dyn AuthApi>,
        analytics: Arc<dyn Analytics>,
    ) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                store,
                storage,
                api,
                analytics,
                value_cache: Mutex::new(None),
                logout_failures: AtomicU64::new(0),
            }),
        }
    }

    #[must_use]
    pub fn store(&self) -> &AuthStore {
        &self.inner.store
    }

    /// Run the store's one-time bootstrap against this context's storage.
    pub fn bootstrap(&self) -> bool {
        self.inner.store.bootstrap(self.inner.storage.as_ref())
    }

    /// Current derived value; the same `Arc` until the session changes.
    #[must_use]
    pub fn value(&self) -> Arc<AuthValue> {
        let session = self.inner.store.snapshot();
        let mut cache = self.inner.value_cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((seen, value)) = cache.as_ref()
            && Arc::ptr_eq(seen, &session)
        {
            return Arc::clone(value);
        }
        let value = Arc::new(AuthValue::from_session(&session));
        *cache = Some((session, Arc::clone(&value)));
        value
    }

    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.inner.store.snapshot().user.clone()
    }

    #[must_use]
    pub fn loading(&self) -> bool {
        self.inner.store.snapshot().loading
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.store.snapshot().is_authenticated()
    }

    /// Remote logout failures swallowed so far.
    #[must_use]
    pub fn logout_failures(&self) -> u64 {
        self.inner.logout_failures.load(Ordering::Relaxed)
    }

    /// Install `user` as the signed-in principal.
    ///
    /// The store update happens first and synchronously; persistence and
    /// analytics follow and cannot fail the login.
    pub fn login(&self, user: User, method: AuthMethod) {
        let user_id = user.id.clone();
        self.inner.store.set_state(SessionPatch::user(Some(user.clone())));
        if let Err(e) = self.inner.storage.save_user(&user) {
            warn!(error = %e, %user_id, "failed to persist session");
        }
        self.inner.analytics.identify(&user_id);
        self.inner.analytics.track_auth_login(method, true, None);
        info!(%user_id, method = method.as_str(), "signed in");
    }

    /// Email + password sign-in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidInput` for bad form input, or the API error
    /// when the server rejects the attempt. The session is unchanged on error.
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
        from: Option<&str>,
    ) -> Result<LoginOutcome, AuthError> {
        let (email, password) = validate_credentials(email, password).map_err(AuthError::InvalidInput)?;
        let result = self.inner.api.login(&email, &password).await;
        self.finish_sign_in(result, AuthMethod::Email, from)
    }

    /// Google OAuth sign-in with an access token obtained by the caller.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidInput` for an empty token, or the API error
    /// when the server rejects it.
    pub async fn sign_in_with_google(&self, access_token: &str, from: Option<&str>) -> Result<LoginOutcome, AuthError> {
        let access_token = access_token.trim();
        if access_token.is_empty() {
            return Err(AuthError::InvalidInput("Missing Google access token."));
        }
        let result = self.inner.api.google_sign_in(access_token).await;
        self.finish_sign_in(result, AuthMethod::Google, from)
    }

    fn finish_sign_in(
        &self,
        result: Result<User, ApiError>,
        method: AuthMethod,
        from: Option<&str>,
    ) -> Result<LoginOutcome, AuthError> {
        match result {
            Ok(user) => {
                let redirect_to = post_login_redirect(&user, from);
                self.login(user.clone(), method);
                Ok(LoginOutcome { user, redirect_to })
            }
            Err(e) => {
                let message = e.to_string();
                warn!(method = method.as_str(), error = %message, "sign-in failed");
                self.inner.analytics.track_auth_login(method, false, Some(&message));
                Err(e.into())
            }
        }
    }

    /// Sign out locally, telling the server on a best-effort basis.
    pub async fn logout(&self) {
        if let Err(e) = self.inner.api.logout().await {
            let failures = self.inner.logout_failures.fetch_add(1, Ordering::Relaxed) + 1;
            warn!(error = %e, failures, "remote logout failed; clearing local session anyway");
        }
        if let Err(e) = self.inner.storage.clear() {
            warn!(error = %e, "failed to clear persisted session");
        }
        self.inner.store.set_state(SessionPatch::user(None));
        self.inner.analytics.reset();
        info!("signed out");
    }
}

// =============================================================================
// PROVIDER SCOPE
// =============================================================================

tokio::task_local! {
    static AUTH_CONTEXT: AuthContext;
}

/// Installs an [`AuthContext`] for the duration of a future or closure.
pub struct AuthProvider;

impl AuthProvider {
    pub async fn scope<F>(context: AuthContext, future: F) -> F::Output
    where
        F: Future,
    {
        AUTH_CONTEXT.scope(context, future).await
    }

    pub fn sync_scope<R>(context: AuthContext, f: impl FnOnce() -> R) -> R {
        AUTH_CONTEXT.sync_scope(context, f)
    }
}

/// The context installed by the nearest enclosing [`AuthProvider`].
///
/// # Errors
///
/// Returns `AuthContextError::OutsideProvider` when no provider is active.
pub fn use_auth() -> Result<AuthContext, AuthContextError> {
    AUTH_CONTEXT
        .try_with(AuthContext::clone)
        .map_err(|_| AuthContextError::OutsideProvider)
}
