//! Shared auth route-guard helpers.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every protected route applies the same decision table, so guards are pure
//! functions of the derived auth value and the path being visited. Nothing
//! here navigates; callers act on the returned `GuardDecision`.

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;

use crate::net::types::{Role, User};
use crate::services::session::{AuthContextError, AuthValue, use_auth};

pub const LOGIN_PATH: &str = "/login";
/// Landing area for authenticated non-admin users.
pub const DEFAULT_LANDING_PATH: &str = "/dashboard";
pub const ADMIN_LANDING_PATH: &str = "/admin";

/// Roles allowed through the admin guard.
pub const ADMIN_ROLES: &[Role] = &[Role::Admin, Role::SuperAdmin];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteGuard {
    /// Any signed-in user.
    Authenticated,
    /// Signed-in users whose role is in the set.
    RoleRestricted(&'static [Role]),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session still bootstrapping; show a neutral waiting state.
    Wait,
    /// Render the protected content.
    Render,
    /// Navigate to `to`. `from` is the destination to resume after login.
    Redirect { to: String, from: Option<String> },
}

impl RouteGuard {
    #[must_use]
    pub fn admin() -> Self {
        Self::RoleRestricted(ADMIN_ROLES)
    }

    /// Decide what to do with a visit to `attempted_path`.
    #[must_use]
    pub fn check(&self, auth: &AuthValue, attempted_path: &str) -> GuardDecision {
        if auth.loading {
            return GuardDecision::Wait;
        }
        let Some(user) = auth.user.as_ref() else {
            return GuardDecision::Redirect {
                to: LOGIN_PATH.to_owned(),
                from: sanitize_return_path(attempted_path),
            };
        };
        match self {
            Self::Authenticated => GuardDecision::Render,
            Self::RoleRestricted(allowed) if allowed.contains(&user.role) => GuardDecision::Render,
            // Silent downgrade: no error page, so admin routes are not advertised.
            Self::RoleRestricted(_) => GuardDecision::Redirect { to: DEFAULT_LANDING_PATH.to_owned(), from: None },
        }
    }
}

/// Apply `guard` using the context installed by the enclosing provider.
///
/// # Errors
///
/// Returns `AuthContextError::OutsideProvider` when called outside a provider.
pub fn check_current(guard: RouteGuard, attempted_path: &str) -> Result<GuardDecision, AuthContextError> {
    let auth = use_auth()?;
    Ok(guard.check(&auth.value(), attempted_path))
}

/// Where to send a user right after signing in.
///
/// Admin roles always land on the admin area; everyone else resumes `from`
/// when it is a safe in-app path, else the default landing page.
#[must_use]
pub fn post_login_redirect(user: &User, from: Option<&str>) -> String {
    if user.role.is_admin() {
        return ADMIN_LANDING_PATH.to_owned();
    }
    from.and_then(sanitize_return_path)
        .unwrap_or_else(|| DEFAULT_LANDING_PATH.to_owned())
}

/// Keep only same-origin paths that do not lead back to the login page.
#[must_use]
pub fn sanitize_return_path(path: &str) -> Option<String> {
    let path = path.trim();
    if !path.starts_with('/') || path.starts_with("//") || path.starts_with("/\\") || path.contains("://") {
        return None;
    }
    let route = path.split(['?', '#']).next().unwrap_or(path);
    if route == LOGIN_PATH || route.starts_with("/login/") {
        return None;
    }
    Some(path.to_owned())
}
