//! Analytics collaborator for auth events.
//!
//! Calls are fire-and-forget: every method returns `()`, so a broken sink can
//! never fail or delay a login or logout.

use tracing::info;

use crate::net::types::AuthMethod;

pub trait Analytics: Send + Sync {
    /// Associate subsequent events with `user_id`.
    fn identify(&self, user_id: &str);

    /// Drop the current identity (on logout).
    fn reset(&self);

    /// Record a login attempt.
    fn track_auth_login(&self, method: AuthMethod, success: bool, error: Option<&str>);
}

/// Emits analytics events as structured logs on the `analytics` target.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingAnalytics;

impl Analytics for TracingAnalytics {
    fn identify(&self, user_id: &str) {
        info!(target: "analytics", user_id, "identify");
    }

    fn reset(&self) {
        info!(target: "analytics", "reset");
    }

    fn track_auth_login(&self, method: AuthMethod, success: bool, error: Option<&str>) {
        info!(target: "analytics", method = method.as_str(), success, error, "auth_login");
    }
}

/// Discards every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopAnalytics;

impl Analytics for NoopAnalytics {
    fn identify(&self, _user_id: &str) {}

    fn reset(&self) {}

    fn track_auth_login(&self, _method: AuthMethod, _success: bool, _error: Option<&str>) {}
}
