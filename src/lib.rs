//! Client-side session and task-tracking core for the quiz platform.
//!
//! SYSTEM CONTEXT
//! ==============
//! Persistent storage feeds the `AuthStore`, the `AuthContext` exposes
//! login/logout over it, and route guards turn the derived auth value into
//! render/wait/redirect decisions. The `TaskPoller` runs independently,
//! tracking a server-side generation job until it finishes.

pub mod config;
pub mod net;
pub mod services;
pub mod state;
pub mod util;

pub use config::ClientConfig;
pub use net::api::{ApiError, AuthApi, HttpApi, TaskApi};
pub use net::types::{AuthMethod, Role, Task, TaskStatus, User};
pub use services::poller::TaskPoller;
pub use services::session::{AuthContext, AuthContextError, AuthError, AuthProvider, AuthValue, use_auth};
pub use state::auth::{AuthStore, Session, SessionPatch};
pub use util::auth::{GuardDecision, RouteGuard};
