//! Shared wire DTOs for the client/REST boundary.
//!
//! DESIGN
//! ======
//! These types mirror the JSON bodies returned by the quiz API so serde
//! round-trips stay lossless. Enum decoding is lenient: unknown roles fall
//! back to the least-privileged role and unknown task statuses are treated as
//! still running, so a server-side addition never breaks a client session.

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;

use serde::{Deserialize, Serialize};

/// Authorization role attached to every user.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Content administrator.
    Admin,
    /// Platform owner; superset of `Admin`.
    SuperAdmin,
    /// Regular learner account. Also absorbs roles this client does not know.
    #[default]
    #[serde(other)]
    User,
}

impl Role {
    /// Whether this role may enter the admin area.
    #[must_use]
    pub fn is_admin(self) -> bool {
        matches!(self, Self::Admin | Self::SuperAdmin)
    }
}

/// An authenticated user as returned by the auth endpoints.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Unique user identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Login email, if the account has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Avatar image URL, if available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    /// Authorization role.
    #[serde(default)]
    pub role: Role,
}

/// How a user signed in. Reported to analytics with every attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthMethod {
    Email,
    Google,
}

impl AuthMethod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Google => "google",
        }
    }
}

impl std::fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a server-side generation task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Completed,
    Failed,
    /// Still running. Unknown statuses land here so polling continues.
    #[serde(other)]
    Pending,
}

impl TaskStatus {
    /// `Completed` and `Failed` end polling for a task.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// A server-tracked asynchronous job, as returned by `GET /tasks/{id}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Opaque identifier assigned by the submitting endpoint.
    pub id: String,
    pub status: TaskStatus,
    /// Job output, present once `status` is `COMPLETED`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// Failure reason, present once `status` is `FAILED`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Task {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
