//! Client state containers.
//!
//! SYSTEM CONTEXT
//! ==============
//! `auth` holds the session store every auth-aware consumer reads from;
//! `task` holds the polling state machine for server-side generation jobs.

pub mod auth;
pub mod task;

#[cfg(test)]
#[path = "test_helpers.rs"]
pub mod test_helpers;
