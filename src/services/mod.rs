//! Client services layered over state and network modules.
//!
//! SYSTEM CONTEXT
//! ==============
//! `storage` persists the signed-in user, `analytics` reports auth events,
//! `session` exposes login/logout over the auth store, and `poller` drives
//! task-status polling in the background.

pub mod analytics;
pub mod poller;
pub mod session;
pub mod storage;
