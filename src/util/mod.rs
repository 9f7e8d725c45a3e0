//! Utility helpers shared across client modules.
//!
//! SYSTEM CONTEXT
//! ==============
//! Utility modules keep navigation policy out of the session and network
//! layers so it can be tested as plain functions.

pub mod auth;
