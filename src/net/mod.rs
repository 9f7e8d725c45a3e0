//! Networking modules for the quiz REST API.
//!
//! SYSTEM CONTEXT
//! ==============
//! `api` holds the collaborator traits and the HTTP client, `types` defines
//! the shared wire schema.

pub mod api;
pub mod types;
