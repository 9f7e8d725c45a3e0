//! Persistent session storage: the durable copy of the signed-in user.
//!
//! DESIGN
//! ======
//! Pure data access with no auth logic. `FileSessionStorage` keeps one JSON
//! document on disk (the client's equivalent of browser local storage);
//! `MemorySessionStorage` backs tests and ephemeral sessions.
//!
//! ERROR HANDLING
//! ==============
//! Implementations report I/O and decode failures as `StorageError`, but the
//! read path used during bootstrap (`get_stored_user`) folds every failure
//! into "no stored user" so a corrupt file logs the user out instead of
//! wedging startup.

#[cfg(test)]
#[path = "storage_test.rs"]
mod tests;

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::warn;

use crate::net::types::User;

/// Errors produced by session storage backends.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("session storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The stored record exists but is not a valid user document.
    #[error("stored session is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Durable storage for the authenticated user record.
pub trait SessionStorage: Send + Sync {
    /// Read the stored user. `Ok(None)` when nothing has been saved.
    fn load_user(&self) -> Result<Option<User>, StorageError>;

    /// Replace the stored user.
    fn save_user(&self, user: &User) -> Result<(), StorageError>;

    /// Remove the stored user. Clearing an empty store is not an error.
    fn clear(&self) -> Result<(), StorageError>;

    /// Lenient read: any failure is logged and treated as absent.
    fn get_stored_user(&self) -> Option<User> {
        match self.load_user() {
            Ok(user) => user,
            Err(e) => {
                warn!(error = %e, "discarding unreadable stored session");
                None
            }
        }
    }
}

// =============================================================================
// FILE BACKEND
// =============================================================================

/// Stores the user as a single JSON file.
pub struct FileSessionStorage {
    path: PathBuf,
}

impl FileSessionStorage {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStorage for FileSessionStorage {
    fn load_user(&self) -> Result<Option<User>, StorageError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn save_user(&self, user: &User) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(user)?;
        // Write-then-rename so a crash never leaves a half-written record.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// =============================================================================
// MEMORY BACKEND
// =============================================================================

/// In-process storage; contents vanish with the process.
#[derive(Default)]
pub struct MemorySessionStorage {
    user: Mutex<Option<User>>,
}

impl MemorySessionStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_user(user: User) -> Self {
        Self { user: Mutex::new(Some(user)) }
    }
}

impl SessionStorage for MemorySessionStorage {
    fn load_user(&self) -> Result<Option<User>, StorageError> {
        Ok(self
            .user
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone())
    }

    fn save_user(&self, user: &User) -> Result<(), StorageError> {
        *self
            .user
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(user.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        *self
            .user
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = None;
        Ok(())
    }
}
