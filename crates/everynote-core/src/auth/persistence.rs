//! Persisted session slot.
//!
//! Only the user survives a restart. The slot holds `{"user": User | null}`
//! under a fixed storage name.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use super::{AuthError, AuthResult};
use crate::models::User;

/// Storage name of the session slot
pub const DEFAULT_STORAGE_NAME: &str = "auth-storage";

/// Payload written to the session slot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSession {
    #[serde(default)]
    pub user: Option<User>,
}

pub trait SessionPersistence: Clone + Send + Sync + 'static {
    fn load(&self) -> AuthResult<Option<PersistedSession>>;
    fn save(&self, session: &PersistedSession) -> AuthResult<()>;
}

/// Session slot stored as `<dir>/<storage name>.json`.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(dir: impl AsRef<Path>, storage_name: &str) -> Self {
        Self {
            path: dir.as_ref().join(format!("{storage_name}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionPersistence for FileSessionStore {
    fn load(&self) -> AuthResult<Option<PersistedSession>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(error) => {
                return Err(AuthError::Storage(format!(
                    "failed to read {}: {error}",
                    self.path.display()
                )))
            }
        };

        if raw.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn save(&self, session: &PersistedSession) -> AuthResult<()> {
        let storage_error = |error: std::io::Error| {
            AuthError::Storage(format!("failed to write {}: {error}", self.path.display()))
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(storage_error)?;
        }

        // Write then rename so a crash never leaves a half-written slot
        let serialized = serde_json::to_string_pretty(session)?;
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, serialized).map_err(storage_error)?;
        std::fs::rename(&tmp_path, &self.path).map_err(storage_error)?;
        Ok(())
    }
}

/// In-process session slot, for tests and embedders without a filesystem.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    slot: Arc<Mutex<Option<String>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw serialized payload, if anything has been saved
    pub fn raw(&self) -> Option<String> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }
}

impl SessionPersistence for MemorySessionStore {
    fn load(&self) -> AuthResult<Option<PersistedSession>> {
        let slot = self
            .slot
            .lock()
            .map_err(|error| AuthError::Storage(error.to_string()))?;
        match slot.as_deref() {
            Some(raw) => Ok(Some(serde_json::from_str(raw)?)),
            None => Ok(None),
        }
    }

    fn save(&self, session: &PersistedSession) -> AuthResult<()> {
        let serialized = serde_json::to_string(session)?;
        let mut slot = self
            .slot
            .lock()
            .map_err(|error| AuthError::Storage(error.to_string()))?;
        *slot = Some(serialized);
        Ok(())
    }
}
