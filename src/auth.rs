//! Persisted sign-in state.
//!
//! The authenticated user is kept as one JSON blob under one key in a
//! [`KeyValueStore`]. The blob is read once when a workspace opens and
//! written on login, signup, and logout.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Debug;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::error::ValidationError;

/// Storage key of the auth blob.
pub const AUTH_STORAGE_KEY: &str = "kaddaConnectAuth";

/// Shortest password accepted at signup.
pub const MIN_PASSWORD_CHARS: usize = 6;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage file is not a JSON object: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("an account with email {0} already exists")]
    EmailTaken(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// String key/value persistence.
pub trait KeyValueStore: Send + Sync + Debug {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// All keys in one JSON object file.
///
/// Every operation re-reads the file so several stores over the same path
/// stay consistent within a process. Writes go through a temporary file in
/// the same directory that is renamed into place, so readers never observe
/// a partial file. A file that is already damaged is reset on the next
/// write instead of blocking every session.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// The current map for a write. A malformed file is logged and
    /// treated as empty; I/O errors still fail.
    fn read_map_for_write(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match self.read_map() {
            Err(StorageError::Json(e)) => {
                tracing::warn!(
                    name: "storage.file.malformed",
                    path = %self.path.display(),
                    error = %e,
                    "Discarding malformed storage file"
                );
                Ok(BTreeMap::new())
            }
            other => other,
        }
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let dir = match self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => {
                std::fs::create_dir_all(parent)?;
                parent
            }
            None => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(serde_json::to_string_pretty(map)?.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| StorageError::Io(e.error))?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.read_map()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut map = self.read_map_for_write()?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut map = match self.read_map() {
            Ok(map) => map,
            // Nothing readable to remove from; rewrite as an empty object.
            Err(StorageError::Json(_)) => return self.write_map(&self.read_map_for_write()?),
            Err(e) => return Err(e),
        };
        if map.remove(key).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl KeyValueStore for InMemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.remove(key);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthState {
    pub is_authenticated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<AuthUser>,
}

impl AuthState {
    #[must_use]
    pub fn signed_in(user: AuthUser) -> Self {
        Self {
            is_authenticated: true,
            user: Some(user),
        }
    }

    /// The user, if the state is both flagged authenticated and carries one.
    #[must_use]
    pub fn user(&self) -> Option<&AuthUser> {
        self.user.as_ref().filter(|_| self.is_authenticated)
    }
}

/// The auth blob for one workspace, cached after the initial load.
#[derive(Debug, Clone)]
pub struct AuthStore {
    backend: Arc<dyn KeyValueStore>,
    key: String,
    state: AuthState,
}

impl AuthStore {
    /// Read the blob under `key` once.
    ///
    /// A missing, unreadable, or malformed blob loads as signed out.
    pub fn load(backend: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        let key = key.into();
        let state = match backend.get(&key) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(name: "auth.load.malformed", key = %key, error = %e, "Ignoring malformed auth state");
                AuthState::default()
            }),
            Ok(None) => AuthState::default(),
            Err(e) => {
                tracing::warn!(name: "auth.load.failed", key = %key, error = %e, "Failed to read auth state");
                AuthState::default()
            }
        };
        Self {
            backend,
            key,
            state,
        }
    }

    /// A store backed by process memory only.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::load(Arc::new(InMemoryStore::default()), AUTH_STORAGE_KEY)
    }

    #[must_use]
    pub fn state(&self) -> &AuthState {
        &self.state
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Write a signed-in state. The cached state only changes if the write
    /// succeeds.
    pub fn persist(&mut self, user: AuthUser) -> Result<&AuthState, StorageError> {
        let state = AuthState::signed_in(user);
        self.backend.set(&self.key, &serde_json::to_string(&state)?)?;
        self.state = state;
        Ok(&self.state)
    }

    /// Remove the blob and reset to signed out.
    pub fn clear(&mut self) -> Result<(), StorageError> {
        self.backend.remove(&self.key)?;
        self.state = AuthState::default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn user() -> AuthUser {
        AuthUser {
            id: "member-1".to_string(),
            email: "grace@kadda.church".to_string(),
            display_name: "Grace Adeyemi".to_string(),
        }
    }

    #[test]
    fn test_state_wire_format() {
        let json = serde_json::to_value(AuthState::signed_in(user())).unwrap();
        assert_eq!(json["isAuthenticated"], true);
        assert_eq!(json["user"]["displayName"], "Grace Adeyemi");

        let signed_out = serde_json::to_value(AuthState::default()).unwrap();
        assert_eq!(signed_out, serde_json::json!({ "isAuthenticated": false }));
    }

    #[test]
    fn test_persist_survives_reload() {
        let dir = TempDir::new().unwrap();
        let backend: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(dir.path().join("auth.json")));

        let mut store = AuthStore::load(Arc::clone(&backend), AUTH_STORAGE_KEY);
        assert!(!store.state().is_authenticated);
        store.persist(user()).unwrap();

        let reloaded = AuthStore::load(backend, AUTH_STORAGE_KEY);
        assert_eq!(reloaded.state().user(), Some(&user()));
    }

    #[test]
    fn test_clear_removes_key() {
        let dir = TempDir::new().unwrap();
        let file = FileStore::new(dir.path().join("nested").join("auth.json"));
        file.set("other", "kept").unwrap();
        let backend: Arc<dyn KeyValueStore> = Arc::new(file);

        let mut store = AuthStore::load(Arc::clone(&backend), AUTH_STORAGE_KEY);
        store.persist(user()).unwrap();
        store.clear().unwrap();

        assert_eq!(store.state(), &AuthState::default());
        assert_eq!(backend.get(AUTH_STORAGE_KEY).unwrap(), None);
        assert_eq!(backend.get("other").unwrap().as_deref(), Some("kept"));
    }

    #[test]
    fn test_malformed_blob_loads_signed_out() {
        let backend: Arc<dyn KeyValueStore> = Arc::new(InMemoryStore::default());
        backend.set(AUTH_STORAGE_KEY, "{not json").unwrap();
        let store = AuthStore::load(backend, AUTH_STORAGE_KEY);
        assert_eq!(store.state(), &AuthState::default());
    }

    #[test]
    fn test_truncated_file_does_not_block_sign_in() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("local-storage.json");
        std::fs::write(&path, r#"{"kaddaConnectAuth:s1": "{\"isAuth"#).unwrap();
        let backend: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(&path));

        let mut store = AuthStore::load(Arc::clone(&backend), "kaddaConnectAuth:s2");
        assert!(!store.state().is_authenticated);
        store.persist(user()).unwrap();

        let reloaded = AuthStore::load(Arc::clone(&backend), "kaddaConnectAuth:s2");
        assert_eq!(reloaded.state().user(), Some(&user()));
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(serde_json::from_str::<BTreeMap<String, String>>(&raw).is_ok());
    }

    #[test]
    fn test_clear_over_truncated_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("local-storage.json");
        std::fs::write(&path, "{\"kadda").unwrap();
        let backend: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(&path));

        let mut store = AuthStore::load(Arc::clone(&backend), AUTH_STORAGE_KEY);
        store.clear().unwrap();
        assert_eq!(backend.get(AUTH_STORAGE_KEY).unwrap(), None);
    }

    #[test]
    fn test_file_store_writes_leave_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let file = FileStore::new(dir.path().join("local-storage.json"));
        file.set("a", "1").unwrap();
        file.set("b", "2").unwrap();
        file.remove("a").unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(file.get("b").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn test_user_requires_authenticated_flag() {
        let state = AuthState {
            is_authenticated: false,
            user: Some(user()),
        };
        assert!(state.user().is_none());
    }
}
