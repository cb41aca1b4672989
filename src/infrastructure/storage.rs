use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::warn;

use crate::domain::error::{AppError, Result};
use crate::infrastructure::config::{StorageBackend, StorageConfig};
use crate::infrastructure::security::keyring::KeyringManager;

pub const TOKEN_KEY: &str = "access_token";
pub const USER_KEY: &str = "user";

/// Durable key/value storage for the session, read on every authenticated request.
pub trait SessionStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

pub fn build_storage(config: &StorageConfig) -> Arc<dyn SessionStorage> {
    match config.backend {
        StorageBackend::File => Arc::new(FileStorage::new(config.path.clone())),
        StorageBackend::Keyring => Arc::new(KeyringStorage::new(&config.keyring_service)),
        StorageBackend::Memory => Arc::new(MemoryStorage::default()),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<BTreeMap<String, String>>,
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        lock(&self.entries).insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        lock(&self.entries).remove(key);
        Ok(())
    }
}

/// JSON object on disk. The file and its parent directory are created on first write.
pub struct FileStorage {
    path: PathBuf,
    guard: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        match serde_json::from_str(&content) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                warn!(
                    error = %e,
                    path = %self.path.display(),
                    "Session file is corrupt, starting empty"
                );
                Ok(BTreeMap::new())
            }
        }
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            ensure_dir(parent)?;
        }
        let serialized = serde_json::to_string_pretty(entries)
            .map_err(|e| AppError::Internal(format!("Failed to serialize session: {}", e)))?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serialized)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl SessionStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = lock(&self.guard);
        Ok(self.read_all()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = lock(&self.guard);
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let _guard = lock(&self.guard);
        let mut entries = self.read_all()?;
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}

/// OS credential store, one entry per key.
///
/// Writes are read back, so a store that does not retain values fails loudly
/// instead of dropping the session.
pub struct KeyringStorage {
    keyring: KeyringManager,
}

impl KeyringStorage {
    pub fn new(service: &str) -> Self {
        Self {
            keyring: KeyringManager::new(service),
        }
    }
}

impl SessionStorage for KeyringStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.keyring.get_secret(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.keyring.set_secret(key, value)?;
        match self.keyring.get_secret(key)? {
            Some(stored) if stored == value => Ok(()),
            _ => {
                warn!(key, "Credential store did not retain the written value");
                Err(AppError::SecurityError(format!(
                    "Credential store did not retain '{}'",
                    key
                )))
            }
        }
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.keyring.delete_secret(key)
    }
}

fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.as_os_str().is_empty() && !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}
