//! Secret storage
//!
//! Secrets are opaque strings addressed by `(service, key)`. The backend is
//! picked from configuration when the store is opened.

use crate::config::{CliConfig, SecretBackend};
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use unl_core::{Result, UnlError};

type Secrets = BTreeMap<String, BTreeMap<String, String>>;

/// A place to keep secrets
pub trait SecretStore: Send + Sync {
    /// Read a secret
    fn get(&self, service: &str, key: &str) -> Result<Option<String>>;

    /// Write a secret, replacing any previous value
    fn set(&self, service: &str, key: &str, value: &str) -> Result<()>;

    /// Remove a secret, returning whether it existed
    fn delete(&self, service: &str, key: &str) -> Result<bool>;

    /// Keys stored under `service`
    fn list(&self, service: &str) -> Result<Vec<String>>;

    /// Which backend this is
    fn backend(&self) -> SecretBackend;
}

/// Open the store selected by `config`
pub fn open_secret_store(config: &CliConfig) -> Result<Box<dyn SecretStore>> {
    let store: Box<dyn SecretStore> = match config.secrets.backend {
        SecretBackend::File => {
            let path = config.secrets_path()?;
            if path.is_dir() {
                return Err(UnlError::config(format!(
                    "secrets path {} is a directory",
                    path.display()
                )));
            }
            Box::new(FileSecretStore::new(path))
        }
        SecretBackend::Memory => Box::new(MemorySecretStore::new()),
    };
    tracing::debug!(backend = %store.backend(), "Opened secret store");
    Ok(store)
}

/// Secrets in a JSON file (`{service: {key: value}}`), mode 0600 on unix
#[derive(Debug, Clone)]
pub struct FileSecretStore {
    path: PathBuf,
}

impl FileSecretStore {
    /// Use the file at `path`; it is created on first write
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Secrets> {
        if !self.path.exists() {
            return Ok(Secrets::new());
        }
        let contents = std::fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(Secrets::new());
        }
        serde_json::from_str(&contents).map_err(|e| {
            UnlError::storage(format!("corrupt secrets file {}: {e}", self.path.display()))
        })
    }

    fn write(&self, secrets: &Secrets) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_vec_pretty(secrets)?;
        let staging = self.path.with_extension("tmp");
        let outcome = write_private_file(&staging, &contents)
            .and_then(|()| std::fs::rename(&staging, &self.path));
        if let Err(e) = outcome {
            if let Err(cleanup) = std::fs::remove_file(&staging) {
                tracing::debug!(error = %cleanup, "Failed to remove staging file");
            }
            return Err(UnlError::storage(format!(
                "failed to write {}: {e}",
                self.path.display()
            )));
        }
        Ok(())
    }
}

/// Create or truncate `path` readable only by the owner, then write `contents`
fn write_private_file(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    #[cfg(unix)]
    {
        // An existing file keeps its old mode on open
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(contents)?;
    file.sync_all()
}

impl SecretStore for FileSecretStore {
    fn get(&self, service: &str, key: &str) -> Result<Option<String>> {
        Ok(self
            .read()?
            .get(service)
            .and_then(|entries| entries.get(key))
            .cloned())
    }

    fn set(&self, service: &str, key: &str, value: &str) -> Result<()> {
        let mut secrets = self.read()?;
        secrets
            .entry(service.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        self.write(&secrets)
    }

    fn delete(&self, service: &str, key: &str) -> Result<bool> {
        let mut secrets = self.read()?;
        let removed = remove_entry(&mut secrets, service, key);
        if removed {
            self.write(&secrets)?;
        }
        Ok(removed)
    }

    fn list(&self, service: &str) -> Result<Vec<String>> {
        Ok(keys_of(&self.read()?, service))
    }

    fn backend(&self) -> SecretBackend {
        SecretBackend::File
    }
}

/// Secrets held in memory for the life of the process
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    secrets: Mutex<Secrets>,
}

impl MemorySecretStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Secrets>> {
        self.secrets
            .lock()
            .map_err(|_| UnlError::storage("secret store lock poisoned"))
    }
}

impl SecretStore for MemorySecretStore {
    fn get(&self, service: &str, key: &str) -> Result<Option<String>> {
        Ok(self
            .lock()?
            .get(service)
            .and_then(|entries| entries.get(key))
            .cloned())
    }

    fn set(&self, service: &str, key: &str, value: &str) -> Result<()> {
        self.lock()?
            .entry(service.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, service: &str, key: &str) -> Result<bool> {
        Ok(remove_entry(&mut *self.lock()?, service, key))
    }

    fn list(&self, service: &str) -> Result<Vec<String>> {
        Ok(keys_of(&*self.lock()?, service))
    }

    fn backend(&self) -> SecretBackend {
        SecretBackend::Memory
    }
}

fn remove_entry(secrets: &mut Secrets, service: &str, key: &str) -> bool {
    let Some(entries) = secrets.get_mut(service) else {
        return false;
    };
    let removed = entries.remove(key).is_some();
    if entries.is_empty() {
        secrets.remove(service);
    }
    removed
}

fn keys_of(secrets: &Secrets, service: &str) -> Vec<String> {
    secrets
        .get(service)
        .map(|entries| entries.keys().cloned().collect())
        .unwrap_or_default()
}
